use crate::foundation::core::{Canvas, DQuat, DVec3, Pose};

/// Points closer than this to the camera plane are not drawn.
pub const NEAR: f64 = 1.0;

/// Pinhole projection for a camera that looks down its local +X axis with +Y up and +Z to the
/// right.
#[derive(Clone, Copy, Debug)]
pub struct Projection {
    position: DVec3,
    inv_rotation: DQuat,
    focal: f64,
    cx: f64,
    cy: f64,
}

impl Projection {
    pub fn new(camera: &Pose, canvas: Canvas, fov_y_deg: f64) -> Self {
        let fov = fov_y_deg.clamp(1.0, 179.0).to_radians();
        let h = f64::from(canvas.height);
        Self {
            position: camera.position,
            inv_rotation: camera.rotation().inverse(),
            focal: (h * 0.5) / (fov * 0.5).tan(),
            cx: f64::from(canvas.width) * 0.5,
            cy: h * 0.5,
        }
    }

    /// World point in camera space: `x` is depth along the view direction.
    pub fn to_camera(&self, p: DVec3) -> DVec3 {
        self.inv_rotation * (p - self.position)
    }

    fn screen(&self, local: DVec3) -> (f64, f64) {
        (
            self.cx + local.z / local.x * self.focal,
            self.cy - local.y / local.x * self.focal,
        )
    }

    /// Screen position and depth of a world point, `None` behind the near plane.
    pub fn project(&self, p: DVec3) -> Option<(f64, f64, f64)> {
        let local = self.to_camera(p);
        if local.x < NEAR {
            return None;
        }
        let (x, y) = self.screen(local);
        Some((x, y, local.x))
    }

    /// Screen endpoints of a world segment, clipped against the near plane.
    pub fn project_segment(&self, a: DVec3, b: DVec3) -> Option<((f64, f64), (f64, f64))> {
        let mut la = self.to_camera(a);
        let mut lb = self.to_camera(b);
        match (la.x >= NEAR, lb.x >= NEAR) {
            (false, false) => return None,
            (true, false) => lb = la.lerp(lb, (la.x - NEAR) / (la.x - lb.x)),
            (false, true) => la = lb.lerp(la, (lb.x - NEAR) / (lb.x - la.x)),
            (true, true) => {}
        }
        Some((self.screen(la), self.screen(lb)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn legacy_front() -> Projection {
        Projection::new(
            &Pose::new([50.0, 50.0, 1000.0], [0.0, 90.0, 0.0]),
            Canvas {
                width: 640,
                height: 480,
            },
            40.0,
        )
    }

    #[test]
    fn front_camera_sees_origin_near_center() {
        let p = legacy_front();
        let (x, y, depth) = p.project(DVec3::new(50.0, 50.0, 0.0)).unwrap();
        assert!((x - 320.0).abs() < 1e-9);
        assert!((y - 240.0).abs() < 1e-9);
        assert!((depth - 1000.0).abs() < 1e-9);

        // Up on screen is +Y in the world.
        let (_, y_up, _) = p.project(DVec3::new(50.0, 150.0, 0.0)).unwrap();
        assert!(y_up < 240.0);
        // Right on screen is +X in the world for a camera looking down -Z.
        let (x_right, _, _) = p.project(DVec3::new(150.0, 50.0, 0.0)).unwrap();
        assert!(x_right > 320.0);
    }

    #[test]
    fn points_behind_camera_are_culled_and_segments_clipped() {
        let p = legacy_front();
        assert!(p.project(DVec3::new(50.0, 50.0, 2000.0)).is_none());

        let seg = p.project_segment(DVec3::new(50.0, 50.0, 0.0), DVec3::new(50.0, 50.0, 2000.0));
        let ((x0, y0), (x1, y1)) = seg.unwrap();
        assert!((x0 - 320.0).abs() < 1e-6 && (y0 - 240.0).abs() < 1e-6);
        assert!((x1 - 320.0).abs() < 1e-6 && (y1 - 240.0).abs() < 1e-6);

        assert!(
            p.project_segment(DVec3::new(0.0, 0.0, 1500.0), DVec3::new(0.0, 0.0, 2000.0))
                .is_none()
        );
    }
}
