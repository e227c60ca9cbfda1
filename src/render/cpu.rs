use crate::config::ViewportConfig;
use crate::foundation::core::DVec3;
use crate::foundation::error::{BatchError, BatchResult};
use crate::render::camera::Projection;
use crate::render::{FrameRGBA, SceneView};

const GRID_HALF_EXTENT: f64 = 500.0;
const GRID_STEP: f64 = 100.0;
const AXIS_LENGTH: f64 = 100.0;

const BONE_WIDTH: f64 = 3.0;
const OVERLAY_WIDTH: f64 = 1.0;
const JOINT_HALF_SIZE: f64 = 3.0;

const BONE_RGB: [u8; 3] = [222, 214, 196];
const JOINT_RGB: [u8; 3] = [255, 170, 60];
const GRID_RGBA: [u8; 4] = [90, 96, 110, 255];

/// Distance at which a point light has halved its contribution.
const LIGHT_FALLOFF: f64 = 1500.0;
/// Shading floor so unlit geometry stays visible.
const AMBIENT: f64 = 0.35;

/// Draws skeletons as lit stick figures with optional ground grid and world axes.
pub struct StickFigureRenderer {
    width: u16,
    height: u16,
    viewport: ViewportConfig,
    pixmap: vello_cpu::Pixmap,
}

impl StickFigureRenderer {
    pub fn new(viewport: ViewportConfig) -> BatchResult<Self> {
        let width: u16 = viewport
            .canvas
            .width
            .try_into()
            .map_err(|_| BatchError::configuration("canvas width exceeds u16"))?;
        let height: u16 = viewport
            .canvas
            .height
            .try_into()
            .map_err(|_| BatchError::configuration("canvas height exceeds u16"))?;
        if width == 0 || height == 0 {
            return Err(BatchError::configuration("canvas must be non-empty"));
        }
        Ok(Self {
            width,
            height,
            viewport,
            pixmap: vello_cpu::Pixmap::new(width, height),
        })
    }

    pub fn render(&mut self, view: &SceneView) -> BatchResult<FrameRGBA> {
        let projection =
            Projection::new(&view.camera, self.viewport.canvas, self.viewport.fov_y_deg);
        let mut ctx = vello_cpu::RenderContext::new(self.width, self.height);

        let [r, g, b, a] = self.viewport.background_rgba;
        ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(r, g, b, a));
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            0.0,
            0.0,
            f64::from(self.width),
            f64::from(self.height),
        ));

        if view.overlays.show_grid {
            draw_grid(&mut ctx, &projection);
        }
        if view.overlays.show_axis {
            draw_axes(&mut ctx, &projection);
        }

        for (a, b) in &view.bones {
            let Some((p0, p1)) = projection.project_segment(*a, *b) else {
                continue;
            };
            let shade = shading(view.light, (*a + *b) * 0.5);
            set_shaded_paint(&mut ctx, BONE_RGB, shade);
            fill_segment(&mut ctx, p0, p1, BONE_WIDTH);
        }

        for j in &view.joints {
            let Some((x, y, _)) = projection.project(*j) else {
                continue;
            };
            set_shaded_paint(&mut ctx, JOINT_RGB, shading(view.light, *j));
            ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
                x - JOINT_HALF_SIZE,
                y - JOINT_HALF_SIZE,
                x + JOINT_HALF_SIZE,
                y + JOINT_HALF_SIZE,
            ));
        }

        ctx.flush();
        ctx.render_to_pixmap(&mut self.pixmap);

        Ok(FrameRGBA {
            width: u32::from(self.width),
            height: u32::from(self.height),
            data: self.pixmap.data_as_u8_slice().to_vec(),
            premultiplied: true,
        })
    }
}

fn shading(light: Option<DVec3>, p: DVec3) -> f64 {
    let Some(light) = light else {
        return 1.0;
    };
    let falloff = 1.0 / (1.0 + light.distance(p) / LIGHT_FALLOFF);
    (AMBIENT + (1.0 - AMBIENT) * falloff).clamp(0.0, 1.0)
}

fn set_shaded_paint(ctx: &mut vello_cpu::RenderContext, rgb: [u8; 3], shade: f64) {
    let scale = |c: u8| (f64::from(c) * shade).round().clamp(0.0, 255.0) as u8;
    ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
        scale(rgb[0]),
        scale(rgb[1]),
        scale(rgb[2]),
        255,
    ));
}

fn draw_grid(ctx: &mut vello_cpu::RenderContext, projection: &Projection) {
    let [r, g, b, a] = GRID_RGBA;
    ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(r, g, b, a));
    let steps = (2.0 * GRID_HALF_EXTENT / GRID_STEP) as i32;
    for i in 0..=steps {
        let t = -GRID_HALF_EXTENT + f64::from(i) * GRID_STEP;
        for (a, b) in [
            (DVec3::new(t, 0.0, -GRID_HALF_EXTENT), DVec3::new(t, 0.0, GRID_HALF_EXTENT)),
            (DVec3::new(-GRID_HALF_EXTENT, 0.0, t), DVec3::new(GRID_HALF_EXTENT, 0.0, t)),
        ] {
            if let Some((p0, p1)) = projection.project_segment(a, b) {
                fill_segment(ctx, p0, p1, OVERLAY_WIDTH);
            }
        }
    }
}

fn draw_axes(ctx: &mut vello_cpu::RenderContext, projection: &Projection) {
    let axes = [
        (DVec3::X, [220, 60, 60]),
        (DVec3::Y, [60, 200, 80]),
        (DVec3::Z, [70, 110, 230]),
    ];
    for (dir, [r, g, b]) in axes {
        if let Some((p0, p1)) = projection.project_segment(DVec3::ZERO, dir * AXIS_LENGTH) {
            ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(r, g, b, 255));
            fill_segment(ctx, p0, p1, OVERLAY_WIDTH * 2.0);
        }
    }
}

/// Fill a screen-space line of `width` pixels as a quad.
fn fill_segment(ctx: &mut vello_cpu::RenderContext, p0: (f64, f64), p1: (f64, f64), width: f64) {
    let (dx, dy) = (p1.0 - p0.0, p1.1 - p0.1);
    let len = (dx * dx + dy * dy).sqrt();
    if !len.is_finite() || len < 1e-6 {
        return;
    }
    let (nx, ny) = (-dy / len * width * 0.5, dx / len * width * 0.5);

    let mut path = vello_cpu::kurbo::BezPath::new();
    path.move_to((p0.0 + nx, p0.1 + ny));
    path.line_to((p1.0 + nx, p1.1 + ny));
    path.line_to((p1.0 - nx, p1.1 - ny));
    path.line_to((p0.0 - nx, p0.1 - ny));
    path.close_path();
    ctx.fill_path(&path);
}
