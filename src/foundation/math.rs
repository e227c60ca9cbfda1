use glam::{DQuat, DVec3};

/// Rotation for XYZ Euler angles in degrees: X is applied first, then Y, then Z.
pub fn euler_xyz_deg(deg: DVec3) -> DQuat {
    DQuat::from_rotation_z(deg.z.to_radians())
        * DQuat::from_rotation_y(deg.y.to_radians())
        * DQuat::from_rotation_x(deg.x.to_radians())
}

/// Rotation about a single named axis (`'X'`, `'Y'`, `'Z'`), angle in degrees.
pub fn axis_rotation_deg(axis: char, deg: f64) -> Option<DQuat> {
    let rad = deg.to_radians();
    match axis.to_ascii_uppercase() {
        'X' => Some(DQuat::from_rotation_x(rad)),
        'Y' => Some(DQuat::from_rotation_y(rad)),
        'Z' => Some(DQuat::from_rotation_z(rad)),
        _ => None,
    }
}

/// Approximate equality for rotations, treating `q` and `-q` as the same orientation.
pub fn quat_approx_eq(a: DQuat, b: DQuat, eps: f64) -> bool {
    a.dot(b).abs() >= 1.0 - eps
}

pub(crate) fn mul_div255_u16(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn euler_applies_x_then_y_then_z() {
        // Camera 0's legacy orientation turns +X (forward) onto -Z.
        let q = euler_xyz_deg(DVec3::new(0.0, 90.0, 0.0));
        let fwd = q * DVec3::X;
        assert!((fwd - DVec3::NEG_Z).length() < 1e-9);

        let q = euler_xyz_deg(DVec3::new(90.0, 0.0, 90.0));
        // X first maps +Y to +Z, then Z leaves +Z alone.
        assert!(((q * DVec3::Y) - DVec3::Z).length() < 1e-9);
    }

    #[test]
    fn axis_rotation_rejects_unknown_axis() {
        assert!(axis_rotation_deg('w', 10.0).is_none());
        assert!(axis_rotation_deg('x', 10.0).is_some());
    }

    #[test]
    fn quat_sign_is_ignored() {
        let q = DQuat::from_rotation_y(0.3);
        assert!(quat_approx_eq(q, -q, 1e-12));
    }

    #[test]
    fn mul_div255_rounds() {
        assert_eq!(mul_div255_u16(255, 128), 128);
        assert_eq!(mul_div255_u16(10, 255), 10);
        assert_eq!(mul_div255_u16(0, 200), 0);
    }
}
