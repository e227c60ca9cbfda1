//! Frame rendering for the headless host.

use crate::foundation::core::{DVec3, Pose};
use crate::host::DisplayFlags;

/// Perspective projection for scene cameras.
pub mod camera;
/// `vello_cpu` stick-figure rasterizer.
pub mod cpu;

/// One rendered frame, RGBA8 row-major.
#[derive(Clone, Debug)]
pub struct FrameRGBA {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    /// Whether `data` carries premultiplied alpha.
    pub premultiplied: bool,
}

/// Everything needed to draw one frame from one camera.
#[derive(Clone, Debug, Default)]
pub struct SceneView {
    /// World-space bone segments (parent joint to child joint).
    pub bones: Vec<(DVec3, DVec3)>,
    /// World-space joint positions.
    pub joints: Vec<DVec3>,
    pub camera: Pose,
    /// Position of the visible point light, if any. Unlit views use flat shading.
    pub light: Option<DVec3>,
    /// Overlays the viewing camera has enabled.
    pub overlays: DisplayFlags,
}
