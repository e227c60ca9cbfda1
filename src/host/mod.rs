//! Host scene and render services.
//!
//! The pipeline never owns a scene graph. Everything it needs from the animation host (scene
//! lifecycle, character binding, plotting, cameras, capture) goes through [`SceneHost`], so the
//! core stages are host-agnostic and can be driven against [`headless::HeadlessHost`] or any other
//! implementation.
//!
//! Handles returned by a host ([`NodeId`], [`CharacterId`]) are only valid until the next
//! [`SceneHost::file_new`] or [`SceneHost::file_open`]; the pipeline re-resolves by label each
//! iteration.

use std::path::{Path, PathBuf};

use crate::foundation::core::{FrameIndex, FrameRange, Pose};
use crate::foundation::error::BatchResult;

/// Headless in-process host.
pub mod headless;

/// Opaque handle to a scene node (joint, camera, light).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u32);

/// Opaque handle to a character.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CharacterId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LightType {
    Point,
    Infinite,
    Spot,
}

/// Per-camera viewport overlays that must not end up in captured video.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DisplayFlags {
    pub show_axis: bool,
    pub show_grid: bool,
}

impl DisplayFlags {
    pub const HIDDEN: Self = Self {
        show_axis: false,
        show_grid: false,
    };
}

impl Default for DisplayFlags {
    fn default() -> Self {
        Self {
            show_axis: true,
            show_grid: true,
        }
    }
}

/// How a character's input drives it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputType {
    /// Driven by another characterized character (retargeting).
    CharacterStream,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoCodec {
    /// Uncompressed frames (rawvideo in an AVI container for the ffmpeg sink).
    #[default]
    Uncompressed,
    H264,
}

/// Baking parameters for [`SceneHost::plot`].
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PlotOptions {
    /// Drop keys that do not change the curve.
    pub use_constant_key_reducer: bool,
    /// When reducing, keep a single key on fully constant curves.
    pub constant_key_reducer_keep_one_key: bool,
    pub plot_all_takes: bool,
    /// Sample on whole frames only.
    pub plot_on_frame: bool,
    /// Sampling period in frames.
    pub plot_period: u64,
    pub precise_time_discontinuities: bool,
}

impl Default for PlotOptions {
    fn default() -> Self {
        Self {
            use_constant_key_reducer: false,
            constant_key_reducer_keep_one_key: true,
            plot_all_takes: true,
            plot_on_frame: true,
            plot_period: 1,
            precise_time_discontinuities: true,
        }
    }
}

/// What one capture writes.
#[derive(Clone, Debug, PartialEq)]
pub struct CaptureOptions {
    pub output: PathBuf,
    pub span: FrameRange,
}

/// Label-based node lookup, the only way the pipeline addresses skeleton joints.
pub trait NodeLookup {
    /// Resolve a node by its full label (`namespace:name`).
    fn find_by_label(&self, label: &str) -> Option<NodeId>;
    /// Full label of a node, including its namespace.
    fn long_name(&self, node: NodeId) -> Option<String>;
}

/// Everything the pipeline consumes from the animation host.
///
/// All calls are blocking and must be issued from one thread; the host owns a single mutable
/// scene.
pub trait SceneHost: NodeLookup {
    /// Reset to an empty scene. Invalidates all handles.
    fn file_new(&mut self) -> BatchResult<()>;
    /// Force one scene evaluation tick.
    fn evaluate(&mut self);
    /// Load `path` as the active scene, replacing the current one.
    fn file_open(&mut self, path: &Path) -> BatchResult<()>;
    /// Import `path` into the current scene without replacing it.
    fn file_import(&mut self, path: &Path) -> BatchResult<()>;

    fn characters(&self) -> Vec<CharacterId>;
    fn current_character(&self) -> Option<CharacterId>;
    fn set_current_character(&mut self, character: Option<CharacterId>);
    fn create_character(&mut self, name: &str) -> CharacterId;
    fn character_name(&self, character: CharacterId) -> Option<String>;
    fn set_character_name(&mut self, character: CharacterId, name: &str) -> BatchResult<()>;
    /// Bind `node` to `slot`, replacing any previous binding of that slot.
    fn bind_slot(&mut self, character: CharacterId, slot: &str, node: NodeId) -> BatchResult<()>;
    fn slot_binding(&self, character: CharacterId, slot: &str) -> Option<NodeId>;
    /// Toggle characterization. Returns `false` when the host refuses.
    fn set_characterize_on(&mut self, character: CharacterId, on: bool) -> bool;
    fn is_characterized(&self, character: CharacterId) -> bool;
    fn set_input(
        &mut self,
        character: CharacterId,
        source: Option<CharacterId>,
        kind: InputType,
    ) -> BatchResult<()>;
    fn set_active_input(&mut self, character: CharacterId, active: bool) -> BatchResult<()>;
    /// Bake the character's driven motion onto its own skeleton.
    fn plot(&mut self, character: CharacterId, opts: &PlotOptions) -> BatchResult<()>;

    fn create_light(&mut self, name: &str, kind: LightType) -> NodeId;
    fn create_camera(&mut self, name: &str) -> NodeId;
    fn set_pose(&mut self, node: NodeId, pose: Pose) -> BatchResult<()>;
    fn set_visible(&mut self, node: NodeId, visible: bool) -> BatchResult<()>;
    fn destroy(&mut self, node: NodeId);

    /// Force one render tick so newly created cameras are known to the renderer.
    fn render_tick(&mut self);
    fn set_camera_in_pane(&mut self, camera: NodeId, pane: usize) -> BatchResult<()>;
    fn cameras(&self) -> Vec<NodeId>;
    fn display_flags(&self, camera: NodeId) -> Option<DisplayFlags>;
    fn set_display_flags(&mut self, camera: NodeId, flags: DisplayFlags) -> BatchResult<()>;

    fn goto(&mut self, frame: FrameIndex);
    /// Natural span of the current take.
    fn current_take_span(&self) -> FrameRange;
    /// Codec used by subsequent [`SceneHost::render`] calls.
    fn set_video_codec(&mut self, codec: VideoCodec);
    /// Capture the pane-0 camera over `opts.span` into `opts.output`.
    fn render(&mut self, opts: &CaptureOptions) -> BatchResult<()>;
}
