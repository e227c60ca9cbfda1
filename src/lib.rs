//! mocap-batch retargets every motion clip in a folder onto every character in another folder
//! and films each result from a fixed camera rig.
//!
//! The pipeline is split into stages that only talk to the animation host through
//! [`SceneHost`]:
//!
//! - [`characterize()`] binds an imported skeleton to the canonical [`SlotMap`] slots
//! - [`plot_animation`] bakes one character's motion onto another
//! - [`build_and_render`] places a camera and light and captures one video
//! - [`BatchOrchestrator`] runs characters × animations × cameras and reports what happened
//!
//! [`HeadlessHost`] implements [`SceneHost`] in-process (JSON scene documents, BVH clips,
//! `vello_cpu` stick-figure renders, `ffmpeg` encoding).
#![forbid(unsafe_code)]

mod foundation;

/// Batch planning and execution.
pub mod batch;
/// Transient camera/light rig and per-camera capture.
pub mod camera_rig;
/// Skeleton characterization.
pub mod characterize;
/// Batch configuration.
pub mod config;
/// Input file discovery.
pub mod discover;
/// Encoding sinks.
pub mod encode;
/// Host service traits and the headless host.
pub mod host;
/// Frame rendering.
pub mod render;
/// Character-to-character retargeting.
pub mod retarget;
/// Canonical slot to joint-label table.
pub mod slot_map;

pub use crate::foundation::core::{Canvas, DQuat, DVec3, Fps, FrameIndex, FrameRange, Pose};
pub use crate::foundation::error::{BatchError, BatchResult};

pub use crate::batch::{BatchOrchestrator, BatchPlan, BatchReport, CancelToken, Stage};
pub use crate::camera_rig::{RenderJob, build_and_render, output_name};
pub use crate::characterize::{Progress, RootName, TraceProgress, characterize};
pub use crate::config::{BatchConfig, FailureScope, RigConfig, SourceNaming, ViewportConfig};
pub use crate::encode::sink::{FrameSink, SinkConfig};
pub use crate::encode::{FfmpegSinkFactory, SinkFactory};
pub use crate::host::headless::HeadlessHost;
pub use crate::host::{
    CaptureOptions, CharacterId, DisplayFlags, InputType, LightType, NodeId, NodeLookup,
    PlotOptions, SceneHost, VideoCodec,
};
pub use crate::render::FrameRGBA;
pub use crate::retarget::plot_animation;
pub use crate::slot_map::{SlotEntry, SlotMap};
