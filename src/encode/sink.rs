use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::BatchResult;
use crate::host::VideoCodec;
use crate::render::FrameRGBA;

/// Configuration provided to a [`FrameSink`] at the start of a capture.
#[derive(Debug, Clone, PartialEq)]
pub struct SinkConfig {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Output frames-per-second.
    pub fps: Fps,
    pub codec: VideoCodec,
}

/// Sink contract for consuming rendered frames in take order.
///
/// Ordering contract: `push_frame` is called in strictly increasing `FrameIndex` order within the
/// captured range.
pub trait FrameSink: Send {
    /// Called once before any frames are pushed.
    fn begin(&mut self, cfg: SinkConfig) -> BatchResult<()>;
    /// Push one frame in strictly increasing take order.
    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> BatchResult<()>;
    /// Called once after the last frame is pushed.
    fn end(&mut self) -> BatchResult<()>;
}
