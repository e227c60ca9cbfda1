//! Encoding sinks.
//!
//! The headless host captures a camera by pushing rendered frames, in frame order, into a
//! [`sink::FrameSink`] obtained from a [`SinkFactory`].

use std::path::Path;

use crate::foundation::error::BatchResult;

/// `ffmpeg`-based sink (AVI or MP4 output via system `ffmpeg`).
pub mod ffmpeg;
/// Frame sink trait and its configuration.
pub mod sink;

/// Creates one sink per capture.
pub trait SinkFactory {
    /// Sink writing a video to `output`; the codec arrives with [`sink::SinkConfig`].
    fn create(&self, output: &Path) -> BatchResult<Box<dyn sink::FrameSink>>;
}

/// Default factory: every capture spawns its own `ffmpeg` process.
#[derive(Clone, Debug)]
pub struct FfmpegSinkFactory {
    /// Color frames are flattened onto before encoding.
    pub bg_rgba: [u8; 4],
}

impl Default for FfmpegSinkFactory {
    fn default() -> Self {
        Self {
            bg_rgba: [0, 0, 0, 255],
        }
    }
}

impl SinkFactory for FfmpegSinkFactory {
    fn create(&self, output: &Path) -> BatchResult<Box<dyn sink::FrameSink>> {
        let mut opts = ffmpeg::FfmpegSinkOpts::new(output);
        opts.bg_rgba = self.bg_rgba;
        Ok(Box::new(ffmpeg::FfmpegSink::new(opts)))
    }
}
