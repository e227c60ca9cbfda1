use crate::foundation::error::{BatchError, BatchResult};

pub use glam::{DQuat, DVec3};

/// Absolute 0-based frame index in take time.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

/// Half-open frame range `[start, end)` in take time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FrameRange {
    /// Inclusive range start.
    pub start: FrameIndex,
    /// Exclusive range end.
    pub end: FrameIndex,
}

impl FrameRange {
    /// Create a validated range with `start <= end`.
    pub fn new(start: FrameIndex, end: FrameIndex) -> BatchResult<Self> {
        if start.0 > end.0 {
            return Err(BatchError::configuration("FrameRange start must be <= end"));
        }
        Ok(Self { start, end })
    }

    /// Empty range anchored at frame zero.
    pub fn empty() -> Self {
        Self {
            start: FrameIndex(0),
            end: FrameIndex(0),
        }
    }

    /// Number of frames contained in the range.
    pub fn len_frames(self) -> u64 {
        self.end.0.saturating_sub(self.start.0)
    }

    /// Return `true` when the range has no frames.
    pub fn is_empty(self) -> bool {
        self.start.0 >= self.end.0
    }

    /// Return `true` when `f` is inside `[start, end)`.
    pub fn contains(self, f: FrameIndex) -> bool {
        self.start.0 <= f.0 && f.0 < self.end.0
    }

    /// Same range with `start` moved to `start`, clamped so the range never inverts.
    pub fn with_start(self, start: FrameIndex) -> Self {
        Self {
            start: FrameIndex(start.0.min(self.end.0)),
            end: self.end,
        }
    }

    /// Frames in the range, stepping by `period` (a zero period is treated as 1).
    pub fn frames(self, period: u64) -> impl Iterator<Item = FrameIndex> {
        (self.start.0..self.end.0)
            .step_by(period.max(1) as usize)
            .map(FrameIndex)
    }
}

/// Frames-per-second represented as a rational `num/den`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    /// Numerator (frames).
    pub num: u32,
    /// Denominator (seconds), must be non-zero.
    pub den: u32,
}

impl Fps {
    /// Create a validated FPS value.
    pub fn new(num: u32, den: u32) -> BatchResult<Self> {
        if den == 0 {
            return Err(BatchError::configuration("Fps den must be > 0"));
        }
        if num == 0 {
            return Err(BatchError::configuration("Fps num must be > 0"));
        }
        Ok(Self { num, den })
    }

    /// Convert to floating-point FPS.
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    /// Nearest rational FPS for a per-frame duration in seconds (as found in BVH files).
    pub fn from_frame_time(secs: f64) -> BatchResult<Self> {
        if !(secs.is_finite() && secs > 0.0) {
            return Err(BatchError::serde(format!("invalid frame time {secs}")));
        }
        let fps = (1.0 / secs).round();
        if fps < 1.0 || fps > f64::from(u16::MAX) {
            return Err(BatchError::serde(format!("frame time {secs} is out of range")));
        }
        Self::new(fps as u32, 1)
    }
}

impl Default for Fps {
    fn default() -> Self {
        Self { num: 30, den: 1 }
    }
}

/// Output frame dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Default for Canvas {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
        }
    }
}

/// Position plus XYZ Euler rotation in degrees, the way scene objects are placed.
#[derive(Clone, Copy, Debug, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct Pose {
    pub position: DVec3,
    /// Euler angles in degrees, applied X then Y then Z.
    pub rotation_deg: DVec3,
}

impl Pose {
    pub fn new(position: [f64; 3], rotation_deg: [f64; 3]) -> Self {
        Self {
            position: DVec3::from_array(position),
            rotation_deg: DVec3::from_array(rotation_deg),
        }
    }

    pub fn rotation(&self) -> DQuat {
        crate::foundation::math::euler_xyz_deg(self.rotation_deg)
    }
}
