//! Batch configuration.
//!
//! Everything the interactive tool used to ask for (folders, filters) plus the constants it kept
//! in module globals (camera and light placement, root naming) is a plain value here, loadable
//! from JSON and overridable from the command line.

use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::foundation::core::{Canvas, Fps, Pose};
use crate::foundation::error::{BatchError, BatchResult};
use crate::host::{PlotOptions, VideoCodec};

/// How far a retarget failure propagates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureScope {
    /// Skip the current (character, animation) pair and continue.
    #[default]
    Iteration,
    /// Abort the whole batch.
    Run,
}

/// Placement of the point light used for every capture.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LightConfig {
    pub pose: Pose,
}

impl Default for LightConfig {
    fn default() -> Self {
        // The legacy rig took the Z rotation from camera 0's rotation rather than the light's own
        // table; both are 0 so the value is reproduced here explicitly.
        Self {
            pose: Pose::new([200.0, 200.0, 10.0], [100.0, 0.0, 0.0]),
        }
    }
}

/// Camera placements and capture settings.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RigConfig {
    /// One capture per entry, in order; the index is part of the output name.
    pub cameras: Vec<Pose>,
    pub light: LightConfig,
    pub codec: VideoCodec,
    /// Output file extension, without the dot.
    pub video_ext: String,
    /// Frames skipped at the start of every capture.
    pub settle_frames: u64,
}

impl Default for RigConfig {
    fn default() -> Self {
        Self {
            cameras: vec![
                Pose::new([50.0, 50.0, 1000.0], [0.0, 90.0, 0.0]),
                Pose::new([1000.0, 50.0, 50.0], [170.0, 0.0, 170.0]),
            ],
            light: LightConfig::default(),
            codec: VideoCodec::Uncompressed,
            video_ext: "avi".to_string(),
            settle_frames: 1,
        }
    }
}

impl RigConfig {
    pub fn validate(&self) -> BatchResult<()> {
        if self.cameras.is_empty() {
            return Err(BatchError::configuration("rig needs at least one camera"));
        }
        validate_ext("video_ext", &self.video_ext)
    }
}

/// How the imported animation skeleton's root is found and characterized.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SourceNaming {
    /// Namespace the host gives imported joints (including the trailing `:`).
    pub namespace: String,
    /// Joint name prefix inside the namespace.
    pub prefix: String,
    /// Root joint name.
    pub root: String,
    /// Derive the prefix from the root's first name token (biped-style rigs).
    pub use_prefix_scheme: bool,
}

impl Default for SourceNaming {
    fn default() -> Self {
        Self {
            namespace: "BVH:".to_string(),
            prefix: String::new(),
            root: "Hips".to_string(),
            use_prefix_scheme: false,
        }
    }
}

impl SourceNaming {
    /// Full label the imported root joint is looked up by.
    pub fn root_label(&self) -> String {
        format!("{}{}{}", self.namespace, self.prefix, self.root)
    }
}

/// Headless host render settings.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub canvas: Canvas,
    /// Used when a scene does not declare its own frame rate.
    pub fps: Fps,
    /// Vertical field of view in degrees.
    pub fov_y_deg: f64,
    pub background_rgba: [u8; 4],
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            canvas: Canvas::default(),
            fps: Fps::default(),
            fov_y_deg: 40.0,
            background_rgba: [18, 20, 28, 255],
        }
    }
}

/// Complete batch configuration.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub character_dir: PathBuf,
    pub animation_dir: PathBuf,
    /// Character scene extension, without the dot (matched case-insensitively).
    pub character_ext: String,
    pub animation_ext: String,
    /// Where videos go; defaults to `character_dir`.
    pub output_dir: Option<PathBuf>,
    /// Optional slot map override; the built-in table is used otherwise.
    pub slot_map: Option<PathBuf>,
    pub source: SourceNaming,
    pub retarget_failure: FailureScope,
    pub plot: PlotOptions,
    pub rig: RigConfig,
    pub viewport: ViewportConfig,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            character_dir: PathBuf::from("."),
            animation_dir: PathBuf::from("."),
            character_ext: "fbx".to_string(),
            animation_ext: "bvh".to_string(),
            output_dir: None,
            slot_map: None,
            source: SourceNaming::default(),
            retarget_failure: FailureScope::default(),
            plot: PlotOptions::default(),
            rig: RigConfig::default(),
            viewport: ViewportConfig::default(),
        }
    }
}

impl BatchConfig {
    pub fn new(character_dir: impl Into<PathBuf>, animation_dir: impl Into<PathBuf>) -> Self {
        Self {
            character_dir: character_dir.into(),
            animation_dir: animation_dir.into(),
            ..Self::default()
        }
    }

    pub fn from_json_str(s: &str) -> BatchResult<Self> {
        let cfg: Self = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_path(path: impl AsRef<Path>) -> BatchResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config '{}'", path.display()))?;
        Self::from_json_str(&text)
            .map_err(|e| BatchError::configuration(format!("config '{}': {e}", path.display())))
    }

    pub fn output_dir(&self) -> &Path {
        self.output_dir.as_deref().unwrap_or(&self.character_dir)
    }

    pub fn validate(&self) -> BatchResult<()> {
        validate_ext("character_ext", &self.character_ext)?;
        validate_ext("animation_ext", &self.animation_ext)?;
        if self.source.root.trim().is_empty() {
            return Err(BatchError::configuration("source root name must be non-empty"));
        }
        if self.plot.plot_period == 0 {
            return Err(BatchError::configuration("plot_period must be >= 1"));
        }
        let Canvas { width, height } = self.viewport.canvas;
        if width == 0 || height == 0 || width > u32::from(u16::MAX) || height > u32::from(u16::MAX)
        {
            return Err(BatchError::configuration(format!(
                "viewport {width}x{height} is out of range"
            )));
        }
        self.rig.validate()
    }
}

fn validate_ext(field: &str, ext: &str) -> BatchResult<()> {
    if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(BatchError::configuration(format!(
            "{field} must be a non-empty alphanumeric extension without the dot, got '{ext}'"
        )));
    }
    Ok(())
}
