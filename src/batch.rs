//! Batch orchestration over every (character file, animation file) pair.
//!
//! Each pair runs the same stage sequence against a freshly reset host scene:
//!
//! 1. [`Stage::NewScene`]: reset and tick once so no handle from the previous pair survives.
//! 2. [`Stage::OpenCharacterScene`]: the scene must bring exactly one character (the display
//!    character).
//! 3. [`Stage::ImportAnimation`]: import the clip.
//! 4. [`Stage::CharacterizeIfNeeded`]: characterize the imported skeleton unless the import
//!    already carried a character.
//! 5. [`Stage::Retarget`]: plot the source onto the display character.
//! 6. [`Stage::RenderAllCameras`]: one capture per configured camera.
//!
//! Failure scoping: configuration, characterization and root lookup failures abort the batch;
//! retarget failures skip the pair (or abort, with [`FailureScope::Run`]); render failures only
//! lose one camera.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::camera_rig::{RenderJob, build_and_render, output_path};
use crate::characterize::{TraceProgress, characterize};
use crate::config::{BatchConfig, FailureScope};
use crate::discover::require_inputs;
use crate::foundation::error::{BatchError, BatchResult};
use crate::host::{CharacterId, SceneHost};
use crate::retarget::plot_animation;
use crate::slot_map::SlotMap;

/// Cooperative cancellation flag, checked between pairs.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// A token that has not been cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; every clone observes it. The pair in progress still finishes.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether [`CancelToken::cancel`] was called on this token or any clone.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Pipeline stage of one (character, animation) pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    NewScene,
    OpenCharacterScene,
    ImportAnimation,
    CharacterizeIfNeeded,
    Retarget,
    RenderAllCameras,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NewScene => "new scene",
            Self::OpenCharacterScene => "open character scene",
            Self::ImportAnimation => "import animation",
            Self::CharacterizeIfNeeded => "characterize",
            Self::Retarget => "retarget",
            Self::RenderAllCameras => "render",
        };
        f.write_str(s)
    }
}

/// Inputs and expected outputs of a batch, resolved before any scene is touched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchPlan {
    pub characters: Vec<PathBuf>,
    pub animations: Vec<PathBuf>,
    /// Character-major, then animation, then camera.
    pub outputs: Vec<PathBuf>,
}

impl BatchPlan {
    pub fn pair_count(&self) -> usize {
        self.characters.len() * self.animations.len()
    }
}

/// A pair that was skipped after a non-fatal failure.
#[derive(Debug)]
pub struct SkippedPair {
    pub character_file: PathBuf,
    pub animation_file: PathBuf,
    pub stage: Stage,
    pub error: BatchError,
}

/// A camera capture that failed; the batch moved on.
#[derive(Debug)]
pub struct CameraFailure {
    pub output: PathBuf,
    pub camera_index: usize,
    pub error: BatchError,
}

/// Fatal failure that stopped the batch.
#[derive(Debug)]
pub struct Abort {
    pub character_file: PathBuf,
    pub animation_file: PathBuf,
    pub stage: Stage,
    pub error: BatchError,
}

/// What a batch run produced.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Videos written, in render order.
    pub rendered: Vec<PathBuf>,
    pub skipped: Vec<SkippedPair>,
    pub camera_failures: Vec<CameraFailure>,
    pub aborted: Option<Abort>,
    pub cancelled: bool,
}

impl BatchReport {
    /// `true` when every planned pair ran to completion without losing a camera.
    pub fn is_complete(&self) -> bool {
        self.aborted.is_none()
            && !self.cancelled
            && self.skipped.is_empty()
            && self.camera_failures.is_empty()
    }

    /// Turn a fatal abort into an error, keeping successful and partial runs as `Ok`.
    pub fn into_result(mut self) -> BatchResult<Self> {
        match self.aborted.take() {
            Some(abort) => Err(abort.error),
            None => Ok(self),
        }
    }
}

/// Per-pair state threaded through the stages.
#[derive(Clone, Debug)]
pub struct IterationContext<'p> {
    pub character_file: &'p Path,
    pub animation_file: &'p Path,
    /// Character loaded with the character scene; the one being filmed.
    pub display: CharacterId,
    /// Character driving the display character.
    pub source: CharacterId,
}

struct StageError {
    stage: Stage,
    error: BatchError,
}

trait AtStage<T> {
    fn at(self, stage: Stage) -> Result<T, StageError>;
}

impl<T> AtStage<T> for BatchResult<T> {
    fn at(self, stage: Stage) -> Result<T, StageError> {
        self.map_err(|error| StageError { stage, error })
    }
}

/// Runs a batch against a host.
pub struct BatchOrchestrator<'a> {
    config: &'a BatchConfig,
    slot_map: &'a SlotMap,
    cancel: CancelToken,
}

impl<'a> BatchOrchestrator<'a> {
    pub fn new(config: &'a BatchConfig, slot_map: &'a SlotMap) -> Self {
        Self {
            config,
            slot_map,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Resolve inputs and outputs without touching the host.
    ///
    /// Fails when either input directory has no matching file or two jobs would write the same
    /// output path.
    pub fn plan(&self) -> BatchResult<BatchPlan> {
        let cfg = self.config;
        cfg.validate()?;
        let characters = require_inputs(&cfg.character_dir, &cfg.character_ext, "character")?;
        let animations = require_inputs(&cfg.animation_dir, &cfg.animation_ext, "animation")?;

        let mut outputs = Vec::with_capacity(
            characters.len() * animations.len() * cfg.rig.cameras.len(),
        );
        let mut seen = HashSet::new();
        for character in &characters {
            for animation in &animations {
                for camera_index in 0..cfg.rig.cameras.len() {
                    let out = output_path(
                        cfg.output_dir(),
                        character,
                        camera_index,
                        animation,
                        &cfg.rig.video_ext,
                    );
                    if !seen.insert(out.clone()) {
                        return Err(BatchError::configuration(format!(
                            "output '{}' would be written by more than one job",
                            out.display()
                        )));
                    }
                    outputs.push(out);
                }
            }
        }

        Ok(BatchPlan {
            characters,
            animations,
            outputs,
        })
    }

    /// Run every pair in character-major order.
    ///
    /// Planning errors are returned as `Err`; failures while running are recorded in the
    /// returned [`BatchReport`].
    pub fn run(&self, host: &mut dyn SceneHost) -> BatchResult<BatchReport> {
        let plan = self.plan()?;
        tracing::info!(
            characters = plan.characters.len(),
            animations = plan.animations.len(),
            videos = plan.outputs.len(),
            "starting batch"
        );

        let mut report = BatchReport::default();
        'pairs: for character_file in &plan.characters {
            for animation_file in &plan.animations {
                if self.cancel.is_cancelled() {
                    tracing::warn!("batch cancelled");
                    report.cancelled = true;
                    break 'pairs;
                }

                let Err(StageError { stage, error }) =
                    self.run_pair(host, character_file, animation_file, &mut report)
                else {
                    continue;
                };

                let fatal = error.is_fatal()
                    || (matches!(error, BatchError::Retarget(_))
                        && self.config.retarget_failure == FailureScope::Run);
                if fatal {
                    tracing::error!(
                        character = %character_file.display(),
                        animation = %animation_file.display(),
                        %stage,
                        error = %error,
                        "aborting batch"
                    );
                    report.aborted = Some(Abort {
                        character_file: character_file.clone(),
                        animation_file: animation_file.clone(),
                        stage,
                        error,
                    });
                    break 'pairs;
                }

                tracing::warn!(
                    character = %character_file.display(),
                    animation = %animation_file.display(),
                    %stage,
                    error = %error,
                    "skipping pair"
                );
                report.skipped.push(SkippedPair {
                    character_file: character_file.clone(),
                    animation_file: animation_file.clone(),
                    stage,
                    error,
                });
            }
        }

        tracing::info!(
            rendered = report.rendered.len(),
            skipped = report.skipped.len(),
            camera_failures = report.camera_failures.len(),
            "batch finished"
        );
        Ok(report)
    }

    fn run_pair(
        &self,
        host: &mut dyn SceneHost,
        character_file: &Path,
        animation_file: &Path,
        report: &mut BatchReport,
    ) -> Result<(), StageError> {
        tracing::info!(
            character = %character_file.display(),
            animation = %animation_file.display(),
            "processing pair"
        );

        new_scene(host).at(Stage::NewScene)?;
        let display = open_character_scene(host, character_file).at(Stage::OpenCharacterScene)?;
        host.file_import(animation_file).at(Stage::ImportAnimation)?;
        let source =
            self.characterize_if_needed(host, display).at(Stage::CharacterizeIfNeeded)?;
        plot_animation(host, display, source, &self.config.plot).at(Stage::Retarget)?;

        let ctx = IterationContext {
            character_file,
            animation_file,
            display,
            source,
        };
        self.render_all_cameras(host, &ctx, report);
        Ok(())
    }

    fn characterize_if_needed(
        &self,
        host: &mut dyn SceneHost,
        display: CharacterId,
    ) -> BatchResult<CharacterId> {
        let characters = host.characters();
        match characters.len() {
            1 => {
                let naming = &self.config.source;
                let label = naming.root_label();
                let root = host.find_by_label(&label).ok_or_else(|| {
                    BatchError::root_not_found(format!(
                        "imported skeleton has no joint labelled '{label}'"
                    ))
                })?;
                characterize(
                    host,
                    &naming.root,
                    naming.use_prefix_scheme,
                    &naming.prefix,
                    self.slot_map,
                    root,
                    &mut TraceProgress,
                )
            }
            2 => characters.into_iter().find(|c| *c != display).ok_or_else(|| {
                BatchError::configuration("imported character is the display character")
            }),
            n => Err(BatchError::configuration(format!(
                "expected one or two characters after import, found {n}"
            ))),
        }
    }

    fn render_all_cameras(
        &self,
        host: &mut dyn SceneHost,
        ctx: &IterationContext<'_>,
        report: &mut BatchReport,
    ) {
        let rig = &self.config.rig;
        for (camera_index, camera) in rig.cameras.iter().enumerate() {
            let job = RenderJob {
                target: ctx.display,
                source: ctx.source,
                camera_index,
                camera: *camera,
                light: rig.light.pose,
                output: output_path(
                    self.config.output_dir(),
                    ctx.character_file,
                    camera_index,
                    ctx.animation_file,
                    &rig.video_ext,
                ),
            };

            match build_and_render(host, &job, rig) {
                Ok(path) => {
                    tracing::info!(output = %path.display(), "rendered");
                    report.rendered.push(path);
                }
                Err(error) => {
                    tracing::warn!(output = %job.output.display(), error = %error, "camera failed");
                    report.camera_failures.push(CameraFailure {
                        output: job.output,
                        camera_index,
                        error,
                    });
                }
            }
        }
    }
}

fn new_scene(host: &mut dyn SceneHost) -> BatchResult<()> {
    host.file_new()?;
    host.evaluate();
    Ok(())
}

fn open_character_scene(host: &mut dyn SceneHost, file: &Path) -> BatchResult<CharacterId> {
    host.file_open(file)?;
    let display = host.current_character().ok_or_else(|| {
        BatchError::configuration(format!(
            "no characterized character in character scene '{}'",
            file.display()
        ))
    })?;
    let count = host.characters().len();
    if count != 1 {
        return Err(BatchError::configuration(format!(
            "character scene '{}' must contain exactly one character, found {count}",
            file.display()
        )));
    }
    Ok(display)
}
