//! Camera rig: transient camera + light setup and one capture per camera.
//!
//! Every capture mutates shared scene state (overlay flags on all cameras) and creates transient
//! objects. Both are owned by a [`CaptureScope`] that undoes them on drop, so the scene looks the
//! same after a camera iteration whether or not the capture succeeded.

use std::path::{Path, PathBuf};

use crate::config::RigConfig;
use crate::discover::file_base;
use crate::foundation::core::{FrameIndex, Pose};
use crate::foundation::error::{BatchError, BatchResult};
use crate::host::{CaptureOptions, CharacterId, DisplayFlags, LightType, NodeId, SceneHost};

/// One capture: a (character, animation, camera) combination.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderJob {
    /// Character the motion was plotted onto (the one being filmed).
    pub target: CharacterId,
    /// Character that drove the plot.
    pub source: CharacterId,
    pub camera_index: usize,
    pub camera: Pose,
    pub light: Pose,
    pub output: PathBuf,
}

/// `<characterBase>_<cameraIndex>_<animationBase>.<videoExt>`
pub fn output_name(
    character_file: &Path,
    camera_index: usize,
    animation_file: &Path,
    video_ext: &str,
) -> String {
    format!(
        "{}_{}_{}.{}",
        file_base(character_file),
        camera_index,
        file_base(animation_file),
        video_ext
    )
}

/// [`output_name`] joined onto `out_dir`.
pub fn output_path(
    out_dir: &Path,
    character_file: &Path,
    camera_index: usize,
    animation_file: &Path,
    video_ext: &str,
) -> PathBuf {
    out_dir.join(output_name(
        character_file,
        camera_index,
        animation_file,
        video_ext,
    ))
}

/// Build the camera/light setup for `job`, capture it, and tear the setup down again.
///
/// Any failure is reported as [`BatchError::Render`]. A file the failed capture created at
/// `job.output` is removed; one left there by an earlier run is kept.
#[tracing::instrument(
    skip(host, job, rig),
    fields(camera = job.camera_index, output = %job.output.display())
)]
pub fn build_and_render(
    host: &mut dyn SceneHost,
    job: &RenderJob,
    rig: &RigConfig,
) -> BatchResult<PathBuf> {
    let mut output = OutputGuard::new(job.output.clone());
    let mut scope = CaptureScope::new(host);

    capture(&mut scope, job, rig).map_err(|e| match e {
        BatchError::Render(_) => e,
        other => BatchError::render(format!("camera {}: {other}", job.camera_index)),
    })?;

    output.commit();
    Ok(job.output.clone())
}

fn capture(scope: &mut CaptureScope<'_>, job: &RenderJob, rig: &RigConfig) -> BatchResult<()> {
    let light = scope.create_light("mylight", LightType::Point);
    scope.host().set_pose(light, job.light)?;
    scope.host().set_visible(light, true)?;

    let camera = scope.create_camera("Camera1");
    scope.host().set_pose(camera, job.camera)?;
    scope.host().render_tick();
    scope.host().set_camera_in_pane(camera, 0)?;

    scope.hide_overlays()?;

    let host = scope.host();
    host.goto(FrameIndex(0));
    host.set_video_codec(rig.codec);
    let span = host
        .current_take_span()
        .with_start(FrameIndex(rig.settle_frames));
    if span.is_empty() {
        return Err(BatchError::render(format!(
            "camera {}: current take has no frames after skipping {}",
            job.camera_index, rig.settle_frames
        )));
    }

    host.render(&CaptureOptions {
        output: job.output.clone(),
        span,
    })
    .map_err(|e| BatchError::render(format!("camera {}: {e}", job.camera_index)))
}

/// Scoped ownership of capture side effects on the host.
///
/// On drop, overlay flags are restored to the values saved by [`CaptureScope::hide_overlays`] and
/// transient nodes are destroyed in reverse creation order.
pub(crate) struct CaptureScope<'a> {
    host: &'a mut dyn SceneHost,
    transient: Vec<NodeId>,
    saved_flags: Vec<(NodeId, DisplayFlags)>,
}

impl<'a> CaptureScope<'a> {
    pub(crate) fn new(host: &'a mut dyn SceneHost) -> Self {
        Self {
            host,
            transient: Vec::new(),
            saved_flags: Vec::new(),
        }
    }

    pub(crate) fn host(&mut self) -> &mut dyn SceneHost {
        &mut *self.host
    }

    fn create_light(&mut self, name: &str, kind: LightType) -> NodeId {
        let id = self.host.create_light(name, kind);
        self.transient.push(id);
        id
    }

    fn create_camera(&mut self, name: &str) -> NodeId {
        let id = self.host.create_camera(name);
        self.transient.push(id);
        id
    }

    /// Save and clear axis/grid display on every scene camera.
    fn hide_overlays(&mut self) -> BatchResult<()> {
        for camera in self.host.cameras() {
            let Some(flags) = self.host.display_flags(camera) else {
                continue;
            };
            if self.saved_flags.iter().all(|(id, _)| *id != camera) {
                self.saved_flags.push((camera, flags));
            }
            self.host.set_display_flags(camera, DisplayFlags::HIDDEN)?;
        }
        Ok(())
    }
}

impl Drop for CaptureScope<'_> {
    fn drop(&mut self) {
        for (camera, flags) in self.saved_flags.drain(..) {
            if let Err(e) = self.host.set_display_flags(camera, flags) {
                tracing::warn!(?camera, error = %e, "failed to restore camera display flags");
            }
        }
        while let Some(node) = self.transient.pop() {
            self.host.destroy(node);
        }
    }
}

/// Removes a file the capture created at `path` unless the capture was committed.
///
/// A file that was already there when the guard was armed belongs to an earlier run and is left
/// alone.
struct OutputGuard {
    path: Option<PathBuf>,
}

impl OutputGuard {
    fn new(path: PathBuf) -> Self {
        Self {
            path: (!path.exists()).then_some(path),
        }
    }

    fn commit(&mut self) {
        self.path = None;
    }
}

impl Drop for OutputGuard {
    fn drop(&mut self) {
        let Some(path) = self.path.take() else {
            return;
        };
        match std::fs::remove_file(&path) {
            Ok(()) => tracing::debug!(path = %path.display(), "removed incomplete output"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to remove incomplete output"
            ),
        }
    }
}
