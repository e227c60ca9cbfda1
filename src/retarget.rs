//! Retarget binding: drive a target character from a source character and bake the result.

use crate::foundation::error::{BatchError, BatchResult};
use crate::host::{CharacterId, InputType, SceneHost};

pub use crate::host::PlotOptions;

/// Drive `target` from `source` and plot the motion onto the target's own skeleton.
///
/// Characterization of the target is (re-)enabled first; calling this on an already
/// characterized target is harmless. Returns the target on success.
#[tracing::instrument(skip(host, opts))]
pub fn plot_animation(
    host: &mut dyn SceneHost,
    target: CharacterId,
    source: CharacterId,
    opts: &PlotOptions,
) -> BatchResult<CharacterId> {
    if target == source {
        return Err(BatchError::retarget("a character cannot drive itself"));
    }
    if !host.is_characterized(source) {
        return Err(BatchError::retarget(format!(
            "source {} is not characterized",
            describe(host, source)
        )));
    }
    if !host.set_characterize_on(target, true) {
        return Err(BatchError::retarget(format!(
            "target {} could not be characterized",
            describe(host, target)
        )));
    }

    host.set_input(target, Some(source), InputType::CharacterStream)
        .map_err(|e| BatchError::retarget(format!("set input: {e}")))?;
    host.set_active_input(target, true)
        .map_err(|e| BatchError::retarget(format!("activate input: {e}")))?;

    host.plot(target, opts).map_err(|e| {
        BatchError::retarget(format!(
            "plot of {} from {} failed: {e}",
            describe(host, target),
            describe(host, source)
        ))
    })?;

    tracing::debug!(
        character = %describe(host, target),
        source = %describe(host, source),
        "plotted"
    );
    Ok(target)
}

fn describe(host: &dyn SceneHost, character: CharacterId) -> String {
    host.character_name(character)
        .map(|n| format!("'{n}'"))
        .unwrap_or_else(|| format!("{character:?}"))
}
