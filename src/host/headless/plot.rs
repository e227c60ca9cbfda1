//! Baking a character-stream input onto the target skeleton.

use crate::foundation::core::FrameIndex;
use crate::foundation::error::{BatchError, BatchResult};
use crate::host::headless::scene::{Curve, JointKey, Scene};
use crate::host::{CharacterId, InputType, NodeId, PlotOptions};

/// Slot whose translation is transferred (scaled) along with its rotation.
pub(crate) const ROOT_SLOT: &str = "Hips";

const MIN_HEIGHT: f64 = 1e-6;

/// Sample the target's source character at every plotted frame and write the result as keys on
/// the target's own joints. Returns the number of keys written.
///
/// Every slot bound on both characters copies the source joint's local rotation. The root slot
/// also copies its local translation, scaled by the ratio of the two skeletons' root heights so
/// a taller or shorter target keeps its feet on the ground. Other joints keep their rest
/// translation.
pub(crate) fn plot_character(
    scene: &mut Scene,
    target: CharacterId,
    opts: &PlotOptions,
) -> BatchResult<usize> {
    let t = scene
        .character(target)
        .ok_or_else(|| BatchError::host(format!("character {target:?} does not exist")))?;
    if !t.characterized {
        return Err(BatchError::host(format!("character '{}' is not characterized", t.name)));
    }
    let source = match t.input {
        Some((source, InputType::CharacterStream)) if t.active_input => source,
        _ => {
            return Err(BatchError::host(format!(
                "character '{}' has no active character input",
                t.name
            )));
        }
    };
    let s = scene
        .character(source)
        .ok_or_else(|| BatchError::host(format!("source character {source:?} does not exist")))?;
    if !s.characterized {
        return Err(BatchError::host(format!(
            "source character '{}' is not characterized",
            s.name
        )));
    }

    // (slot, target joint, source joint)
    let pairs: Vec<(String, NodeId, NodeId)> = t
        .slots
        .iter()
        .filter_map(|(slot, tj)| s.slots.get(slot).map(|sj| (slot.clone(), *tj, *sj)))
        .collect();
    if pairs.is_empty() {
        return Err(BatchError::host(format!(
            "characters '{}' and '{}' share no bound slots",
            t.name, s.name
        )));
    }

    let takes: Vec<usize> = if opts.plot_all_takes {
        (0..scene.takes.len()).collect()
    } else {
        vec![scene.current_take]
    };

    let mut written = 0usize;
    for take in takes {
        let span = scene.takes[take].span;
        if span.is_empty() {
            return Err(BatchError::host(format!(
                "take '{}' has no frames to plot",
                scene.takes[take].name
            )));
        }

        let scale = root_scale(scene, &pairs, take, span.start);
        let mut baked: Vec<(NodeId, Curve)> = pairs
            .iter()
            .map(|(_, tj, _)| (*tj, Curve::default()))
            .collect();

        for frame in span.frames(opts.plot_period) {
            for ((slot, tj, sj), (_, curve)) in pairs.iter().zip(baked.iter_mut()) {
                let src = scene.local_key(*sj, take, frame).ok_or_else(|| {
                    BatchError::host(format!("source joint for '{slot}' vanished"))
                })?;
                let rest = scene.node(*tj).map(|n| n.rest_offset).ok_or_else(|| {
                    BatchError::host(format!("target joint for '{slot}' vanished"))
                })?;
                let translation = if slot == ROOT_SLOT {
                    src.translation * scale
                } else {
                    rest
                };
                curve.keys.insert(
                    frame.0,
                    JointKey {
                        translation,
                        rotation: src.rotation,
                    },
                );
            }
        }

        for (joint, mut curve) in baked {
            if opts.use_constant_key_reducer {
                curve.reduce_constant(opts.constant_key_reducer_keep_one_key);
            }
            written += curve.keys.len();
            scene.node_mut(joint)?.curves.insert(take, curve);
        }
    }

    // The baked curves now carry the motion; the live input is released.
    scene.character_mut(target)?.active_input = false;
    tracing::debug!(character = ?target, source = ?source, keys = written, "plotted");
    Ok(written)
}

/// Target root height over source root height, 1.0 when either is degenerate.
///
/// Heights come from the rest pose; a source whose root rests at the origin (typical for motion
/// capture clips) is measured at the first plotted frame instead.
fn root_scale(
    scene: &Scene,
    pairs: &[(String, NodeId, NodeId)],
    take: usize,
    first: FrameIndex,
) -> f64 {
    let Some((_, tj, sj)) = pairs.iter().find(|(slot, _, _)| slot == ROOT_SLOT) else {
        return 1.0;
    };
    let rest_height = |id: NodeId| scene.node(id).map(|n| n.rest_offset.y).unwrap_or(0.0);

    let target_h = rest_height(*tj);
    let mut source_h = rest_height(*sj);
    if source_h.abs() < MIN_HEIGHT {
        source_h = scene
            .local_key(*sj, take, first)
            .map(|k| k.translation.y)
            .unwrap_or(0.0);
    }
    if target_h.abs() < MIN_HEIGHT || source_h.abs() < MIN_HEIGHT {
        return 1.0;
    }
    target_h / source_h
}
