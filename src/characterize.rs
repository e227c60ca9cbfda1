//! Characterization: bind a raw skeleton's joints to the canonical slot set.

use crate::foundation::error::{BatchError, BatchResult};
use crate::host::{CharacterId, NodeId, SceneHost};
use crate::slot_map::SlotMap;

/// Observer for per-slot progress while a character is being built.
pub trait Progress {
    /// Called after slot `index` (0-based) of `total` has been processed.
    fn slot_done(&mut self, index: usize, total: usize);
}

/// Emits progress as `tracing` trace events.
#[derive(Debug, Default)]
pub struct TraceProgress;

impl Progress for TraceProgress {
    fn slot_done(&mut self, index: usize, total: usize) {
        let percent = ((index + 1) * 100).checked_div(total).unwrap_or(100);
        tracing::trace!(percent, "creating character mapping");
    }
}

/// Naming parts of a skeleton root, as found in the scene.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RootName {
    /// Everything up to and including the last `:` (empty when there is no namespace).
    pub namespace: String,
    pub name: String,
}

impl RootName {
    pub fn split(long_name: &str) -> Self {
        match long_name.rfind(':') {
            Some(i) => Self {
                namespace: long_name[..=i].to_string(),
                name: long_name[i + 1..].to_string(),
            },
            None => Self {
                namespace: String::new(),
                name: long_name.to_string(),
            },
        }
    }
}

/// How joint labels are composed for one skeleton.
#[derive(Clone, Debug, PartialEq, Eq)]
struct LabelScheme {
    namespace: String,
    prefix: String,
    root: String,
}

impl LabelScheme {
    fn resolve(
        root_name: &str,
        use_prefix_scheme: bool,
        name_prefix: &str,
        root: &RootName,
    ) -> Self {
        if use_prefix_scheme {
            let token = root.name.split_whitespace().next().unwrap_or_default();
            Self {
                namespace: root.namespace.clone(),
                prefix: format!("{token} "),
                root: token.to_string(),
            }
        } else {
            Self {
                namespace: root.namespace.clone(),
                prefix: name_prefix.to_string(),
                root: root_name.to_string(),
            }
        }
    }

    fn character_name(&self, use_prefix_scheme: bool) -> String {
        if use_prefix_scheme {
            format!("{}{}", self.namespace, self.root)
        } else {
            format!("{}{}{}", self.namespace, self.prefix, self.root)
        }
    }

    fn joint_label(&self, label: &str) -> String {
        if label.is_empty() {
            format!("{}{}", self.namespace, self.root)
        } else {
            format!("{}{}{}", self.namespace, self.prefix, label)
        }
    }
}

/// Build a characterized character from the skeleton rooted at `skeleton_root`.
///
/// Slots whose label does not resolve in the scene stay unbound. The new character becomes the
/// host's current character.
#[tracing::instrument(skip(host, slot_map, progress))]
pub fn characterize(
    host: &mut dyn SceneHost,
    root_name: &str,
    use_prefix_scheme: bool,
    name_prefix: &str,
    slot_map: &SlotMap,
    skeleton_root: NodeId,
    progress: &mut dyn Progress,
) -> BatchResult<CharacterId> {
    let long_name = host.long_name(skeleton_root).ok_or_else(|| {
        BatchError::characterization(format!("skeleton root {skeleton_root:?} is not in the scene"))
    })?;
    let root = RootName::split(&long_name);
    let scheme = LabelScheme::resolve(root_name, use_prefix_scheme, name_prefix, &root);

    let character = host.create_character("mycharacter");
    host.set_current_character(Some(character));
    let display_name = scheme.character_name(use_prefix_scheme);
    host.set_character_name(character, &display_name)?;

    let total = slot_map.len();
    let mut bound = 0usize;
    for (index, entry) in slot_map.iter().enumerate() {
        let label = scheme.joint_label(&entry.label);
        if let Some(joint) = host.find_by_label(&label) {
            host.bind_slot(character, &entry.slot, joint)?;
            bound += 1;
        }
        progress.slot_done(index, total);
    }

    if !host.set_characterize_on(character, true) {
        return Err(BatchError::characterization(format!(
            "host refused to characterize '{display_name}' ({bound}/{total} slots bound)"
        )));
    }

    tracing::info!(character = %display_name, bound, total, "character mapping created");
    Ok(character)
}
