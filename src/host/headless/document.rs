//! JSON scene documents: the headless host's stand-in for binary character scenes.
//!
//! ```json
//! {
//!   "fps": 30,
//!   "frames": 0,
//!   "joints": [{ "name": "Hips", "offset": [0, 95, 0] },
//!              { "name": "Spine", "parent": "Hips", "offset": [0, 10, 0] }],
//!   "character": { "name": "Hero", "slots": { "Hips": "Hips", "Spine": "Spine" } },
//!   "cameras": [{ "name": "Producer Perspective", "show_axis": true, "show_grid": true }],
//!   "motion": [{ "joint": "Hips", "keys": [{ "frame": 0, "translation": [0, 95, 0] }] }]
//! }
//! ```

use std::collections::BTreeMap;

use crate::foundation::core::{DVec3, Pose};
use crate::foundation::error::{BatchError, BatchResult};

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SceneDocument {
    /// Whole frames per second.
    #[serde(default)]
    pub fps: Option<u32>,
    /// Length of the scene's take; grown to cover the motion keys.
    #[serde(default)]
    pub frames: u64,
    #[serde(default)]
    pub joints: Vec<JointDoc>,
    #[serde(default)]
    pub character: Option<CharacterDoc>,
    /// Further characters bound to the same joints; `character` stays the scene's current one.
    #[serde(default)]
    pub characters: Vec<CharacterDoc>,
    #[serde(default)]
    pub cameras: Vec<CameraDoc>,
    #[serde(default)]
    pub motion: Vec<MotionDoc>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JointDoc {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub offset: [f64; 3],
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CharacterDoc {
    pub name: String,
    /// Slot name to joint name.
    #[serde(default)]
    pub slots: BTreeMap<String, String>,
    #[serde(default = "default_true")]
    pub characterized: bool,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CameraDoc {
    pub name: String,
    #[serde(default)]
    pub pose: Pose,
    #[serde(default = "default_true")]
    pub show_axis: bool,
    #[serde(default = "default_true")]
    pub show_grid: bool,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MotionDoc {
    pub joint: String,
    pub keys: Vec<KeyDoc>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeyDoc {
    pub frame: u64,
    /// Local translation; the joint's offset when omitted.
    #[serde(default)]
    pub translation: Option<[f64; 3]>,
    /// XYZ Euler angles in degrees.
    #[serde(default)]
    pub rotation_deg: Option<[f64; 3]>,
}

impl SceneDocument {
    pub fn from_json_str(s: &str) -> BatchResult<Self> {
        let doc: Self = serde_json::from_str(s)?;
        doc.validate()?;
        Ok(doc)
    }

    /// Structural checks: unique joint names, parents declared before children, and every slot,
    /// motion track and parent naming a declared joint.
    pub fn validate(&self) -> BatchResult<()> {
        let mut seen = std::collections::HashSet::new();
        for j in &self.joints {
            if j.name.is_empty() {
                return Err(BatchError::serde("joint names must be non-empty"));
            }
            if let Some(p) = &j.parent
                && !seen.contains(p.as_str())
            {
                return Err(BatchError::serde(format!(
                    "joint '{}' references parent '{p}' before it is declared",
                    j.name
                )));
            }
            if !seen.insert(j.name.as_str()) {
                return Err(BatchError::serde(format!("duplicate joint '{}'", j.name)));
            }
        }
        for c in self.all_characters() {
            for (slot, joint) in &c.slots {
                if !seen.contains(joint.as_str()) {
                    return Err(BatchError::serde(format!(
                        "slot '{slot}' references unknown joint '{joint}'"
                    )));
                }
            }
        }
        for m in &self.motion {
            if !seen.contains(m.joint.as_str()) {
                return Err(BatchError::serde(format!(
                    "motion references unknown joint '{}'",
                    m.joint
                )));
            }
        }
        if self.fps == Some(0) {
            return Err(BatchError::serde("fps must be > 0"));
        }
        Ok(())
    }

    /// `character` first, then `characters` in declaration order.
    pub fn all_characters(&self) -> impl Iterator<Item = &CharacterDoc> {
        self.character.iter().chain(&self.characters)
    }

    /// Take length covering both `frames` and the last motion key.
    pub fn span_frames(&self) -> u64 {
        self.motion
            .iter()
            .flat_map(|m| m.keys.iter().map(|k| k.frame + 1))
            .fold(self.frames, u64::max)
    }
}

impl JointDoc {
    pub fn offset(&self) -> DVec3 {
        DVec3::from_array(self.offset)
    }
}
