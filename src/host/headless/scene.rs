use std::collections::BTreeMap;

use crate::foundation::core::{DQuat, DVec3, FrameIndex, FrameRange, Pose};
use crate::foundation::error::{BatchError, BatchResult};
use crate::host::{CharacterId, DisplayFlags, InputType, LightType, NodeId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum NodeKind {
    Joint,
    Camera,
    Light(LightType),
}

/// Local joint transform at one key.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct JointKey {
    pub translation: DVec3,
    pub rotation: DQuat,
}

/// Keyed local transform of one joint in one take. Missing frames interpolate between
/// neighbouring keys and hold the first/last key outside them.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Curve {
    pub keys: BTreeMap<u64, JointKey>,
}

impl Curve {
    pub fn sample(&self, frame: FrameIndex) -> Option<JointKey> {
        let before = self.keys.range(..=frame.0).next_back();
        let after = self.keys.range(frame.0..).next();
        match (before, after) {
            (Some((&f0, k0)), Some((&f1, k1))) if f1 > f0 => {
                let t = (frame.0 - f0) as f64 / (f1 - f0) as f64;
                Some(JointKey {
                    translation: k0.translation.lerp(k1.translation, t),
                    rotation: k0.rotation.slerp(k1.rotation, t),
                })
            }
            (Some((_, k)), _) | (None, Some((_, k))) => Some(*k),
            (None, None) => None,
        }
    }

    /// Drop keys that interpolation reproduces exactly. A fully constant curve keeps its first
    /// key when `keep_one` is set and becomes empty otherwise.
    pub fn reduce_constant(&mut self, keep_one: bool) {
        const EPS: f64 = 1e-9;
        let same = |a: &JointKey, b: &JointKey| {
            a.translation.abs_diff_eq(b.translation, EPS)
                && crate::foundation::math::quat_approx_eq(a.rotation, b.rotation, EPS)
        };

        let frames: Vec<u64> = self.keys.keys().copied().collect();
        let Some(&first) = frames.first() else {
            return;
        };
        let first_key = self.keys[&first];
        if self.keys.values().all(|k| same(k, &first_key)) {
            self.keys.retain(|f, _| keep_one && *f == first);
            return;
        }

        let mut drop = Vec::new();
        for w in frames.windows(3) {
            let (a, b, c) = (&self.keys[&w[0]], &self.keys[&w[1]], &self.keys[&w[2]]);
            if same(a, b) && same(b, c) {
                drop.push(w[1]);
            }
        }
        for f in drop {
            self.keys.remove(&f);
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Node {
    pub label: String,
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    /// Joints: local translation at rest.
    pub rest_offset: DVec3,
    /// Cameras and lights: placement in world space.
    pub pose: Pose,
    pub visible: bool,
    pub display: DisplayFlags,
    /// Joints: animation per take index.
    pub curves: BTreeMap<usize, Curve>,
}

impl Node {
    pub fn joint(label: impl Into<String>, parent: Option<NodeId>, rest_offset: DVec3) -> Self {
        Self {
            label: label.into(),
            kind: NodeKind::Joint,
            parent,
            rest_offset,
            pose: Pose::default(),
            visible: true,
            display: DisplayFlags::default(),
            curves: BTreeMap::new(),
        }
    }

    pub fn object(label: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            label: label.into(),
            kind,
            parent: None,
            rest_offset: DVec3::ZERO,
            pose: Pose::default(),
            visible: true,
            display: DisplayFlags::default(),
            curves: BTreeMap::new(),
        }
    }

    fn rest_key(&self) -> JointKey {
        JointKey {
            translation: self.rest_offset,
            rotation: DQuat::IDENTITY,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub(crate) struct Character {
    pub name: String,
    pub slots: BTreeMap<String, NodeId>,
    pub characterized: bool,
    pub input: Option<(CharacterId, InputType)>,
    pub active_input: bool,
}

#[derive(Clone, Debug)]
pub(crate) struct Take {
    pub name: String,
    pub span: FrameRange,
}

/// The single mutable scene a headless host owns.
#[derive(Clone, Debug)]
pub(crate) struct Scene {
    /// Destroyed nodes leave a hole so outstanding ids never alias a new node.
    pub nodes: Vec<Option<Node>>,
    pub characters: Vec<Character>,
    pub current_character: Option<CharacterId>,
    pub takes: Vec<Take>,
    pub current_take: usize,
    pub pane_camera: Option<NodeId>,
    pub cursor: FrameIndex,
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            characters: Vec::new(),
            current_character: None,
            takes: vec![Take {
                name: "Take 001".to_string(),
                span: FrameRange::empty(),
            }],
            current_take: 0,
            pane_camera: None,
            cursor: FrameIndex(0),
        }
    }
}

impl Scene {
    pub fn add_node(&mut self, node: Node) -> NodeId {
        self.nodes.push(Some(node));
        NodeId((self.nodes.len() - 1) as u32)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0 as usize).and_then(Option::as_ref)
    }

    pub fn node_mut(&mut self, id: NodeId) -> BatchResult<&mut Node> {
        self.nodes
            .get_mut(id.0 as usize)
            .and_then(Option::as_mut)
            .ok_or_else(|| BatchError::host(format!("node {id:?} does not exist")))
    }

    pub fn remove_node(&mut self, id: NodeId) {
        if let Some(slot) = self.nodes.get_mut(id.0 as usize) {
            *slot = None;
        }
        if self.pane_camera == Some(id) {
            self.pane_camera = None;
        }
        for c in &mut self.characters {
            c.slots.retain(|_, n| *n != id);
        }
    }

    pub fn find_by_label(&self, label: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|n| n.as_ref().is_some_and(|n| n.label == label))
            .map(|i| NodeId(i as u32))
    }

    pub fn nodes_of(&self, pred: impl Fn(&NodeKind) -> bool) -> Vec<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, n)| match n {
                Some(n) if pred(&n.kind) => Some(NodeId(i as u32)),
                _ => None,
            })
            .collect()
    }

    pub fn add_character(&mut self, character: Character) -> CharacterId {
        self.characters.push(character);
        CharacterId((self.characters.len() - 1) as u32)
    }

    pub fn character(&self, id: CharacterId) -> Option<&Character> {
        self.characters.get(id.0 as usize)
    }

    pub fn character_mut(&mut self, id: CharacterId) -> BatchResult<&mut Character> {
        self.characters
            .get_mut(id.0 as usize)
            .ok_or_else(|| BatchError::host(format!("character {id:?} does not exist")))
    }

    pub fn current_span(&self) -> FrameRange {
        self.takes
            .get(self.current_take)
            .map(|t| t.span)
            .unwrap_or_else(FrameRange::empty)
    }

    /// Grow the current take so it covers `[0, frames)`.
    pub fn extend_current_take(&mut self, frames: u64) {
        if let Some(take) = self.takes.get_mut(self.current_take)
            && take.span.end.0 < frames
        {
            take.span.end = FrameIndex(frames);
        }
    }

    /// Local transform of a joint in `take` at `frame`; the rest pose when it has no keys.
    pub fn local_key(&self, id: NodeId, take: usize, frame: FrameIndex) -> Option<JointKey> {
        let node = self.node(id)?;
        Some(
            node.curves
                .get(&take)
                .and_then(|c| c.sample(frame))
                .unwrap_or_else(|| node.rest_key()),
        )
    }

    /// World position and rotation of a joint, walking up the parent chain.
    pub fn global_transform(
        &self,
        id: NodeId,
        take: usize,
        frame: FrameIndex,
    ) -> Option<(DVec3, DQuat)> {
        let mut chain = Vec::new();
        let mut cursor = Some(id);
        while let Some(cur) = cursor {
            let node = self.node(cur)?;
            if node.kind != NodeKind::Joint || chain.len() > self.nodes.len() {
                return None;
            }
            chain.push(cur);
            cursor = node.parent;
        }

        let mut pos = DVec3::ZERO;
        let mut rot = DQuat::IDENTITY;
        for joint in chain.into_iter().rev() {
            let key = self.local_key(joint, take, frame)?;
            pos += rot * key.translation;
            rot *= key.rotation;
        }
        Some((pos, rot))
    }

    /// World-space segments from each joint's parent to the joint, plus all joint positions.
    pub fn skeleton_segments(&self, frame: FrameIndex) -> (Vec<(DVec3, DVec3)>, Vec<DVec3>) {
        let take = self.current_take;
        let mut bones = Vec::new();
        let mut joints = Vec::new();
        for id in self.nodes_of(|k| *k == NodeKind::Joint) {
            let Some((p, _)) = self.global_transform(id, take, frame) else {
                continue;
            };
            joints.push(p);
            let parent = self.node(id).and_then(|n| n.parent);
            if let Some((pp, _)) = parent.and_then(|pid| self.global_transform(pid, take, frame)) {
                bones.push((pp, p));
            }
        }
        (bones, joints)
    }
}
