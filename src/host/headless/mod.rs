//! In-process [`SceneHost`] with no animation package behind it.
//!
//! Scenes are JSON [`document::SceneDocument`]s or BVH clips, sniffed by content rather than
//! extension. Captures render stick figures with `vello_cpu` into a [`FrameSink`] from the
//! configured [`SinkFactory`].

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::config::ViewportConfig;
use crate::encode::sink::{FrameSink, SinkConfig};
use crate::encode::{FfmpegSinkFactory, SinkFactory};
use crate::foundation::core::{DQuat, DVec3, Fps, FrameIndex, FrameRange, Pose};
use crate::foundation::error::{BatchError, BatchResult};
use crate::foundation::math::euler_xyz_deg;
use crate::host::{
    CaptureOptions, CharacterId, DisplayFlags, InputType, LightType, NodeId, NodeLookup,
    PlotOptions, SceneHost, VideoCodec,
};
use crate::render::SceneView;
use crate::render::cpu::StickFigureRenderer;

mod bvh;
/// JSON scene document format.
pub mod document;
mod plot;
mod scene;

use document::SceneDocument;
use scene::{Character, Curve, JointKey, Node, NodeKind, Scene};

/// Namespace given to joints of an imported BVH clip.
pub const BVH_NAMESPACE: &str = "BVH:";
/// Namespace given to everything merged from an imported scene document.
pub const MERGE_NAMESPACE: &str = "merged:";
/// Camera every new scene starts with.
pub const DEFAULT_CAMERA: &str = "Producer Perspective";

/// Headless scene host.
pub struct HeadlessHost {
    scene: Scene,
    viewport: ViewportConfig,
    fps: Fps,
    renderer: StickFigureRenderer,
    sinks: Box<dyn SinkFactory>,
    codec: VideoCodec,
    /// Cameras the renderer has seen; a camera created since the last render tick is unknown.
    known_cameras: BTreeSet<NodeId>,
}

impl HeadlessHost {
    /// Host that encodes captures with the system `ffmpeg`.
    pub fn new(viewport: ViewportConfig) -> BatchResult<Self> {
        let [r, g, b, _] = viewport.background_rgba;
        let sinks = FfmpegSinkFactory {
            bg_rgba: [r, g, b, 255],
        };
        Self::with_sink_factory(viewport, Box::new(sinks))
    }

    pub fn with_sink_factory(
        viewport: ViewportConfig,
        sinks: Box<dyn SinkFactory>,
    ) -> BatchResult<Self> {
        let renderer = StickFigureRenderer::new(viewport.clone())?;
        let mut host = Self {
            scene: Scene::default(),
            fps: viewport.fps,
            viewport,
            renderer,
            sinks,
            codec: VideoCodec::default(),
            known_cameras: BTreeSet::new(),
        };
        host.reset();
        Ok(host)
    }

    /// Frame rate captures are encoded at.
    pub fn fps(&self) -> Fps {
        self.fps
    }

    /// Local translation and rotation of a joint in the current take.
    pub fn joint_local_transform(&self, node: NodeId, frame: FrameIndex) -> Option<(DVec3, DQuat)> {
        if self.scene.node(node)?.kind != NodeKind::Joint {
            return None;
        }
        self.scene
            .local_key(node, self.scene.current_take, frame)
            .map(|k| (k.translation, k.rotation))
    }

    /// World position of a joint in the current take.
    pub fn joint_world_position(&self, node: NodeId, frame: FrameIndex) -> Option<DVec3> {
        self.scene
            .global_transform(node, self.scene.current_take, frame)
            .map(|(p, _)| p)
    }

    /// Current playback frame.
    pub fn cursor(&self) -> FrameIndex {
        self.scene.cursor
    }

    /// Number of live nodes of any kind.
    pub fn node_count(&self) -> usize {
        self.scene.nodes.iter().filter(|n| n.is_some()).count()
    }

    fn reset(&mut self) {
        self.scene = Scene::default();
        self.fps = self.viewport.fps;
        self.known_cameras.clear();
        let camera = self.scene.add_node(Node::object(DEFAULT_CAMERA, NodeKind::Camera));
        self.known_cameras.insert(camera);
    }

    fn read_scene_file(path: &Path) -> BatchResult<SceneFile> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read scene file '{}'", path.display()))?;
        let in_file = |e: BatchError| match e {
            BatchError::Serde(msg) => BatchError::serde(format!("'{}': {msg}", path.display())),
            other => other,
        };
        if text.trim_start().starts_with("HIERARCHY") {
            Ok(SceneFile::Clip(bvh::parse(&text).map_err(in_file)?))
        } else {
            Ok(SceneFile::Document(
                SceneDocument::from_json_str(&text).map_err(in_file)?,
            ))
        }
    }

    /// Add `doc` to the scene with every label prefixed by `namespace`. Returns the document's
    /// first character, if it declares any.
    fn load_document(
        &mut self,
        doc: &SceneDocument,
        namespace: &str,
    ) -> BatchResult<Option<CharacterId>> {
        let take = self.scene.current_take;
        let mut by_name = std::collections::HashMap::new();
        for j in &doc.joints {
            let parent = match &j.parent {
                Some(p) => Some(*by_name.get(p.as_str()).ok_or_else(|| {
                    BatchError::serde(format!("joint '{}' has unknown parent '{p}'", j.name))
                })?),
                None => None,
            };
            let id = self.scene.add_node(Node::joint(
                format!("{namespace}{}", j.name),
                parent,
                j.offset(),
            ));
            by_name.insert(j.name.as_str(), id);
        }

        for m in &doc.motion {
            let id = *by_name
                .get(m.joint.as_str())
                .ok_or_else(|| BatchError::serde(format!("unknown motion joint '{}'", m.joint)))?;
            let node = self.scene.node_mut(id)?;
            let rest = node.rest_offset;
            let curve = node.curves.entry(take).or_default();
            for k in &m.keys {
                curve.keys.insert(
                    k.frame,
                    JointKey {
                        translation: k.translation.map(DVec3::from_array).unwrap_or(rest),
                        rotation: k
                            .rotation_deg
                            .map(|r| euler_xyz_deg(DVec3::from_array(r)))
                            .unwrap_or(DQuat::IDENTITY),
                    },
                );
            }
        }

        for c in &doc.cameras {
            let mut node = Node::object(format!("{namespace}{}", c.name), NodeKind::Camera);
            node.pose = c.pose;
            node.display = DisplayFlags {
                show_axis: c.show_axis,
                show_grid: c.show_grid,
            };
            let id = self.scene.add_node(node);
            self.known_cameras.insert(id);
        }

        let mut first = None;
        for c in doc.all_characters() {
            let mut slots = std::collections::BTreeMap::new();
            for (slot, joint) in &c.slots {
                let id = by_name.get(joint.as_str()).ok_or_else(|| {
                    BatchError::serde(format!("slot '{slot}' has unknown joint '{joint}'"))
                })?;
                slots.insert(slot.clone(), *id);
            }
            let id = self.scene.add_character(Character {
                name: format!("{namespace}{}", c.name),
                slots,
                characterized: c.characterized,
                ..Character::default()
            });
            first.get_or_insert(id);
        }

        self.scene.extend_current_take(doc.span_frames());
        Ok(first)
    }

    /// Add a BVH clip's skeleton and motion with every joint label prefixed by `namespace`.
    fn load_clip(&mut self, clip: &bvh::BvhClip, namespace: &str) -> BatchResult<()> {
        let take = self.scene.current_take;
        let mut ids: Vec<NodeId> = Vec::with_capacity(clip.joints.len());
        for (index, j) in clip.joints.iter().enumerate() {
            let parent = j.parent.and_then(|p| ids.get(p).copied());
            let id = self.scene.add_node(Node::joint(
                format!("{namespace}{}", j.name),
                parent,
                j.offset,
            ));
            ids.push(id);

            let mut curve = Curve::default();
            for frame in 0..clip.frames.len() {
                if let Some((translation, rotation)) = clip.local_key(index, frame) {
                    curve.keys.insert(
                        frame as u64,
                        JointKey {
                            translation,
                            rotation,
                        },
                    );
                }
            }
            if !curve.keys.is_empty() {
                self.scene.node_mut(id)?.curves.insert(take, curve);
            }
        }

        self.fps = clip.fps;
        self.scene.extend_current_take(clip.frames.len() as u64);
        Ok(())
    }

    fn camera(&self, id: NodeId) -> BatchResult<&Node> {
        match self.scene.node(id) {
            Some(n) if n.kind == NodeKind::Camera => Ok(n),
            _ => Err(BatchError::host(format!("{id:?} is not a camera"))),
        }
    }

    fn light_position(&self) -> Option<DVec3> {
        self.scene.nodes.iter().flatten().find_map(|n| match n.kind {
            NodeKind::Light(_) if n.visible => Some(n.pose.position),
            _ => None,
        })
    }

    fn view(&self, camera: &Node, frame: FrameIndex) -> SceneView {
        let (bones, joints) = self.scene.skeleton_segments(frame);
        SceneView {
            bones,
            joints,
            camera: camera.pose,
            light: self.light_position(),
            overlays: camera.display,
        }
    }

    fn capture(
        &mut self,
        camera: NodeId,
        span: FrameRange,
        sink: &mut dyn FrameSink,
    ) -> BatchResult<()> {
        sink.begin(SinkConfig {
            width: self.viewport.canvas.width,
            height: self.viewport.canvas.height,
            fps: self.fps,
            codec: self.codec,
        })?;
        for frame in span.frames(1) {
            self.scene.cursor = frame;
            let view = self.view(self.camera(camera)?, frame);
            let rgba = self.renderer.render(&view)?;
            sink.push_frame(frame, &rgba)?;
        }
        sink.end()
    }
}

enum SceneFile {
    Document(SceneDocument),
    Clip(bvh::BvhClip),
}

/// `<dir>/<stem>.partial.<ext>`: where a capture is written before it is known to be complete.
pub fn partial_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match output.extension() {
        Some(ext) => format!("{stem}.partial.{}", ext.to_string_lossy()),
        None => format!("{stem}.partial"),
    };
    output.with_file_name(name)
}

impl NodeLookup for HeadlessHost {
    fn find_by_label(&self, label: &str) -> Option<NodeId> {
        self.scene.find_by_label(label)
    }

    fn long_name(&self, node: NodeId) -> Option<String> {
        self.scene.node(node).map(|n| n.label.clone())
    }
}

impl SceneHost for HeadlessHost {
    fn file_new(&mut self) -> BatchResult<()> {
        self.reset();
        Ok(())
    }

    fn evaluate(&mut self) {
        let span = self.scene.current_span();
        if span.end.0 > 0 && self.scene.cursor.0 >= span.end.0 {
            self.scene.cursor = FrameIndex(span.end.0 - 1);
        }
    }

    #[tracing::instrument(skip(self, path), fields(path = %path.display()))]
    fn file_open(&mut self, path: &Path) -> BatchResult<()> {
        let file = Self::read_scene_file(path)?;
        self.reset();
        match file {
            SceneFile::Document(doc) => {
                if let Some(fps) = doc.fps {
                    self.fps = Fps::new(fps, 1)?;
                }
                let character = self.load_document(&doc, "")?;
                self.scene.current_character = character;
            }
            SceneFile::Clip(clip) => self.load_clip(&clip, "")?,
        }
        tracing::debug!(nodes = self.node_count(), "scene opened");
        Ok(())
    }

    #[tracing::instrument(skip(self, path), fields(path = %path.display()))]
    fn file_import(&mut self, path: &Path) -> BatchResult<()> {
        match Self::read_scene_file(path)? {
            SceneFile::Document(doc) => {
                self.load_document(&doc, MERGE_NAMESPACE)?;
            }
            SceneFile::Clip(clip) => self.load_clip(&clip, BVH_NAMESPACE)?,
        }
        tracing::debug!(
            nodes = self.node_count(),
            frames = self.scene.current_span().len_frames(),
            "file imported"
        );
        Ok(())
    }

    fn characters(&self) -> Vec<CharacterId> {
        (0..self.scene.characters.len())
            .map(|i| CharacterId(i as u32))
            .collect()
    }

    fn current_character(&self) -> Option<CharacterId> {
        self.scene.current_character
    }

    fn set_current_character(&mut self, character: Option<CharacterId>) {
        self.scene.current_character =
            character.filter(|c| self.scene.character(*c).is_some());
    }

    fn create_character(&mut self, name: &str) -> CharacterId {
        self.scene.add_character(Character {
            name: name.to_string(),
            ..Character::default()
        })
    }

    fn character_name(&self, character: CharacterId) -> Option<String> {
        self.scene.character(character).map(|c| c.name.clone())
    }

    fn set_character_name(&mut self, character: CharacterId, name: &str) -> BatchResult<()> {
        self.scene.character_mut(character)?.name = name.to_string();
        Ok(())
    }

    fn bind_slot(&mut self, character: CharacterId, slot: &str, node: NodeId) -> BatchResult<()> {
        match self.scene.node(node) {
            Some(n) if n.kind == NodeKind::Joint => {}
            _ => return Err(BatchError::host(format!("{node:?} is not a joint"))),
        }
        self.scene
            .character_mut(character)?
            .slots
            .insert(slot.to_string(), node);
        Ok(())
    }

    fn slot_binding(&self, character: CharacterId, slot: &str) -> Option<NodeId> {
        self.scene.character(character)?.slots.get(slot).copied()
    }

    fn set_characterize_on(&mut self, character: CharacterId, on: bool) -> bool {
        let root_bound = self
            .slot_binding(character, plot::ROOT_SLOT)
            .is_some_and(|n| self.scene.node(n).is_some());
        let Ok(c) = self.scene.character_mut(character) else {
            return false;
        };
        if on && !root_bound {
            tracing::debug!(character = %c.name, "characterization refused: root slot unbound");
            return false;
        }
        c.characterized = on;
        true
    }

    fn is_characterized(&self, character: CharacterId) -> bool {
        self.scene
            .character(character)
            .is_some_and(|c| c.characterized)
    }

    fn set_input(
        &mut self,
        character: CharacterId,
        source: Option<CharacterId>,
        kind: InputType,
    ) -> BatchResult<()> {
        if let Some(s) = source {
            if s == character {
                return Err(BatchError::host("a character cannot drive itself"));
            }
            if self.scene.character(s).is_none() {
                return Err(BatchError::host(format!("source character {s:?} does not exist")));
            }
        }
        let c = self.scene.character_mut(character)?;
        c.input = source.map(|s| (s, kind));
        if c.input.is_none() {
            c.active_input = false;
        }
        Ok(())
    }

    fn set_active_input(&mut self, character: CharacterId, active: bool) -> BatchResult<()> {
        let c = self.scene.character_mut(character)?;
        if active && c.input.is_none() {
            return Err(BatchError::host(format!("character '{}' has no input", c.name)));
        }
        c.active_input = active;
        Ok(())
    }

    fn plot(&mut self, character: CharacterId, opts: &PlotOptions) -> BatchResult<()> {
        plot::plot_character(&mut self.scene, character, opts).map(|_| ())
    }

    fn create_light(&mut self, name: &str, kind: LightType) -> NodeId {
        let mut node = Node::object(name, NodeKind::Light(kind));
        node.visible = false;
        self.scene.add_node(node)
    }

    fn create_camera(&mut self, name: &str) -> NodeId {
        self.scene.add_node(Node::object(name, NodeKind::Camera))
    }

    fn set_pose(&mut self, node: NodeId, pose: Pose) -> BatchResult<()> {
        let n = self.scene.node_mut(node)?;
        if n.kind == NodeKind::Joint {
            return Err(BatchError::host("joints are posed through animation, not placement"));
        }
        n.pose = pose;
        Ok(())
    }

    fn set_visible(&mut self, node: NodeId, visible: bool) -> BatchResult<()> {
        self.scene.node_mut(node)?.visible = visible;
        Ok(())
    }

    fn destroy(&mut self, node: NodeId) {
        self.scene.remove_node(node);
        self.known_cameras.remove(&node);
    }

    fn render_tick(&mut self) {
        self.known_cameras
            .extend(self.scene.nodes_of(|k| *k == NodeKind::Camera));
    }

    fn set_camera_in_pane(&mut self, camera: NodeId, pane: usize) -> BatchResult<()> {
        if pane != 0 {
            return Err(BatchError::host(format!("pane {pane} does not exist")));
        }
        self.camera(camera)?;
        if !self.known_cameras.contains(&camera) {
            return Err(BatchError::host(format!(
                "camera {camera:?} is not known to the renderer yet"
            )));
        }
        self.scene.pane_camera = Some(camera);
        Ok(())
    }

    fn cameras(&self) -> Vec<NodeId> {
        self.scene.nodes_of(|k| *k == NodeKind::Camera)
    }

    fn display_flags(&self, camera: NodeId) -> Option<DisplayFlags> {
        self.camera(camera).ok().map(|n| n.display)
    }

    fn set_display_flags(&mut self, camera: NodeId, flags: DisplayFlags) -> BatchResult<()> {
        self.camera(camera)?;
        self.scene.node_mut(camera)?.display = flags;
        Ok(())
    }

    fn goto(&mut self, frame: FrameIndex) {
        self.scene.cursor = frame;
    }

    fn current_take_span(&self) -> FrameRange {
        self.scene.current_span()
    }

    fn set_video_codec(&mut self, codec: VideoCodec) {
        self.codec = codec;
    }

    #[tracing::instrument(skip(self, opts), fields(output = %opts.output.display()))]
    fn render(&mut self, opts: &CaptureOptions) -> BatchResult<()> {
        let camera = self
            .scene
            .pane_camera
            .ok_or_else(|| BatchError::render("no camera in pane 0"))?;
        if opts.span.is_empty() {
            return Err(BatchError::render("capture span is empty"));
        }

        let partial = partial_path(&opts.output);
        let result = self
            .sinks
            .create(&partial)
            .and_then(|mut sink| self.capture(camera, opts.span, sink.as_mut()));
        if let Err(e) = result {
            if partial.exists()
                && let Err(rm) = std::fs::remove_file(&partial)
            {
                tracing::warn!(
                    path = %partial.display(),
                    error = %rm,
                    "failed to remove partial capture"
                );
            }
            return Err(e);
        }

        std::fs::rename(&partial, &opts.output).with_context(|| {
            format!(
                "move '{}' to '{}'",
                partial.display(),
                opts.output.display()
            )
        })?;
        tracing::info!(frames = opts.span.len_frames(), "capture written");
        Ok(())
    }
}
