#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use mocap_batch::{
    BatchConfig, BatchError, BatchResult, Canvas, FrameIndex, FrameRGBA, FrameSink, HeadlessHost,
    SinkConfig, SinkFactory,
};

/// One finished capture as seen by [`RecordingSinks`].
#[derive(Clone, Debug)]
pub struct Capture {
    /// Path the sink was asked to write (the host's partial path).
    pub path: PathBuf,
    pub config: SinkConfig,
    pub frames: Vec<u64>,
}

#[derive(Default)]
struct Shared {
    captures: Vec<Capture>,
    fail_matching: Option<String>,
}

/// Sink factory that writes a small text file per capture instead of running ffmpeg.
#[derive(Clone, Default)]
pub struct RecordingSinks(Arc<Mutex<Shared>>);

impl RecordingSinks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Captures whose file name contains `needle` fail on their first frame.
    pub fn failing_on(needle: &str) -> Self {
        let s = Self::default();
        s.0.lock().unwrap().fail_matching = Some(needle.to_string());
        s
    }

    pub fn captures(&self) -> Vec<Capture> {
        self.0.lock().unwrap().captures.clone()
    }
}

impl SinkFactory for RecordingSinks {
    fn create(&self, output: &Path) -> BatchResult<Box<dyn FrameSink>> {
        let name = output
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let fail = self
            .0
            .lock()
            .unwrap()
            .fail_matching
            .as_deref()
            .is_some_and(|needle| name.contains(needle));
        Ok(Box::new(RecordingSink {
            shared: Arc::clone(&self.0),
            path: output.to_path_buf(),
            fail,
            config: None,
            frames: Vec::new(),
        }))
    }
}

struct RecordingSink {
    shared: Arc<Mutex<Shared>>,
    path: PathBuf,
    fail: bool,
    config: Option<SinkConfig>,
    frames: Vec<u64>,
}

impl FrameSink for RecordingSink {
    fn begin(&mut self, cfg: SinkConfig) -> BatchResult<()> {
        std::fs::write(&self.path, b"started\n")?;
        self.config = Some(cfg);
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> BatchResult<()> {
        if self.fail {
            return Err(BatchError::render("recording sink told to fail"));
        }
        let cfg = self
            .config
            .as_ref()
            .ok_or_else(|| BatchError::render("push before begin"))?;
        assert_eq!((frame.width, frame.height), (cfg.width, cfg.height));
        self.frames.push(idx.0);
        Ok(())
    }

    fn end(&mut self) -> BatchResult<()> {
        let config = self
            .config
            .take()
            .ok_or_else(|| BatchError::render("end before begin"))?;
        std::fs::write(&self.path, format!("frames {}\n", self.frames.len()))?;
        self.shared.lock().unwrap().captures.push(Capture {
            path: self.path.clone(),
            config,
            frames: std::mem::take(&mut self.frames),
        });
        Ok(())
    }
}

pub fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
    let p = dir.join(name);
    std::fs::write(&p, text).unwrap();
    p
}

/// Character scene with a small leg-and-spine skeleton, fully bound and characterized.
pub fn character_doc(name: &str, hips_height: f64) -> String {
    format!(
        r#"{{
  "fps": 30,
  "joints": [
    {{ "name": "Hips", "offset": [0, {hips_height}, 0] }},
    {{ "name": "Spine", "parent": "Hips", "offset": [0, 10, 0] }},
    {{ "name": "Head", "parent": "Spine", "offset": [0, 15, 0] }},
    {{ "name": "LeftUpLeg", "parent": "Hips", "offset": [8, -5, 0] }},
    {{ "name": "LeftLeg", "parent": "LeftUpLeg", "offset": [0, -40, 0] }}
  ],
  "character": {{
    "name": "{name}",
    "slots": {{ "Hips": "Hips", "Spine": "Spine", "Head": "Head",
               "LeftUpLeg": "LeftUpLeg", "LeftLeg": "LeftLeg" }}
  }},
  "cameras": [{{ "name": "Side", "show_axis": true, "show_grid": false }}]
}}"#
    )
}

/// BVH clip rooted at `root` with `frames` frames; the root walks +1 along X per frame at a
/// height of 90 while the spine sways.
pub fn bvh_clip(root: &str, frames: usize) -> String {
    let mut s = format!(
        "HIERARCHY
ROOT {root}
{{
  OFFSET 0 0 0
  CHANNELS 6 Xposition Yposition Zposition Zrotation Xrotation Yrotation
  JOINT Spine
  {{
    OFFSET 0 10 0
    CHANNELS 3 Zrotation Xrotation Yrotation
    JOINT Head
    {{
      OFFSET 0 15 0
      CHANNELS 3 Zrotation Xrotation Yrotation
      End Site
      {{
        OFFSET 0 5 0
      }}
    }}
  }}
  JOINT LeftUpLeg
  {{
    OFFSET 8 -5 0
    CHANNELS 3 Zrotation Xrotation Yrotation
    JOINT LeftLeg
    {{
      OFFSET 0 -40 0
      CHANNELS 3 Zrotation Xrotation Yrotation
      End Site
      {{
        OFFSET 0 -40 0
      }}
    }}
  }}
}}
MOTION
Frames: {frames}
Frame Time: 0.04
"
    );
    for f in 0..frames {
        let sway = (f as f64) * 2.0;
        s.push_str(&format!("{f} 90 0 0 0 0 {sway} 0 0 0 0 0 0 0 0 0 0 0\n"));
    }
    s
}

/// JSON scene carrying its own motion and already characterized `characters`, as a merged
/// take would. The hips walk +1 along X per frame over `frames` frames.
pub fn merged_doc(characters: &[&str], frames: u64) -> String {
    let slots = r#"{ "Hips": "Hips", "Spine": "Spine" }"#;
    let mut docs: Vec<String> = characters
        .iter()
        .map(|name| format!(r#"{{ "name": "{name}", "slots": {slots} }}"#))
        .collect();
    let first = if docs.is_empty() {
        "null".to_string()
    } else {
        docs.remove(0)
    };
    let last = frames.saturating_sub(1);
    format!(
        r#"{{
  "frames": {frames},
  "joints": [
    {{ "name": "Hips", "offset": [0, 90, 0] }},
    {{ "name": "Spine", "parent": "Hips", "offset": [0, 10, 0] }}
  ],
  "character": {first},
  "characters": [{rest}],
  "motion": [{{ "joint": "Hips", "keys": [
    {{ "frame": 0, "translation": [0, 90, 0] }},
    {{ "frame": {last}, "translation": [{last}, 90, 0] }}
  ] }}]
}}"#,
        rest = docs.join(", ")
    )
}

/// Character scene with a skeleton and a camera but no character.
pub fn bare_scene_doc() -> String {
    r#"{
  "joints": [{ "name": "Hips", "offset": [0, 90, 0] }],
  "cameras": [{ "name": "Side" }]
}"#
    .to_string()
}

/// Character and animation directories side by side in one temp dir.
pub struct Workspace {
    pub root: tempfile::TempDir,
    pub characters: PathBuf,
    pub animations: PathBuf,
}

impl Workspace {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let characters = root.path().join("characters");
        let animations = root.path().join("animations");
        std::fs::create_dir_all(&characters).unwrap();
        std::fs::create_dir_all(&animations).unwrap();
        Self {
            root,
            characters,
            animations,
        }
    }

    pub fn character(&self, file: &str, name: &str) -> PathBuf {
        write(&self.characters, file, &character_doc(name, 90.0))
    }

    pub fn clip(&self, file: &str, root: &str, frames: usize) -> PathBuf {
        write(&self.animations, file, &bvh_clip(root, frames))
    }

    /// Default configuration with a small canvas so captures stay cheap.
    pub fn config(&self) -> BatchConfig {
        let mut cfg = BatchConfig::new(&self.characters, &self.animations);
        cfg.viewport.canvas = Canvas {
            width: 64,
            height: 48,
        };
        cfg
    }

    pub fn host(&self, cfg: &BatchConfig, sinks: &RecordingSinks) -> HeadlessHost {
        HeadlessHost::with_sink_factory(cfg.viewport.clone(), Box::new(sinks.clone())).unwrap()
    }
}

pub fn file_names(paths: &[PathBuf]) -> Vec<String> {
    paths
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}
