mod support;

use mocap_batch::{
    BatchError, BatchOrchestrator, CancelToken, DisplayFlags, FailureScope, Fps, NodeLookup,
    SceneHost, SlotMap, Stage,
};
use support::{RecordingSinks, Workspace, bare_scene_doc, file_names, merged_doc, write};

#[test]
fn one_character_two_animations_renders_four_videos() {
    let ws = Workspace::new();
    ws.character("A.fbx", "A");
    ws.clip("walk.bvh", "Hips", 5);
    ws.clip("run.bvh", "Hips", 5);

    let cfg = ws.config();
    let slots = SlotMap::builtin().unwrap();
    let sinks = RecordingSinks::new();
    let mut host = ws.host(&cfg, &sinks);

    let report = BatchOrchestrator::new(&cfg, &slots).run(&mut host).unwrap();
    assert!(report.is_complete(), "{report:?}");

    let mut names = file_names(&report.rendered);
    names.sort();
    assert_eq!(
        names,
        vec!["A_0_run.avi", "A_0_walk.avi", "A_1_run.avi", "A_1_walk.avi"]
    );
    for path in &report.rendered {
        assert!(path.starts_with(&ws.characters));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "frames 4\n");
    }

    let leftovers: Vec<_> = std::fs::read_dir(&ws.characters)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|n| n.contains(".partial"))
        .collect();
    assert!(leftovers.is_empty(), "{leftovers:?}");

    let captures = sinks.captures();
    assert_eq!(captures.len(), 4);
    for c in &captures {
        // Frame 0 is the settle frame.
        assert_eq!(c.frames, vec![1, 2, 3, 4]);
        assert_eq!(c.config.fps, Fps::new(25, 1).unwrap());
        assert_eq!((c.config.width, c.config.height), (64, 48));
    }
}

#[test]
fn every_character_animation_camera_combination_is_unique() {
    let ws = Workspace::new();
    ws.character("A.fbx", "A");
    ws.character("B.fbx", "B");
    ws.clip("walk.bvh", "Hips", 3);
    ws.clip("run.bvh", "Hips", 3);
    ws.clip("jump.bvh", "Hips", 3);

    let cfg = ws.config();
    let slots = SlotMap::builtin().unwrap();
    let sinks = RecordingSinks::new();
    let mut host = ws.host(&cfg, &sinks);

    let report = BatchOrchestrator::new(&cfg, &slots).run(&mut host).unwrap();
    assert!(report.is_complete(), "{report:?}");
    assert_eq!(report.rendered.len(), 2 * 3 * 2);

    let mut names = file_names(&report.rendered);
    names.sort();
    names.dedup();
    assert_eq!(names.len(), 12);
    // Character-major order.
    assert!(file_names(&report.rendered[..6]).iter().all(|n| n.starts_with("A_")));
}

#[test]
fn missing_root_aborts_without_further_videos() {
    let ws = Workspace::new();
    ws.character("A.fbx", "A");
    ws.clip("a_walk.bvh", "Hips", 3);
    ws.clip("b_bad.bvh", "Root", 3);
    ws.clip("c_run.bvh", "Hips", 3);

    let cfg = ws.config();
    let slots = SlotMap::builtin().unwrap();
    let sinks = RecordingSinks::new();
    let mut host = ws.host(&cfg, &sinks);

    let report = BatchOrchestrator::new(&cfg, &slots).run(&mut host).unwrap();
    assert_eq!(
        file_names(&report.rendered),
        vec!["A_0_a_walk.avi", "A_1_a_walk.avi"]
    );

    let abort = report.aborted.as_ref().unwrap();
    assert_eq!(abort.stage, Stage::CharacterizeIfNeeded);
    assert!(abort.animation_file.ends_with("b_bad.bvh"));
    assert!(matches!(abort.error, BatchError::RootNotFound(_)));
    assert!(!ws.characters.join("A_0_c_run.avi").exists());

    assert!(matches!(
        report.into_result(),
        Err(BatchError::RootNotFound(_))
    ));
}

#[test]
fn empty_clip_skips_its_pair_by_default() {
    let ws = Workspace::new();
    ws.character("A.fbx", "A");
    ws.clip("empty.bvh", "Hips", 0);
    ws.clip("walk.bvh", "Hips", 3);

    let cfg = ws.config();
    let slots = SlotMap::builtin().unwrap();
    let sinks = RecordingSinks::new();
    let mut host = ws.host(&cfg, &sinks);

    let report = BatchOrchestrator::new(&cfg, &slots).run(&mut host).unwrap();
    assert!(report.aborted.is_none());
    assert_eq!(report.skipped.len(), 1);
    let skipped = &report.skipped[0];
    assert_eq!(skipped.stage, Stage::Retarget);
    assert!(skipped.animation_file.ends_with("empty.bvh"));
    assert!(matches!(skipped.error, BatchError::Retarget(_)));
    assert_eq!(
        file_names(&report.rendered),
        vec!["A_0_walk.avi", "A_1_walk.avi"]
    );
}

#[test]
fn run_scoped_retarget_failure_aborts() {
    let ws = Workspace::new();
    ws.character("A.fbx", "A");
    ws.clip("empty.bvh", "Hips", 0);
    ws.clip("walk.bvh", "Hips", 3);

    let mut cfg = ws.config();
    cfg.retarget_failure = FailureScope::Run;
    let slots = SlotMap::builtin().unwrap();
    let sinks = RecordingSinks::new();
    let mut host = ws.host(&cfg, &sinks);

    let report = BatchOrchestrator::new(&cfg, &slots).run(&mut host).unwrap();
    assert!(report.rendered.is_empty());
    assert!(report.skipped.is_empty());
    let abort = report.aborted.as_ref().unwrap();
    assert_eq!(abort.stage, Stage::Retarget);
    assert!(matches!(abort.error, BatchError::Retarget(_)));
}

#[test]
fn failed_camera_leaves_no_file_and_restores_overlays() {
    let ws = Workspace::new();
    ws.character("A.fbx", "A");
    ws.clip("walk.bvh", "Hips", 3);

    let cfg = ws.config();
    let slots = SlotMap::builtin().unwrap();
    let sinks = RecordingSinks::failing_on("_1_");
    let mut host = ws.host(&cfg, &sinks);

    let report = BatchOrchestrator::new(&cfg, &slots).run(&mut host).unwrap();
    assert!(report.aborted.is_none());
    assert_eq!(file_names(&report.rendered), vec!["A_0_walk.avi"]);
    assert_eq!(report.camera_failures.len(), 1);
    let failure = &report.camera_failures[0];
    assert_eq!(failure.camera_index, 1);
    assert!(matches!(failure.error, BatchError::Render(_)));

    assert!(!ws.characters.join("A_1_walk.avi").exists());
    assert!(!ws.characters.join("A_1_walk.partial.avi").exists());

    // The scene of the last pair is still loaded: transient rig nodes are gone and every
    // camera has the overlays it was opened with.
    assert!(host.find_by_label("mylight").is_none());
    assert!(host.find_by_label("Camera1").is_none());
    assert_eq!(host.cameras().len(), 2);
    let side = host.find_by_label("Side").unwrap();
    assert_eq!(
        host.display_flags(side),
        Some(DisplayFlags {
            show_axis: true,
            show_grid: false,
        })
    );
    let producer = host.find_by_label("Producer Perspective").unwrap();
    assert_eq!(host.display_flags(producer), Some(DisplayFlags::default()));
}

#[test]
fn cancelled_batch_stops_before_the_first_pair() {
    let ws = Workspace::new();
    ws.character("A.fbx", "A");
    ws.clip("walk.bvh", "Hips", 3);

    let cfg = ws.config();
    let slots = SlotMap::builtin().unwrap();
    let sinks = RecordingSinks::new();
    let mut host = ws.host(&cfg, &sinks);

    let cancel = CancelToken::new();
    cancel.cancel();
    let report = BatchOrchestrator::new(&cfg, &slots)
        .with_cancel(cancel)
        .run(&mut host)
        .unwrap();
    assert!(report.cancelled);
    assert!(report.rendered.is_empty());
    assert!(sinks.captures().is_empty());
}

#[test]
fn empty_animation_directory_fails_planning() {
    let ws = Workspace::new();
    ws.character("A.fbx", "A");

    let cfg = ws.config();
    let slots = SlotMap::builtin().unwrap();
    let sinks = RecordingSinks::new();
    let mut host = ws.host(&cfg, &sinks);

    let err = BatchOrchestrator::new(&cfg, &slots)
        .run(&mut host)
        .unwrap_err();
    assert!(matches!(err, BatchError::Configuration(_)));
}

#[test]
fn merged_clip_with_its_own_character_is_used_directly() {
    let ws = Workspace::new();
    ws.character("A.fbx", "A");
    // JSON content under the animation extension; the host sniffs the format.
    write(&ws.animations, "merge.bvh", &merged_doc(&["Performer"], 4));

    let cfg = ws.config();
    let slots = SlotMap::builtin().unwrap();
    let sinks = RecordingSinks::new();
    let mut host = ws.host(&cfg, &sinks);

    let report = BatchOrchestrator::new(&cfg, &slots).run(&mut host).unwrap();
    assert!(report.is_complete(), "{report:?}");
    assert_eq!(
        file_names(&report.rendered),
        vec!["A_0_merge.avi", "A_1_merge.avi"]
    );
    for c in sinks.captures() {
        assert_eq!(c.frames, vec![1, 2, 3]);
    }

    // No skeleton was characterized: the scene still holds exactly the two characters.
    let characters = host.characters();
    assert_eq!(characters.len(), 2);
    assert_eq!(
        host.character_name(characters[1]).as_deref(),
        Some("merged:Performer")
    );
    assert!(host.find_by_label("merged:Hips").is_some());
    assert!(host.find_by_label("BVH:Hips").is_none());
}

#[test]
fn more_than_two_characters_after_import_aborts() {
    let ws = Workspace::new();
    ws.character("A.fbx", "A");
    ws.character("B.fbx", "B");
    write(
        &ws.animations,
        "merge.bvh",
        &merged_doc(&["Lead", "Partner"], 4),
    );

    let cfg = ws.config();
    let slots = SlotMap::builtin().unwrap();
    let sinks = RecordingSinks::new();
    let mut host = ws.host(&cfg, &sinks);

    let report = BatchOrchestrator::new(&cfg, &slots).run(&mut host).unwrap();
    assert!(report.rendered.is_empty());
    assert!(sinks.captures().is_empty());

    let abort = report.aborted.as_ref().unwrap();
    assert_eq!(abort.stage, Stage::CharacterizeIfNeeded);
    assert!(abort.character_file.ends_with("A.fbx"));
    assert!(abort.animation_file.ends_with("merge.bvh"));
    assert!(matches!(abort.error, BatchError::Configuration(_)));
    assert!(matches!(
        report.into_result(),
        Err(BatchError::Configuration(_))
    ));
}

#[test]
fn character_scene_without_a_character_aborts_at_open() {
    let ws = Workspace::new();
    write(&ws.characters, "A.fbx", &bare_scene_doc());
    ws.clip("walk.bvh", "Hips", 3);

    let cfg = ws.config();
    let slots = SlotMap::builtin().unwrap();
    let sinks = RecordingSinks::new();
    let mut host = ws.host(&cfg, &sinks);

    let report = BatchOrchestrator::new(&cfg, &slots).run(&mut host).unwrap();
    assert!(report.rendered.is_empty());
    assert!(report.skipped.is_empty());
    assert!(sinks.captures().is_empty());

    let abort = report.aborted.as_ref().unwrap();
    assert_eq!(abort.stage, Stage::OpenCharacterScene);
    assert!(abort.character_file.ends_with("A.fbx"));
    assert!(matches!(abort.error, BatchError::Configuration(_)));
    // The clip was never imported.
    assert!(host.find_by_label("BVH:Hips").is_none());
}

#[test]
fn failed_camera_keeps_a_video_from_an_earlier_run() {
    let ws = Workspace::new();
    ws.character("A.fbx", "A");
    ws.clip("walk.bvh", "Hips", 3);
    let earlier = ws.characters.join("A_1_walk.avi");
    std::fs::write(&earlier, b"earlier run").unwrap();

    let cfg = ws.config();
    let slots = SlotMap::builtin().unwrap();
    let sinks = RecordingSinks::failing_on("_1_");
    let mut host = ws.host(&cfg, &sinks);

    let report = BatchOrchestrator::new(&cfg, &slots).run(&mut host).unwrap();
    assert_eq!(report.camera_failures.len(), 1);
    assert_eq!(std::fs::read(&earlier).unwrap(), b"earlier run");
    assert!(!ws.characters.join("A_1_walk.partial.avi").exists());
}
