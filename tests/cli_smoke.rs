use std::path::PathBuf;
use std::process::Command;

fn exe() -> PathBuf {
    std::env::var_os("CARGO_BIN_EXE_mocap-batch")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            let mut p = PathBuf::from("target").join("debug");
            p.push(if cfg!(windows) {
                "mocap-batch.exe"
            } else {
                "mocap-batch"
            });
            p
        })
}

#[test]
fn cli_plan_lists_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let chars = dir.path().join("chars");
    let anims = dir.path().join("anims");
    std::fs::create_dir_all(&chars).unwrap();
    std::fs::create_dir_all(&anims).unwrap();
    std::fs::write(chars.join("A.fbx"), b"{}").unwrap();
    std::fs::write(anims.join("walk.bvh"), b"").unwrap();
    std::fs::write(anims.join("run.BVH"), b"").unwrap();
    // Not a word-character base name; ignored.
    std::fs::write(anims.join("bad name.bvh"), b"").unwrap();

    let out = Command::new(exe())
        .arg("plan")
        .arg("--characters")
        .arg(&chars)
        .arg("--animations")
        .arg(&anims)
        .arg("--out")
        .arg(dir.path().join("videos"))
        .output()
        .unwrap();
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let stdout = String::from_utf8(out.stdout).unwrap();
    let names: Vec<&str> = stdout
        .lines()
        .map(|l| l.rsplit(['/', '\\']).next().unwrap())
        .collect();
    assert_eq!(
        names,
        vec!["A_0_run.avi", "A_1_run.avi", "A_0_walk.avi", "A_1_walk.avi"]
    );
    assert!(!dir.path().join("videos").exists());
}

#[test]
fn cli_slots_prints_builtin_table() {
    let out = Command::new(exe()).arg("slots").output().unwrap();
    assert!(out.status.success());

    let stdout = String::from_utf8(out.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert!(lines.contains(&"Hips\t(root)"));
    assert!(lines.contains(&"LeftUpLeg\tLeftUpLeg"));
    assert_eq!(lines[0], "Reference\treference");
}

#[test]
fn cli_requires_input_directories() {
    let out = Command::new(exe()).arg("run").output().unwrap();
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("--characters"), "{stderr}");
}
