// tests/build_tree.rs

use jarvis::Workspace;
use jarvis::system::fs_ops::{self, FsError};
use serde_json::json;
use std::fs;
use tempfile::tempdir;

#[test]
fn stage_project_into_scratch_and_clean() {
    let _ = env_logger::builder().is_test(true).try_init();

    // --- Setup ---
    let tmp = tempdir().unwrap();
    let project = tmp.path().join("proj");
    let ws = Workspace::with_home(&project, &tmp.path().join("home"));
    fs::create_dir_all(ws.templates().root()).unwrap();
    fs::write(
        ws.templates().root().join("package.xml"),
        "<package><name>{{ pkg.name }}</name><deps>{{ pkg.deps | join(\",\") }}</deps></package>",
    )
    .unwrap();
    fs::create_dir_all(project.join("src/rover_nav")).unwrap();
    fs::write(project.join("src/rover_nav/main.py"), "print('nav')").unwrap();

    // --- Execute ---
    let staged = ws.scratch_dir_for("rover_nav");
    fs_ops::ensure_dir(ws.scratch_dir()).unwrap();
    fs_ops::copy(&project.join("src/rover_nav"), &staged).unwrap();
    ws.render_template(
        "package.xml",
        &staged.join("package.xml"),
        &json!({ "pkg": { "name": "rover_nav", "deps": ["rospy", "numpy"] } }),
    )
    .unwrap();
    fs_ops::ensure_dir(ws.hash_store()).unwrap();
    fs_ops::link(&staged, &ws.hash_store().join("rover_nav")).unwrap();

    // --- Assert ---
    assert_eq!(
        fs::read_to_string(staged.join("main.py")).unwrap(),
        "print('nav')"
    );
    assert_eq!(
        fs::read_to_string(staged.join("package.xml")).unwrap(),
        "<package><name>rover_nav</name><deps>rospy,numpy</deps></package>"
    );

    ws.clean().unwrap();
    assert!(!ws.hash_store().exists());
    assert!(staged.join("main.py").exists());
    assert!(matches!(
        fs_ops::remove(ws.hash_store()),
        Err(FsError::NotFound { .. })
    ));
}
