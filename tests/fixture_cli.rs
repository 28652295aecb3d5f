use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

// md5 of the payloads written below.
const HASH_TABLE: &str = r#"
algorithm = "md5"

[original]
"ac65464b4aa751d3ffc5299073ba2d8a" = "af7fcc0f-7a58-4a74-bfa2-8fb6e12008eb"  # train-a
"55365651eea4353d63aeb5d2c87d6ea6" = "8bc11648-d983-4a62-9ea2-590901f374ff"  # train-b
"21700f4bf4cd6190bbb14ea1d7312139" = "48557ec1-3205-403a-b82c-843fd9b03f5b"  # test-a
"2e527e143e12aeaf6d47b0ee3662900f" = "cbddd90c-f574-43d9-8d1f-b4989678a09b"  # test-b
"f776c8fdddf685928de7dcb6772c99e0" = "cbddd90c-f574-43d9-8d1f-b4989678a09b"  # test-c

[detargeted]
"46bc41a6afff20179f511e63df41a0f9" = "48557ec1-3205-403a-b82c-843fd9b03f5b"  # untargeted-a

[prediction]
"f6dff156b311a7d71ddc1e52fa467fcc" = "48557ec1-3205-403a-b82c-843fd9b03f5b"  # pred-a
"04f47ac91cbed4597b7cb6c2b5506812" = "cbddd90c-f574-43d9-8d1f-b4989678a09b"  # pred-b
"#;

const FIXTURE_IDS: [&str; 4] = [
    "af7fcc0f-7a58-4a74-bfa2-8fb6e12008eb",
    "8bc11648-d983-4a62-9ea2-590901f374ff",
    "48557ec1-3205-403a-b82c-843fd9b03f5b",
    "cbddd90c-f574-43d9-8d1f-b4989678a09b",
];

fn algo_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_algo-fixture"))
}

fn problem_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_problem-fixture"))
}

fn put(dir: &Path, name: &str, content: &str) {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join(name), content).unwrap();
}

/// Temp root with a hash table, prediction fixtures and untargeted fixtures.
fn setup_test_env() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    fs::write(root.join("hashes.toml"), HASH_TABLE).unwrap();

    let pred = root.join("fixtures").join("pred");
    let untargeted = root.join("fixtures").join("untargetedTest");
    for id in FIXTURE_IDS {
        put(&pred, id, "pred-a");
        put(&untargeted, id, "untargeted-a");
    }
    // One prediction fixture with different content so outputs are distinguishable.
    put(&pred, "cbddd90c-f574-43d9-8d1f-b4989678a09b", "pred-b");
    tmp
}

fn run(binary: &Path, root: &Path, fixtures: &str, args: &[&str]) -> (String, bool) {
    let output = Command::new(binary)
        .args(args)
        .arg("--fixtures")
        .arg(root.join("fixtures").join(fixtures))
        .arg("--hash-table")
        .arg(root.join("hashes.toml"))
        .output()
        .unwrap_or_else(|e| panic!("Failed to run {:?}: {}", binary, e));

    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stderr, output.status.success())
}

fn run_algo(root: &Path, args: &[&str]) -> (String, bool) {
    run(&algo_binary(), root, "pred", args)
}

fn run_problem(root: &Path, args: &[&str]) -> (String, bool) {
    run(&problem_binary(), root, "untargetedTest", args)
}

fn volume(root: &Path) -> PathBuf {
    let volume = root.join("volume");
    put(&volume.join("train"), "a.h5", "train-a");
    put(&volume.join("train"), "b.h5", "train-b");
    put(&volume.join("test"), "t.h5", "test-b");
    volume
}

#[test]
fn test_algo_train_then_predict() {
    let tmp = setup_test_env();
    let root = tmp.path();
    let volume = volume(root);
    let v = volume.to_str().unwrap();

    let (stderr, success) = run_algo(root, &["-T", "train", "-V", v]);
    assert!(success, "train failed: {}", stderr);
    assert!(stderr.contains("Starting training with 2 data files"));
    assert!(stderr.contains("Successfully predicted on data a.h5"));

    assert_eq!(
        fs::read_to_string(volume.join("train/pred/a.h5")).unwrap(),
        "pred-a"
    );
    assert_eq!(
        fs::read_to_string(volume.join("test/pred/t.h5")).unwrap(),
        "pred-b"
    );

    let (stderr, success) = run_algo(root, &["-T", "predict", "-V", v]);
    assert!(success, "predict failed: {}", stderr);

    let model: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(volume.join("model/model_trained.json")).unwrap())
            .unwrap();
    let records = model.as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["id"], 0);
    assert_eq!(records[0]["msg"], "Train");
}

#[test]
fn test_algo_predict_without_model_fails() {
    let tmp = setup_test_env();
    let root = tmp.path();
    let volume = volume(root);

    let (stderr, success) = run_algo(root, &["-T", "predict", "-V", volume.to_str().unwrap()]);
    assert!(!success);
    assert!(stderr.contains("[FATAL ERROR]"), "{}", stderr);
    assert!(stderr.contains("missing model file"), "{}", stderr);
}

#[test]
fn test_algo_rejects_unknown_file() {
    let tmp = setup_test_env();
    let root = tmp.path();
    let volume = volume(root);
    put(&volume.join("train"), "rogue.h5", "rogue");

    let (stderr, success) = run_algo(root, &["-T", "train", "-V", volume.to_str().unwrap()]);
    assert!(!success);
    assert!(
        stderr.contains("invalid checksum for file rogue.h5 (44ac6119a7a7a60e65a3e2b852ebd6c0)"),
        "{}",
        stderr
    );
    assert!(!volume.join("model/model_trained.json").exists());
}

#[test]
fn test_algo_rejects_invalid_task() {
    let tmp = setup_test_env();
    let root = tmp.path();
    let volume = volume(root);

    let (_, success) = run_algo(root, &["-T", "fit", "-V", volume.to_str().unwrap()]);
    assert!(!success);
    let (_, success) = run_algo(root, &["-T", "train"]);
    assert!(!success);
}

#[test]
fn test_algo_json_log_format() {
    let tmp = setup_test_env();
    let root = tmp.path();
    let volume = volume(root);

    let (stderr, success) = run_algo(
        root,
        &["-T", "train", "-V", volume.to_str().unwrap(), "--log-format", "json"],
    );
    assert!(success, "{}", stderr);
    for line in stderr.lines() {
        let event: serde_json::Value = serde_json::from_str(line).unwrap();
        assert_eq!(event["level"], "info");
    }
}

#[test]
fn test_problem_detarget() {
    let tmp = setup_test_env();
    let root = tmp.path();
    let hidden = root.join("hidden");
    let submission = root.join("submission");
    put(&hidden.join("test"), "x.h5", "test-a");

    let (stderr, success) = run_problem(
        root,
        &["-T", "detarget", "-i", hidden.to_str().unwrap(), "-s", submission.to_str().unwrap()],
    );
    assert!(success, "detarget failed: {}", stderr);
    assert!(stderr.contains("Removed target from x.h5"));
    assert_eq!(
        fs::read_to_string(submission.join("test/x.h5")).unwrap(),
        "untargeted-a"
    );
}

#[test]
fn test_problem_perf_writes_report() {
    let tmp = setup_test_env();
    let root = tmp.path();
    let hidden = root.join("hidden");
    let submission = root.join("submission");
    put(&hidden.join("test"), "x.h5", "test-a");
    put(&submission.join("test"), "x.h5", "untargeted-a");
    put(&submission.join("test/pred"), "x.h5", "pred-a");
    put(&submission.join("train"), "t.h5", "train-a");
    put(&submission.join("train/pred"), "t.h5", "pred-b");

    let (stderr, success) = run_problem(
        root,
        &["-T", "perf", "-i", hidden.to_str().unwrap(), "-s", submission.to_str().unwrap()],
    );
    assert!(success, "perf failed: {}", stderr);

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(hidden.join("perf/performance.json")).unwrap())
            .unwrap();
    let perf = report["perf"].as_f64().unwrap();
    assert!((0.0..1.0).contains(&perf));
    assert!(report["test_perf"]["x.h5"].is_f64());
    assert!(report["train_perf"]["t.h5"].is_f64());
}

#[test]
fn test_problem_perf_count_mismatch() {
    let tmp = setup_test_env();
    let root = tmp.path();
    let hidden = root.join("hidden");
    let submission = root.join("submission");
    put(&hidden.join("test"), "a.h5", "test-a");
    put(&hidden.join("test"), "b.h5", "test-b");
    put(&hidden.join("test"), "c.h5", "test-c");
    put(&submission.join("test/pred"), "a.h5", "pred-a");
    put(&submission.join("test/pred"), "b.h5", "pred-b");
    put(&submission.join("train"), "t.h5", "train-a");
    put(&submission.join("train/pred"), "t.h5", "pred-a");

    let (stderr, success) = run_problem(
        root,
        &["-T", "perf", "-i", hidden.to_str().unwrap(), "-s", submission.to_str().unwrap()],
    );
    assert!(!success);
    assert!(stderr.contains("test: 3, test pred: 2"), "{}", stderr);
    assert!(!hidden.join("perf/performance.json").exists());
}
