mod support;

use std::{
    fs,
    path::Path,
    process::{Command, Output},
};

use support::{zip_bytes, Reply, TestServer};

fn download_models(args: &[&str], models_dir: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_download-models"))
        .args(args)
        .arg("--models-dir")
        .arg(models_dir)
        .env_remove("MODELS_LOG")
        .output()
        .unwrap()
}

fn write_catalog(dir: &Path, json: String) -> String {
    let path = dir.join("catalog.json");
    fs::write(&path, json).unwrap();
    path.display().to_string()
}

#[test]
fn no_action_prints_usage_and_fails() {
    let root = tempfile::tempdir().unwrap();
    let output = download_models(&[], &root.path().join("models"));
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--model <name> or --all"), "{stderr}");
}

#[test]
fn unknown_model_fails_without_touching_disk() {
    let root = tempfile::tempdir().unwrap();
    let models_dir = root.path().join("models");
    let output = download_models(&["--model", "unknown-id"], &models_dir);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stdout).contains("unknown model: unknown-id"));
    assert!(!models_dir.exists());
}

#[test]
fn all_succeeds_only_when_every_model_does() {
    let server = TestServer::start(vec![
        ("/m1.zip", Reply::Body(zip_bytes(&[("m1/model.conf", b"conf")]))),
        ("/w.bin", Reply::Body(vec![3u8; 2_000])),
    ]);
    let root = tempfile::tempdir().unwrap();
    let models_dir = root.path().join("models");
    let catalog = write_catalog(
        root.path(),
        format!(
            r#"[
                {{"id": "m1", "url": "{}", "filename": "m1.zip", "extractDir": "m1"}},
                {{"id": "w", "url": "{}", "filename": "w.bin"}}
            ]"#,
            server.url("/m1.zip"),
            server.url("/w.bin")
        ),
    );

    let output = download_models(&["--all", "--catalog", &catalog], &models_dir);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(output.status.code(), Some(0), "{stdout}");
    assert!(stdout.contains("Successfully downloaded: 2/2 models"));
    assert!(stdout.contains("TTS models will be downloaded automatically on first use"));
    assert!(models_dir.join("m1/model.conf").is_file());
    assert!(!models_dir.join("m1.zip").exists());
    assert!(models_dir.join("w.bin").is_file());
}

#[test]
fn partial_success_exits_one() {
    let server = TestServer::start(vec![("/w.bin", Reply::Body(vec![3u8; 2_000]))]);
    let root = tempfile::tempdir().unwrap();
    let models_dir = root.path().join("models");
    let catalog = write_catalog(
        root.path(),
        format!(
            r#"[
                {{"id": "w", "url": "{}", "filename": "w.bin"}},
                {{"id": "gone", "url": "{}", "filename": "gone.bin"}}
            ]"#,
            server.url("/w.bin"),
            server.url("/gone.bin")
        ),
    );

    let output = download_models(&["--all", "--catalog", &catalog], &models_dir);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(output.status.code(), Some(1), "{stdout}");
    assert!(stdout.contains("Successfully downloaded: 1/2 models"));
    assert!(stdout.contains("✗ Some models failed to download"));

    // Each outcome is printed under its own header, before the next entry starts.
    let w_header = stdout.find("--- Downloading w ---").unwrap();
    let w_done = stdout.find("✓ Downloaded").unwrap();
    let gone_header = stdout.find("--- Downloading gone ---").unwrap();
    assert!(w_header < w_done && w_done < gone_header, "{stdout}");
}

#[test]
fn clean_requires_yes_to_delete() {
    let root = tempfile::tempdir().unwrap();
    let models_dir = root.path().join("models");
    fs::create_dir_all(models_dir.join("vosk-model-hi-0.22")).unwrap();
    fs::write(models_dir.join("vosk-model-hi-0.22.zip"), b"leftover").unwrap();
    fs::write(models_dir.join("whisper-medium.pt.part"), b"partial").unwrap();

    let dry = download_models(&["--clean"], &models_dir);
    assert_eq!(dry.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&dry.stdout).contains("Re-run with --yes"));
    assert!(models_dir.join("vosk-model-hi-0.22.zip").exists());

    let applied = download_models(&["--clean", "--yes"], &models_dir);
    assert_eq!(applied.status.code(), Some(0));
    assert!(!models_dir.join("vosk-model-hi-0.22.zip").exists());
    assert!(!models_dir.join("whisper-medium.pt.part").exists());
    assert!(models_dir.join("vosk-model-hi-0.22").is_dir());
}

#[test]
fn list_reports_each_builtin_model() {
    let root = tempfile::tempdir().unwrap();
    let models_dir = root.path().join("models");
    fs::create_dir_all(models_dir.join("vosk-model-en-us-0.22")).unwrap();

    let output = download_models(&["--list"], &models_dir);
    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let line = |id: &str| {
        stdout
            .lines()
            .find(|line| line.trim_start().starts_with(id))
            .unwrap_or_default()
            .to_string()
    };
    assert!(line("vosk_en").contains("installed"));
    assert!(line("vosk_hi").contains("missing"));
    assert!(line("whisper").contains("missing"));
}
