//! CLI integration tests using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// A command isolated from the user's config and cookie environment.
fn vocabot(dir: &TempDir) -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("vocabot").unwrap();
    cmd.current_dir(dir.path())
        .env("HOME", dir.path())
        .env_remove("VOCABOT_COOKIE")
        .env("RUST_LOG", "off");
    cmd
}

fn write_progress(dir: &TempDir) {
    let progress = serde_json::json!({
        "current_question": {
            "context": "She was known for her candor.",
            "question": "Candor means:",
            "choices": [{"answer": "openness", "code": "c1"}, {"answer": "anger", "code": "c2"}],
            "done": false
        },
        "points": 1234,
        "question_type": "D",
        "r_secret": "S1",
        "cookies": "guid=g; JSESSIONID=j"
    });
    std::fs::write(dir.path().join("progress.json"), progress.to_string()).unwrap();
}

#[test]
fn init_creates_config() {
    let dir = TempDir::new().unwrap();

    vocabot(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created vocabot.toml"));

    let content = std::fs::read_to_string(dir.path().join("vocabot.toml")).unwrap();
    assert!(content.contains("[oracle]"));
    assert!(content.contains("llama3.1:8b-instruct-q5_K_S"));
}

#[test]
fn init_skips_existing() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("vocabot.toml"), "# mine\n").unwrap();

    vocabot(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));

    let content = std::fs::read_to_string(dir.path().join("vocabot.toml")).unwrap();
    assert_eq!(content, "# mine\n");
}

#[test]
fn generated_config_loads() {
    let dir = TempDir::new().unwrap();
    vocabot(&dir).arg("init").assert().success();

    vocabot(&dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("No saved session"));
}

#[test]
fn status_shows_saved_session() {
    let dir = TempDir::new().unwrap();
    write_progress(&dir);
    std::fs::write(dir.path().join("data.txt"), "a|b|[]|{}\nc|d|[]|{}\n").unwrap();

    vocabot(&dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("active"))
        .stdout(predicate::str::contains("1234"))
        .stdout(predicate::str::contains("Candor means:"))
        .stdout(predicate::str::contains("JSESSIONID, guid"));
}

#[test]
fn status_with_corrupt_progress_fails() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("progress.json"), "{not json").unwrap();

    vocabot(&dir)
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn missing_config_file_fails() {
    let dir = TempDir::new().unwrap();

    vocabot(&dir)
        .arg("status")
        .arg("--config")
        .arg("nonexistent.toml")
        .assert()
        .failure()
        .stderr(predicate::str::contains("config file not found"));
}

#[test]
fn run_rejects_empty_candidate_pool() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("vocabot.toml"),
        "[run]\nlist_candidates = []\n",
    )
    .unwrap();

    vocabot(&dir)
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("list_candidates"));
}

#[test]
fn run_rejects_negative_sleep_scale() {
    let dir = TempDir::new().unwrap();

    vocabot(&dir)
        .args(["run", "--sleep-scale=-1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("sleep scale"));
}

#[test]
fn check_login_fails_when_service_unreachable() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("vocabot.toml"),
        "[service]\nbase_url = \"http://127.0.0.1:9\"\n",
    )
    .unwrap();

    vocabot(&dir)
        .arg("check-login")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not logged in"));
}

#[test]
fn list_models_fails_when_ollama_unreachable() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("vocabot.toml"),
        "[oracle]\nbase_url = \"http://127.0.0.1:9\"\n",
    )
    .unwrap();

    vocabot(&dir)
        .arg("list-models")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not reachable"));
}

#[test]
fn help_output() {
    let dir = TempDir::new().unwrap();

    vocabot(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("check-login"))
        .stdout(predicate::str::contains("list-models"))
        .stdout(predicate::str::contains("init"));
}

#[test]
fn version_output() {
    let dir = TempDir::new().unwrap();

    vocabot(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("vocabot"));
}
