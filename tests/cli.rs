use assert_cmd::Command;
use tempfile::TempDir;

use quizbreak::history::HistoryDb;
use quizbreak::session::{SessionOutcome, SessionSummary, TriggerSource};

fn quizbreak(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("quizbreak").unwrap();
    cmd.env("HOME", home.path()).env_remove("QUIZBREAK_LOG");
    cmd
}

fn history_db(home: &TempDir) -> HistoryDb {
    HistoryDb::open(home.path().join(".local/state/quizbreak/history.db")).unwrap()
}

#[test]
fn help_lists_options() {
    let home = TempDir::new().unwrap();
    let output = quizbreak(&home).arg("--help").output().unwrap();
    assert!(output.status.success());

    let text = String::from_utf8_lossy(&output.stdout);
    for flag in ["--video", "--games", "--every", "--only", "--no-speech", "history"] {
        assert!(text.contains(flag), "missing {flag}");
    }
}

#[test]
fn refuses_to_run_without_a_tty() {
    let home = TempDir::new().unwrap();
    let output = quizbreak(&home).write_stdin("").output().unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("stdin must be a tty"));
}

#[test]
fn empty_history() {
    let home = TempDir::new().unwrap();
    let output = quizbreak(&home).arg("history").output().unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout)
        .contains("0 sessions (0 completed, 0 abandoned), 0 games played"));
}

#[test]
fn history_lists_and_exports_sessions() {
    let home = TempDir::new().unwrap();
    let now = chrono::Local::now();
    history_db(&home)
        .record(&SessionSummary {
            trigger: TriggerSource::Automatic,
            started_at: now,
            ended_at: now,
            sequence: vec![
                quizbreak::games::GameKind::Numbers,
                quizbreak::games::GameKind::Alphabet,
            ],
            completed: 1,
            outcome: SessionOutcome::Abandoned,
        })
        .unwrap();

    let output = quizbreak(&home).arg("history").output().unwrap();
    let text = String::from_utf8_lossy(&output.stdout);
    assert!(text.contains("1 sessions (0 completed, 1 abandoned), 1 games played"));
    assert!(text.contains("automatic"));
    assert!(text.contains("1/2  numbers alphabet"));

    let output = quizbreak(&home)
        .args(["history", "--csv", "-"])
        .output()
        .unwrap();
    let csv = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[1].ends_with(",automatic,abandoned,1,2,numbers alphabet"));
}
