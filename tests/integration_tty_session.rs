// End-to-end run of the real binary.
// - Requires a TTY; uses expectrl which allocates a pseudo terminal.
// - Unix-only and ignored by default. Run with
//   `cargo test --test integration_tty_session -- --ignored`.

#![cfg(unix)]

use std::time::Duration;

use expectrl::{spawn, Eof};

#[test]
#[ignore]
fn starts_a_manual_session_and_quits() -> Result<(), Box<dyn std::error::Error>> {
    let home = tempfile::tempdir()?;
    let config = home.path().join("prefs.json");
    let bin = assert_cmd::cargo::cargo_bin("quizbreak");
    let cmd = format!(
        "env HOME={} {} --no-speech --config {} -g 1",
        home.path().display(),
        bin.display(),
        config.display()
    );

    let mut p = spawn(cmd)?;
    std::thread::sleep(Duration::from_millis(300));

    // start exercises by hand, then give up on them
    p.send("x")?;
    std::thread::sleep(Duration::from_millis(200));
    p.send("\x1b")?;
    std::thread::sleep(Duration::from_millis(200));

    p.send("q")?;
    p.expect(Eof)?;

    assert!(config.exists());
    Ok(())
}
