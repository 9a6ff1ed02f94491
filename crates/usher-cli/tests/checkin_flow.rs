//! End-to-end integration tests for the registration and check-in flow.
//!
//! Drives the compiled `usher` binary through the full pipeline:
//! init -> event create -> register -> check-in -> scan -> status.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

use tempfile::TempDir;

fn usher_binary() -> String {
    env!("CARGO_BIN_EXE_usher").to_string()
}

/// One isolated home directory with its own organizer identity and database.
struct TestHome {
    temp: TempDir,
    database_path: PathBuf,
}

impl TestHome {
    fn new() -> Self {
        let temp = TempDir::new().expect("create temp home");
        let database_path = temp.path().join("usher.db");
        let home = Self {
            temp,
            database_path,
        };
        let output = home.run(&["init", "--label", "test-desk"]);
        assert!(
            output.status.success(),
            "usher init should succeed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        home
    }

    /// A home sharing another home's database, as a second scanning device
    /// (and a different organizer identity) would.
    fn sharing_database_of(other: &Self) -> Self {
        let temp = TempDir::new().expect("create temp home");
        let home = Self {
            temp,
            database_path: other.database_path.clone(),
        };
        let output = home.run(&["init", "--label", "other-desk"]);
        assert!(output.status.success());
        home
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(usher_binary());
        cmd.env("HOME", self.temp.path())
            .env_remove("XDG_DATA_HOME")
            .env_remove("XDG_CONFIG_HOME")
            .env("USHER_DATABASE_PATH", &self.database_path);
        cmd
    }

    fn run(&self, args: &[&str]) -> Output {
        self.command()
            .args(args)
            .output()
            .expect("failed to run usher")
    }

    fn run_ok(&self, args: &[&str]) -> String {
        let output = self.run(args);
        assert!(
            output.status.success(),
            "usher {args:?} failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8(output.stdout).expect("stdout is UTF-8")
    }

    fn run_with_stdin(&self, args: &[&str], stdin: &str) -> Output {
        let mut child = self
            .command()
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("failed to spawn usher");
        child
            .stdin
            .as_mut()
            .expect("stdin is piped")
            .write_all(stdin.as_bytes())
            .expect("write stdin");
        child.wait_with_output().expect("wait for usher")
    }
}

fn create_event(home: &TestHome) -> String {
    let stdout = home.run_ok(&[
        "event",
        "create",
        "--title",
        "RustConf",
        "--at",
        "2026-09-01T09:00:00Z",
        "--location",
        "Main hall",
        "--capacity",
        "2",
        "--json",
    ]);
    let event: serde_json::Value = serde_json::from_str(stdout.trim()).expect("event JSON");
    event["id"].as_str().expect("event id").to_string()
}

fn register_attendee(home: &TestHome, event_id: &str, name: &str, email: &str) -> String {
    let stdout = home.run_ok(&[
        "register", "--event", event_id, "--name", name, "--email", email, "--json",
    ]);
    let registration: serde_json::Value =
        serde_json::from_str(stdout.trim()).expect("registration JSON");
    assert_eq!(registration["status"], "pending");
    registration["credential"]
        .as_str()
        .expect("credential")
        .to_string()
}

#[test]
fn full_checkin_flow() {
    let home = TestHome::new();
    let event_id = create_event(&home);
    let credential = register_attendee(&home, &event_id, "Ada", "ada@example.com");

    // First scan checks Ada in.
    let stdout = home.run_ok(&["check-in", "--event", &event_id, "--credential", &credential]);
    assert!(stdout.contains("Checked in: Ada"), "{stdout}");

    // An immediate repeat is a duplicate, not a second success.
    let stdout = home.run_ok(&["check-in", "--event", &event_id, "--credential", &credential]);
    assert!(stdout.contains("Already checked in: Ada"), "{stdout}");

    // Garbage resolves to nothing and mutates nothing.
    let stdout = home.run_ok(&["check-in", "--event", &event_id, "--credential", "garbage"]);
    assert!(stdout.contains("No registration matches"), "{stdout}");

    let stdout = home.run_ok(&["status", "--event", &event_id, "--json"]);
    let status: serde_json::Value = serde_json::from_str(stdout.trim()).expect("status JSON");
    assert_eq!(status["tally"]["total"], 1);
    assert_eq!(status["tally"]["checked_in"], 1);
}

#[test]
fn registration_is_capacity_limited() {
    let home = TestHome::new();
    let event_id = create_event(&home);
    register_attendee(&home, &event_id, "Ada", "ada@example.com");
    register_attendee(&home, &event_id, "Grace", "grace@example.com");

    let output = home.run(&[
        "register",
        "--event",
        &event_id,
        "--name",
        "Linus",
        "--email",
        "linus@example.com",
    ]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("capacity"), "{stderr}");
}

#[test]
fn scan_session_with_manual_entry() {
    let home = TestHome::new();
    let event_id = create_event(&home);
    let credential = register_attendee(&home, &event_id, "Ada", "ada@example.com");

    let stdin = format!("{credential}\n{credential}\nq\n");
    let output = home.run_with_stdin(&["scan", "--event", &event_id], &stdin);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("[OK] Ada checked in"), "{stdout}");
    assert!(stdout.contains("[DUP] Ada already checked in"), "{stdout}");
    assert!(stdout.contains("Checked in: 1 of 1"), "{stdout}");
}

#[test]
fn scan_session_with_frame_feed() {
    let home = TestHome::new();
    let event_id = create_event(&home);
    let credential = register_attendee(&home, &event_id, "Ada", "ada@example.com");

    // A capture tool would drop frames here; `cat` stands in for the
    // external decoder, so the frame bytes are the decoded text.
    let frames_dir = home.temp.path().join("frames");
    std::fs::create_dir_all(&frames_dir).unwrap();
    std::fs::write(frames_dir.join("frame-0.raw"), &credential).unwrap();

    let output = home.run_with_stdin(
        &[
            "scan",
            "--event",
            &event_id,
            "--frames",
            frames_dir.to_str().unwrap(),
            "--decoder",
            "cat",
        ],
        "\nq\n",
    );
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("[OK] Ada checked in"), "{stdout}");
    assert!(stdout.contains("Checked in: 1 of 1"), "{stdout}");
}

#[test]
fn foreign_organizer_cannot_check_in() {
    let owner = TestHome::new();
    let event_id = create_event(&owner);
    let credential = register_attendee(&owner, &event_id, "Ada", "ada@example.com");

    let other = TestHome::sharing_database_of(&owner);
    let output = other.run(&["check-in", "--event", &event_id, "--credential", &credential]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not found for this organizer"), "{stderr}");

    // The owner still sees Ada pending.
    let stdout = owner.run_ok(&["status", "--event", &event_id, "--json"]);
    let status: serde_json::Value = serde_json::from_str(stdout.trim()).expect("status JSON");
    assert_eq!(status["tally"]["checked_in"], 0);
}

#[test]
fn deleting_an_event_removes_its_registrations() {
    let home = TestHome::new();
    let event_id = create_event(&home);
    register_attendee(&home, &event_id, "Ada", "ada@example.com");

    let stdout = home.run_ok(&["event", "delete", &event_id]);
    assert!(stdout.contains("Deleted event"), "{stdout}");

    let output = home.run(&["status", "--event", &event_id]);
    assert!(!output.status.success());
}
