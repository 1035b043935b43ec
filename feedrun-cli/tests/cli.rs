//! End-to-end checks of the `feedrun` binary's exit codes

#![cfg(unix)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("jobs")).unwrap();
        Self { dir }
    }

    fn jobs(&self) -> PathBuf {
        self.dir.path().join("jobs")
    }

    fn log(&self) -> PathBuf {
        self.dir.path().join("state").join("feedrun.log")
    }

    /// Adds a job whose script body is `body`
    fn add_job(&self, id: &str, enabled: bool, body: &str) -> PathBuf {
        let dir = self.jobs().join(id);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("run.sh"), format!("#!/bin/sh\n{}\n", body)).unwrap();
        fs::write(
            dir.join("job_config.json"),
            format!(
                r#"{{
                    "job_id": "{id}",
                    "name": "{id} scraper",
                    "enabled": {enabled},
                    "source": {{
                        "type": "script",
                        "script_path": "run.sh",
                        "interpreter": "/bin/sh",
                        "timeout_seconds": 10,
                        "retry_attempts": 0
                    }},
                    "output": {{ "format": "csv", "directory": "data", "filename": "out.csv" }}
                }}"#
            ),
        )
        .unwrap();
        dir
    }

    fn add_broken_job(&self, dir_name: &str) {
        let dir = self.jobs().join(dir_name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("job_config.json"), "{ not json").unwrap();
    }

    fn feedrun(&self, args: &[&str]) -> Output {
        feedrun_in(&self.jobs(), &self.log(), args)
    }
}

fn feedrun_command(jobs: &Path, log: &Path, args: &[&str]) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_feedrun"));
    command
        .arg("--jobs-dir")
        .arg(jobs)
        .arg("--log-file")
        .arg(log)
        .args(args)
        .env_remove("FEEDRUN_JOBS_DIR")
        .env_remove("FEEDRUN_LOG_FILE")
        .env_remove("FEEDRUN_MAX_PARALLEL_JOBS");
    command
}

fn feedrun_in(jobs: &Path, log: &Path, args: &[&str]) -> Output {
    feedrun_command(jobs, log, args).output().unwrap()
}

/// Polls until `check` holds or `limit` elapses
fn wait_for(limit: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + limit;
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        thread::sleep(Duration::from_millis(50));
    }
    check()
}

/// Zombies awaiting their reaper count as dead
fn pid_alive(pid: i32) -> bool {
    match fs::read_to_string(format!("/proc/{}/stat", pid)) {
        Ok(stat) => stat
            .rsplit(')')
            .next()
            .map(|rest| !rest.trim_start().starts_with('Z'))
            .unwrap_or(false),
        // SAFETY: signal 0 only checks for existence
        Err(_) => unsafe { libc::kill(pid, 0) == 0 },
    }
}

#[test]
fn test_list_with_only_invalid_jobs_succeeds() {
    let ws = Workspace::new();
    ws.add_broken_job("broken");

    let output = ws.feedrun(&["list"]);

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("broken"));
    assert!(stdout.contains("invalid"));
}

#[test]
fn test_list_missing_root_is_fatal() {
    let ws = Workspace::new();
    let missing = ws.dir.path().join("nowhere");

    let output = feedrun_in(&missing, &ws.log(), &["list"]);

    assert_eq!(output.status.code(), Some(5));
}

#[test]
fn test_run_success_writes_log() {
    let ws = Workspace::new();
    ws.add_job("news", true, "mkdir -p data && echo id > data/out.csv");

    let output = ws.feedrun(&["run", "--job", "news"]);

    assert_eq!(output.status.code(), Some(0));
    assert!(ws.jobs().join("news/data/out.csv").is_file());
    let log = fs::read_to_string(ws.log()).unwrap();
    assert!(log.contains("\"record\":\"summary\""));
    assert!(log.contains("\"final_status\":\"succeeded\""));
}

#[test]
fn test_run_failure_exits_one() {
    let ws = Workspace::new();
    ws.add_job("flaky", true, "echo boom >&2\nexit 3");

    let output = ws.feedrun(&["run", "--job", "flaky"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stdout).contains("boom"));
}

#[test]
fn test_run_unknown_job_exits_two() {
    let ws = Workspace::new();
    ws.add_job("news", true, "exit 0");

    let output = ws.feedrun(&["run", "--job", "weather"]);

    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_run_disabled_job_needs_force() {
    let ws = Workspace::new();
    ws.add_job("paused", false, "mkdir -p data && echo id > data/out.csv");

    let output = ws.feedrun(&["run", "--job", "paused"]);
    assert_eq!(output.status.code(), Some(3));
    assert!(!ws.jobs().join("paused/data/out.csv").exists());

    let output = ws.feedrun(&["run", "--job", "paused", "--force"]);
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn test_run_all_reports_most_severe_code() {
    let ws = Workspace::new();
    ws.add_job("a_ok", true, "mkdir -p data && echo id > data/out.csv");
    ws.add_job("b_fail", true, "exit 1");

    let output = ws.feedrun(&["run", "--all", "--parallel", "2"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(ws.jobs().join("a_ok/data/out.csv").is_file());
}

#[test]
fn test_ctrl_c_stops_job_and_exits_130() {
    let ws = Workspace::new();
    let dir = ws.add_job("hang", true, "sleep 60 & echo $! > sleeper.pid\ntouch started\nwait");

    let mut child = feedrun_command(&ws.jobs(), &ws.log(), &["run", "--job", "hang"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    assert!(wait_for(Duration::from_secs(10), || dir.join("started").exists()));
    // SAFETY: plain signal delivery to a child we own
    unsafe {
        libc::kill(child.id() as libc::pid_t, libc::SIGINT);
    }

    let mut status = None;
    assert!(wait_for(Duration::from_secs(10), || {
        status = child.try_wait().unwrap();
        status.is_some()
    }));
    assert_eq!(status.and_then(|s| s.code()), Some(130));

    let log = fs::read_to_string(ws.log()).unwrap();
    assert!(log.contains("\"record\":\"interrupted\""));

    let sleeper: i32 = fs::read_to_string(dir.join("sleeper.pid"))
        .unwrap()
        .trim()
        .parse()
        .unwrap();
    assert!(wait_for(Duration::from_secs(2), || !pid_alive(sleeper)));
}
