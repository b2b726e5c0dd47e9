//! Command execution backend: `POST /execute_shell {command}`
//!
//! The command line is split into an argument vector and the program is
//! started directly, never through a shell. Each command runs in its own
//! process group so a timeout can kill everything it started.

use super::argv::split_command;
use super::error::BackendApiError;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use relay_domain::codes;
use relay_domain::tool::builtin::SHELL_ENDPOINT;
use serde::Deserialize;
use serde_json::{Value, json};
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct ShellSettings {
    pub timeout: Duration,
    /// Bytes kept per stream; the rest is drained and dropped
    pub max_output_bytes: usize,
    pub working_dir: Option<PathBuf>,
}

impl Default for ShellSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_output_bytes: 1024 * 1024,
            working_dir: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ShellRequest {
    pub command: String,
}

/// Exit status and captured streams of a finished command
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOutput {
    /// Exit code, `-1` when the process was killed by a signal
    pub return_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub truncated: bool,
}

impl CommandOutput {
    /// Success reports stdout; failure reports stderr (stdout when stderr is empty).
    pub fn to_json(&self) -> Value {
        let (status, output) = if self.return_code == 0 {
            ("success", self.stdout.trim())
        } else if self.stderr.trim().is_empty() {
            ("error", self.stdout.trim())
        } else {
            ("error", self.stderr.trim())
        };
        let mut body = json!({
            "status": status,
            "return_code": self.return_code,
            "output": output,
        });
        if self.truncated {
            body["truncated"] = Value::Bool(true);
        }
        body
    }
}

pub fn router(settings: ShellSettings) -> Router {
    Router::new()
        .route(SHELL_ENDPOINT, post(execute_shell))
        .with_state(Arc::new(settings))
}

async fn execute_shell(
    State(settings): State<Arc<ShellSettings>>,
    payload: Result<Json<ShellRequest>, JsonRejection>,
) -> Result<Json<Value>, BackendApiError> {
    let Json(request) = payload?;
    let output = run_command(&request.command, &settings).await?;
    Ok(Json(output.to_json()))
}

/// Split, resolve and run one command line under the configured limits.
pub async fn run_command(
    line: &str,
    settings: &ShellSettings,
) -> Result<CommandOutput, BackendApiError> {
    let argv = split_command(line).map_err(|e| BackendApiError::invalid_request(e.to_string()))?;
    let program = which::which(&argv[0]).map_err(|_| {
        BackendApiError::bad_request(
            codes::COMMAND_NOT_FOUND,
            format!("command not found: {}", argv[0]),
        )
    })?;

    debug!("shell: {:?}", argv);

    let mut cmd = Command::new(&program);
    cmd.args(&argv[1..])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = &settings.working_dir {
        cmd.current_dir(dir);
    }

    #[cfg(unix)]
    cmd.process_group(0);

    // Linux: the child dies with the backend even if we are SIGKILLed.
    #[cfg(target_os = "linux")]
    unsafe {
        cmd.pre_exec(|| {
            libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGKILL);
            Ok(())
        });
    }

    let mut child = cmd.spawn().map_err(|e| {
        BackendApiError::internal(format!("failed to start {}: {}", argv[0], e))
    })?;
    let pid = child.id();

    let limit = settings.max_output_bytes;
    let stdout_task = child
        .stdout
        .take()
        .map(|stream| tokio::spawn(read_bounded(stream, limit)));
    let stderr_task = child
        .stderr
        .take()
        .map(|stream| tokio::spawn(read_bounded(stream, limit)));

    match tokio::time::timeout(settings.timeout, wait_exited(&mut child)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            kill_group(pid);
            let _ = child.kill().await;
            return Err(BackendApiError::internal(format!("failed to wait for command: {}", e)));
        }
        Err(_) => {
            warn!("shell: '{}' timed out after {:?}, killing group", argv[0], settings.timeout);
            kill_group(pid);
            let _ = child.kill().await;
            for task in [stdout_task, stderr_task].into_iter().flatten() {
                task.abort();
            }
            return Err(BackendApiError::timeout(format!(
                "command timed out after {} seconds",
                settings.timeout.as_secs_f64()
            )));
        }
    }

    // The leader has exited but is not reaped yet, so its pid still names
    // our group. Background children left in it would hold the pipes open.
    kill_group(pid);
    let status = child
        .wait()
        .await
        .map_err(|e| BackendApiError::internal(format!("failed to wait for command: {}", e)))?;

    let (stdout, stdout_cut) = join_reader(stdout_task).await;
    let (stderr, stderr_cut) = join_reader(stderr_task).await;
    let return_code = status.code().unwrap_or(-1);

    info!("shell: '{}' exited with {}", argv[0], return_code);

    Ok(CommandOutput {
        return_code,
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
        truncated: stdout_cut || stderr_cut,
    })
}

/// Keep the first `limit` bytes and drain the rest.
async fn read_bounded<R: AsyncRead + Unpin>(mut reader: R, limit: usize) -> (Vec<u8>, bool) {
    let mut kept = Vec::new();
    let mut truncated = false;
    let mut chunk = [0u8; 8192];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                let room = limit.saturating_sub(kept.len());
                if n > room {
                    truncated = true;
                }
                kept.extend_from_slice(&chunk[..n.min(room)]);
            }
        }
    }
    (kept, truncated)
}

async fn join_reader(task: Option<tokio::task::JoinHandle<(Vec<u8>, bool)>>) -> (Vec<u8>, bool) {
    match task {
        Some(task) => task.await.unwrap_or_default(),
        None => (Vec::new(), false),
    }
}

/// Wait for the child to exit without reaping it.
#[cfg(unix)]
async fn wait_exited(child: &mut tokio::process::Child) -> std::io::Result<()> {
    let Some(pid) = child.id() else {
        return Ok(());
    };
    tokio::task::spawn_blocking(move || {
        loop {
            let mut info: libc::siginfo_t = unsafe { std::mem::zeroed() };
            let rc = unsafe {
                libc::waitid(
                    libc::P_PID,
                    pid as libc::id_t,
                    &mut info,
                    libc::WEXITED | libc::WNOWAIT,
                )
            };
            if rc == 0 {
                return Ok(());
            }
            let err = std::io::Error::last_os_error();
            if err.kind() != std::io::ErrorKind::Interrupted {
                return Err(err);
            }
        }
    })
    .await
    .map_err(std::io::Error::other)?
}

#[cfg(not(unix))]
async fn wait_exited(child: &mut tokio::process::Child) -> std::io::Result<()> {
    child.wait().await.map(|_| ())
}

#[cfg(unix)]
fn kill_group(pid: Option<u32>) {
    if let Some(pid) = pid {
        // The child was started with process_group(0), so its pid is the pgid.
        unsafe {
            libc::killpg(pid as libc::pid_t, libc::SIGKILL);
        }
    }
}

#[cfg(not(unix))]
fn kill_group(_pid: Option<u32>) {}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use std::time::Instant;

    fn settings() -> ShellSettings {
        ShellSettings::default()
    }

    #[tokio::test]
    async fn test_echo_succeeds_with_trimmed_output() {
        let output = run_command("echo hello", &settings()).await.unwrap();
        assert_eq!(output.return_code, 0);
        assert_eq!(
            output.to_json(),
            json!({"status": "success", "return_code": 0, "output": "hello"})
        );
    }

    #[tokio::test]
    async fn test_operators_reach_the_program_as_arguments() {
        let output = run_command("echo hi | rm -rf /nothing", &settings())
            .await
            .unwrap();
        assert_eq!(output.stdout.trim(), "hi | rm -rf /nothing");
    }

    #[tokio::test]
    async fn test_nonzero_exit_reports_stderr() {
        let output = run_command("ls /definitely/not/here", &settings())
            .await
            .unwrap();
        assert_ne!(output.return_code, 0);
        let body = output.to_json();
        assert_eq!(body["status"], "error");
        assert!(body["output"].as_str().unwrap().contains("/definitely/not/here"));
    }

    #[tokio::test]
    async fn test_nonzero_exit_without_stderr_reports_stdout() {
        let output = run_command("false", &settings()).await.unwrap();
        assert_eq!(output.return_code, 1);
        assert_eq!(output.to_json()["output"], "");
    }

    #[tokio::test]
    async fn test_unknown_program_is_command_not_found() {
        let err = run_command("no-such-program-xyz --help", &settings())
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), codes::COMMAND_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_malformed_lines_are_invalid_requests() {
        for line in ["", "   ", "echo 'unterminated"] {
            let err = run_command(line, &settings()).await.unwrap_err();
            assert_eq!(err.status(), StatusCode::BAD_REQUEST);
            assert_eq!(err.code(), codes::INVALID_REQUEST);
        }
    }

    #[tokio::test]
    async fn test_timeout_kills_the_command() {
        let settings = ShellSettings {
            timeout: Duration::from_millis(300),
            ..settings()
        };
        let started = Instant::now();
        let err = run_command("sleep 30", &settings).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::REQUEST_TIMEOUT);
        assert_eq!(err.code(), codes::TIMEOUT);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    /// Dead, or a zombie waiting for its new parent to reap it.
    #[cfg(target_os = "linux")]
    fn is_gone(pid: i32) -> bool {
        match std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
            Err(_) => true,
            Ok(stat) => stat
                .rsplit_once(')')
                .is_some_and(|(_, rest)| rest.trim_start().starts_with('Z')),
        }
    }

    #[cfg(target_os = "linux")]
    async fn wait_gone(pid: i32) -> bool {
        for _ in 0..50 {
            if is_gone(pid) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        false
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_timeout_kills_the_whole_group() {
        let dir = tempfile::tempdir().unwrap();
        let pids = dir.path().join("pids");
        let settings = ShellSettings {
            timeout: Duration::from_millis(500),
            ..settings()
        };
        let line = format!(
            "sh -c 'sleep 30 & echo $$ $! > {}; sleep 30'",
            pids.display()
        );
        let err = run_command(&line, &settings).await.unwrap_err();
        assert_eq!(err.code(), codes::TIMEOUT);

        let recorded = std::fs::read_to_string(&pids).unwrap();
        let mut fields = recorded.split_whitespace().map(|f| f.parse::<i32>().unwrap());
        let (pgid, background) = (fields.next().unwrap(), fields.next().unwrap());
        assert!(wait_gone(background).await, "background sleep {background} survived");

        let rc = unsafe { libc::kill(-pgid, 0) };
        if rc == 0 {
            // only zombies left in the group
            assert!(is_gone(background));
        } else {
            assert_eq!(std::io::Error::last_os_error().raw_os_error(), Some(libc::ESRCH));
        }
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_background_child_is_killed_after_normal_exit() {
        let started = Instant::now();
        let output = run_command("sh -c 'sleep 30 & echo $!'", &settings())
            .await
            .unwrap();
        assert_eq!(output.return_code, 0);
        assert!(started.elapsed() < Duration::from_secs(5));

        let background: i32 = output.stdout.trim().parse().unwrap();
        assert!(wait_gone(background).await, "background sleep {background} survived");
    }

    #[tokio::test]
    async fn test_output_is_bounded() {
        let settings = ShellSettings {
            max_output_bytes: 100,
            ..settings()
        };
        let output = run_command("seq 1 100000", &settings).await.unwrap();
        assert_eq!(output.return_code, 0);
        assert_eq!(output.stdout.len(), 100);
        assert!(output.truncated);
        assert_eq!(output.to_json()["truncated"], true);
    }

    #[tokio::test]
    async fn test_working_dir_is_applied() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "x").unwrap();
        let settings = ShellSettings {
            working_dir: Some(dir.path().to_path_buf()),
            ..settings()
        };
        let output = run_command("ls", &settings).await.unwrap();
        assert!(output.stdout.contains("marker.txt"));
    }

    #[tokio::test]
    async fn test_handler_renders_json() {
        let state = State(Arc::new(settings()));
        let request = Ok(Json(ShellRequest {
            command: "echo 'two words'".to_string(),
        }));
        let Json(body) = execute_shell(state, request).await.unwrap();
        assert_eq!(body["output"], "two words");
    }
}
