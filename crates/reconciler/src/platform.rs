//! Container platform abstraction for testability.
//!
//! The [`Platform`] trait abstracts the Proxmox `pct` tool and the per-container
//! config files, allowing production code to use [`PctPlatform`] while tests use
//! `MockPlatform`.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │ LifecycleReconciler │
//! │ CommandExecutor     │
//! │ PrivilegeConfigurator│
//! └──────────┬──────────┘
//!            │
//!            ▼
//!      ┌──────────┐
//!      │ Platform │ (trait)
//!      └──────────┘
//!        │      │
//!        ▼      ▼
//!    ┌─────┐ ┌──────┐
//!    │ pct │ │ Mock │
//!    └──┬──┘ └──────┘
//!       │
//!       ▼
//!  /usr/sbin/pct + /etc/pve/lxc/<id>.conf
//! ```
//!
//! # Error Handling
//!
//! Every platform call is fallible and potentially slow. Failures are reported
//! as [`ReconcileError::Transient`]; deciding whether to retry is left to the
//! callers. Config file access failures are reported as
//! [`ReconcileError::ConfigFile`].

use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use lxcward_core::config::PlatformConfig;
use lxcward_core::types::{CommandLine, ContainerId};

use crate::error::ReconcileError;

/// Result of a command executed inside a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecOutput {
    /// Process exit code (`-1` when terminated by a signal).
    pub exit_code: i32,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl ExecOutput {
    /// Whether the command exited with status 0.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    fn from_output(output: Output) -> Self {
        Self {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

/// Trait abstracting container platform operations.
///
/// All platform interaction goes through this trait, enabling testability via
/// mocking. The trait is `Send + Sync + 'static`, allowing the platform to be
/// shared through `Arc` by every component.
///
/// # Implementations
///
/// - [`PctPlatform`]: Production implementation driving the `pct` CLI
/// - `MockPlatform`: Scripted test implementation (available in tests only)
pub trait Platform: Send + Sync + 'static {
    /// Queries the raw status text of a container (`status: running`).
    ///
    /// # Errors
    ///
    /// Returns `ReconcileError::Transient` if the query itself fails.
    fn query_status(
        &self,
        id: ContainerId,
    ) -> impl Future<Output = Result<String, ReconcileError>> + Send;

    /// Starts a container.
    fn start(&self, id: ContainerId) -> impl Future<Output = Result<(), ReconcileError>> + Send;

    /// Stops a container.
    fn stop(&self, id: ContainerId) -> impl Future<Output = Result<(), ReconcileError>> + Send;

    /// Runs a command inside a container.
    ///
    /// A non-zero exit code is not an error at this level; it is reported in
    /// the returned [`ExecOutput`].
    ///
    /// # Errors
    ///
    /// Returns `ReconcileError::Transient` if the command could not be run at
    /// all (container not running, tool failure, timeout).
    fn exec(
        &self,
        id: ContainerId,
        command: &CommandLine,
    ) -> impl Future<Output = Result<ExecOutput, ReconcileError>> + Send;

    /// Queries the platform's view of the container configuration.
    ///
    /// Succeeds only if the container exists.
    fn query_config(
        &self,
        id: ContainerId,
    ) -> impl Future<Output = Result<String, ReconcileError>> + Send;

    /// Reads the persisted configuration file of a container.
    fn read_config(
        &self,
        id: ContainerId,
    ) -> impl Future<Output = Result<String, ReconcileError>> + Send;

    /// Replaces the persisted configuration file of a container.
    fn write_config(
        &self,
        id: ContainerId,
        contents: &str,
    ) -> impl Future<Output = Result<(), ReconcileError>> + Send;
}

/// Production platform implementation using the Proxmox `pct` tool.
///
/// Every invocation is bounded by `command_timeout`; the child process is
/// killed if the timeout elapses.
///
/// # Examples
///
/// ```ignore
/// use lxcward_reconciler::PctPlatform;
///
/// let platform = PctPlatform::new("/usr/sbin/pct", "/etc/pve/lxc", Duration::from_secs(120));
/// let raw = platform.query_status(ContainerId::new(101)?).await?;
/// ```
pub struct PctPlatform {
    pct_path: PathBuf,
    config_dir: PathBuf,
    command_timeout: Duration,
}

impl PctPlatform {
    /// Creates a platform driving the given `pct` binary.
    pub fn new(
        pct_path: impl Into<PathBuf>,
        config_dir: impl Into<PathBuf>,
        command_timeout: Duration,
    ) -> Self {
        Self {
            pct_path: pct_path.into(),
            config_dir: config_dir.into(),
            command_timeout,
        }
    }

    /// Creates a platform from the `[platform]` config section.
    pub fn from_config(config: &PlatformConfig) -> Self {
        Self::new(
            &config.pct_path,
            &config.config_dir,
            Duration::from_secs(config.command_timeout_secs),
        )
    }

    /// Path of the persisted config file for a container.
    pub fn config_path(&self, id: ContainerId) -> PathBuf {
        self.config_dir.join(format!("{id}.conf"))
    }

    async fn run_pct(
        &self,
        operation: &str,
        id: ContainerId,
        args: &[&str],
    ) -> Result<Output, ReconcileError> {
        debug!(
            container_id = %id,
            operation,
            pct = %self.pct_path.display(),
            "invoking pct"
        );

        let child = tokio::process::Command::new(&self.pct_path)
            .args(args)
            .kill_on_drop(true)
            .output();

        match tokio::time::timeout(self.command_timeout, child).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(ReconcileError::transient(
                operation,
                id,
                format!("failed to run {}: {e}", self.pct_path.display()),
            )),
            Err(_elapsed) => Err(ReconcileError::transient(
                operation,
                id,
                format!("timed out after {}s", self.command_timeout.as_secs()),
            )),
        }
    }

    /// Runs a pct subcommand and requires a zero exit status.
    async fn run_checked(
        &self,
        operation: &str,
        id: ContainerId,
        args: &[&str],
    ) -> Result<String, ReconcileError> {
        let output = self.run_pct(operation, id, args).await?;
        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(ReconcileError::transient(
                operation,
                id,
                format!(
                    "pct exited with {}: {}",
                    output.status.code().unwrap_or(-1),
                    stderr.trim()
                ),
            ))
        }
    }
}

impl Platform for PctPlatform {
    async fn query_status(&self, id: ContainerId) -> Result<String, ReconcileError> {
        let id_arg = id.to_string();
        self.run_checked("status", id, &["status", &id_arg]).await
    }

    async fn start(&self, id: ContainerId) -> Result<(), ReconcileError> {
        let id_arg = id.to_string();
        self.run_checked("start", id, &["start", &id_arg])
            .await
            .map(|_| ())
    }

    async fn stop(&self, id: ContainerId) -> Result<(), ReconcileError> {
        let id_arg = id.to_string();
        self.run_checked("stop", id, &["stop", &id_arg])
            .await
            .map(|_| ())
    }

    async fn exec(
        &self,
        id: ContainerId,
        command: &CommandLine,
    ) -> Result<ExecOutput, ReconcileError> {
        let id_arg = id.to_string();
        let mut args: Vec<&str> = vec!["exec", &id_arg, "--"];
        args.extend(command.args().iter().map(String::as_str));

        let output = self.run_pct("exec", id, &args).await?;
        Ok(ExecOutput::from_output(output))
    }

    async fn query_config(&self, id: ContainerId) -> Result<String, ReconcileError> {
        let id_arg = id.to_string();
        self.run_checked("config", id, &["config", &id_arg]).await
    }

    async fn read_config(&self, id: ContainerId) -> Result<String, ReconcileError> {
        let path = self.config_path(id);
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| ReconcileError::ConfigFile {
                container_id: id,
                reason: format!("read {}: {e}", path.display()),
            })
    }

    async fn write_config(&self, id: ContainerId, contents: &str) -> Result<(), ReconcileError> {
        let path = self.config_path(id);
        let tmp = temp_path(&path);

        let to_err = |stage: &str, e: std::io::Error| ReconcileError::ConfigFile {
            container_id: id,
            reason: format!("{stage} {}: {e}", path.display()),
        };

        tokio::fs::write(&tmp, contents)
            .await
            .map_err(|e| to_err("write", e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| to_err("replace", e))?;
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// 플랫폼 호출 기록 (테스트용)
#[cfg(test)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Status,
    Start,
    Stop,
    Exec(Vec<String>),
    QueryConfig,
    ReadConfig,
    WriteConfig,
}

#[cfg(test)]
#[derive(Default)]
struct MockState {
    running: bool,
    exists: bool,
    status_script: std::collections::VecDeque<lxcward_core::types::ContainerStatus>,
    status_query_fails: bool,
    start_failures: u32,
    start_never_runs: bool,
    stop_failures: u32,
    exec_failures: u32,
    exec_always_fails: bool,
    crash_on_failed_exec: Option<u32>,
    failed_execs: u32,
    existing_paths: Vec<String>,
    config: String,
    calls: Vec<Call>,
}

/// 테스트용 Mock 플랫폼
///
/// 단일 컨테이너를 시뮬레이션합니다. start/stop은 내부 상태를 바꾸고,
/// `pct`처럼 이미 실행 중인 컨테이너의 start와 정지된 컨테이너의 stop은 실패합니다.
/// 스크립트된 상태가 있으면 조회 시 먼저 소비합니다.
#[cfg(test)]
pub struct MockPlatform {
    state: std::sync::Mutex<MockState>,
}

#[cfg(test)]
impl MockPlatform {
    /// 존재하고 정지된 컨테이너를 생성합니다.
    pub fn new() -> Self {
        Self {
            state: std::sync::Mutex::new(MockState {
                exists: true,
                ..MockState::default()
            }),
        }
    }

    fn with(self, f: impl FnOnce(&mut MockState)) -> Self {
        f(&mut self.state.lock().unwrap());
        self
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    /// 실행 중인 상태로 시작합니다.
    pub fn running(self) -> Self {
        self.with(|s| s.running = true)
    }

    /// 존재하지 않는 컨테이너로 설정합니다.
    pub fn missing(self) -> Self {
        self.with(|s| s.exists = false)
    }

    /// 상태 조회 결과를 순서대로 지정합니다.
    pub fn with_status_script(
        self,
        script: Vec<lxcward_core::types::ContainerStatus>,
    ) -> Self {
        self.with(|s| s.status_script = script.into())
    }

    /// 상태 조회가 항상 실패합니다.
    pub fn with_failing_status_query(self) -> Self {
        self.with(|s| s.status_query_fails = true)
    }

    /// 처음 `n`번의 start가 실패합니다.
    pub fn with_start_failures(self, n: u32) -> Self {
        self.with(|s| s.start_failures = n)
    }

    /// start는 성공하지만 컨테이너가 Running이 되지 않습니다.
    pub fn with_start_never_running(self) -> Self {
        self.with(|s| s.start_never_runs = true)
    }

    /// 처음 `n`번의 stop이 실패합니다.
    pub fn with_stop_failures(self, n: u32) -> Self {
        self.with(|s| s.stop_failures = n)
    }

    /// 처음 `n`번의 exec가 non-zero로 종료합니다.
    pub fn with_exec_failures(self, n: u32) -> Self {
        self.with(|s| s.exec_failures = n)
    }

    /// 모든 exec가 non-zero로 종료합니다.
    pub fn with_exec_always_failing(self) -> Self {
        self.with(|s| s.exec_always_fails = true)
    }

    /// `n`번째로 실패한 exec가 컨테이너도 정지시킵니다.
    pub fn with_crash_on_failed_exec(self, n: u32) -> Self {
        self.with(|s| s.crash_on_failed_exec = Some(n))
    }

    /// `test -e`로 존재한다고 응답할 경로를 지정합니다.
    pub fn with_existing_paths(self, paths: &[&str]) -> Self {
        self.with(|s| s.existing_paths = paths.iter().map(|p| (*p).to_owned()).collect())
    }

    /// 영속 설정 내용을 지정합니다.
    pub fn with_config(self, config: &str) -> Self {
        self.with(|s| s.config = config.to_owned())
    }

    /// 기록된 호출 목록
    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    pub fn start_calls(&self) -> usize {
        self.count(|c| matches!(c, Call::Start))
    }

    pub fn stop_calls(&self) -> usize {
        self.count(|c| matches!(c, Call::Stop))
    }

    pub fn exec_calls(&self) -> usize {
        self.count(|c| matches!(c, Call::Exec(_)))
    }

    pub fn write_calls(&self) -> usize {
        self.count(|c| matches!(c, Call::WriteConfig))
    }

    /// 현재 영속 설정 내용
    pub fn config(&self) -> String {
        self.state().config.clone()
    }

    fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.state().calls.iter().filter(|c| pred(c)).count()
    }
}

#[cfg(test)]
impl Platform for MockPlatform {
    async fn query_status(&self, id: ContainerId) -> Result<String, ReconcileError> {
        let mut s = self.state();
        s.calls.push(Call::Status);
        if s.status_query_fails {
            return Err(ReconcileError::transient("status", id, "mock status failure"));
        }
        if let Some(status) = s.status_script.pop_front() {
            return Ok(format!("status: {status}\n"));
        }
        let status = if s.running { "running" } else { "stopped" };
        Ok(format!("status: {status}\n"))
    }

    async fn start(&self, id: ContainerId) -> Result<(), ReconcileError> {
        let mut s = self.state();
        s.calls.push(Call::Start);
        if s.start_failures > 0 {
            s.start_failures -= 1;
            return Err(ReconcileError::transient("start", id, "mock start failure"));
        }
        if s.running {
            return Err(ReconcileError::transient(
                "start",
                id,
                format!("CT {id} already running"),
            ));
        }
        if !s.start_never_runs {
            s.running = true;
        }
        Ok(())
    }

    async fn stop(&self, id: ContainerId) -> Result<(), ReconcileError> {
        let mut s = self.state();
        s.calls.push(Call::Stop);
        if s.stop_failures > 0 {
            s.stop_failures -= 1;
            return Err(ReconcileError::transient("stop", id, "mock stop failure"));
        }
        if !s.running {
            return Err(ReconcileError::transient(
                "stop",
                id,
                format!("CT {id} not running"),
            ));
        }
        s.running = false;
        Ok(())
    }

    async fn exec(
        &self,
        id: ContainerId,
        command: &CommandLine,
    ) -> Result<ExecOutput, ReconcileError> {
        let mut s = self.state();
        s.calls.push(Call::Exec(command.args().to_vec()));
        if !s.running {
            return Err(ReconcileError::transient(
                "exec",
                id,
                format!("CT {id} not running"),
            ));
        }

        let fail = if s.exec_always_fails {
            true
        } else if s.exec_failures > 0 {
            s.exec_failures -= 1;
            true
        } else {
            false
        };

        if fail {
            s.failed_execs += 1;
            if s.crash_on_failed_exec == Some(s.failed_execs) {
                s.running = false;
            }
            return Ok(ExecOutput {
                exit_code: 1,
                stdout: String::new(),
                stderr: "mock failure".to_owned(),
            });
        }

        let exit_code = match command.args() {
            [program, flag, path] if program == "test" && flag == "-e" => {
                if s.existing_paths.contains(path) { 0 } else { 1 }
            }
            _ => 0,
        };
        Ok(ExecOutput {
            exit_code,
            stdout: String::new(),
            stderr: String::new(),
        })
    }

    async fn query_config(&self, id: ContainerId) -> Result<String, ReconcileError> {
        let mut s = self.state();
        s.calls.push(Call::QueryConfig);
        if s.exists {
            Ok(s.config.clone())
        } else {
            Err(ReconcileError::transient(
                "config",
                id,
                format!("Configuration file 'nodes/pve/lxc/{id}.conf' does not exist"),
            ))
        }
    }

    async fn read_config(&self, id: ContainerId) -> Result<String, ReconcileError> {
        let mut s = self.state();
        s.calls.push(Call::ReadConfig);
        if s.exists {
            Ok(s.config.clone())
        } else {
            Err(ReconcileError::ConfigFile {
                container_id: id,
                reason: "mock config missing".to_owned(),
            })
        }
    }

    async fn write_config(&self, _id: ContainerId, contents: &str) -> Result<(), ReconcileError> {
        let mut s = self.state();
        s.calls.push(Call::WriteConfig);
        s.config = contents.to_owned();
        Ok(())
    }
}
