//! 생명주기 조정 -- 컨테이너를 Running, 나아가 응답 가능 상태로 수렴
//!
//! [`LifecycleReconciler`]는 상태를 조회하고, Running이 아니면
//! start 재시도 -> 안정화 대기 -> 재조회 사이클을 한 번 수행합니다.
//!
//! # 흐름
//!
//! ```text
//! probe ──Running──> AlreadyRunning
//!   │
//!   └─otherwise─> start (Retrier) ─> sleep(stabilization) ─> probe
//!                                                             │
//!                                      Running <──────────────┤
//!                                      StabilizationFailure <─┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use serde::Serialize;
use tracing::{debug, error, info};

use lxcward_core::metrics::STABILIZATION_FAILURES_TOTAL;
use lxcward_core::types::{CommandLine, ContainerId, ContainerStatus};

use crate::error::ReconcileError;
use crate::platform::Platform;
use crate::probe::StatusProbe;
use crate::retry::{Retrier, RetryPolicy};

/// 수렴 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Convergence {
    /// 이미 Running이었음 (start 호출 없음)
    AlreadyRunning,
    /// 시작하여 Running에 도달함
    Started,
}

impl std::fmt::Display for Convergence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyRunning => write!(f, "already running"),
            Self::Started => write!(f, "started"),
        }
    }
}

/// 생명주기 조정기
pub struct LifecycleReconciler<P: Platform> {
    platform: Arc<P>,
    probe: StatusProbe<P>,
    start_retrier: Retrier,
    stabilization_delay: Duration,
    noop: CommandLine,
}

impl<P: Platform> LifecycleReconciler<P> {
    /// 새 조정기를 생성합니다.
    ///
    /// `start_policy.stabilization_delay`가 시작 후 재조회 전 대기 시간입니다.
    pub fn new(platform: Arc<P>, start_policy: RetryPolicy, noop: CommandLine) -> Self {
        Self {
            probe: StatusProbe::new(Arc::clone(&platform)),
            platform,
            start_retrier: Retrier::new(start_policy),
            stabilization_delay: start_policy.stabilization_delay,
            noop,
        }
    }

    /// 상태 조회기
    pub fn probe(&self) -> &StatusProbe<P> {
        &self.probe
    }

    /// 응답 확인에 쓰는 no-op 명령
    pub fn noop_command(&self) -> &CommandLine {
        &self.noop
    }

    /// 컨테이너가 Running이 되도록 보장합니다.
    ///
    /// 이미 Running이면 start를 호출하지 않습니다.
    ///
    /// # Errors
    ///
    /// start 재시도 소진 시 `RetryExhausted`, 안정화 후에도 Running이 아니면
    /// `Stabilization`을 반환합니다.
    pub async fn ensure_running(&self, id: ContainerId) -> Result<Convergence, ReconcileError> {
        let status = self.probe.status(id).await;
        if status.is_running() {
            debug!(container_id = %id, "container already running");
            return Ok(Convergence::AlreadyRunning);
        }

        info!(container_id = %id, %status, "container not running, starting");
        self.restart_and_stabilize(id).await?;
        Ok(Convergence::Started)
    }

    /// 상태와 무관하게 start -> 안정화 대기 -> 재조회를 수행합니다.
    ///
    /// 명령 재시도 중 에스컬레이션과 권한 전환 사이클에서 사용합니다.
    /// start가 실패해도 재조회 결과가 Running이면 그 시도는 성공입니다
    /// (`pct start`는 이미 실행 중인 컨테이너에 대해 실패합니다).
    pub async fn restart_and_stabilize(&self, id: ContainerId) -> Result<(), ReconcileError> {
        let platform = &*self.platform;
        let probe = &self.probe;
        self.start_retrier
            .run("start", id, move |_| async move {
                if let Err(e) = platform.start(id).await {
                    if probe.status(id).await.is_running() {
                        debug!(container_id = %id, error = %e, "start failed but container is running");
                        return Ok(());
                    }
                    return Err(e);
                }
                Ok(())
            })
            .await
            .inspect_err(|e| {
                error!(container_id = %id, error = %e, "failed to start container");
            })?;

        debug!(
            container_id = %id,
            delay_secs = self.stabilization_delay.as_secs(),
            "waiting for container to stabilize"
        );
        tokio::time::sleep(self.stabilization_delay).await;

        let status = self.probe.status(id).await;
        if status != ContainerStatus::Running {
            counter!(STABILIZATION_FAILURES_TOTAL).increment(1);
            error!(container_id = %id, %status, "container did not stabilize");
            return Err(ReconcileError::Stabilization {
                container_id: id,
                status,
            });
        }

        info!(container_id = %id, "container running");
        Ok(())
    }

    /// Running을 보장한 뒤 no-op 명령을 한 번 실행해 응답을 확인합니다.
    ///
    /// # Errors
    ///
    /// no-op이 실패하거나 non-zero로 종료하면 `Unresponsive`를 반환합니다.
    pub async fn ensure_responsive(&self, id: ContainerId) -> Result<Convergence, ReconcileError> {
        let convergence = self.ensure_running(id).await?;

        match self.platform.exec(id, &self.noop).await {
            Ok(output) if output.success() => {
                debug!(container_id = %id, "container responsive");
                Ok(convergence)
            }
            Ok(output) => Err(ReconcileError::Unresponsive {
                container_id: id,
                reason: format!(
                    "'{}' exited with status {}",
                    self.noop, output.exit_code
                ),
            }),
            Err(e) => Err(ReconcileError::Unresponsive {
                container_id: id,
                reason: e.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{Call, MockPlatform};
    use crate::retry::RetryPolicies;

    fn id() -> ContainerId {
        ContainerId::new(101).unwrap()
    }

    fn reconciler(platform: &Arc<MockPlatform>) -> LifecycleReconciler<MockPlatform> {
        LifecycleReconciler::new(
            Arc::clone(platform),
            RetryPolicies::default().start,
            CommandLine::new(["true"]).unwrap(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn already_running_issues_no_start() {
        let platform = Arc::new(MockPlatform::new().running());
        let result = reconciler(&platform).ensure_running(id()).await.unwrap();

        assert_eq!(result, Convergence::AlreadyRunning);
        assert_eq!(platform.start_calls(), 0);
        assert_eq!(platform.calls(), vec![Call::Status]);
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_container_is_started_and_reprobed() {
        let platform = Arc::new(MockPlatform::new());
        let result = reconciler(&platform).ensure_running(id()).await.unwrap();

        assert_eq!(result, Convergence::Started);
        assert_eq!(
            platform.calls(),
            vec![Call::Status, Call::Start, Call::Status]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_status_triggers_start() {
        let platform = Arc::new(MockPlatform::new().with_status_script(vec![ContainerStatus::Unknown]));
        let result = reconciler(&platform).ensure_running(id()).await.unwrap();
        assert_eq!(result, Convergence::Started);
        assert_eq!(platform.start_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn start_retries_then_succeeds() {
        let platform = Arc::new(MockPlatform::new().with_start_failures(2));
        reconciler(&platform).ensure_running(id()).await.unwrap();
        assert_eq!(platform.start_calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn start_exhaustion_is_terminal() {
        let platform = Arc::new(MockPlatform::new().with_start_failures(10));
        let err = reconciler(&platform).ensure_running(id()).await.unwrap_err();

        assert!(matches!(
            err,
            ReconcileError::RetryExhausted { attempts: 5, .. }
        ));
        assert_eq!(platform.start_calls(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn stabilization_failure_when_still_stopped() {
        let platform = Arc::new(MockPlatform::new().with_start_never_running());
        let err = reconciler(&platform).ensure_running(id()).await.unwrap_err();

        assert!(matches!(
            err,
            ReconcileError::Stabilization {
                status: ContainerStatus::Stopped,
                ..
            }
        ));
        assert_eq!(platform.start_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn waits_stabilization_delay_before_reprobe() {
        let platform = Arc::new(MockPlatform::new());
        let start = tokio::time::Instant::now();
        reconciler(&platform).ensure_running(id()).await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn restart_and_stabilize_starts_even_when_running() {
        let platform = Arc::new(MockPlatform::new().running());
        reconciler(&platform).restart_and_stabilize(id()).await.unwrap();
        assert_eq!(platform.start_calls(), 1);
        assert_eq!(
            platform.calls(),
            vec![Call::Start, Call::Status, Call::Status]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn misreported_running_container_converges_on_first_start() {
        // 일시적 조회 실패로 Unknown이 보고된 실행 중 컨테이너
        let platform = Arc::new(
            MockPlatform::new()
                .running()
                .with_status_script(vec![ContainerStatus::Unknown]),
        );
        let result = reconciler(&platform).ensure_running(id()).await.unwrap();

        assert_eq!(result, Convergence::Started);
        assert_eq!(platform.start_calls(), 1);
        assert_eq!(
            platform.calls(),
            vec![Call::Status, Call::Start, Call::Status, Call::Status]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn failed_start_on_stopped_container_is_still_retried() {
        let platform = Arc::new(MockPlatform::new().with_start_failures(1));
        reconciler(&platform).restart_and_stabilize(id()).await.unwrap();
        assert_eq!(platform.start_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn ensure_responsive_runs_noop_once() {
        let platform = Arc::new(MockPlatform::new().running());
        reconciler(&platform).ensure_responsive(id()).await.unwrap();

        assert_eq!(platform.exec_calls(), 1);
        assert!(platform
            .calls()
            .contains(&Call::Exec(vec!["true".to_owned()])));
    }

    #[tokio::test(start_paused = true)]
    async fn ensure_responsive_fails_on_nonzero_noop() {
        let platform = Arc::new(MockPlatform::new().running().with_exec_always_failing());
        let err = reconciler(&platform).ensure_responsive(id()).await.unwrap_err();

        assert!(matches!(err, ReconcileError::Unresponsive { .. }));
        assert_eq!(platform.exec_calls(), 1);
    }
}
