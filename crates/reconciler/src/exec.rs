//! 재시도 기반 컨테이너 내부 명령 실행
//!
//! [`CommandExecutor`]는 명령 실행 전에 컨테이너를 Running으로 수렴시키고,
//! 실패한 시도 사이마다 상태를 다시 확인합니다. 컨테이너가 중간에 멈췄다면
//! 다음 시도 전에 재시작-안정화를 수행하며, 시도 횟수는 초기화하지 않습니다.

use std::sync::Arc;

use metrics::counter;
use tracing::{debug, error, info, warn};

use lxcward_core::metrics::{EXEC_ATTEMPTS_TOTAL, EXEC_EXHAUSTED_TOTAL, RESTART_ESCALATIONS_TOTAL};
use lxcward_core::types::{CommandLine, ContainerId};

use crate::error::ReconcileError;
use crate::lifecycle::LifecycleReconciler;
use crate::platform::{ExecOutput, Platform};
use crate::retry::RetryPolicy;

/// 명령 실행기
pub struct CommandExecutor<P: Platform> {
    platform: Arc<P>,
    lifecycle: Arc<LifecycleReconciler<P>>,
    policy: RetryPolicy,
}

impl<P: Platform> CommandExecutor<P> {
    /// 새 실행기를 생성합니다.
    pub fn new(
        platform: Arc<P>,
        lifecycle: Arc<LifecycleReconciler<P>>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            platform,
            lifecycle,
            policy,
        }
    }

    /// 명령을 재시도하며 실행합니다.
    ///
    /// 1. 컨테이너를 Running으로 수렴
    /// 2. 최대 `max_attempts`번 시도 (exec 에러 또는 non-zero 종료는 실패)
    /// 3. 남은 시도가 있으면 상태 재확인, Running이 아니면 재시작-안정화
    /// 4. 시도 간 `inter_attempt_delay` 대기
    ///
    /// # Errors
    ///
    /// 모든 시도가 실패하면 명령과 컨테이너를 담은 `RetryExhausted`를 반환합니다.
    /// 수렴 또는 에스컬레이션 실패는 그대로 전파합니다.
    pub async fn exec_with_retry(
        &self,
        id: ContainerId,
        command: &CommandLine,
    ) -> Result<ExecOutput, ReconcileError> {
        self.lifecycle.ensure_running(id).await?;

        let max_attempts = self.policy.max_attempts;
        let mut last_error = String::from("no attempt made");

        for attempt in 1..=max_attempts {
            counter!(EXEC_ATTEMPTS_TOTAL).increment(1);
            debug!(
                container_id = %id,
                command = %command,
                attempt,
                max_attempts,
                "executing command"
            );

            match self.platform.exec(id, command).await {
                Ok(output) if output.success() => {
                    info!(container_id = %id, command = %command, attempt, "command succeeded");
                    return Ok(output);
                }
                Ok(output) => {
                    last_error = format!(
                        "exited with status {}: {}",
                        output.exit_code,
                        output.stderr.trim()
                    );
                }
                Err(e) => last_error = e.to_string(),
            }

            warn!(
                container_id = %id,
                command = %command,
                attempt,
                max_attempts,
                error = %last_error,
                "command attempt failed"
            );

            if attempt < max_attempts {
                let status = self.lifecycle.probe().status(id).await;
                if !status.is_running() {
                    counter!(RESTART_ESCALATIONS_TOTAL).increment(1);
                    warn!(
                        container_id = %id,
                        %status,
                        attempt,
                        "container left running state, restarting before next attempt"
                    );
                    self.lifecycle.restart_and_stabilize(id).await?;
                }
                tokio::time::sleep(self.policy.inter_attempt_delay).await;
            }
        }

        counter!(EXEC_EXHAUSTED_TOTAL).increment(1);
        error!(
            container_id = %id,
            command = %command,
            attempts = max_attempts,
            "command failed after all attempts"
        );
        Err(ReconcileError::RetryExhausted {
            operation: format!("exec '{command}'"),
            container_id: id,
            attempts: max_attempts,
            last_error,
        })
    }

    /// Running을 보장한 뒤 명령을 정확히 한 번 실행합니다.
    ///
    /// 종료 코드와 무관하게 출력을 반환합니다.
    pub async fn exec_once(
        &self,
        id: ContainerId,
        command: &CommandLine,
    ) -> Result<ExecOutput, ReconcileError> {
        self.lifecycle.ensure_running(id).await?;
        counter!(EXEC_ATTEMPTS_TOTAL).increment(1);
        debug!(container_id = %id, command = %command, "executing command once");
        self.platform.exec(id, command).await
    }

    /// no-op 명령을 재시도 실행하여 응답 가능 여부를 확인합니다.
    ///
    /// # Errors
    ///
    /// 재시도 소진 시 `Unresponsive`를 반환합니다.
    pub async fn verify_responsive(&self, id: ContainerId) -> Result<(), ReconcileError> {
        let noop = self.lifecycle.noop_command();
        match self.exec_with_retry(id, noop).await {
            Ok(_) => Ok(()),
            Err(ReconcileError::RetryExhausted { last_error, .. }) => {
                Err(ReconcileError::Unresponsive {
                    container_id: id,
                    reason: format!("'{noop}' never succeeded: {last_error}"),
                })
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use lxcward_core::types::ContainerStatus;

    use super::*;
    use crate::platform::{Call, MockPlatform};
    use crate::retry::RetryPolicies;

    fn id() -> ContainerId {
        ContainerId::new(101).unwrap()
    }

    fn cmd(args: &[&str]) -> CommandLine {
        CommandLine::new(args.iter().copied()).unwrap()
    }

    fn executor(platform: &Arc<MockPlatform>) -> CommandExecutor<MockPlatform> {
        let policies = RetryPolicies::default();
        let lifecycle = Arc::new(LifecycleReconciler::new(
            Arc::clone(platform),
            policies.start,
            cmd(&["true"]),
        ));
        CommandExecutor::new(Arc::clone(platform), lifecycle, policies.exec)
    }

    #[tokio::test(start_paused = true)]
    async fn running_container_executes_once() {
        let platform = Arc::new(MockPlatform::new().running());
        let output = executor(&platform)
            .exec_with_retry(id(), &cmd(&["systemctl", "is-active", "app"]))
            .await
            .unwrap();

        assert!(output.success());
        assert_eq!(platform.exec_calls(), 1);
        assert_eq!(platform.start_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_container_is_started_before_first_exec() {
        let platform = Arc::new(MockPlatform::new());
        executor(&platform)
            .exec_with_retry(id(), &cmd(&["true"]))
            .await
            .unwrap();

        let calls = platform.calls();
        let first_start = calls.iter().position(|c| *c == Call::Start).unwrap();
        let first_exec = calls
            .iter()
            .position(|c| matches!(c, Call::Exec(_)))
            .unwrap();
        assert!(first_start < first_exec);
    }

    #[tokio::test(start_paused = true)]
    async fn always_failing_command_gets_exactly_three_attempts() {
        let platform = Arc::new(MockPlatform::new().running().with_exec_always_failing());
        let err = executor(&platform)
            .exec_with_retry(id(), &cmd(&["false"]))
            .await
            .unwrap_err();

        assert_eq!(platform.exec_calls(), 3);
        assert_eq!(platform.start_calls(), 0);
        match err {
            ReconcileError::RetryExhausted {
                operation,
                container_id,
                attempts,
                ..
            } => {
                assert_eq!(operation, "exec 'false'");
                assert_eq!(container_id, id());
                assert_eq!(attempts, 3);
            }
            other => panic!("expected RetryExhausted, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_on_second_attempt() {
        let platform = Arc::new(MockPlatform::new().running().with_exec_failures(1));
        executor(&platform)
            .exec_with_retry(id(), &cmd(&["true"]))
            .await
            .unwrap();
        assert_eq!(platform.exec_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn crash_mid_retry_escalates_once_without_resetting_attempts() {
        let platform = Arc::new(
            MockPlatform::new()
                .running()
                .with_exec_always_failing()
                .with_crash_on_failed_exec(1),
        );
        let err = executor(&platform)
            .exec_with_retry(id(), &cmd(&["false"]))
            .await
            .unwrap_err();

        assert!(matches!(err, ReconcileError::RetryExhausted { attempts: 3, .. }));
        assert_eq!(platform.exec_calls(), 3);
        assert_eq!(platform.start_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn late_crash_restart_keeps_attempt_count() {
        // 두 번째 실패에서 정지 -> 재시작 후 시도는 3회차로 계속됨
        let platform = Arc::new(
            MockPlatform::new()
                .running()
                .with_exec_always_failing()
                .with_crash_on_failed_exec(2),
        );
        let err = executor(&platform)
            .exec_with_retry(id(), &cmd(&["false"]))
            .await
            .unwrap_err();

        assert!(matches!(err, ReconcileError::RetryExhausted { attempts: 3, .. }));
        assert_eq!(platform.exec_calls(), 3);
        assert_eq!(platform.start_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn late_crash_then_success_on_last_attempt() {
        let platform = Arc::new(
            MockPlatform::new()
                .running()
                .with_exec_failures(2)
                .with_crash_on_failed_exec(2),
        );
        executor(&platform)
            .exec_with_retry(id(), &cmd(&["hostname"]))
            .await
            .unwrap();

        assert_eq!(platform.exec_calls(), 3);
        assert_eq!(platform.start_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_status_failure_on_running_container_does_not_abort() {
        let platform = Arc::new(
            MockPlatform::new()
                .running()
                .with_status_script(vec![ContainerStatus::Unknown]),
        );
        executor(&platform)
            .exec_with_retry(id(), &cmd(&["hostname"]))
            .await
            .unwrap();

        assert_eq!(platform.start_calls(), 1);
        assert_eq!(platform.exec_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn escalation_failure_is_terminal() {
        let platform = Arc::new(
            MockPlatform::new()
                .running()
                .with_exec_always_failing()
                .with_crash_on_failed_exec(1)
                .with_start_never_running(),
        );
        let err = executor(&platform)
            .exec_with_retry(id(), &cmd(&["false"]))
            .await
            .unwrap_err();

        assert!(matches!(err, ReconcileError::Stabilization { .. }));
        assert_eq!(platform.exec_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn waits_between_attempts_only() {
        let platform = Arc::new(MockPlatform::new().running().with_exec_always_failing());
        let start = tokio::time::Instant::now();
        let _ = executor(&platform)
            .exec_with_retry(id(), &cmd(&["false"]))
            .await;
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(20) && elapsed < Duration::from_secs(21));
    }

    #[tokio::test(start_paused = true)]
    async fn exec_once_returns_nonzero_output() {
        let platform = Arc::new(MockPlatform::new().running());
        let output = executor(&platform)
            .exec_once(id(), &cmd(&["test", "-e", "/missing"]))
            .await
            .unwrap();

        assert_eq!(output.exit_code, 1);
        assert_eq!(platform.exec_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn verify_responsive_maps_exhaustion_to_unresponsive() {
        let platform = Arc::new(MockPlatform::new().running().with_exec_always_failing());
        let err = executor(&platform).verify_responsive(id()).await.unwrap_err();
        assert!(matches!(err, ReconcileError::Unresponsive { .. }));
    }
}
