//! 고정 지연 재시도 실행기
//!
//! [`Retrier`]는 작업을 최대 `max_attempts`번 호출하고, 실패 사이에만
//! `inter_attempt_delay`만큼 대기합니다. 마지막 실패 뒤에는 대기하지 않습니다.
//!
//! # 사용 예시
//!
//! ```ignore
//! let retrier = Retrier::new(policies.start);
//! let platform = &*self.platform;
//! retrier.run("start", id, move |_| platform.start(id)).await?;
//! ```

use std::future::Future;
use std::time::Duration;

use metrics::counter;
use tracing::{debug, warn};

use lxcward_core::config::RetryConfig;
use lxcward_core::metrics::{LABEL_OPERATION, PLATFORM_RETRIES_TOTAL};
use lxcward_core::types::ContainerId;

use crate::error::ReconcileError;

/// 재시도 정책
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 최대 시도 횟수 (1 이상)
    pub max_attempts: u32,
    /// 실패 사이 대기 시간
    pub inter_attempt_delay: Duration,
    /// 시작 후 상태 재확인 전 대기 시간
    pub stabilization_delay: Duration,
}

impl RetryPolicy {
    /// 새 정책을 생성합니다.
    ///
    /// # Errors
    ///
    /// `max_attempts`가 0이면 `ReconcileError::Config`를 반환합니다.
    pub fn new(
        max_attempts: u32,
        inter_attempt_delay: Duration,
        stabilization_delay: Duration,
    ) -> Result<Self, ReconcileError> {
        if max_attempts == 0 {
            return Err(ReconcileError::Config {
                field: "max_attempts".to_owned(),
                reason: "must be at least 1".to_owned(),
            });
        }
        Ok(Self {
            max_attempts,
            inter_attempt_delay,
            stabilization_delay,
        })
    }
}

/// 호출 지점별 재시도 정책 묶음
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicies {
    /// 컨테이너 내부 명령 실행 (기본 3회 / 10초 / 안정화 10초)
    pub exec: RetryPolicy,
    /// 조정 중 컨테이너 시작 (기본 5회 / 5초)
    pub start: RetryPolicy,
    /// 권한 전환 사이클의 정지 (기본 3회 / 10초)
    pub stop: RetryPolicy,
}

impl RetryPolicies {
    /// `[retry]` 설정 섹션에서 정책을 만듭니다.
    pub fn from_config(config: &RetryConfig) -> Result<Self, ReconcileError> {
        let stabilization = Duration::from_secs(config.stabilization_secs);
        Ok(Self {
            exec: RetryPolicy::new(
                config.exec_max_attempts,
                Duration::from_secs(config.exec_delay_secs),
                stabilization,
            )
            .map_err(|e| rename_field(e, "retry.exec_max_attempts"))?,
            start: RetryPolicy::new(
                config.start_max_attempts,
                Duration::from_secs(config.start_delay_secs),
                stabilization,
            )
            .map_err(|e| rename_field(e, "retry.start_max_attempts"))?,
            stop: RetryPolicy::new(
                config.stop_max_attempts,
                Duration::from_secs(config.stop_delay_secs),
                Duration::ZERO,
            )
            .map_err(|e| rename_field(e, "retry.stop_max_attempts"))?,
        })
    }
}

impl Default for RetryPolicies {
    fn default() -> Self {
        let stabilization = Duration::from_secs(10);
        Self {
            exec: RetryPolicy {
                max_attempts: 3,
                inter_attempt_delay: Duration::from_secs(10),
                stabilization_delay: stabilization,
            },
            start: RetryPolicy {
                max_attempts: 5,
                inter_attempt_delay: Duration::from_secs(5),
                stabilization_delay: stabilization,
            },
            stop: RetryPolicy {
                max_attempts: 3,
                inter_attempt_delay: Duration::from_secs(10),
                stabilization_delay: Duration::ZERO,
            },
        }
    }
}

fn rename_field(err: ReconcileError, field: &str) -> ReconcileError {
    match err {
        ReconcileError::Config { reason, .. } => ReconcileError::Config {
            field: field.to_owned(),
            reason,
        },
        other => other,
    }
}

/// 재시도 실행기
#[derive(Debug, Clone, Copy)]
pub struct Retrier {
    policy: RetryPolicy,
}

impl Retrier {
    /// 정책으로 실행기를 생성합니다.
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// 적용 중인 정책
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// 작업을 재시도하며 실행합니다.
    ///
    /// `action`은 1부터 시작하는 시도 번호를 받습니다.
    /// 첫 성공을 즉시 반환하고, 재시도 불가능한 에러는 그대로 전파합니다.
    ///
    /// # Errors
    ///
    /// 모든 시도가 실패하면 마지막 에러를 담은 `ReconcileError::RetryExhausted`를 반환합니다.
    pub async fn run<T, F, Fut>(
        &self,
        operation: &str,
        id: ContainerId,
        mut action: F,
    ) -> Result<T, ReconcileError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ReconcileError>>,
    {
        let max_attempts = self.policy.max_attempts;
        let mut last_error = String::from("no attempt made");

        for attempt in 1..=max_attempts {
            debug!(container_id = %id, operation, attempt, max_attempts, "attempting");

            match action(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => {
                    warn!(
                        container_id = %id,
                        operation,
                        attempt,
                        max_attempts,
                        error = %e,
                        "attempt failed"
                    );
                    last_error = e.to_string();
                }
            }

            if attempt < max_attempts {
                counter!(PLATFORM_RETRIES_TOTAL, LABEL_OPERATION => operation.to_owned())
                    .increment(1);
                tokio::time::sleep(self.policy.inter_attempt_delay).await;
            }
        }

        Err(ReconcileError::RetryExhausted {
            operation: operation.to_owned(),
            container_id: id,
            attempts: max_attempts,
            last_error,
        })
    }
}
