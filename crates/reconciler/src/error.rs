//! 조정기 에러 타입
//!
//! [`ReconcileError`]는 상태 조정, 명령 실행, 권한 전환에서 발생하는 모든 에러를 표현합니다.
//! `From<ReconcileError> for LxcwardError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.

use lxcward_core::error::{ArgumentError, ContainerError, LxcwardError};
use lxcward_core::types::{ContainerId, ContainerStatus};

/// 조정기 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// 누락되었거나 형식이 잘못된 입력 (재시도하지 않음)
    #[error(transparent)]
    InvalidArgument(#[from] ArgumentError),

    /// 플랫폼 호출 실패
    ///
    /// 재시도 예산 안에서는 [`Retrier`](crate::retry::Retrier)가 흡수합니다.
    #[error("{operation} failed for container {container_id}: {reason}")]
    Transient {
        /// 실패한 작업명 (status, start, stop, exec, ...)
        operation: String,
        /// 대상 컨테이너
        container_id: ContainerId,
        /// 실패 사유
        reason: String,
    },

    /// 시작 후 안정화 대기를 거쳐도 Running이 아님
    #[error("container {container_id} failed to stabilize after start (status: {status})")]
    Stabilization {
        /// 대상 컨테이너
        container_id: ContainerId,
        /// 마지막으로 관측한 상태
        status: ContainerStatus,
    },

    /// 모든 시도 소진
    #[error("{operation} exhausted {attempts} attempt(s) for container {container_id}: {last_error}")]
    RetryExhausted {
        /// 작업명
        operation: String,
        /// 대상 컨테이너
        container_id: ContainerId,
        /// 수행한 시도 횟수
        attempts: u32,
        /// 마지막 시도의 실패 사유
        last_error: String,
    },

    /// 컨테이너가 no-op 명령에 응답하지 않음
    #[error("container {container_id} is unresponsive: {reason}")]
    Unresponsive {
        /// 대상 컨테이너
        container_id: ContainerId,
        /// 사유
        reason: String,
    },

    /// 컨테이너 설정 파일 읽기/쓰기 실패
    #[error("config file error for container {container_id}: {reason}")]
    ConfigFile {
        /// 대상 컨테이너
        container_id: ContainerId,
        /// 사유
        reason: String,
    },

    /// 조정기 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },
}

impl ReconcileError {
    /// 플랫폼 호출 실패를 생성합니다.
    pub fn transient(
        operation: impl Into<String>,
        container_id: ContainerId,
        reason: impl Into<String>,
    ) -> Self {
        Self::Transient {
            operation: operation.into(),
            container_id,
            reason: reason.into(),
        }
    }

    /// 재시도 대상인지 여부
    ///
    /// 인자 에러와 설정 에러는 다시 시도해도 결과가 같습니다.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::InvalidArgument(_) | Self::Config { .. })
    }
}

impl From<ReconcileError> for LxcwardError {
    fn from(err: ReconcileError) -> Self {
        match err {
            ReconcileError::InvalidArgument(arg) => LxcwardError::InvalidArgument(arg),
            ReconcileError::Transient {
                operation,
                container_id,
                reason,
            } => LxcwardError::Container(ContainerError::Platform {
                operation,
                container_id: container_id.get(),
                reason,
            }),
            ReconcileError::Stabilization {
                container_id,
                status,
            } => LxcwardError::Container(ContainerError::Stabilization {
                container_id: container_id.get(),
                status: status.to_string(),
            }),
            ReconcileError::RetryExhausted {
                operation,
                container_id,
                attempts,
                last_error,
            } => LxcwardError::Container(ContainerError::RetryExhausted {
                operation,
                container_id: container_id.get(),
                attempts,
                reason: last_error,
            }),
            ReconcileError::Unresponsive {
                container_id,
                reason,
            } => LxcwardError::Container(ContainerError::Unresponsive {
                container_id: container_id.get(),
                reason,
            }),
            ReconcileError::ConfigFile {
                container_id,
                reason,
            } => LxcwardError::Container(ContainerError::ConfigFile {
                container_id: container_id.get(),
                reason,
            }),
            ReconcileError::Config { field, reason } => {
                LxcwardError::Config(lxcward_core::error::ConfigError::InvalidValue {
                    field,
                    reason,
                })
            }
        }
    }
}
