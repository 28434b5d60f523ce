//! 에러 타입: 도메인별 에러 정의

/// lxcward 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum LxcwardError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 필수 인자 누락 또는 형식 오류
    #[error("{0}")]
    InvalidArgument(#[from] ArgumentError),

    /// 컨테이너 조정(reconcile) 에러
    #[error("container error: {0}")]
    Container(#[from] ContainerError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 인자 에러
///
/// 재시도 대상이 아닙니다. 누락되었거나 형식이 잘못된 입력을 나타냅니다.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid argument '{field}': {reason}")]
pub struct ArgumentError {
    /// 문제가 된 인자 이름
    pub field: String,
    /// 거부 사유
    pub reason: String,
}

impl ArgumentError {
    /// 새 인자 에러를 생성합니다.
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// 컨테이너 조정 에러
///
/// 재시도 예산을 모두 소진했거나 되돌릴 수 없는 실패를 나타냅니다.
/// 모든 variant는 컨테이너 ID를 포함합니다.
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    /// 플랫폼 호출 실패 (재시도 예산 내에서는 흡수됨)
    #[error("{operation} failed for container {container_id}: {reason}")]
    Platform {
        operation: String,
        container_id: u32,
        reason: String,
    },

    /// 재시도 소진
    #[error("{operation} exhausted {attempts} attempt(s) for container {container_id}: {reason}")]
    RetryExhausted {
        operation: String,
        container_id: u32,
        attempts: u32,
        reason: String,
    },

    /// 시작 후 Running 상태에 도달하지 못함
    #[error("container {container_id} failed to stabilize (status: {status})")]
    Stabilization { container_id: u32, status: String },

    /// 컨테이너가 명령에 응답하지 않음
    #[error("container {container_id} is unresponsive: {reason}")]
    Unresponsive { container_id: u32, reason: String },

    /// 컨테이너 설정 파일 읽기/쓰기 실패
    #[error("config file error for container {container_id}: {reason}")]
    ConfigFile { container_id: u32, reason: String },
}
