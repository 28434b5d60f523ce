//! 검증 계층 -- 상태 없는 술어 검사
//!
//! 모든 검사는 [`Validity`]를 반환하며 재시도하지 않습니다.
//! 원시 문자열 식별자를 받는 검사는 파싱 실패 시 `InvalidArgument`를 반환합니다.
//!
//! # 검사 목록
//!
//! - 컨테이너 존재 (`pct config <id>` 성공 여부)
//! - 컨테이너 실행 중 (상태 조회 == Running)
//! - GPU 할당 문자열 (`none`, `all`, 쉼표로 구분한 정수)
//! - 컨테이너 내부 경로 존재 (`test -e <path>` 한 번)
//! - JSON 문법 / JSON 스키마 적합성

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use lxcward_core::types::{CommandLine, ContainerId};

use crate::error::ReconcileError;
use crate::exec::CommandExecutor;
use crate::platform::Platform;
use crate::probe::StatusProbe;

/// 검사 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "validity", content = "reason", rename_all = "snake_case")]
pub enum Validity {
    /// 유효
    Valid,
    /// 유효하지 않음
    Invalid(String),
    /// 입력 자체가 잘못됨
    InvalidArgument(String),
}

impl Validity {
    /// 유효한지 여부
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

impl fmt::Display for Validity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Valid => write!(f, "valid"),
            Self::Invalid(reason) => write!(f, "invalid: {reason}"),
            Self::InvalidArgument(reason) => write!(f, "invalid argument: {reason}"),
        }
    }
}

/// GPU 할당 문자열을 검사합니다.
///
/// `none`, `all`, 또는 `0`, `0,1` 처럼 쉼표로 구분한 음이 아닌 정수만 허용합니다.
/// 공백은 허용하지 않습니다.
pub fn gpu_assignment(value: &str) -> Validity {
    if value.is_empty() {
        return Validity::Invalid("GPU assignment is empty".to_owned());
    }
    if value == "none" || value == "all" {
        return Validity::Valid;
    }

    let well_formed = value
        .split(',')
        .all(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()));
    if well_formed {
        Validity::Valid
    } else {
        Validity::Invalid(format!(
            "'{value}' is not 'none', 'all' or a comma-separated list of GPU indices"
        ))
    }
}

/// JSON 파일의 문법을 검사합니다.
pub async fn json_syntax(path: &Path) -> Validity {
    match read_json(path).await {
        Ok(_) => Validity::Valid,
        Err(reason) => Validity::Invalid(reason),
    }
}

/// JSON 문서가 스키마를 만족하는지 검사합니다.
///
/// 스키마 파일을 읽거나 컴파일할 수 없으면 `InvalidArgument`입니다.
pub async fn json_schema(document: &Path, schema: &Path) -> Validity {
    let schema_value = match read_json(schema).await {
        Ok(value) => value,
        Err(reason) => return Validity::InvalidArgument(format!("schema: {reason}")),
    };
    let validator = match jsonschema::validator_for(&schema_value) {
        Ok(validator) => validator,
        Err(e) => {
            return Validity::InvalidArgument(format!(
                "schema {} does not compile: {e}",
                schema.display()
            ));
        }
    };

    let instance = match read_json(document).await {
        Ok(value) => value,
        Err(reason) => return Validity::Invalid(reason),
    };

    let errors: Vec<String> = validator
        .iter_errors(&instance)
        .map(|e| e.to_string())
        .collect();
    if errors.is_empty() {
        Validity::Valid
    } else {
        Validity::Invalid(errors.join("; "))
    }
}

async fn read_json(path: &Path) -> Result<Value, String> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    serde_json::from_str(&text).map_err(|e| format!("{} is not valid JSON: {e}", path.display()))
}

/// 플랫폼을 사용하는 검사 모음
pub struct ValidationLayer<P: Platform> {
    platform: Arc<P>,
    probe: StatusProbe<P>,
    executor: Arc<CommandExecutor<P>>,
}

impl<P: Platform> ValidationLayer<P> {
    /// 새 검증 계층을 생성합니다.
    pub fn new(platform: Arc<P>, executor: Arc<CommandExecutor<P>>) -> Self {
        Self {
            probe: StatusProbe::new(Arc::clone(&platform)),
            platform,
            executor,
        }
    }

    /// 컨테이너가 존재하는지 검사합니다.
    pub async fn container_exists(&self, raw_id: &str) -> Validity {
        let id = match ContainerId::parse(raw_id) {
            Ok(id) => id,
            Err(e) => return Validity::InvalidArgument(e.to_string()),
        };
        match self.platform.query_config(id).await {
            Ok(_) => Validity::Valid,
            Err(e) => {
                debug!(container_id = %id, error = %e, "config query failed");
                Validity::Invalid(format!("container {id} does not exist"))
            }
        }
    }

    /// 컨테이너가 실행 중인지 검사합니다.
    pub async fn container_running(&self, raw_id: &str) -> Validity {
        let id = match ContainerId::parse(raw_id) {
            Ok(id) => id,
            Err(e) => return Validity::InvalidArgument(e.to_string()),
        };
        let status = self.probe.status(id).await;
        if status.is_running() {
            Validity::Valid
        } else {
            Validity::Invalid(format!("container {id} is {status}"))
        }
    }

    /// GPU 할당 문자열을 검사합니다.
    pub fn gpu_assignment(&self, value: &str) -> Validity {
        gpu_assignment(value)
    }

    /// 컨테이너 안에 경로가 존재하는지 검사합니다.
    ///
    /// 컨테이너가 Running이 아니면 먼저 시작합니다.
    pub async fn path_exists(&self, raw_id: &str, path: &str) -> Validity {
        let id = match ContainerId::parse(raw_id) {
            Ok(id) => id,
            Err(e) => return Validity::InvalidArgument(e.to_string()),
        };
        if path.trim().is_empty() {
            return Validity::InvalidArgument("path is required".to_owned());
        }
        let command = match CommandLine::new(["test", "-e", path]) {
            Ok(command) => command,
            Err(e) => return Validity::InvalidArgument(e.to_string()),
        };

        match self.executor.exec_once(id, &command).await {
            Ok(output) if output.success() => Validity::Valid,
            Ok(_) => Validity::Invalid(format!("{path} does not exist in container {id}")),
            Err(ReconcileError::InvalidArgument(e)) => Validity::InvalidArgument(e.to_string()),
            Err(e) => Validity::Invalid(e.to_string()),
        }
    }

    /// JSON 파일의 문법을 검사합니다.
    pub async fn json_syntax(&self, path: &Path) -> Validity {
        json_syntax(path).await
    }

    /// JSON 문서가 스키마를 만족하는지 검사합니다.
    pub async fn json_schema(&self, document: &Path, schema: &Path) -> Validity {
        json_schema(document, schema).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::LifecycleReconciler;
    use crate::platform::MockPlatform;
    use crate::retry::RetryPolicies;

    fn layer(platform: &Arc<MockPlatform>) -> ValidationLayer<MockPlatform> {
        let policies = RetryPolicies::default();
        let lifecycle = Arc::new(LifecycleReconciler::new(
            Arc::clone(platform),
            policies.start,
            CommandLine::new(["true"]).unwrap(),
        ));
        let executor = Arc::new(CommandExecutor::new(
            Arc::clone(platform),
            lifecycle,
            policies.exec,
        ));
        ValidationLayer::new(Arc::clone(platform), executor)
    }

    #[test]
    fn gpu_valid_values() {
        for value in ["0", "1", "0,1", "all", "none", "10,2,3"] {
            assert_eq!(gpu_assignment(value), Validity::Valid, "{value}");
        }
    }

    #[test]
    fn gpu_invalid_values() {
        for value in ["", "x", "0,", ",0", "0,,1", "-1", "0, 1", "ALL", " 0"] {
            assert!(!gpu_assignment(value).is_valid(), "{value:?}");
        }
    }

    #[tokio::test]
    async fn exists_when_config_query_succeeds() {
        let platform = Arc::new(MockPlatform::new());
        assert_eq!(layer(&platform).container_exists("101").await, Validity::Valid);
    }

    #[tokio::test]
    async fn missing_container_is_invalid() {
        let platform = Arc::new(MockPlatform::new().missing());
        assert!(matches!(
            layer(&platform).container_exists("101").await,
            Validity::Invalid(_)
        ));
    }

    #[tokio::test]
    async fn empty_id_is_invalid_argument() {
        let platform = Arc::new(MockPlatform::new());
        let layer = layer(&platform);
        assert!(matches!(layer.container_exists("").await, Validity::InvalidArgument(_)));
        assert!(matches!(layer.container_running("  ").await, Validity::InvalidArgument(_)));
        assert!(matches!(
            layer.path_exists("", "/opt").await,
            Validity::InvalidArgument(_)
        ));
        assert!(platform.calls().is_empty());
    }

    #[tokio::test]
    async fn running_check_reflects_probe() {
        let running = Arc::new(MockPlatform::new().running());
        assert_eq!(layer(&running).container_running("101").await, Validity::Valid);

        let stopped = Arc::new(MockPlatform::new());
        let result = layer(&stopped).container_running("101").await;
        assert_eq!(result, Validity::Invalid("container 101 is stopped".to_owned()));
        assert_eq!(stopped.start_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn path_exists_runs_single_test_command() {
        let platform = Arc::new(MockPlatform::new().running().with_existing_paths(&["/opt/app"]));
        let layer = layer(&platform);

        assert_eq!(layer.path_exists("101", "/opt/app").await, Validity::Valid);
        assert!(matches!(
            layer.path_exists("101", "/opt/missing").await,
            Validity::Invalid(_)
        ));
        assert_eq!(platform.exec_calls(), 2);
    }

    #[tokio::test]
    async fn empty_path_is_invalid_argument() {
        let platform = Arc::new(MockPlatform::new().running());
        assert!(matches!(
            layer(&platform).path_exists("101", "").await,
            Validity::InvalidArgument(_)
        ));
    }

    #[tokio::test]
    async fn json_syntax_checks_file() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.json");
        let bad = dir.path().join("bad.json");
        std::fs::write(&good, r#"{"gpus": [0, 1]}"#).unwrap();
        std::fs::write(&bad, r#"{"gpus": [0, 1}"#).unwrap();

        assert_eq!(json_syntax(&good).await, Validity::Valid);
        assert!(matches!(json_syntax(&bad).await, Validity::Invalid(_)));
        assert!(matches!(
            json_syntax(&dir.path().join("absent.json")).await,
            Validity::Invalid(_)
        ));
    }

    #[tokio::test]
    async fn json_schema_validates_document() {
        let dir = tempfile::tempdir().unwrap();
        let schema = dir.path().join("schema.json");
        let good = dir.path().join("good.json");
        let bad = dir.path().join("bad.json");
        std::fs::write(
            &schema,
            r#"{"type": "object", "required": ["name"], "properties": {"name": {"type": "string"}}}"#,
        )
        .unwrap();
        std::fs::write(&good, r#"{"name": "agent"}"#).unwrap();
        std::fs::write(&bad, r#"{"name": 5}"#).unwrap();

        assert_eq!(json_schema(&good, &schema).await, Validity::Valid);
        assert!(matches!(json_schema(&bad, &schema).await, Validity::Invalid(_)));
    }

    #[tokio::test]
    async fn uncompilable_schema_is_invalid_argument() {
        let dir = tempfile::tempdir().unwrap();
        let schema = dir.path().join("schema.json");
        let doc = dir.path().join("doc.json");
        std::fs::write(&schema, r#"{"type": 12}"#).unwrap();
        std::fs::write(&doc, "{}").unwrap();

        assert!(matches!(
            json_schema(&doc, &schema).await,
            Validity::InvalidArgument(_)
        ));
    }

    #[tokio::test]
    async fn unreadable_schema_is_invalid_argument() {
        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("doc.json");
        std::fs::write(&doc, "{}").unwrap();

        assert!(matches!(
            json_schema(&doc, &dir.path().join("missing.json")).await,
            Validity::InvalidArgument(_)
        ));
    }
}
