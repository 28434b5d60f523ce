//! 설정 관리: lxcward.toml 파싱 및 런타임 설정
//!
//! [`LxcwardConfig`]는 프로세스 시작 시 한 번 생성되어 모든 컴포넌트에
//! 명시적으로 전달됩니다. 생성 이후에는 읽기 전용으로 취급합니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`LXCWARD_RETRY_EXEC_MAX_ATTEMPTS=5` 형식)
//! 3. 설정 파일 (`lxcward.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), lxcward_core::error::LxcwardError> {
//! use lxcward_core::config::LxcwardConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = LxcwardConfig::load("lxcward.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = LxcwardConfig::parse("[retry]\nexec_max_attempts = 5")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, LxcwardError};

/// 설정 상한값 상수
const MAX_ATTEMPTS: u32 = 20;
const MAX_DELAY_SECS: u64 = 600;
const MAX_COMMAND_TIMEOUT_SECS: u64 = 3600;
const MAX_START_TIMEOUT_SECS: u64 = 86_400;

/// lxcward 통합 설정
///
/// `lxcward.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LxcwardConfig {
    /// 일반 설정 (로그)
    #[serde(default)]
    pub general: GeneralConfig,
    /// 플랫폼(`pct`) 설정
    #[serde(default)]
    pub platform: PlatformConfig,
    /// 재시도 정책
    #[serde(default)]
    pub retry: RetryConfig,
    /// 권한 전환 정책
    #[serde(default)]
    pub privilege: PrivilegeConfig,
}

impl LxcwardConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, LxcwardError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, LxcwardError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LxcwardError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                LxcwardError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// 기본값에 환경변수 오버라이드만 적용한 설정을 생성합니다.
    ///
    /// 설정 파일이 없는 호스트에서 사용합니다.
    pub fn from_env() -> Result<Self, LxcwardError> {
        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, LxcwardError> {
        toml::from_str(toml_str).map_err(|e| {
            LxcwardError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `LXCWARD_{SECTION}_{FIELD}`
    /// 예: `LXCWARD_PRIVILEGE_ALLOW_PROTECTED=true`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "LXCWARD_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "LXCWARD_GENERAL_LOG_FORMAT");
        override_string(&mut self.general.log_file, "LXCWARD_GENERAL_LOG_FILE");

        // Platform
        override_string(&mut self.platform.pct_path, "LXCWARD_PLATFORM_PCT_PATH");
        override_string(&mut self.platform.config_dir, "LXCWARD_PLATFORM_CONFIG_DIR");
        override_u64(
            &mut self.platform.command_timeout_secs,
            "LXCWARD_PLATFORM_COMMAND_TIMEOUT_SECS",
        );

        // Retry
        override_u32(
            &mut self.retry.exec_max_attempts,
            "LXCWARD_RETRY_EXEC_MAX_ATTEMPTS",
        );
        override_u64(&mut self.retry.exec_delay_secs, "LXCWARD_RETRY_EXEC_DELAY_SECS");
        override_u32(
            &mut self.retry.start_max_attempts,
            "LXCWARD_RETRY_START_MAX_ATTEMPTS",
        );
        override_u64(
            &mut self.retry.start_delay_secs,
            "LXCWARD_RETRY_START_DELAY_SECS",
        );
        override_u32(
            &mut self.retry.stop_max_attempts,
            "LXCWARD_RETRY_STOP_MAX_ATTEMPTS",
        );
        override_u64(&mut self.retry.stop_delay_secs, "LXCWARD_RETRY_STOP_DELAY_SECS");
        override_u64(
            &mut self.retry.stabilization_secs,
            "LXCWARD_RETRY_STABILIZATION_SECS",
        );

        // Privilege
        override_bool(
            &mut self.privilege.allow_protected,
            "LXCWARD_PRIVILEGE_ALLOW_PROTECTED",
        );
        override_u32_csv(
            &mut self.privilege.protected_ids,
            "LXCWARD_PRIVILEGE_PROTECTED_IDS",
        );
        override_string(
            &mut self.privilege.apparmor_profile,
            "LXCWARD_PRIVILEGE_APPARMOR_PROFILE",
        );
        override_u64(
            &mut self.privilege.start_timeout_secs,
            "LXCWARD_PRIVILEGE_START_TIMEOUT_SECS",
        );
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), LxcwardError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        if self.platform.pct_path.trim().is_empty() {
            return Err(invalid("platform.pct_path", "must not be empty"));
        }
        if self.platform.config_dir.trim().is_empty() {
            return Err(invalid("platform.config_dir", "must not be empty"));
        }
        if self.platform.command_timeout_secs == 0
            || self.platform.command_timeout_secs > MAX_COMMAND_TIMEOUT_SECS
        {
            return Err(invalid(
                "platform.command_timeout_secs",
                format!("must be 1-{MAX_COMMAND_TIMEOUT_SECS}"),
            ));
        }

        let attempts = [
            ("retry.exec_max_attempts", self.retry.exec_max_attempts),
            ("retry.start_max_attempts", self.retry.start_max_attempts),
            ("retry.stop_max_attempts", self.retry.stop_max_attempts),
        ];
        for (field, value) in attempts {
            if value == 0 || value > MAX_ATTEMPTS {
                return Err(invalid(field, format!("must be 1-{MAX_ATTEMPTS}")));
            }
        }

        let delays = [
            ("retry.exec_delay_secs", self.retry.exec_delay_secs),
            ("retry.start_delay_secs", self.retry.start_delay_secs),
            ("retry.stop_delay_secs", self.retry.stop_delay_secs),
            ("retry.stabilization_secs", self.retry.stabilization_secs),
        ];
        for (field, value) in delays {
            if value > MAX_DELAY_SECS {
                return Err(invalid(field, format!("must be 0-{MAX_DELAY_SECS}")));
            }
        }

        for range in &self.privilege.advisory_ranges {
            if range.start == 0 || range.start > range.end {
                return Err(invalid(
                    "privilege.advisory_ranges",
                    format!("invalid range {}-{}", range.start, range.end),
                ));
            }
        }

        if self.privilege.protected_ids.contains(&0) {
            return Err(invalid(
                "privilege.protected_ids",
                "container ids must be positive",
            ));
        }

        let profile = self.privilege.apparmor_profile.trim();
        if profile.is_empty() || profile.contains('\n') {
            return Err(invalid(
                "privilege.apparmor_profile",
                "must be a single non-empty line",
            ));
        }

        if self.privilege.start_timeout_secs == 0
            || self.privilege.start_timeout_secs > MAX_START_TIMEOUT_SECS
        {
            return Err(invalid(
                "privilege.start_timeout_secs",
                format!("must be 1-{MAX_START_TIMEOUT_SECS}"),
            ));
        }

        if self
            .privilege
            .noop_command
            .first()
            .is_none_or(|program| program.trim().is_empty())
        {
            return Err(invalid("privilege.noop_command", "must not be empty"));
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> LxcwardError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason: reason.into(),
    }
    .into()
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
    /// 로그 파일 경로 (비어 있으면 stderr)
    pub log_file: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
            log_file: String::new(),
        }
    }
}

/// 플랫폼 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// `pct` 실행 파일 경로
    pub pct_path: String,
    /// 컨테이너 설정 파일 디렉토리 (`<id>.conf`)
    pub config_dir: String,
    /// 플랫폼 명령 1회 타임아웃 (초)
    pub command_timeout_secs: u64,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            pct_path: "/usr/sbin/pct".to_owned(),
            config_dir: "/etc/pve/lxc".to_owned(),
            command_timeout_secs: 120,
        }
    }
}

/// 재시도 정책 설정
///
/// 호출 지점별로 고정된 정책을 가집니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// 명령 실행 최대 시도 횟수
    pub exec_max_attempts: u32,
    /// 명령 실행 재시도 간격 (초)
    pub exec_delay_secs: u64,
    /// 컨테이너 시작 최대 시도 횟수
    pub start_max_attempts: u32,
    /// 컨테이너 시작 재시도 간격 (초)
    pub start_delay_secs: u64,
    /// 컨테이너 정지 최대 시도 횟수
    pub stop_max_attempts: u32,
    /// 컨테이너 정지 재시도 간격 (초)
    pub stop_delay_secs: u64,
    /// 시작 직후 안정화 대기 시간 (초)
    pub stabilization_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            exec_max_attempts: 3,
            exec_delay_secs: 10,
            start_max_attempts: 5,
            start_delay_secs: 5,
            stop_max_attempts: 3,
            stop_delay_secs: 10,
            stabilization_secs: 10,
        }
    }
}

/// 컨테이너 ID 범위 (양 끝 포함)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdRange {
    /// 시작 ID
    pub start: u32,
    /// 끝 ID
    pub end: u32,
}

impl IdRange {
    /// ID가 범위에 포함되는지 여부
    pub fn contains(&self, id: u32) -> bool {
        (self.start..=self.end).contains(&id)
    }
}

/// 권한 전환 정책 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrivilegeConfig {
    /// 보호 대상 컨테이너도 전환할지 여부
    pub allow_protected: bool,
    /// 기본적으로 건너뛰는 컨테이너 ID
    pub protected_ids: Vec<u32>,
    /// 경고를 남기고 진행하는 ID 범위
    pub advisory_ranges: Vec<IdRange>,
    /// 경고 범위에 해당할 때 남기는 메시지
    pub advisory_message: String,
    /// 적용할 AppArmor 프로파일
    pub apparmor_profile: String,
    /// 시작 타임아웃 (초)
    pub start_timeout_secs: u64,
    /// 응답성 확인용 no-op 명령
    pub noop_command: Vec<String>,
}

impl Default for PrivilegeConfig {
    fn default() -> Self {
        Self {
            allow_protected: false,
            protected_ids: vec![999],
            advisory_ranges: vec![IdRange {
                start: 900,
                end: 998,
            }],
            advisory_message: "agent container may need GPU device passthrough configured"
                .to_owned(),
            apparmor_profile: "unconfined".to_owned(),
            start_timeout_secs: 300,
            noop_command: vec!["true".to_owned()],
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_u32(target: &mut u32, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u32>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u32 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

fn override_u32_csv(target: &mut Vec<u32>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        let parsed: Result<Vec<u32>, _> = val
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::parse::<u32>)
            .collect();
        match parsed {
            Ok(ids) => *target = ids,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse id list from env var, ignoring"
            ),
        }
    }
}
