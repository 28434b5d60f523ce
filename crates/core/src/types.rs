//! 도메인 타입: 컨테이너 식별자, 상태, 명령
//!
//! 모든 크레이트가 공유하는 값 타입을 정의합니다.
//! 원시 문자열은 이 모듈의 생성자를 통과해야만 도메인 타입이 됩니다.

use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ArgumentError;

/// 컨테이너 식별자
///
/// 플랫폼이 부여한 양의 정수입니다. 존재 여부는 검증하지 않습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerId(NonZeroU32);

impl ContainerId {
    /// 정수 값에서 식별자를 생성합니다. 0은 거부됩니다.
    pub fn new(raw: u32) -> Result<Self, ArgumentError> {
        NonZeroU32::new(raw)
            .map(Self)
            .ok_or_else(|| ArgumentError::new("container_id", "must be a positive integer"))
    }

    /// 문자열에서 식별자를 파싱합니다.
    ///
    /// 빈 문자열, 숫자가 아닌 값, 0은 모두 `ArgumentError`입니다.
    pub fn parse(raw: &str) -> Result<Self, ArgumentError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ArgumentError::new("container_id", "container id is required"));
        }
        let value = trimmed.parse::<u32>().map_err(|_| {
            ArgumentError::new(
                "container_id",
                format!("'{trimmed}' is not a positive integer"),
            )
        })?;
        Self::new(value)
    }

    /// 정수 값을 반환합니다.
    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl FromStr for ContainerId {
    type Err = ArgumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 컨테이너 생명주기 상태
///
/// 매 조회마다 새로 얻으며 하나의 작업 범위를 넘어 캐시하지 않습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerStatus {
    /// 조회 실패 또는 알 수 없는 출력
    #[default]
    Unknown,
    /// 정지됨
    Stopped,
    /// 실행 중
    Running,
}

impl ContainerStatus {
    /// `pct status` 출력(`status: running`)을 해석합니다.
    ///
    /// 인식할 수 없는 출력은 `Unknown`이 됩니다.
    pub fn from_status_output(output: &str) -> Self {
        for line in output.lines() {
            let line = line.trim();
            let value = line.strip_prefix("status:").map(str::trim).unwrap_or(line);
            match value.to_ascii_lowercase().as_str() {
                "running" => return Self::Running,
                "stopped" => return Self::Stopped,
                _ => {}
            }
        }
        Self::Unknown
    }

    /// Running 상태인지 여부
    pub fn is_running(self) -> bool {
        self == Self::Running
    }
}

impl fmt::Display for ContainerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Stopped => write!(f, "stopped"),
            Self::Running => write!(f, "running"),
        }
    }
}

/// 컨테이너 안에서 실행할 명령
///
/// 인자 순서를 보존하며 비어 있을 수 없습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct CommandLine(Vec<String>);

impl CommandLine {
    /// 인자 목록에서 명령을 생성합니다.
    ///
    /// 인자가 없거나 프로그램 이름이 비어 있으면 `ArgumentError`를 반환합니다.
    pub fn new<I, S>(args: I) -> Result<Self, ArgumentError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        match args.first() {
            None => Err(ArgumentError::new("command", "command must not be empty")),
            Some(program) if program.trim().is_empty() => Err(ArgumentError::new(
                "command",
                "program name must not be blank",
            )),
            Some(_) => Ok(Self(args)),
        }
    }

    /// 실행할 프로그램
    pub fn program(&self) -> &str {
        &self.0[0]
    }

    /// 전체 인자 목록 (프로그램 포함)
    pub fn args(&self) -> &[String] {
        &self.0
    }
}

impl TryFrom<Vec<String>> for CommandLine {
    type Error = ArgumentError;

    fn try_from(value: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CommandLine> for Vec<String> {
    fn from(value: CommandLine) -> Self {
        value.0
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(" "))
    }
}
