//! 컨테이너 식별자 정책
//!
//! 권한 전환 전에 식별자를 평가합니다.
//! 보호 ID는 override가 없으면 건너뛰고, 권고 범위의 ID는 경고 후 진행합니다.

use lxcward_core::config::{IdRange, PrivilegeConfig};
use lxcward_core::types::ContainerId;

/// 정책 평가 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyDecision {
    /// 그대로 진행
    Proceed,
    /// 경고를 남기고 진행
    Advisory(String),
    /// 변경 없이 건너뜀 (성공으로 취급)
    Skip(String),
}

/// 식별자 정책
#[derive(Debug, Clone, Default)]
pub struct IdentifierPolicy {
    allow_protected: bool,
    protected_ids: Vec<u32>,
    advisory_ranges: Vec<IdRange>,
    advisory_message: String,
}

impl IdentifierPolicy {
    /// `[privilege]` 설정에서 정책을 만듭니다.
    pub fn from_config(config: &PrivilegeConfig) -> Self {
        Self {
            allow_protected: config.allow_protected,
            protected_ids: config.protected_ids.clone(),
            advisory_ranges: config.advisory_ranges.clone(),
            advisory_message: config.advisory_message.clone(),
        }
    }

    /// 제약이 없는 정책
    pub fn permissive() -> Self {
        Self::default()
    }

    /// 식별자를 평가합니다.
    pub fn evaluate(&self, id: ContainerId) -> PolicyDecision {
        let raw = id.get();
        let mut notes = Vec::new();

        if self.protected_ids.contains(&raw) {
            if !self.allow_protected {
                return PolicyDecision::Skip(format!(
                    "container {raw} is protected; set LXCWARD_PRIVILEGE_ALLOW_PROTECTED=true to override"
                ));
            }
            notes.push(format!("container {raw} is protected, proceeding due to override"));
        }

        if self.advisory_ranges.iter().any(|range| range.contains(raw)) {
            notes.push(self.advisory_message.clone());
        }

        if notes.is_empty() {
            PolicyDecision::Proceed
        } else {
            PolicyDecision::Advisory(notes.join("; "))
        }
    }
}
