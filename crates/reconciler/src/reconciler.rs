//! 조정기 파사드 -- 구성 요소를 한 번에 조립
//!
//! [`Reconciler`]는 설정에서 만든 재시도 정책과 식별자 정책으로
//! 생명주기 조정기, 명령 실행기, 권한 전환기, 검증 계층을 묶습니다.
//!
//! # 사용 예시
//!
//! ```ignore
//! use lxcward_reconciler::{PctPlatform, ReconcilerBuilder};
//!
//! let reconciler = ReconcilerBuilder::new()
//!     .config(config)
//!     .platform(Arc::new(PctPlatform::from_config(&config.platform)))
//!     .build()?;
//!
//! reconciler.exec_with_retry(id, &command).await?;
//! ```

use std::sync::Arc;

use lxcward_core::config::LxcwardConfig;
use lxcward_core::types::{CommandLine, ContainerId, ContainerStatus};

use crate::error::ReconcileError;
use crate::exec::CommandExecutor;
use crate::lifecycle::{Convergence, LifecycleReconciler};
use crate::persisted::privilege_directives;
use crate::platform::{ExecOutput, PctPlatform, Platform};
use crate::policy::IdentifierPolicy;
use crate::privilege::{PrivilegeConfigurator, PrivilegeOutcome};
use crate::retry::{Retrier, RetryPolicies};
use crate::validation::ValidationLayer;

/// 조정기 파사드
pub struct Reconciler<P: Platform> {
    policies: RetryPolicies,
    lifecycle: Arc<LifecycleReconciler<P>>,
    executor: Arc<CommandExecutor<P>>,
    privilege: PrivilegeConfigurator<P>,
    validation: ValidationLayer<P>,
}

impl Reconciler<PctPlatform> {
    /// 설정으로 `pct` 기반 조정기를 만듭니다.
    pub fn from_config(config: &LxcwardConfig) -> Result<Self, ReconcileError> {
        ReconcilerBuilder::new()
            .config(config.clone())
            .platform(Arc::new(PctPlatform::from_config(&config.platform)))
            .build()
    }
}

impl<P: Platform> Reconciler<P> {
    /// 적용 중인 재시도 정책
    pub fn policies(&self) -> &RetryPolicies {
        &self.policies
    }

    /// 현재 상태를 조회합니다. 실패 시 `Unknown`입니다.
    pub async fn status(&self, id: ContainerId) -> ContainerStatus {
        self.lifecycle.probe().status(id).await
    }

    /// 컨테이너가 Running이 되도록 보장합니다.
    pub async fn ensure_running(&self, id: ContainerId) -> Result<Convergence, ReconcileError> {
        self.lifecycle.ensure_running(id).await
    }

    /// Running을 보장하고 no-op 명령으로 응답을 확인합니다.
    pub async fn ensure_responsive(&self, id: ContainerId) -> Result<Convergence, ReconcileError> {
        self.lifecycle.ensure_responsive(id).await
    }

    /// 명령을 재시도하며 실행합니다.
    pub async fn exec_with_retry(
        &self,
        id: ContainerId,
        command: &CommandLine,
    ) -> Result<ExecOutput, ReconcileError> {
        self.executor.exec_with_retry(id, command).await
    }

    /// 명령을 한 번만 실행합니다.
    pub async fn exec_once(
        &self,
        id: ContainerId,
        command: &CommandLine,
    ) -> Result<ExecOutput, ReconcileError> {
        self.executor.exec_once(id, command).await
    }

    /// 컨테이너를 privileged 모드로 전환합니다.
    pub async fn make_privileged(
        &self,
        id: ContainerId,
    ) -> Result<PrivilegeOutcome, ReconcileError> {
        self.privilege.make_privileged(id).await
    }

    /// 검증 계층
    pub fn validation(&self) -> &ValidationLayer<P> {
        &self.validation
    }

    /// 생명주기 조정기
    pub fn lifecycle(&self) -> &LifecycleReconciler<P> {
        &self.lifecycle
    }

    /// 명령 실행기
    pub fn executor(&self) -> &CommandExecutor<P> {
        &self.executor
    }
}

/// 조정기 빌더
pub struct ReconcilerBuilder<P: Platform> {
    config: LxcwardConfig,
    platform: Option<Arc<P>>,
    identifier_policy: Option<IdentifierPolicy>,
}

impl<P: Platform> ReconcilerBuilder<P> {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self {
            config: LxcwardConfig::default(),
            platform: None,
            identifier_policy: None,
        }
    }

    /// 설정을 지정합니다.
    pub fn config(mut self, config: LxcwardConfig) -> Self {
        self.config = config;
        self
    }

    /// 플랫폼 구현을 지정합니다.
    pub fn platform(mut self, platform: Arc<P>) -> Self {
        self.platform = Some(platform);
        self
    }

    /// `[privilege]` 설정 대신 사용할 식별자 정책을 지정합니다.
    pub fn identifier_policy(mut self, policy: IdentifierPolicy) -> Self {
        self.identifier_policy = Some(policy);
        self
    }

    /// 조정기를 빌드합니다.
    ///
    /// # Errors
    ///
    /// 플랫폼이 지정되지 않았거나, 재시도 정책 또는 no-op 명령이 잘못되면
    /// `ReconcileError::Config`를 반환합니다.
    pub fn build(self) -> Result<Reconciler<P>, ReconcileError> {
        let platform = self.platform.ok_or_else(|| ReconcileError::Config {
            field: "platform".to_owned(),
            reason: "platform must be provided".to_owned(),
        })?;

        let policies = RetryPolicies::from_config(&self.config.retry)?;
        let privilege_config = &self.config.privilege;
        let noop = CommandLine::new(privilege_config.noop_command.iter().cloned()).map_err(|e| {
            ReconcileError::Config {
                field: "privilege.noop_command".to_owned(),
                reason: e.reason,
            }
        })?;

        let lifecycle = Arc::new(LifecycleReconciler::new(
            Arc::clone(&platform),
            policies.start,
            noop,
        ));
        let executor = Arc::new(CommandExecutor::new(
            Arc::clone(&platform),
            Arc::clone(&lifecycle),
            policies.exec,
        ));
        let privilege = PrivilegeConfigurator::new(
            Arc::clone(&platform),
            Arc::clone(&lifecycle),
            Arc::clone(&executor),
            Retrier::new(policies.stop),
            self.identifier_policy
                .unwrap_or_else(|| IdentifierPolicy::from_config(privilege_config)),
            privilege_directives(privilege_config),
        );
        let validation = ValidationLayer::new(platform, Arc::clone(&executor));

        Ok(Reconciler {
            policies,
            lifecycle,
            executor,
            privilege,
            validation,
        })
    }
}

impl<P: Platform> Default for ReconcilerBuilder<P> {
    fn default() -> Self {
        Self::new()
    }
}
