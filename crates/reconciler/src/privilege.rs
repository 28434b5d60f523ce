//! 권한 전환 -- 컨테이너를 privileged 모드로 멱등하게 전환
//!
//! # 사이클
//!
//! 1. 식별자 정책 평가 (보호 ID는 건너뜀, 권고 범위는 경고)
//! 2. stop (Retrier, 기본 3회 / 10초)
//! 3. 영속 설정에 지시문 적용 (바뀐 경우에만 쓰기)
//! 4. 재시작-안정화 (Retrier, 기본 5회 / 5초)
//! 5. no-op 명령으로 응답 확인
//!
//! 부분적으로 적용된 설정 변경은 롤백하지 않습니다.

use std::sync::Arc;

use metrics::counter;
use serde::Serialize;
use tracing::{debug, info, warn};

use lxcward_core::metrics::{CONFIG_WRITES_TOTAL, PRIVILEGE_SKIPS_TOTAL};
use lxcward_core::types::{ContainerId, ContainerStatus};

use crate::error::ReconcileError;
use crate::exec::CommandExecutor;
use crate::lifecycle::LifecycleReconciler;
use crate::persisted::{Directive, PersistedConfig};
use crate::platform::Platform;
use crate::policy::{IdentifierPolicy, PolicyDecision};
use crate::retry::Retrier;

/// 권한 전환 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PrivilegeOutcome {
    /// 정책에 의해 건너뜀
    Skipped {
        /// 사유
        reason: String,
    },
    /// 전환 사이클 완료
    Applied {
        /// 영속 설정이 실제로 바뀌었는지 여부
        config_changed: bool,
        /// 권고 메시지 (있으면)
        advisory: Option<String>,
    },
}

/// 권한 전환기
pub struct PrivilegeConfigurator<P: Platform> {
    platform: Arc<P>,
    lifecycle: Arc<LifecycleReconciler<P>>,
    executor: Arc<CommandExecutor<P>>,
    stop_retrier: Retrier,
    policy: IdentifierPolicy,
    directives: Vec<Directive>,
}

impl<P: Platform> PrivilegeConfigurator<P> {
    /// 새 전환기를 생성합니다.
    pub fn new(
        platform: Arc<P>,
        lifecycle: Arc<LifecycleReconciler<P>>,
        executor: Arc<CommandExecutor<P>>,
        stop_retrier: Retrier,
        policy: IdentifierPolicy,
        directives: Vec<Directive>,
    ) -> Self {
        Self {
            platform,
            lifecycle,
            executor,
            stop_retrier,
            policy,
            directives,
        }
    }

    /// 컨테이너를 privileged 모드로 전환합니다.
    ///
    /// 보호 ID는 아무 플랫폼 호출 없이 `Skipped`를 반환합니다.
    ///
    /// # Errors
    ///
    /// stop/start 재시도 소진, 설정 파일 읽기/쓰기 실패, 안정화 실패,
    /// 응답 확인 실패 시 에러를 반환합니다.
    pub async fn make_privileged(
        &self,
        id: ContainerId,
    ) -> Result<PrivilegeOutcome, ReconcileError> {
        let advisory = match self.policy.evaluate(id) {
            PolicyDecision::Skip(reason) => {
                counter!(PRIVILEGE_SKIPS_TOTAL).increment(1);
                warn!(container_id = %id, %reason, "skipping privilege change");
                return Ok(PrivilegeOutcome::Skipped { reason });
            }
            PolicyDecision::Advisory(message) => {
                warn!(container_id = %id, advisory = %message, "privilege change advisory");
                Some(message)
            }
            PolicyDecision::Proceed => None,
        };

        info!(container_id = %id, "stopping container for privilege change");
        let platform = &*self.platform;
        let probe = self.lifecycle.probe();
        self.stop_retrier
            .run("stop", id, move |_| async move {
                // 이미 정지된 컨테이너에 대한 `pct stop`은 실패함
                if let Err(e) = platform.stop(id).await {
                    if probe.status(id).await == ContainerStatus::Stopped {
                        debug!(container_id = %id, error = %e, "stop failed but container is stopped");
                        return Ok(());
                    }
                    return Err(e);
                }
                Ok(())
            })
            .await?;

        let config_changed = self.apply_directives(id).await?;

        info!(container_id = %id, config_changed, "restarting container");
        self.lifecycle.restart_and_stabilize(id).await?;
        self.executor.verify_responsive(id).await?;

        info!(container_id = %id, config_changed, "container is privileged");
        Ok(PrivilegeOutcome::Applied {
            config_changed,
            advisory,
        })
    }

    /// 영속 설정에 지시문을 적용하고, 바뀐 경우에만 씁니다.
    async fn apply_directives(&self, id: ContainerId) -> Result<bool, ReconcileError> {
        let text = self.platform.read_config(id).await?;
        let mut config = PersistedConfig::parse(&text);

        if !config.apply_all(&self.directives) {
            debug!(container_id = %id, "config already privileged, no write");
            return Ok(false);
        }

        self.platform.write_config(id, &config.render()).await?;
        counter!(CONFIG_WRITES_TOTAL).increment(1);
        info!(container_id = %id, "config updated");
        Ok(true)
    }
}
