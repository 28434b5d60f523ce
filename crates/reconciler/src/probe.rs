//! 컨테이너 상태 조회
//!
//! [`StatusProbe`]는 플랫폼에서 현재 생명주기 상태를 매번 새로 읽어옵니다.
//! 조회 실패는 에러가 아니라 [`ContainerStatus::Unknown`]으로 표현됩니다.

use std::sync::Arc;

use tracing::{debug, warn};

use lxcward_core::types::{ContainerId, ContainerStatus};

use crate::platform::Platform;

/// 상태 조회기
pub struct StatusProbe<P: Platform> {
    platform: Arc<P>,
}

impl<P: Platform> StatusProbe<P> {
    /// 새 조회기를 생성합니다.
    pub fn new(platform: Arc<P>) -> Self {
        Self { platform }
    }

    /// 현재 상태를 조회합니다.
    ///
    /// 플랫폼 호출이 실패하거나 출력을 해석할 수 없으면 `Unknown`을 반환합니다.
    pub async fn status(&self, id: ContainerId) -> ContainerStatus {
        match self.platform.query_status(id).await {
            Ok(output) => {
                let status = ContainerStatus::from_status_output(&output);
                if status == ContainerStatus::Unknown {
                    warn!(
                        container_id = %id,
                        output = output.trim(),
                        "unrecognized status output"
                    );
                } else {
                    debug!(container_id = %id, %status, "probed container status");
                }
                status
            }
            Err(e) => {
                warn!(container_id = %id, error = %e, "status query failed");
                ContainerStatus::Unknown
            }
        }
    }
}
