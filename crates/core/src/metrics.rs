//! 메트릭 상수 및 설명 등록
//!
//! 모든 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! reconciler는 이 상수를 사용하여 `metrics::counter!()` 매크로를 호출합니다.
//! recorder가 설치되지 않은 프로세스에서는 모든 호출이 no-op입니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `lxcward_`
//! - 접미어: `_total` (counter)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(lxcward_core::metrics::EXEC_ATTEMPTS_TOTAL).increment(1);
//! ```

use metrics::describe_counter;

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 플랫폼 작업 레이블 키 (start, stop)
pub const LABEL_OPERATION: &str = "operation";

// ─── Reconciler 메트릭 ─────────────────────────────────────────────

/// 컨테이너 내부 명령 실행 시도 수 (counter)
pub const EXEC_ATTEMPTS_TOTAL: &str = "lxcward_exec_attempts_total";

/// 재시도를 모두 소진한 명령 실행 수 (counter)
pub const EXEC_EXHAUSTED_TOTAL: &str = "lxcward_exec_exhausted_total";

/// 재시도 도중 발생한 재시작(에스컬레이션) 수 (counter)
pub const RESTART_ESCALATIONS_TOTAL: &str = "lxcward_restart_escalations_total";

/// 플랫폼 start/stop 재시도 수 (counter, label: operation)
pub const PLATFORM_RETRIES_TOTAL: &str = "lxcward_platform_retries_total";

/// 안정화 실패 수 (counter)
pub const STABILIZATION_FAILURES_TOTAL: &str = "lxcward_stabilization_failures_total";

/// 컨테이너 설정 파일 쓰기 수 (counter)
pub const CONFIG_WRITES_TOTAL: &str = "lxcward_config_writes_total";

/// 정책에 의해 건너뛴 권한 전환 수 (counter)
pub const PRIVILEGE_SKIPS_TOTAL: &str = "lxcward_privilege_skips_total";

/// 모든 메트릭의 설명을 등록합니다.
///
/// recorder 설치 직후 한 번 호출합니다.
pub fn describe_all() {
    describe_counter!(
        EXEC_ATTEMPTS_TOTAL,
        "Total number of in-container command attempts"
    );
    describe_counter!(
        EXEC_EXHAUSTED_TOTAL,
        "Total number of commands that exhausted their retry budget"
    );
    describe_counter!(
        RESTART_ESCALATIONS_TOTAL,
        "Total number of restart-and-stabilize cycles triggered mid-retry"
    );
    describe_counter!(
        PLATFORM_RETRIES_TOTAL,
        "Total number of retried platform start/stop calls"
    );
    describe_counter!(
        STABILIZATION_FAILURES_TOTAL,
        "Total number of containers that did not reach running after start"
    );
    describe_counter!(
        CONFIG_WRITES_TOTAL,
        "Total number of persisted container config writes"
    );
    describe_counter!(
        PRIVILEGE_SKIPS_TOTAL,
        "Total number of privilege changes skipped by identifier policy"
    );
}
