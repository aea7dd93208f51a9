//! 메트릭 상수 및 설명 등록
//!
//! 모든 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 크레이트는 이 상수를 사용하여 `metrics::counter!()`,
//! `metrics::histogram!()` 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `powerprobe_`
//! - 모듈명: `waiter_`, `cinder_`, `scenario_`
//! - 접미어: `_total` (counter), `_seconds` (histogram)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(powerprobe_core::metrics::WAITER_POLLS_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 결과 레이블 키 (succeeded, failed, timed_out, cancelled)
pub const LABEL_RESULT: &str = "result";

/// REST 작업 레이블 키 (show_volume, create_volume, ...)
pub const LABEL_OPERATION: &str = "operation";

/// 시나리오 이름 레이블 키
pub const LABEL_SCENARIO: &str = "scenario";

// ─── Waiter 메트릭 ──────────────────────────────────────────────────

/// Waiter: 상태 조회 횟수 (counter)
pub const WAITER_POLLS_TOTAL: &str = "powerprobe_waiter_polls_total";

/// Waiter: 재시도된 조회 에러 수 (counter)
pub const WAITER_READ_ERRORS_TOTAL: &str = "powerprobe_waiter_read_errors_total";

/// Waiter: 종료 결과 수 (counter, label: result)
pub const WAITER_OUTCOMES_TOTAL: &str = "powerprobe_waiter_outcomes_total";

/// Waiter: 대기 소요 시간 (histogram, 초)
pub const WAITER_WAIT_DURATION_SECONDS: &str = "powerprobe_waiter_wait_duration_seconds";

// ─── Cinder 클라이언트 메트릭 ───────────────────────────────────────

/// Cinder: REST 요청 수 (counter, labels: operation, result)
pub const CINDER_REQUESTS_TOTAL: &str = "powerprobe_cinder_requests_total";

// ─── Scenario 메트릭 ───────────────────────────────────────────────

/// Scenario: 실행 결과 수 (counter, labels: scenario, result)
pub const SCENARIO_RUNS_TOTAL: &str = "powerprobe_scenario_runs_total";

/// Scenario: 실패한 정리 작업 수 (counter)
pub const SCENARIO_CLEANUP_FAILURES_TOTAL: &str = "powerprobe_scenario_cleanup_failures_total";

// ─── 히스토그램 버킷 정의 ────────────────────────────────────────────

/// 대기 소요 시간 히스토그램 버킷 (초)
///
/// 볼륨 생성은 수 초, 마이그레이션은 수십 분까지 걸립니다.
pub const WAIT_DURATION_BUCKETS: [f64; 10] = [
    0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 900.0, 1800.0,
];

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 전역 레코더 설치 후 한 번만 호출해야 합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_histogram};

    // Waiter
    describe_counter!(
        WAITER_POLLS_TOTAL,
        "Total number of resource state reads issued by waiters"
    );
    describe_counter!(
        WAITER_READ_ERRORS_TOTAL,
        "Total number of read errors tolerated while polling"
    );
    describe_counter!(
        WAITER_OUTCOMES_TOTAL,
        "Terminal wait outcomes by result"
    );
    describe_histogram!(
        WAITER_WAIT_DURATION_SECONDS,
        "Wall-clock duration of a single wait in seconds"
    );

    // Cinder
    describe_counter!(
        CINDER_REQUESTS_TOTAL,
        "Block Storage REST requests by operation and result"
    );

    // Scenario
    describe_counter!(
        SCENARIO_RUNS_TOTAL,
        "Validation scenario runs by scenario and result"
    );
    describe_counter!(
        SCENARIO_CLEANUP_FAILURES_TOTAL,
        "Cleanup steps that failed after a scenario"
    );
}
