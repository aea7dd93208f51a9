//! 폴링 루프
//!
//! [`wait`]은 명세를 검증한 뒤 리소스를 반복 조회하여 목표 상태, 실패 상태,
//! 제한 시간 중 먼저 도달한 쪽으로 종료합니다.
//!
//! - 조회 에러(NotFound 포함)는 제한 시간까지 재시도합니다.
//!   부재 대기에서의 NotFound만 예외로 즉시 성공입니다.
//! - [`ReadError::Invalid`]는 재시도하지 않고 [`WaitError::Config`]로 끝납니다.
//! - 실패 상태는 즉시 반환하며 추가 조회를 하지 않습니다.
//! - 취소 토큰은 매 조회 직전과 sleep 도중에 확인합니다.
//! - 제한 시간은 반복 횟수가 아닌 단조 시계 기준 마감 시각입니다.

use metrics::{counter, histogram};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use powerprobe_core::metrics::{
    LABEL_RESULT, WAITER_OUTCOMES_TOTAL, WAITER_POLLS_TOTAL, WAITER_READ_ERRORS_TOTAL,
    WAITER_WAIT_DURATION_SECONDS,
};

use crate::error::WaitError;
use crate::outcome::{WaitOutcome, WaitReport};
use crate::reader::{Observed, ReadError, ResourceReader};
use crate::spec::{StateClass, WaitPurpose, WaitSpec};

/// 리소스가 종료 상태에 도달할 때까지 대기합니다.
///
/// # Errors
///
/// - [`WaitError::Config`]: 명세가 잘못됨 (조회하지 않음), 또는 reader가
///   [`ReadError::Invalid`]를 보고함
/// - [`WaitError::Cancelled`]: `cancel`이 취소됨
///
/// 실패 상태와 시간 초과는 에러가 아니라 [`WaitOutcome`]으로 반환됩니다.
/// `?`로 전파하려면 [`wait_until`]을 사용하세요.
pub async fn wait<R>(
    spec: &WaitSpec,
    reader: &R,
    cancel: &CancellationToken,
) -> Result<WaitOutcome<R::Resource>, WaitError>
where
    R: ResourceReader,
{
    spec.validate()?;

    let resource_id = spec.resource_id();
    let started = Instant::now();
    let deadline = started.checked_add(spec.timeout()).ok_or_else(|| {
        WaitError::config(format!(
            "timeout {:?} overflows the monotonic clock",
            spec.timeout()
        ))
    })?;
    let mut backoff = spec.backoff();

    let mut attempts: u32 = 0;
    let mut last_status: Option<String> = None;
    let mut last_error: Option<String> = None;

    debug!(
        resource_id = resource_id,
        purpose = %spec.purpose(),
        timeout_secs = spec.timeout().as_secs_f64(),
        "waiting for resource"
    );

    loop {
        if cancel.is_cancelled() {
            return Err(cancelled(resource_id, attempts, started));
        }

        attempts = attempts.saturating_add(1);
        counter!(WAITER_POLLS_TOTAL).increment(1);

        match reader.fetch(resource_id).await {
            Ok(snapshot) => {
                let status = snapshot.status().to_lowercase();
                match spec.classify(&status) {
                    StateClass::Target => {
                        let report = report(spec, attempts, started);
                        info!(
                            resource_id = resource_id,
                            status = %status,
                            attempts = attempts,
                            elapsed_secs = report.elapsed.as_secs_f64(),
                            "resource reached target status"
                        );
                        return Ok(finish(WaitOutcome::Succeeded {
                            snapshot: Some(snapshot),
                            report,
                        }));
                    }
                    StateClass::Failure => {
                        let report = report(spec, attempts, started);
                        warn!(
                            resource_id = resource_id,
                            status = %status,
                            attempts = attempts,
                            "resource entered failure status"
                        );
                        return Ok(finish(WaitOutcome::Failed {
                            status,
                            snapshot,
                            report,
                        }));
                    }
                    StateClass::Pending => {
                        if last_status.as_deref() != Some(status.as_str()) {
                            debug!(
                                resource_id = resource_id,
                                status = %status,
                                previous = last_status.as_deref().unwrap_or("<none>"),
                                "resource status changed"
                            );
                        }
                        last_status = Some(status);
                    }
                }
            }
            Err(ReadError::NotFound(message)) if spec.purpose() == WaitPurpose::Absence => {
                let report = report(spec, attempts, started);
                info!(
                    resource_id = resource_id,
                    attempts = attempts,
                    elapsed_secs = report.elapsed.as_secs_f64(),
                    detail = %message,
                    "resource is gone"
                );
                return Ok(finish(WaitOutcome::Succeeded {
                    snapshot: None,
                    report,
                }));
            }
            Err(ReadError::Invalid(reason)) => {
                warn!(
                    resource_id = resource_id,
                    attempt = attempts,
                    reason = %reason,
                    "read request rejected, not retrying"
                );
                return Err(WaitError::config(reason));
            }
            Err(e) => {
                counter!(WAITER_READ_ERRORS_TOTAL).increment(1);
                debug!(
                    resource_id = resource_id,
                    attempt = attempts,
                    error = %e,
                    "read failed, retrying"
                );
                last_error = Some(e.to_string());
            }
        }

        let now = Instant::now();
        if now >= deadline {
            let report = report(spec, attempts, started);
            warn!(
                resource_id = resource_id,
                attempts = attempts,
                timeout_secs = report.timeout.as_secs_f64(),
                last_status = last_status.as_deref().unwrap_or("<none>"),
                last_error = last_error.as_deref().unwrap_or("<none>"),
                "timed out waiting for resource"
            );
            return Ok(finish(WaitOutcome::TimedOut {
                last_status,
                last_error,
                report,
            }));
        }

        let delay = backoff.advance().min(deadline - now);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(cancelled(resource_id, attempts, started));
            }
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

/// [`wait`] 후 실패와 시간 초과를 [`WaitError`]로 변환합니다.
///
/// 성공 시 스냅샷을 반환하며, 부재 대기가 NotFound로 끝난 경우 `None`입니다.
pub async fn wait_until<R>(
    spec: &WaitSpec,
    reader: &R,
    cancel: &CancellationToken,
) -> Result<Option<R::Resource>, WaitError>
where
    R: ResourceReader,
{
    wait(spec, reader, cancel).await?.into_result()
}

fn report(spec: &WaitSpec, attempts: u32, started: Instant) -> WaitReport {
    WaitReport {
        resource_id: spec.resource_id().to_owned(),
        purpose: spec.purpose(),
        attempts,
        elapsed: started.elapsed(),
        timeout: spec.timeout(),
    }
}

fn finish<T>(outcome: WaitOutcome<T>) -> WaitOutcome<T> {
    counter!(WAITER_OUTCOMES_TOTAL, LABEL_RESULT => outcome.result_label()).increment(1);
    histogram!(WAITER_WAIT_DURATION_SECONDS).record(outcome.report().elapsed.as_secs_f64());
    outcome
}

fn cancelled(resource_id: &str, attempts: u32, started: Instant) -> WaitError {
    info!(
        resource_id = resource_id,
        attempts = attempts,
        elapsed_secs = started.elapsed().as_secs_f64(),
        "wait cancelled"
    );
    let err = WaitError::Cancelled {
        resource_id: resource_id.to_owned(),
        attempts,
        elapsed: started.elapsed(),
    };
    counter!(WAITER_OUTCOMES_TOTAL, LABEL_RESULT => err.result_label()).increment(1);
    err
}
