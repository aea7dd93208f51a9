//! 시나리오 실행기
//!
//! 시나리오 본문을 실행하고, 결과와 상관없이 정리 스택을 비운 뒤
//! [`ScenarioReport`]를 만듭니다.

use metrics::counter;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use powerprobe_cinder::BlockStorageClient;
use powerprobe_core::config::PowerprobeConfig;
use powerprobe_core::metrics as m;

use crate::context::ScenarioContext;
use crate::error::ScenarioError;
use crate::failover::FailoverTarget;
use crate::report::{ScenarioKind, ScenarioOutcome, ScenarioReport};
use crate::{failover, migration, qos, volume_type};

async fn dispatch<C: BlockStorageClient>(
    kind: ScenarioKind,
    ctx: &mut ScenarioContext<'_, C>,
) -> Result<ScenarioOutcome, ScenarioError> {
    match kind {
        ScenarioKind::FailoverPowerStore => {
            let target = FailoverTarget::powerstore(ctx.config);
            failover::run(ctx, &target).await
        }
        ScenarioKind::FailoverPowerFlex => {
            let target = FailoverTarget::powerflex(ctx.config);
            failover::run(ctx, &target).await
        }
        ScenarioKind::VolumeType => volume_type::run(ctx).await,
        ScenarioKind::Qos => qos::run(ctx).await,
        ScenarioKind::Migration => migration::run(ctx).await,
    }
}

/// 시나리오 하나를 실행합니다.
///
/// 정리 단계는 `cancel`과 분리된 토큰으로 실행되므로, 취소된 시나리오도
/// 만든 리소스를 지웁니다.
pub async fn run_scenario<C: BlockStorageClient>(
    kind: ScenarioKind,
    client: &C,
    config: &PowerprobeConfig,
    cancel: &CancellationToken,
) -> ScenarioReport {
    let started = Instant::now();
    info!(scenario = %kind, "scenario started");

    let mut ctx = ScenarioContext::new(client, config, cancel);
    let outcome = match dispatch(kind, &mut ctx).await {
        Ok(outcome) => outcome,
        Err(ScenarioError::Precondition(reason)) => ScenarioOutcome::Skipped(reason),
        Err(e) => {
            error!(scenario = %kind, error = %e, "scenario failed");
            ScenarioOutcome::Failed(e.to_string())
        }
    };

    let (cleanup, notes) = ctx.into_parts();
    let cleanup_failures = cleanup
        .run(client, &config.volume, &CancellationToken::new())
        .await;
    if !cleanup_failures.is_empty() {
        warn!(
            scenario = %kind,
            failures = cleanup_failures.len(),
            "scenario left resources behind"
        );
    }

    counter!(
        m::SCENARIO_RUNS_TOTAL,
        m::LABEL_SCENARIO => kind.name(),
        m::LABEL_RESULT => outcome.result_label()
    )
    .increment(1);

    let duration = started.elapsed();
    info!(
        scenario = %kind,
        outcome = %outcome,
        duration_secs = duration.as_secs_f64(),
        "scenario finished"
    );

    ScenarioReport {
        scenario: kind,
        outcome,
        duration,
        notes,
        cleanup_failures,
    }
}

/// 시나리오를 순서대로 실행합니다. 취소된 뒤의 시나리오는 건너뜁니다.
pub async fn run_all<C: BlockStorageClient>(
    kinds: &[ScenarioKind],
    client: &C,
    config: &PowerprobeConfig,
    cancel: &CancellationToken,
) -> Vec<ScenarioReport> {
    let mut reports = Vec::with_capacity(kinds.len());
    for &kind in kinds {
        if cancel.is_cancelled() {
            reports.push(ScenarioReport {
                scenario: kind,
                outcome: ScenarioOutcome::skipped("cancelled"),
                duration: Default::default(),
                notes: Vec::new(),
                cleanup_failures: Vec::new(),
            });
            continue;
        }
        reports.push(run_scenario(kind, client, config, cancel).await);
    }
    reports
}
