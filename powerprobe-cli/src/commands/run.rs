//! `powerprobe run` command handler

use std::collections::BTreeSet;
use std::io::Write;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::info;

use powerprobe_cinder::{Capability, ClientFactory};
use powerprobe_core::config::PowerprobeConfig;
use powerprobe_scenarios::{ScenarioKind, ScenarioOutcome, ScenarioReport, run_all};

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `run` command.
pub async fn execute(
    args: RunArgs,
    config: &PowerprobeConfig,
    cancel: &CancellationToken,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let kinds = parse_selection(&args.scenario)?;
    let client = ClientFactory::new(config.cloud.clone()).negotiate(&required_capabilities(&kinds))?;

    info!(scenarios = ?kinds, "running scenarios");
    let reports = run_all(&kinds, &client, config, cancel).await;

    let summary = RunSummary::new(reports);
    writer.render(&summary)?;
    summary.into_result()
}

/// `all` or a single scenario name.
fn parse_selection(selection: &str) -> Result<Vec<ScenarioKind>, CliError> {
    if selection.eq_ignore_ascii_case("all") {
        return Ok(ScenarioKind::ALL.to_vec());
    }
    Ok(vec![selection.parse::<ScenarioKind>()?])
}

fn required_capabilities(kinds: &[ScenarioKind]) -> Vec<Capability> {
    kinds
        .iter()
        .flat_map(|k| k.required_capabilities().iter().copied())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Aggregated result of a `run` invocation.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub passed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub reports: Vec<ScenarioReport>,
}

impl RunSummary {
    fn new(reports: Vec<ScenarioReport>) -> Self {
        let count = |f: fn(&ScenarioOutcome) -> bool| reports.iter().filter(|r| f(&r.outcome)).count();
        Self {
            passed: count(|o| matches!(o, ScenarioOutcome::Passed)),
            skipped: count(|o| matches!(o, ScenarioOutcome::Skipped(_))),
            failed: count(|o| matches!(o, ScenarioOutcome::Failed(_))),
            reports,
        }
    }

    fn into_result(self) -> Result<(), CliError> {
        let unclean: Vec<&str> = self
            .reports
            .iter()
            .filter(|r| !r.is_clean())
            .map(|r| r.scenario.name())
            .collect();
        if unclean.is_empty() {
            Ok(())
        } else {
            Err(CliError::ScenarioFailed(format!(
                "scenario(s) failed or left resources behind: {}",
                unclean.join(", ")
            )))
        }
    }
}

impl Render for RunSummary {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "{:<22} {:<8} {:>8}  Detail", "Scenario", "Result", "Time")?;
        writeln!(w, "{}", "-".repeat(72))?;
        for report in &self.reports {
            let (label, detail) = match &report.outcome {
                ScenarioOutcome::Passed => ("PASS".green().bold(), String::new()),
                ScenarioOutcome::Skipped(reason) => ("SKIP".yellow().bold(), reason.clone()),
                ScenarioOutcome::Failed(reason) => ("FAIL".red().bold(), reason.clone()),
            };
            writeln!(
                w,
                "{:<22} {:<8} {:>7.1}s  {}",
                report.scenario.name(),
                label,
                report.duration.as_secs_f64(),
                detail
            )?;
            for note in &report.notes {
                writeln!(w, "{:<22} note: {note}", "")?;
            }
            for failure in &report.cleanup_failures {
                writeln!(w, "{:<22} {} {}", "", "cleanup:".red(), failure)?;
            }
        }
        writeln!(w)?;
        writeln!(
            w,
            "{} passed, {} skipped, {} failed",
            self.passed, self.skipped, self.failed
        )
    }
}
