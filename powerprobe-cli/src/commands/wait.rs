//! `powerprobe wait` command handler

use std::io::Write;
use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::info;

use powerprobe_cinder::{
    BlockStorageClient, Capability, ClientFactory, VolumeReader, volume_deletion_spec,
    volume_status_spec,
};
use powerprobe_core::config::{MAX_BUILD_TIMEOUT_SECS, PowerprobeConfig, VolumeConfig};
use powerprobe_waiter::{WaitOutcome, WaitPurpose, WaitResult, wait};

use crate::cli::WaitArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `wait` command.
pub async fn execute(
    args: WaitArgs,
    config: &PowerprobeConfig,
    cancel: &CancellationToken,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let client = ClientFactory::new(config.cloud.clone()).negotiate(&[Capability::Volumes])?;
    let summary = wait_for_volume(&client, &args, &config.volume, cancel).await?;
    writer.render(&summary)?;
    summary.into_result()
}

/// Build the wait spec from CLI arguments and poll until a terminal outcome.
pub(crate) async fn wait_for_volume<C: BlockStorageClient>(
    client: &C,
    args: &WaitArgs,
    volume: &VolumeConfig,
    cancel: &CancellationToken,
) -> Result<WaitSummary, CliError> {
    let mut volume = volume.clone();
    if let Some(secs) = args.timeout_secs {
        if secs == 0 || secs > MAX_BUILD_TIMEOUT_SECS {
            return Err(CliError::Config(format!(
                "--timeout-secs must be 1-{MAX_BUILD_TIMEOUT_SECS}, got {secs}"
            )));
        }
        volume.build_timeout_secs = secs;
    }

    let spec = if args.deleted {
        volume_deletion_spec(&args.volume_id, &volume)?
    } else {
        volume_status_spec(&args.volume_id, &args.status, &volume)?
    };
    info!(
        volume_id = %args.volume_id,
        purpose = %spec.purpose(),
        timeout_secs = spec.timeout().as_secs(),
        "waiting for volume"
    );

    let outcome = wait(&spec, &VolumeReader::new(client), cancel).await?;
    let target = if args.deleted {
        "deleted".to_owned()
    } else {
        args.status.to_lowercase()
    };
    Ok(WaitSummary::new(target, outcome))
}

/// Result of a single `wait` invocation.
#[derive(Debug, Serialize)]
pub struct WaitSummary {
    pub volume_id: String,
    pub purpose: WaitPurpose,
    pub target: String,
    pub result: WaitResult,
    /// Last status observed, if any
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub attempts: u32,
    pub elapsed_secs: f64,
    pub timeout_secs: f64,
}

impl WaitSummary {
    fn new(target: String, outcome: WaitOutcome<powerprobe_cinder::Volume>) -> Self {
        let report = outcome.report().clone();
        let result = outcome.result();
        let (status, host, last_error) = match outcome {
            WaitOutcome::Succeeded { snapshot, .. } => match snapshot {
                Some(volume) => (Some(volume.status), volume.host, None),
                None => (None, None, None),
            },
            WaitOutcome::Failed {
                status, snapshot, ..
            } => (Some(status), snapshot.host, None),
            WaitOutcome::TimedOut {
                last_status,
                last_error,
                ..
            } => (last_status, None, last_error),
        };
        Self {
            volume_id: report.resource_id,
            purpose: report.purpose,
            target,
            result,
            status,
            host,
            last_error,
            attempts: report.attempts,
            elapsed_secs: report.elapsed.as_secs_f64(),
            timeout_secs: report.timeout.as_secs_f64(),
        }
    }

    /// Failed and timed-out waits become errors after the summary is printed.
    fn into_result(self) -> Result<(), CliError> {
        let status = self.status.as_deref().unwrap_or("<none>");
        match self.result {
            WaitResult::Failed => Err(CliError::ResourceFailed(format!(
                "volume {} entered failure status '{status}'",
                self.volume_id
            ))),
            WaitResult::TimedOut => Err(CliError::Timeout(format!(
                "volume {} did not reach '{}' within {:?} (last status {status})",
                self.volume_id,
                self.target,
                Duration::from_secs_f64(self.timeout_secs)
            ))),
            WaitResult::Succeeded => Ok(()),
        }
    }
}

impl Render for WaitSummary {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let label = self.result.as_str();
        let result = match self.result {
            WaitResult::Succeeded => label.green().bold(),
            WaitResult::Failed => label.red().bold(),
            WaitResult::TimedOut => label.yellow().bold(),
        };
        writeln!(w, "Volume {} ({} wait for '{}')", self.volume_id.bold(), self.purpose, self.target)?;
        writeln!(w, "  Result:   {result}")?;
        if let Some(status) = &self.status {
            writeln!(w, "  Status:   {status}")?;
        }
        if let Some(host) = &self.host {
            writeln!(w, "  Host:     {host}")?;
        }
        if let Some(err) = &self.last_error {
            writeln!(w, "  Last error: {}", err.red())?;
        }
        writeln!(
            w,
            "  Attempts: {} in {:.1}s (timeout {:.0}s)",
            self.attempts, self.elapsed_secs, self.timeout_secs
        )
    }
}
