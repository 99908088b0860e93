//! Command dispatch: bridges CLI args -> controller operations -> output.

pub mod auto_close;
pub mod config_cmd;
pub mod door;
pub mod watch;

use std::time::Duration;

use garage_core::{Controller, CoreError, Feed, GarageEvent, GarageStatus};
use tokio::sync::broadcast;

use crate::cli::Command;
use crate::error::CliError;
use crate::output::Printer;

/// Dispatch a database-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    controller: &Controller,
    sync_timeout: Duration,
    printer: Printer,
) -> Result<(), CliError> {
    match cmd {
        Command::Status(args) => door::status(controller, &args, sync_timeout, printer).await,
        Command::Open => door::open(controller, printer).await,
        Command::Close => door::close(controller, sync_timeout, printer).await,
        Command::CancelAutoClose => door::cancel_auto_close(controller, printer).await,
        Command::Watch(args) => watch::handle(controller, &args, sync_timeout, printer).await,
        Command::AutoClose(args) => {
            auto_close::handle(controller, &args, sync_timeout, printer).await
        }
        Command::Config(_) => Err(CliError::Validation {
            field: "command".into(),
            reason: "config commands run without a controller".into(),
        }),
    }
}

// ── Shared helpers ───────────────────────────────────────────────────

fn timed_out(limit: Duration) -> CliError {
    CliError::Timeout {
        seconds: limit.as_secs(),
    }
}

/// Start listeners and wait for the first authoritative status.
pub(crate) async fn sync_status(
    controller: &Controller,
    limit: Duration,
) -> Result<GarageStatus, CliError> {
    controller.start().await?;
    let status = tokio::time::timeout(limit, controller.wait_for_status())
        .await
        .map_err(|_| timed_out(limit))??;
    Ok(status)
}

/// Start listeners and wait for the options feed to report.
pub(crate) async fn sync_options(controller: &Controller, limit: Duration) -> Result<(), CliError> {
    controller.start().await?;
    tokio::time::timeout(limit, controller.wait_for_feed(Feed::Options))
        .await
        .map_err(|_| timed_out(limit))??;
    Ok(())
}

/// Wait for queued writes, then surface the first one that failed.
pub(crate) async fn settle_writes(
    controller: &Controller,
    events: &mut broadcast::Receiver<GarageEvent>,
) -> Result<(), CliError> {
    controller.flush_writes().await;
    while let Ok(event) = events.try_recv() {
        if let GarageEvent::Diagnostic(
            err @ (CoreError::PermissionDenied { .. } | CoreError::Remote { .. }),
        ) = event
        {
            return Err(err.into());
        }
    }
    Ok(())
}
