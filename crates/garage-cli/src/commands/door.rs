//! Door status and the three door actions.

use std::time::Duration;

use garage_core::Controller;
use serde_json::json;

use super::{settle_writes, sync_options, sync_status};
use crate::cli::StatusArgs;
use crate::error::CliError;
use crate::output::Printer;

pub async fn status(
    controller: &Controller,
    args: &StatusArgs,
    limit: Duration,
    printer: Printer,
) -> Result<(), CliError> {
    let status = sync_status(controller, limit).await?;
    sync_options(controller, limit).await?;
    let state = controller.snapshot();

    if args.json {
        let options = &state.auto_close_options;
        let body = json!({
            "status": status.to_string(),
            "in_motion": status.is_in_motion(),
            "auto_close": {
                "enabled": options.enabled,
                "timeout_secs": options.timeout.as_secs(),
                "warning_enabled": options.warning_enabled,
                "warning_timeout_secs": options.warning_timeout.as_secs(),
            },
            "warning_pending": state.pending_auto_close_warning.is_some(),
        });
        printer.println(&serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    printer.println(&printer.status(status));
    printer.println(&printer.options(&state.auto_close_options));
    if let Some(ref warning) = state.pending_auto_close_warning {
        printer.println(&format!(
            "auto-close warning pending ({} before close)",
            crate::output::human(warning.timeout)
        ));
    }
    Ok(())
}

pub async fn open(controller: &Controller, printer: Printer) -> Result<(), CliError> {
    let mut events = controller.events();
    controller.request_open().await?;
    settle_writes(controller, &mut events).await?;
    printer.println("open requested");
    Ok(())
}

/// Close needs the current status so an opening door is paused, not reversed.
pub async fn close(
    controller: &Controller,
    limit: Duration,
    printer: Printer,
) -> Result<(), CliError> {
    let before = sync_status(controller, limit).await?;
    let mut events = controller.events();
    controller.request_close().await?;
    settle_writes(controller, &mut events).await?;

    let after = controller.status();
    if after == before {
        printer.println("close requested");
    } else {
        printer.println(&format!(
            "close requested: {} -> {}",
            printer.status(before),
            printer.status(after)
        ));
    }
    Ok(())
}

pub async fn cancel_auto_close(controller: &Controller, printer: Printer) -> Result<(), CliError> {
    let mut events = controller.events();
    controller.cancel_auto_close().await?;
    settle_writes(controller, &mut events).await?;
    printer.println("auto-close cancelled");
    Ok(())
}
