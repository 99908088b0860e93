//! Follow the door until interrupted.

use std::time::Duration;

use garage_core::{Controller, GarageEvent};
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

use super::sync_status;
use crate::cli::WatchArgs;
use crate::error::CliError;
use crate::output::{Printer, human};

pub async fn handle(
    controller: &Controller,
    args: &WatchArgs,
    limit: Duration,
    printer: Printer,
) -> Result<(), CliError> {
    let mut events = controller.events();
    let status = sync_status(controller, limit).await?;
    printer.println(&printer.status(status));

    let mut seen = 0usize;
    loop {
        if args.count.is_some_and(|count| seen >= count) {
            return Ok(());
        }

        let event = tokio::select! {
            _ = tokio::signal::ctrl_c() => return Ok(()),
            event = events.recv() => event,
        };

        match event {
            Ok(GarageEvent::AutoCloseWarningPending { .. }) => {
                if let Some(warning) = controller.take_auto_close_warning().await? {
                    printer.println(&printer.event(&GarageEvent::AutoCloseWarningPending {
                        timeout: warning.timeout,
                    }));
                    printer.println(&format!(
                        "  run `garage cancel-auto-close` to keep it open ({} lead)",
                        human(warning.timeout)
                    ));
                }
            }
            Ok(event) => printer.println(&printer.event(&event)),
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "event stream lagged");
                continue;
            }
            Err(RecvError::Closed) => return Err(CliError::Stopped),
        }
        seen += 1;
    }
}
