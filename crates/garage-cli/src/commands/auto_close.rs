//! Auto-close option edits.
//!
//! Each edit changes one field of the remote options. The options feed is
//! read first so the other fields are carried over unchanged.

use std::time::Duration;

use garage_core::{Controller, OptionEdit};

use super::{settle_writes, sync_options};
use crate::cli::{AutoCloseArgs, AutoCloseCommand};
use crate::error::CliError;
use crate::output::Printer;

fn edit_for(command: &AutoCloseCommand) -> OptionEdit {
    match *command {
        AutoCloseCommand::Enable => OptionEdit::Enabled(true),
        AutoCloseCommand::Disable => OptionEdit::Enabled(false),
        AutoCloseCommand::Warn => OptionEdit::WarningEnabled(true),
        AutoCloseCommand::NoWarn => OptionEdit::WarningEnabled(false),
        AutoCloseCommand::Timeout { duration } => OptionEdit::Timeout(duration),
        AutoCloseCommand::WarningTimeout { duration } => OptionEdit::WarningTimeout(duration),
    }
}

pub async fn handle(
    controller: &Controller,
    args: &AutoCloseArgs,
    limit: Duration,
    printer: Printer,
) -> Result<(), CliError> {
    let edit = edit_for(&args.command);
    if matches!(edit, OptionEdit::Timeout(d) if d.is_zero()) {
        return Err(CliError::Validation {
            field: "timeout".into(),
            reason: "must be greater than zero".into(),
        });
    }

    sync_options(controller, limit).await?;
    let mut events = controller.events();
    let written = controller.edit_options(edit).await?;
    settle_writes(controller, &mut events).await?;

    let options = controller.store().auto_close_options();
    if !written {
        printer.println("unchanged");
    }
    printer.println(&printer.options(&options));
    Ok(())
}
