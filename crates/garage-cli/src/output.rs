//! Text rendering for door state and events.

use std::io::{self, IsTerminal, Write};
use std::time::Duration;

use garage_core::{AutoCloseOptions, ColorTag, GarageEvent, GarageStatus, Origin, Reversal};
use owo_colors::{AnsiColors, OwoColorize};

use crate::cli::ColorMode;

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// Renders lines for one invocation.
#[derive(Debug, Clone, Copy)]
pub struct Printer {
    pub color: bool,
    pub quiet: bool,
}

impl Printer {
    pub fn println(self, line: &str) {
        if self.quiet || line.is_empty() {
            return;
        }
        let mut stdout = io::stdout().lock();
        let _ = writeln!(stdout, "{line}");
    }

    pub fn status(self, status: GarageStatus) -> String {
        let attrs = status.display_attributes();
        let label = if attrs.in_motion {
            format!("{status}…")
        } else {
            status.to_string()
        };
        if !self.color {
            return label;
        }
        label.color(ansi(attrs.color)).bold().to_string()
    }

    pub fn options(self, options: &AutoCloseOptions) -> String {
        let close = if options.enabled {
            format!("after {}", human(options.timeout))
        } else {
            "off".to_owned()
        };
        let warn = if options.warning_enabled {
            format!("after {}", human(options.warning_timeout))
        } else {
            "off".to_owned()
        };
        let mut text = format!("auto-close: {close}, warning: {warn}");
        if options.enabled && options.warning_enabled && !options.warning_precedes_timeout() {
            text.push_str(" (warning comes after the close)");
        }
        if !options.last_writer_id.is_empty() {
            text.push_str(&format!(" [set by {}]", options.last_writer_id));
        }
        text
    }

    pub fn event(self, event: &GarageEvent) -> String {
        match event {
            GarageEvent::StatusChanged {
                previous,
                status,
                origin,
            } => {
                let suffix = match origin {
                    Origin::Optimistic => " (expected)",
                    Origin::Remote => "",
                };
                format!("{} -> {}{suffix}", self.status(*previous), self.status(*status))
            }
            GarageEvent::DoorReversed(reversal) => {
                let text = match reversal {
                    Reversal::ClosedWhileOpening => "door closed while opening",
                    Reversal::ReopenedWhileClosing => "door reopened while closing",
                };
                self.alert(text)
            }
            GarageEvent::OptionsChanged(options) => self.options(options),
            GarageEvent::AutoCloseWarningPending { timeout } => {
                self.alert(&format!("door will close in {}", human(*timeout)))
            }
            GarageEvent::Diagnostic(err) => format!("warning: {err}"),
        }
    }

    fn alert(self, text: &str) -> String {
        if self.color {
            text.yellow().bold().to_string()
        } else {
            text.to_owned()
        }
    }
}

fn ansi(tag: ColorTag) -> AnsiColors {
    match tag {
        ColorTag::Green => AnsiColors::Green,
        ColorTag::Amber => AnsiColors::Yellow,
        ColorTag::Red => AnsiColors::Red,
        ColorTag::Orange => AnsiColors::BrightRed,
        ColorTag::Blue => AnsiColors::Blue,
    }
}

/// Whole-second rendering ("1h 15m").
pub fn human(duration: Duration) -> String {
    humantime::format_duration(Duration::from_secs(duration.as_secs())).to_string()
}
