//! Config subcommand handlers.

use garage_config::{Config, Profile};
use garage_core::DEFAULT_GARAGE_ID;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::active_profile_name;
use crate::error::CliError;
use crate::output::Printer;

const MASK: &str = "********";

pub fn handle(args: ConfigArgs, global: &GlobalOpts, printer: Printer) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init {
            database_url,
            issuer_id,
            garage_id,
            default,
        } => {
            let mut cfg = garage_config::load_config_or_default();
            let profile_name = global.profile.clone().unwrap_or_else(|| "default".into());

            let profile = Profile {
                database_url,
                garage_id: garage_id.unwrap_or_else(|| DEFAULT_GARAGE_ID.into()),
                issuer_id,
                auth_token: None,
                auth_token_env: None,
                timeout: None,
            };
            // Validate before touching disk.
            garage_config::profile_to_controller_config(&profile, &profile_name, &cfg.defaults)?;

            if default || cfg.profiles.is_empty() {
                cfg.default_profile = Some(profile_name.clone());
            }
            cfg.profiles.insert(profile_name.clone(), profile);
            let path = garage_config::save_config(&cfg)?;

            printer.println(&format!(
                "profile '{profile_name}' written to {}",
                path.display()
            ));
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = garage_config::load_config()?;
            let active = active_profile_name(global, &cfg);
            printer.println(&format!("# active profile: {active}"));
            printer.println(&render_masked(&cfg)?);
            Ok(())
        }

        ConfigCommand::Path => {
            printer.println(&garage_config::config_path().display().to_string());
            Ok(())
        }

        ConfigCommand::SetToken { token } => {
            if token.trim().is_empty() {
                return Err(CliError::Validation {
                    field: "token".into(),
                    reason: "cannot be empty".into(),
                });
            }
            let cfg = garage_config::load_config_or_default();
            let profile_name = active_profile_name(global, &cfg);
            garage_config::store_auth_token(&profile_name, &token)?;
            printer.println(&format!("auth token for '{profile_name}' stored in system keyring"));
            Ok(())
        }
    }
}

/// TOML with plaintext tokens hidden.
fn render_masked(cfg: &Config) -> Result<String, CliError> {
    let masked = Config {
        default_profile: cfg.default_profile.clone(),
        defaults: garage_config::Defaults {
            color: cfg.defaults.color.clone(),
            timeout: cfg.defaults.timeout,
        },
        profiles: cfg
            .profiles
            .iter()
            .map(|(name, profile)| {
                let mut profile = profile.clone();
                if profile.auth_token.is_some() {
                    profile.auth_token = Some(MASK.into());
                }
                (name.clone(), profile)
            })
            .collect(),
    };
    toml::to_string_pretty(&masked).map_err(|e| CliError::Validation {
        field: "config".into(),
        reason: format!("failed to serialize config: {e}"),
    })
}
