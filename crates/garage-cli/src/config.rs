//! Flag-aware profile resolution on top of `garage_config`.
//!
//! Precedence for every field: CLI flag (or its env var) > profile > default.

use std::time::Duration;

use garage_config::{Config, ConfigError, Profile};
use garage_core::ControllerConfig;
use secrecy::SecretString;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Effective sync/request timeout in seconds.
pub fn timeout_secs(global: &GlobalOpts, config: &Config, profile: Option<&Profile>) -> u64 {
    global
        .timeout
        .or_else(|| profile.and_then(|p| p.timeout))
        .unwrap_or(config.defaults.timeout)
}

/// Build a `ControllerConfig` from the config file, profile, and flags.
pub fn build_controller_config(
    global: &GlobalOpts,
    config: &Config,
) -> Result<ControllerConfig, CliError> {
    let profile_name = active_profile_name(global, config);

    let mut controller = match config.profiles.get(&profile_name) {
        Some(profile) => {
            let mut merged = profile.clone();
            if let Some(ref url) = global.database_url {
                merged.database_url.clone_from(url);
            }
            if let Some(ref issuer) = global.issuer_id {
                merged.issuer_id.clone_from(issuer);
            }
            garage_config::profile_to_controller_config(&merged, &profile_name, &config.defaults)?
        }
        // Explicit --profile that doesn't exist is a usage error.
        None if global.profile.is_some() => {
            return Err(ConfigError::ProfileNotFound {
                name: profile_name,
                available: config.profile_names(),
            }
            .into());
        }
        None => from_flags(global)?,
    };

    if let Some(ref garage) = global.garage {
        controller = controller.with_garage_id(garage.clone());
    }
    if let Some(ref token) = global.auth_token {
        controller = controller.with_auth(SecretString::from(token.clone()));
    }
    controller.timeout = Duration::from_secs(timeout_secs(
        global,
        config,
        config.profiles.get(&profile_name),
    ));

    Ok(controller)
}

/// No profile on disk: everything must come from flags / env vars.
fn from_flags(global: &GlobalOpts) -> Result<ControllerConfig, CliError> {
    let no_config = || CliError::NoConfig {
        path: garage_config::config_path().display().to_string(),
    };
    let url_str = global.database_url.as_deref().ok_or_else(no_config)?;
    let issuer = global.issuer_id.as_deref().ok_or_else(no_config)?;

    let url: url::Url = url_str.parse().map_err(|_| CliError::Validation {
        field: "database_url".into(),
        reason: format!("invalid URL: {url_str}"),
    })?;
    if issuer.trim().is_empty() {
        return Err(CliError::Validation {
            field: "issuer_id".into(),
            reason: "must not be empty".into(),
        });
    }

    Ok(ControllerConfig::new(url, issuer))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use clap::Parser;

    use super::*;
    use crate::cli::Cli;

    fn global(args: &[&str]) -> GlobalOpts {
        let mut argv = vec!["garage"];
        argv.extend_from_slice(args);
        argv.push("open");
        Cli::try_parse_from(argv).unwrap().global
    }

    fn config_with_home() -> Config {
        let mut cfg = Config::default();
        cfg.default_profile = Some("home".into());
        cfg.profiles.insert(
            "home".into(),
            Profile {
                database_url: "https://home.example.com".into(),
                garage_id: "home_garage".into(),
                issuer_id: "uid-home".into(),
                auth_token: None,
                auth_token_env: None,
                timeout: Some(9),
            },
        );
        cfg
    }

    #[test]
    fn flags_override_profile() {
        let cfg = config_with_home();
        let opts = global(&["--garage", "cabin", "--issuer-id", "uid-flag", "--timeout", "3"]);

        let controller = build_controller_config(&opts, &cfg).unwrap();
        assert_eq!(controller.database_url.as_str(), "https://home.example.com/");
        assert_eq!(controller.issuer_id, "uid-flag");
        assert_eq!(controller.garage_id, "cabin");
        assert_eq!(controller.timeout, Duration::from_secs(3));
    }

    #[test]
    fn profile_timeout_beats_defaults() {
        let cfg = config_with_home();
        let controller = build_controller_config(&global(&[]), &cfg).unwrap();
        assert_eq!(controller.timeout, Duration::from_secs(9));
    }

    #[test]
    fn flags_alone_are_enough() {
        let opts = global(&[
            "--database-url",
            "https://flags.example.com",
            "--issuer-id",
            "uid-1",
        ]);
        let controller = build_controller_config(&opts, &Config::default()).unwrap();
        assert_eq!(controller.garage_id, "home_garage");
        assert_eq!(controller.timeout, Duration::from_secs(30));
    }

    #[test]
    fn missing_everything_is_no_config() {
        let err = build_controller_config(&global(&[]), &Config::default()).unwrap_err();
        assert!(matches!(err, CliError::NoConfig { .. }));
    }

    #[test]
    fn unknown_explicit_profile_is_reported() {
        let cfg = config_with_home();
        let err = build_controller_config(&global(&["--profile", "cabin"]), &cfg).unwrap_err();
        assert!(matches!(
            err,
            CliError::ProfileNotFound { ref name, ref available }
                if name == "cabin" && available == "home"
        ));
    }
}
