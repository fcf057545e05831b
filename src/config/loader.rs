//! Configuration loading: flags over file over defaults.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use thiserror::Error;

use crate::config::cli::Cli;
use crate::config::schema::HopperConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0}")]
    Cli(#[from] clap::Error),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse process arguments and build the validated configuration.
pub fn load<I, T>(args: I) -> Result<HopperConfig, ConfigError>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = Cli::try_parse_from(args)?;
    resolve(cli)
}

/// Merge parsed flags with the optional config file and validate the result.
pub fn resolve(cli: Cli) -> Result<HopperConfig, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => load_file(path)?,
        None => HopperConfig::default(),
    };

    if let Some(level) = cli.level {
        config.log_level = level;
    }
    if let Some(listen) = cli.listen {
        config.listen = listen;
    }
    if cli.otel {
        config.otel = true;
    }
    if let Some(mode) = cli.forward_mode {
        config.forward_mode = mode;
    }
    if let Some(addr) = cli.metrics_listen {
        config.metrics_listen = Some(addr);
    }

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load a TOML file without validating it.
pub fn load_file(path: &Path) -> Result<HopperConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{ForwardMode, LogLevel};
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn no_args_yields_defaults() {
        let config = load(["hopper"]).unwrap();
        assert_eq!(config, HopperConfig::default());
    }

    #[test]
    fn flags_override_file() {
        let file = write_config("listen = \"127.0.0.1:7000\"\nlog_level = \"warn\"\notel = true\n");
        let path = file.path().to_str().unwrap().to_string();
        let config = load(["hopper", "--config", &path, "--listen", "127.0.0.1:9001"]).unwrap();

        assert_eq!(config.listen, "127.0.0.1:9001");
        assert_eq!(config.log_level, LogLevel::Warn);
        assert!(config.otel);
        assert_eq!(config.forward_mode, ForwardMode::Host);
    }

    #[test]
    fn invalid_level_flag_aborts() {
        let err = load(["hopper", "--level", "loud"]).unwrap_err();
        assert!(matches!(err, ConfigError::Cli(_)));
    }

    #[test]
    fn invalid_file_value_aborts() {
        let file = write_config("log_level = \"loud\"\n");
        let path = file.path().to_str().unwrap().to_string();
        let err = load(["hopper", "--config", &path]).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn missing_file_aborts() {
        let err = load(["hopper", "--config", "/nonexistent/hopper.toml"]).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn bad_listen_fails_validation() {
        let err = load(["hopper", "--listen", "nowhere"]).unwrap_err();
        match err {
            ConfigError::Validation(errors) => assert_eq!(errors[0].field, "listen"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
