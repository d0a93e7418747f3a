use config::{Config, Environment, File};
use kreg_domain::config::KregConfig;
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default configuration file, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "kreg.toml";
/// Prefix of environment overrides (`KREG__DATABASE__URL` → `database.url`).
pub const ENV_PREFIX: &str = "KREG";

/// Custom error type for config loading.
#[kreg_derive::kreg_error]
pub enum ConfigError {
    #[error("Config error{}: {source}", format_context(.context))]
    Config { source: config::ConfigError, context: Option<Cow<'static, str>> },

    #[error("Config file not found{}: {message}", format_context(.context))]
    NotFound { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

/// A reusable configuration loader that combines file-based settings with environment overrides.
///
/// This function implements a layered configuration strategy:
/// 1. **Base File**: Loads settings from `path`. An explicitly given file must exist; when
///    `path` is `None` the loader falls back to [`DEFAULT_CONFIG_FILE`] and tolerates its absence,
///    so a bare checkout still runs on defaults.
/// 2. **Environment Overrides**: Overlays values from environment variables prefixed with `KREG__`.
///    Nested structures are accessed using double underscores (e.g., `KREG__SYNC__BATCH_SIZE`
///    maps to `sync.batch_size`).
///
/// # Errors
/// This function will return an error if:
/// * An explicitly specified configuration file cannot be found.
/// * The content of the file or the environment does not match the structure of type `T`.
///
/// # Example
/// ```rust
/// use kreg_kernel::config::load_config;
///
/// #[derive(Default, serde::Deserialize)]
/// struct AppConfig {
///     port: u16,
/// }
///
/// let cfg: AppConfig = load_config(Some("config/local.toml")).unwrap_or_default();
/// ```
pub fn load_config<T>(path: Option<impl AsRef<Path>>) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    let (effective_path, required) = path.map_or_else(
        || (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        |p| (p.as_ref().to_path_buf(), true),
    );

    if required && !effective_path.exists() {
        return Err(ConfigError::NotFound {
            message: effective_path.display().to_string().into(),
            context: Some("Explicit --config path".into()),
        });
    }

    let builder = Config::builder()
        .add_source(File::from(effective_path.as_path()).required(required))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true)
                .convert_case(config::Case::Snake),
        );

    if effective_path.exists() {
        info!("Loading config from {}", effective_path.display());
    } else {
        debug!("No config file at {}, using defaults", effective_path.display());
    }

    let config = builder
        .build()
        .context("Failed to build config")?
        .try_deserialize::<T>()
        .context("Failed to deserialize config")?;

    Ok(config)
}

/// Loads the workspace-wide [`KregConfig`].
pub fn load_kreg_config(path: Option<impl AsRef<Path>>) -> Result<KregConfig, ConfigError> {
    load_config(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    #[serial]
    fn explicit_missing_file_is_an_error() {
        let err = load_kreg_config(Some("definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }

    #[test]
    #[serial]
    fn file_values_override_defaults() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("kreg.toml");
        fs::write(&path, "[kernel]\nversion = \"3.2.1\"\n\n[sync]\nbatch_size = 50\n")?;

        let cfg = load_kreg_config(Some(&path))?;
        assert_eq!(cfg.kernel.version, "3.2.1");
        assert_eq!(cfg.sync.batch_size, 50);
        assert_eq!(cfg.database.namespace, "kreg");
        Ok(())
    }
}
