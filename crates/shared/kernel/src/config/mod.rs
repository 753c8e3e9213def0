use config::{Config, Environment, File};
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use tracing::info;

/// Prefix of environment overrides (`VENEER__BUS__RELAY=false`).
pub const ENV_PREFIX: &str = "VENEER";

/// File stem looked up in the working directory when no explicit path is given.
pub const DEFAULT_CONFIG_FILE: &str = "veneer";

/// Custom error type for config loading.
#[veneer_derive::veneer_error]
pub enum ConfigError {
    #[error("Config error{}: {source}", format_context(.context))]
    Config { source: config::ConfigError, context: Option<Cow<'static, str>> },
}

/// A reusable configuration loader that combines file-based settings with environment overrides.
///
/// 1. **Base File**: an explicit `path` must exist. Without one, `veneer.{toml,json,yaml,..}`
///    in the working directory is used when present and skipped otherwise, so a process
///    can run on defaults plus environment alone.
/// 2. **Environment Overrides**: variables prefixed with `VENEER__`, nested with double
///    underscores (`VENEER__STORAGE__DATA_DIR` maps to `storage.data_dir`).
///
/// # Errors
/// Returns [`ConfigError::Config`] if an explicit file is missing or unreadable, or if the
/// merged sources do not deserialize into `T`.
///
/// # Example
/// ```rust
/// use veneer_domain::config::VeneerConfig;
/// use veneer_kernel::config::load_config;
///
/// let cfg: VeneerConfig = load_config(None::<&str>).unwrap_or_default();
/// assert!(!cfg.namespace.is_empty());
/// ```
pub fn load_config<T>(path: Option<impl AsRef<Path>>) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    let (effective_path, required) = path.map_or_else(
        || (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        |p| (p.as_ref().to_path_buf(), true),
    );

    info!(path = %effective_path.display(), required, "Loading config");
    layered(&effective_path, required, environment())
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .convert_case(config::Case::Snake)
        .try_parsing(true)
}

fn layered<T>(path: &Path, required: bool, env: Environment) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    let config = Config::builder()
        .add_source(File::from(path).required(required))
        .add_source(env)
        .build()
        .context("Failed to build config")?
        .try_deserialize::<T>()
        .context("Failed to deserialize config")?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use veneer_domain::config::VeneerConfig;

    #[test]
    fn environment_overrides_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(b"namespace = \"fromfile\"\n").unwrap();

        let vars = HashMap::from([
            ("VENEER__NAMESPACE".to_owned(), "fromenv".to_owned()),
            ("VENEER__BUS__TAP_CAPACITY".to_owned(), "16".to_owned()),
        ]);
        let cfg: VeneerConfig =
            layered(file.path(), true, environment().source(Some(vars))).unwrap();

        assert_eq!(cfg.namespace, "fromenv");
        assert_eq!(cfg.bus.tap_capacity, 16);
    }
}
