use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Environment variable prefix (`MOVIESHELF_API_URL` -> `api.url`)
pub const ENV_PREFIX: &str = "MOVIESHELF_";

/// Variables under the prefix that belong to the CLI, not the config tree.
const CLI_ONLY_VARS: &[&str] = &["CONFIG", "PASSWORD"];

/// Environment overrides. Only the first `_` after the prefix separates the
/// section from the key, so `MOVIESHELF_VALIDATION_MIN_YEAR` lands on
/// `validation.min_year`.
fn env_overrides(prefix: &str) -> Env {
    Env::prefixed(prefix)
        .ignore(CLI_ONLY_VARS)
        .map(|key| key.as_str().replacen('_', ".", 1).into())
}

/// Load configuration from file with environment variable overrides
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    Figment::new()
        .merge(Toml::file(path))
        .merge(env_overrides(ENV_PREFIX))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Load configuration from environment variables only.
///
/// The API base URL is normally injected this way by the deployment.
pub fn load_config_from_env() -> Result<Config, ConfigError> {
    Figment::new()
        .merge(env_overrides(ENV_PREFIX))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Parse a TOML document without consulting the environment.
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}
