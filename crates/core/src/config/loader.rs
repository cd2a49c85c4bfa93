use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Load configuration from file with environment variable overrides.
///
/// `ANTHROPIC_API_KEY` fills `analysis.api_key`; `CHARTWATCH_`-prefixed
/// variables override anything else, with `__` separating nested keys
/// (e.g. `CHARTWATCH_RUN__MAX_CONCURRENT_ITEMS=5`).
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(
            Env::raw()
                .only(&["ANTHROPIC_API_KEY"])
                .map(|_| "analysis.api_key".into()),
        )
        .merge(Env::prefixed("CHARTWATCH_").split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(config)
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}
