//! Resolution of the generation-API key.
//!
//! The key is looked up in this order:
//! 1. the `OPENAI_API_KEY` environment variable
//! 2. the `OPENAI_API_KEY` entry of a TOML secrets file
//!    (`--secrets <path>`, default `.trailday/secrets.toml`)

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use log::{debug, info};

use crate::constants::MODEL_API_KEY_ENV_NAME;
use crate::error::ConfigError;

/// Returns the API key, failing before any generation attempt if it is absent.
///
/// # Errors
///
/// Returns [`ConfigError::MissingApiKey`] when neither source provides a
/// non-empty key, or a read/parse error when the secrets file exists but is
/// unusable.
pub fn resolve_api_key(secrets_path: &Path) -> Result<String, ConfigError> {
    let from_env = std::env::var(MODEL_API_KEY_ENV_NAME).ok();
    resolve_api_key_from(from_env, secrets_path)
}

/// Same as [`resolve_api_key`] with the environment value passed in.
///
/// # Errors
///
/// See [`resolve_api_key`].
pub fn resolve_api_key_from(
    from_env: Option<String>,
    secrets_path: &Path,
) -> Result<String, ConfigError> {
    if let Some(key) = from_env.filter(|key| !key.trim().is_empty()) {
        info!("Using API key from {MODEL_API_KEY_ENV_NAME}");
        return Ok(key.trim().to_string());
    }

    let path = secrets_path.display().to_string();
    if !secrets_path.exists() {
        debug!("Secrets file {path} does not exist");
        return Err(ConfigError::MissingApiKey {
            env: MODEL_API_KEY_ENV_NAME,
            path,
        });
    }

    let content = fs::read_to_string(secrets_path).map_err(|source| ConfigError::SecretsRead {
        path: path.clone(),
        source,
    })?;
    let secrets: HashMap<String, toml::Value> =
        toml::from_str(&content).map_err(|source| ConfigError::SecretsParse {
            path: path.clone(),
            source,
        })?;

    match secrets
        .get(MODEL_API_KEY_ENV_NAME)
        .and_then(toml::Value::as_str)
        .map(str::trim)
    {
        Some(key) if !key.is_empty() => {
            info!("Using API key from {path}");
            Ok(key.to_string())
        }
        _ => Err(ConfigError::MissingApiKey {
            env: MODEL_API_KEY_ENV_NAME,
            path,
        }),
    }
}
