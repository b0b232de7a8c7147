//! Oracle credential storage
//!
//! Lookup order: environment, OS keyring, then a 0600 fallback file in the
//! config directory for systems without a usable keyring.

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

const SERVICE_NAME: &str = "tractorbeam";
const API_KEY_USERNAME: &str = "oracle-api-key";
const API_KEY_FILE: &str = "api_key.txt";

/// Environment variables checked before any stored credential
pub const API_KEY_ENV_VARS: &[&str] = &["TRACTORBEAM_API_KEY", "OPENAI_API_KEY"];

/// Get the path for the fallback API key file
fn api_key_file_path() -> Result<PathBuf> {
    let base = crate::config::project_dirs()?;
    let dir = base.config_dir();
    fs::create_dir_all(dir).context("Failed to create config directory")?;
    Ok(dir.join(API_KEY_FILE))
}

/// Set API key - tries keyring first, falls back to file
pub fn set_api_key(key: &str) -> Result<()> {
    let key = key.trim();
    if key.is_empty() {
        anyhow::bail!("API key must not be empty");
    }

    if let Ok(entry) = keyring::Entry::new(SERVICE_NAME, API_KEY_USERNAME) {
        if entry.set_password(key).is_ok() {
            return Ok(());
        }
    }

    save_to_file(key)?;
    tracing::info!("Keyring unavailable, stored API key in config directory");
    Ok(())
}

fn save_to_file(key: &str) -> Result<()> {
    let path = api_key_file_path()?;
    fs::write(&path, key).context("Failed to write API key file")?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o600))
            .context("Failed to set file permissions")?;
    }

    Ok(())
}

fn key_from_env() -> Option<String> {
    API_KEY_ENV_VARS
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}

/// Get API key if one is configured anywhere.
///
/// A missing key is not an error here; oracle calls report it when they
/// actually need the credential.
pub fn get_api_key() -> Option<String> {
    if let Some(key) = key_from_env() {
        return Some(key);
    }

    if let Ok(entry) = keyring::Entry::new(SERVICE_NAME, API_KEY_USERNAME) {
        if let Ok(key) = entry.get_password() {
            if !key.trim().is_empty() {
                return Some(key.trim().to_string());
            }
        }
    }

    let path = api_key_file_path().ok()?;
    let key = fs::read_to_string(path).ok()?;
    let key = key.trim();
    if key.is_empty() { None } else { Some(key.to_string()) }
}

/// Delete stored API key from both keyring and file
pub fn delete_api_key() -> Result<()> {
    if let Ok(entry) = keyring::Entry::new(SERVICE_NAME, API_KEY_USERNAME) {
        let _ = entry.delete_credential();
    }

    let path = api_key_file_path()?;
    if path.exists() {
        fs::remove_file(&path).context("Failed to remove API key file")?;
    }
    Ok(())
}

/// Check if an API key is available
pub fn has_api_key() -> bool {
    get_api_key().is_some()
}
