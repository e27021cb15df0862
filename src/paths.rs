//! Path resolution for berth
//!
//! # Environment Variables
//!
//! - `BERTH_CONFIG_DIR` - Override config directory (e.g., `~/dotfiles/berth`)
//! - `BERTH_HOSTS_FILE` - Override the hosts file that gets patched
//!
//! # Path Resolution Priority
//!
//! For config_dir():
//! 1. `BERTH_CONFIG_DIR` environment variable
//! 2. `~/.berth`

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "BERTH_CONFIG_DIR";

/// Environment variable for hosts file override
pub const ENV_HOSTS_FILE: &str = "BERTH_HOSTS_FILE";

/// Specification file name inside the config directory
pub const SPEC_FILE: &str = "berth.toml";

#[cfg(windows)]
const SYSTEM_HOSTS: &str = r"C:\Windows\System32\drivers\etc\hosts";
#[cfg(not(windows))]
const SYSTEM_HOSTS: &str = "/etc/hosts";

/// Get the berth config directory path
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = expand(&dir);
        log::debug!(
            "Using config dir from {}: {}",
            ENV_CONFIG_DIR,
            path.display()
        );
        return Ok(path);
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".berth");
    log::debug!("Using default config dir: {}", path.display());
    Ok(path)
}

/// Default specification file: `<config_dir>/berth.toml`
pub fn spec_file() -> Result<PathBuf> {
    Ok(config_dir()?.join(SPEC_FILE))
}

/// Hosts file to patch
pub fn hosts_file() -> PathBuf {
    match std::env::var(ENV_HOSTS_FILE) {
        Ok(path) => expand(&path),
        Err(_) => PathBuf::from(SYSTEM_HOSTS),
    }
}

/// Expand ~ and environment variables in a path string.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    /// Helper to run a test with temporary env var
    ///
    /// # Safety
    /// This function uses unsafe env::set_var/remove_var which can cause issues
    /// if other threads read environment variables concurrently.
    /// Only use in single-threaded test contexts.
    fn with_env_var<F, R>(key: &str, value: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let original = env::var(key).ok();
        // SAFETY: Tests run in isolation and don't read env vars concurrently
        unsafe { env::set_var(key, value) };
        let result = f();
        match original {
            // SAFETY: Tests run in isolation
            Some(v) => unsafe { env::set_var(key, v) },
            None => unsafe { env::remove_var(key) },
        }
        result
    }

    #[test]
    fn test_config_dir_env_override() {
        with_env_var(ENV_CONFIG_DIR, "/custom/berth", || {
            assert_eq!(config_dir().unwrap(), PathBuf::from("/custom/berth"));
            assert_eq!(
                spec_file().unwrap(),
                PathBuf::from("/custom/berth/berth.toml")
            );
        });

        let home = dirs::home_dir().unwrap();
        with_env_var(ENV_CONFIG_DIR, "~/dotfiles/berth-tilde-test", || {
            assert_eq!(
                config_dir().unwrap(),
                home.join("dotfiles").join("berth-tilde-test")
            );
        });
    }

    #[test]
    fn test_hosts_file_override() {
        with_env_var(ENV_HOSTS_FILE, "/tmp/berth-hosts", || {
            assert_eq!(hosts_file(), PathBuf::from("/tmp/berth-hosts"));
        });
    }

    #[test]
    fn test_expand_plain_path() {
        assert_eq!(expand("/srv/app"), PathBuf::from("/srv/app"));
    }
}
