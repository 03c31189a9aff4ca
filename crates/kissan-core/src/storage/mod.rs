mod config;
pub mod credentials;

pub use config::{ApiConfig, Config, EngagementConfig, NotificationsConfig};

use std::path::PathBuf;

/// Returns `~/.config/kissan-growth[-dev]/` based on KISSAN_ENV.
///
/// Set KISSAN_ENV=dev to use the development data directory, or
/// KISSAN_CONFIG_DIR to point somewhere else entirely.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let dir = match std::env::var_os("KISSAN_CONFIG_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("KISSAN_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("kissan-growth-dev")
            } else {
                base_dir.join("kissan-growth")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
