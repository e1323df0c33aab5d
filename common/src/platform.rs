//! Platform-specific utilities for database paths.
//!
//! Provides cross-platform functions to determine where the message store
//! lives on Windows, macOS, and Linux.

use std::env;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "SmsStore";

/// Get the default database directory for the current platform.
///
/// Returns platform-specific paths:
/// - **Windows**: `%APPDATA%\SmsStore\db\`
/// - **macOS**: `~/Library/Application Support/SmsStore/db/`
/// - **Linux**: `$XDG_DATA_HOME/SmsStore/db/` or `~/.local/share/SmsStore/db/`
pub fn get_default_db_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        get_windows_db_path()
    }

    #[cfg(target_os = "macos")]
    {
        get_macos_db_path()
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        get_unix_db_path()
    }
}

#[cfg(target_os = "windows")]
fn get_windows_db_path() -> PathBuf {
    match env::var("APPDATA") {
        Ok(appdata) => PathBuf::from(appdata).join(APP_DIR).join("db"),
        Err(_) => fallback_db_path(),
    }
}

#[cfg(target_os = "macos")]
fn get_macos_db_path() -> PathBuf {
    match env::var_os("HOME") {
        Some(home) => PathBuf::from(home)
            .join("Library")
            .join("Application Support")
            .join(APP_DIR)
            .join("db"),
        None => fallback_db_path(),
    }
}

/// Follows the XDG Base Directory specification.
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn get_unix_db_path() -> PathBuf {
    if let Ok(xdg_data_home) = env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg_data_home).join(APP_DIR).join("db");
    }

    match env::var_os("HOME") {
        Some(home) => PathBuf::from(home)
            .join(".local")
            .join("share")
            .join(APP_DIR)
            .join("db"),
        None => fallback_db_path(),
    }
}

fn fallback_db_path() -> PathBuf {
    PathBuf::from(".").join(APP_DIR).join("db")
}

/// Ensure the database directory exists, creating it if necessary.
pub fn ensure_db_directory(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Get a database path with a custom name within the default directory.
///
/// ```
/// use common::platform::get_named_db_path;
///
/// let sms_db = get_named_db_path("sms");
/// assert!(sms_db.ends_with("sms"));
/// ```
pub fn get_named_db_path(name: &str) -> PathBuf {
    get_default_db_path().join(name)
}
