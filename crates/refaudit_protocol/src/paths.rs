use std::path::PathBuf;

/// Resolve the refaudit home directory.
///
/// Priority:
/// 1) REFAUDIT_HOME
/// 2) the user's home directory
/// 3) ./.refaudit
pub fn refaudit_home() -> PathBuf {
    if let Ok(override_path) = std::env::var("REFAUDIT_HOME") {
        return PathBuf::from(override_path);
    }
    match dirs::home_dir() {
        Some(home) => home.join(".refaudit"),
        None => PathBuf::from(".").join(".refaudit"),
    }
}

/// Default logs directory: ~/.refaudit/logs
pub fn default_logs_dir() -> PathBuf {
    refaudit_home().join("logs")
}

/// Default config file: ~/.refaudit/config.toml
pub fn default_config_path() -> PathBuf {
    refaudit_home().join("config.toml")
}
