/// Platform-specific path computation
///
/// Follows the XDG Base Directory specification on Linux (via `dirs`), and the
/// native conventions on macOS and Windows.
use std::path::PathBuf;

/// Platform-agnostic path utilities
pub struct PlatformPaths;

impl PlatformPaths {
    /// Get the appropriate config directory for the current platform
    ///
    /// - Windows: %APPDATA%
    /// - macOS: ~/Library/Application Support
    /// - Linux/Unix: $XDG_CONFIG_HOME or ~/.config
    pub fn config_dir() -> PathBuf {
        dirs::config_dir().unwrap_or_else(|| PathBuf::from("."))
    }

    /// Get default project-specific config directory
    ///
    /// Returns: {config_dir}/codebase-ai
    pub fn project_config_dir() -> PathBuf {
        Self::config_dir().join("codebase-ai")
    }

    /// Get default config file path
    ///
    /// Returns: {config_dir}/codebase-ai/config.toml
    pub fn default_config_path() -> PathBuf {
        Self::project_config_dir().join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_path() {
        let path = PlatformPaths::default_config_path();
        assert!(path.ends_with("codebase-ai/config.toml"));
    }

    #[test]
    fn test_project_config_dir_is_under_config_dir() {
        assert!(PlatformPaths::project_config_dir().starts_with(PlatformPaths::config_dir()));
    }
}
