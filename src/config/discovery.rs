//! Config discovery for tailscope.
//!
//! Walks parent directories to find `tailscope.yaml` and checks for global config
//! at `~/.config/tailscope/config.yaml`.

use std::path::{Path, PathBuf};

/// Project config filename to search for in parent directories.
pub const PROJECT_CONFIG_NAME: &str = "tailscope.yaml";

/// Global config filename within the tailscope config directory.
pub const GLOBAL_CONFIG_NAME: &str = "config.yaml";

/// Result of config discovery.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryResult {
    /// Full path to the project config file (`tailscope.yaml`).
    pub project_config: Option<PathBuf>,
    /// Full path to the global config file.
    pub global_config: Option<PathBuf>,
}

impl DiscoveryResult {
    /// Returns true if any config was found (project or global).
    pub fn has_config(&self) -> bool {
        self.project_config.is_some() || self.global_config.is_some()
    }
}

fn is_file(path: &Path) -> bool {
    path.try_exists().unwrap_or(false) && path.is_file()
}

/// Discover config files starting from the current working directory.
pub fn discover() -> DiscoveryResult {
    let cwd = std::env::current_dir()
        .ok()
        .map(|dir| dir.canonicalize().unwrap_or(dir));
    discover_from(cwd.as_deref(), dirs::config_dir().as_deref())
}

/// Discover config files starting from `start`, with the global config looked
/// up under `config_dir`.
pub fn discover_from(start: Option<&Path>, config_dir: Option<&Path>) -> DiscoveryResult {
    let mut result = DiscoveryResult::default();

    if let Some(config_dir) = config_dir {
        let global_config_path = config_dir.join("tailscope").join(GLOBAL_CONFIG_NAME);
        if is_file(&global_config_path) {
            result.global_config = Some(global_config_path);
        }
    }

    if let Some(start) = start {
        result.project_config = start
            .ancestors()
            .map(|ancestor| ancestor.join(PROJECT_CONFIG_NAME))
            .find(|candidate| is_file(candidate));
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_finds_config_in_start_dir() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join(PROJECT_CONFIG_NAME);
        fs::write(&config_path, "tail: 10\n").unwrap();

        let result = discover_from(Some(temp.path()), None);
        assert_eq!(result.project_config, Some(config_path));
        assert!(result.global_config.is_none());
        assert!(result.has_config());
    }

    #[test]
    fn test_finds_config_in_parent_dir() {
        let temp = TempDir::new().unwrap();
        let subdir = temp.path().join("a").join("b");
        fs::create_dir_all(&subdir).unwrap();
        let config_path = temp.path().join(PROJECT_CONFIG_NAME);
        fs::write(&config_path, "tail: 10\n").unwrap();

        let result = discover_from(Some(&subdir), None);
        assert_eq!(result.project_config, Some(config_path));
    }

    #[test]
    fn test_finds_global_config() {
        let temp = TempDir::new().unwrap();
        let global_dir = temp.path().join("tailscope");
        fs::create_dir_all(&global_dir).unwrap();
        fs::write(global_dir.join(GLOBAL_CONFIG_NAME), "follow: false\n").unwrap();

        let result = discover_from(None, Some(temp.path()));
        assert_eq!(
            result.global_config,
            Some(global_dir.join(GLOBAL_CONFIG_NAME))
        );
        assert!(result.project_config.is_none());
    }

    #[test]
    fn test_directory_named_like_config_is_ignored() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(PROJECT_CONFIG_NAME)).unwrap();

        let result = discover_from(Some(temp.path()), None);
        assert!(result.project_config.is_none());
    }
}
