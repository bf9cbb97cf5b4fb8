//! Config loading for tailscope.
//!
//! Loads YAML config files, layers the project file over the global one and
//! validates the result.

use std::fs;
use std::path::Path;

use crate::config::discovery::DiscoveryResult;
use crate::config::error::ConfigError;
use crate::config::types::{RawConfig, ViewerConfig};
use tracing::debug;

/// Whether a YAML document holds nothing but whitespace and comments.
fn is_blank_yaml(content: &str) -> bool {
    content
        .lines()
        .map(str::trim)
        .all(|line| line.is_empty() || line.starts_with('#') || line == "---")
}

/// Load and parse a YAML config file.
fn load_file(path: &Path) -> Result<RawConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    if is_blank_yaml(&content) {
        return Ok(RawConfig::default());
    }

    let raw: RawConfig = serde_saphyr::from_str(&content)
        .map_err(|e| ConfigError::from_saphyr_error(path.to_path_buf(), e))?;
    validate(path, &raw)?;
    Ok(raw)
}

fn validate(path: &Path, raw: &RawConfig) -> Result<(), ConfigError> {
    if raw.poll_interval_ms == Some(0) {
        return Err(ConfigError::Validation {
            path: path.to_path_buf(),
            message: "poll_interval_ms must be greater than 0".to_string(),
        });
    }
    Ok(())
}

/// Load a single config file, ignoring discovery.
pub fn load_single_file(path: &Path) -> Result<ViewerConfig, ConfigError> {
    load_file(path).map(ViewerConfig::from)
}

/// Load config from discovered config files.
///
/// The global file is read first and the project file is layered on top, key
/// by key. Returns defaults if no config files exist.
pub fn load(discovery: &DiscoveryResult) -> Result<ViewerConfig, ConfigError> {
    let mut raw = RawConfig::default();

    if let Some(global_path) = &discovery.global_config {
        debug!(path = %global_path.display(), "loading global config");
        raw = raw.merge(load_file(global_path)?);
    }

    if let Some(project_path) = &discovery.project_config {
        debug!(path = %project_path.display(), "loading project config");
        raw = raw.merge(load_file(project_path)?);
    }

    Ok(ViewerConfig::from(raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn write(temp: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = temp.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_empty_discovery() {
        let config = load(&DiscoveryResult::default()).unwrap();
        assert_eq!(config, ViewerConfig::default());
    }

    #[test]
    fn test_load_project_config() {
        let temp = TempDir::new().unwrap();
        let path = write(
            &temp,
            "tailscope.yaml",
            "tail: 250\npoll_interval_ms: 2000\nfollow: false\n",
        );

        let config = load_single_file(&path).unwrap();
        assert_eq!(config.tail, 250);
        assert_eq!(config.poll_interval, Duration::from_secs(2));
        assert!(!config.follow);
        assert_eq!(config.search_debounce, Duration::from_millis(500));
    }

    #[test]
    fn test_project_overrides_global() {
        let temp = TempDir::new().unwrap();
        let global = write(&temp, "global.yaml", "tail: 5000\nsearch_debounce_ms: 300\n");
        let project = write(&temp, "tailscope.yaml", "tail: -1\n");

        let discovery = DiscoveryResult {
            project_config: Some(project),
            global_config: Some(global),
        };
        let config = load(&discovery).unwrap();
        assert_eq!(config.tail, -1);
        assert_eq!(config.search_debounce, Duration::from_millis(300));
    }

    #[test]
    fn test_load_empty_yaml() {
        let temp = TempDir::new().unwrap();
        let path = write(&temp, "tailscope.yaml", "# Empty config\n\n");
        assert_eq!(load_single_file(&path).unwrap(), ViewerConfig::default());
    }

    #[test]
    fn test_load_unknown_field_error() {
        let temp = TempDir::new().unwrap();
        let path = write(&temp, "tailscope.yaml", "tial: 10\n");

        let err = load_single_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        let display = err.to_string();
        assert!(display.contains("tailscope.yaml"));
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let temp = TempDir::new().unwrap();
        let path = write(&temp, "tailscope.yaml", "poll_interval_ms: 0\n");

        let err = load_single_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_single_file(Path::new("/no/such/tailscope.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
