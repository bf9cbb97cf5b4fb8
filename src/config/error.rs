//! Config error types for tailscope.
//!
//! Provides rich error messages with file locations and typo suggestions.

use super::types::KNOWN_KEYS;
use std::fmt;
use std::path::PathBuf;

/// Minimum similarity for a "did you mean" suggestion
const SUGGESTION_THRESHOLD: f64 = 0.8;

/// Error loading or parsing a config file.
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading the config file.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// YAML parse error.
    Parse {
        path: PathBuf,
        message: String,
        suggestion: Option<String>,
    },

    /// Validation error (semantic errors after parsing).
    Validation { path: PathBuf, message: String },
}

impl ConfigError {
    /// Build a parse error, suggesting a known key when the parser rejected an
    /// unknown one.
    pub fn from_saphyr_error(path: PathBuf, err: impl fmt::Display) -> Self {
        let message = err.to_string();
        let suggestion = unknown_field(&message).and_then(suggest_key);
        ConfigError::Parse {
            path,
            message,
            suggestion,
        }
    }

    /// Format error in Cargo-style format.
    pub fn format_cargo_style(&self) -> String {
        match self {
            ConfigError::Io { path, source } => {
                format!(
                    "error: cannot read config file\n  --> {}\n  |\n  = {}\n",
                    path.display(),
                    source
                )
            }
            ConfigError::Parse {
                path,
                message,
                suggestion,
            } => {
                let mut output = format!("error: {}\n  --> {}\n  |\n", message, path.display());
                if let Some(suggestion) = suggestion {
                    output.push_str(&format!("  = help: did you mean `{}`?\n", suggestion));
                }
                output
            }
            ConfigError::Validation { path, message } => {
                format!("error: {}\n  --> {}\n  |\n", message, path.display())
            }
        }
    }
}

/// Extract the offending key from serde's "unknown field `x`" message.
fn unknown_field(message: &str) -> Option<&str> {
    let rest = message.split("unknown field `").nth(1)?;
    rest.split('`').next()
}

/// Closest known key to `key`, if any is close enough.
pub fn suggest_key(key: &str) -> Option<String> {
    KNOWN_KEYS
        .iter()
        .map(|known| (strsim::jaro_winkler(key, known), *known))
        .filter(|(score, _)| *score >= SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, known)| known.to_string())
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_cargo_style())
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suggests_close_key() {
        assert_eq!(suggest_key("tial"), Some("tail".to_string()));
        assert_eq!(
            suggest_key("poll_interval"),
            Some("poll_interval_ms".to_string())
        );
        assert_eq!(suggest_key("completely_unrelated"), None);
    }

    #[test]
    fn test_parse_error_carries_suggestion() {
        let err = ConfigError::from_saphyr_error(
            PathBuf::from("tailscope.yaml"),
            "unknown field `folow`, expected one of `tail`, `follow`",
        );
        let display = err.to_string();
        assert!(display.contains("tailscope.yaml"));
        assert!(display.contains("did you mean `follow`?"));
    }

    #[test]
    fn test_validation_format() {
        let err = ConfigError::Validation {
            path: PathBuf::from("/etc/tailscope.yaml"),
            message: "poll_interval_ms must be positive".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "error: poll_interval_ms must be positive\n  --> /etc/tailscope.yaml\n  |\n"
        );
    }
}
