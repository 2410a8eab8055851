//! Adapter configuration.
//!
//! Loaded from a JSON file; every field has a serde default so a partial
//! (or absent) config file works.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Relative location of the analysis server binary when no explicit path is
/// configured, resolved against the directory of the current executable.
const DEFAULT_SERVER_RELATIVE_PATH: &str = "OmniSharpServer/OmniSharp/bin/Debug/OmniSharp.exe";

/// Configuration for the completion-engine adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Start the analysis server automatically when a supported file is
    /// ready to parse, and stop it again on shutdown.
    #[serde(default = "default_true")]
    pub auto_start: bool,

    /// Path to the analysis server executable. When unset, the binary is
    /// expected next to the adapter executable under
    /// `OmniSharpServer/OmniSharp/bin/Debug/OmniSharp.exe`.
    #[serde(default)]
    pub server_path: Option<PathBuf>,

    /// Directory for the per-instance server log files.
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    /// Timeout for a single HTTP request to the server, in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Run the server executable under `mono`. Defaults to true everywhere
    /// except Windows.
    #[serde(default = "default_use_mono")]
    pub use_mono: bool,
}

fn default_true() -> bool {
    true
}

fn default_log_dir() -> PathBuf {
    std::env::temp_dir()
}

fn default_request_timeout_ms() -> u64 {
    5000
}

fn default_use_mono() -> bool {
    !cfg!(windows)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            auto_start: true,
            server_path: None,
            log_dir: default_log_dir(),
            request_timeout_ms: default_request_timeout_ms(),
            use_mono: default_use_mono(),
        }
    }
}

impl Config {
    /// Get the default config file path
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("omnibridge").join("config.json"))
    }

    /// Load configuration from a JSON file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::IoError(format!("{}: {}", path.as_ref().display(), e)))?;

        let config: Config = serde_json::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.as_ref().display(), e)))?;

        Ok(config)
    }

    /// Load from an explicit path, from the default location if one exists,
    /// or fall back to defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => match Self::default_config_path() {
                Some(default_path) if default_path.exists() => {
                    Self::load_from_file(&default_path)
                }
                _ => Ok(Self::default()),
            },
        }
    }

    /// The request timeout as a `Duration`.
    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.request_timeout_ms)
    }

    /// Resolve the analysis server executable path, verifying it exists.
    pub fn resolved_server_path(&self) -> Result<PathBuf, String> {
        let path = match &self.server_path {
            Some(path) => path.clone(),
            None => {
                let exe_dir = std::env::current_exe()
                    .ok()
                    .and_then(|p| p.parent().map(|d| d.to_path_buf()))
                    .unwrap_or_default();
                exe_dir.join(DEFAULT_SERVER_RELATIVE_PATH)
            }
        };

        if path.is_file() {
            Ok(path)
        } else {
            Err(format!(
                "analysis server binary not found at {}. Did you compile it? \
                 Set server_path in the config to the OmniSharp executable.",
                path.display()
            ))
        }
    }
}

/// Configuration error types
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(msg) => write!(f, "IO error: {msg}"),
            ConfigError::ParseError(msg) => write!(f, "Parse error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.auto_start);
        assert!(config.server_path.is_none());
        assert_eq!(config.request_timeout_ms, 5000);
        assert_eq!(config.use_mono, !cfg!(windows));
    }

    #[test]
    fn test_load_partial_config_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{ "auto_start": false, "server_path": "/opt/omnisharp/OmniSharp.exe" }"#,
        )
        .unwrap();

        let config = Config::load_from_file(&path).unwrap();
        assert!(!config.auto_start);
        assert_eq!(
            config.server_path,
            Some(PathBuf::from("/opt/omnisharp/OmniSharp.exe"))
        );
        // Untouched fields keep their defaults
        assert_eq!(config.request_timeout_ms, 5000);
        assert_eq!(config.log_dir, std::env::temp_dir());
    }

    #[test]
    fn test_load_invalid_json_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        match Config::load_from_file(&path) {
            Err(ConfigError::ParseError(msg)) => assert!(msg.contains("config.json")),
            other => panic!("expected parse error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        match Config::load_from_file("/nonexistent/config.json") {
            Err(ConfigError::IoError(_)) => {}
            other => panic!("expected IO error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_load_or_default_with_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "request_timeout_ms": 250 }"#).unwrap();

        let config = Config::load_or_default(Some(&path)).unwrap();
        assert_eq!(config.request_timeout(), std::time::Duration::from_millis(250));
    }

    #[test]
    fn test_resolved_server_path_missing_binary() {
        let config = Config {
            server_path: Some(PathBuf::from("/nonexistent/OmniSharp.exe")),
            ..Config::default()
        };
        let err = config.resolved_server_path().unwrap_err();
        assert!(err.contains("/nonexistent/OmniSharp.exe"), "got: {}", err);
        assert!(err.contains("not found"), "got: {}", err);
    }

    #[test]
    fn test_resolved_server_path_existing_binary() {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("OmniSharp.exe");
        std::fs::write(&exe, "").unwrap();

        let config = Config {
            server_path: Some(exe.clone()),
            ..Config::default()
        };
        assert_eq!(config.resolved_server_path().unwrap(), exe);
    }
}
