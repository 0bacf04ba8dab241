//! Pipeline configuration

use livepatch_parse::DEFAULT_MIN_CONTENT_LEN;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// What a session expects the model to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    /// Edit the active page with delta blocks; whole-unit fallback at the end
    #[default]
    Delta,
    /// Generate whole pages and files with unit markers
    Pages,
}

impl std::fmt::Display for SessionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Delta => "delta",
            Self::Pages => "pages",
        })
    }
}

/// Orchestrator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Session mode
    pub mode: SessionMode,
    /// Unit bodies shorter than this (chars) are not yet complete
    pub min_unit_content_len: usize,
    /// Divisor for the approximate token count in progress reports
    pub chars_per_token: usize,
    /// Unit path used when neither the session nor the response names one
    pub default_page_path: String,
    /// Consult the legacy comment grammar when structured deltas are absent
    pub legacy_fallback: bool,
    /// Fail the session when no chunk arrives for this long
    pub idle_timeout_ms: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            mode: SessionMode::Delta,
            min_unit_content_len: DEFAULT_MIN_CONTENT_LEN,
            chars_per_token: 4,
            default_page_path: "index.html".to_string(),
            legacy_fallback: true,
            idle_timeout_ms: None,
        }
    }
}

impl PipelineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With session mode
    #[inline]
    #[must_use]
    pub fn with_mode(mut self, mode: SessionMode) -> Self {
        self.mode = mode;
        self
    }

    /// With minimum unit body length
    #[inline]
    #[must_use]
    pub fn with_min_unit_content_len(mut self, len: usize) -> Self {
        self.min_unit_content_len = len;
        self
    }

    /// With chars-per-token divisor
    #[inline]
    #[must_use]
    pub fn with_chars_per_token(mut self, chars: usize) -> Self {
        self.chars_per_token = chars;
        self
    }

    /// With default page path
    #[inline]
    #[must_use]
    pub fn with_default_page_path(mut self, path: impl Into<String>) -> Self {
        self.default_page_path = path.into();
        self
    }

    /// With or without the legacy grammar fallback
    #[inline]
    #[must_use]
    pub fn with_legacy_fallback(mut self, enabled: bool) -> Self {
        self.legacy_fallback = enabled;
        self
    }

    /// With an idle timeout between chunks
    #[inline]
    #[must_use]
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Idle timeout as a [`Duration`]
    #[must_use]
    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout_ms.map(Duration::from_millis)
    }

    /// Parse and validate TOML
    ///
    /// # Errors
    /// [`ConfigError::Parse`] on malformed TOML, [`ConfigError::Invalid`] when
    /// a value is out of range.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    ///
    /// # Errors
    /// [`ConfigError::Io`] when the file cannot be read, otherwise as
    /// [`Self::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Check value ranges
    ///
    /// # Errors
    /// [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chars_per_token == 0 {
            return Err(ConfigError::Invalid("chars_per_token must be at least 1".into()));
        }
        if self.default_page_path.trim().is_empty() {
            return Err(ConfigError::Invalid("default_page_path must not be empty".into()));
        }
        if self.idle_timeout_ms == Some(0) {
            return Err(ConfigError::Invalid("idle_timeout_ms must be positive".into()));
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
