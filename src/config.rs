use std::path::Path;

use chatcore::filter::DEFAULT_FEED_LIMIT;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config: {0}")]
    Io(#[from] std::io::Error),

    #[error("parsing config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Channel shown when no private conversation is selected.
    pub channel: String,
    pub feed_limit: usize,
    /// Hide messages whose text is empty even if they carry a location or an
    /// attachment.
    pub require_content: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            channel: "general".to_string(),
            feed_limit: DEFAULT_FEED_LIMIT,
            require_content: false,
        }
    }
}

impl SessionConfig {
    /// Loads a JSON config file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_file_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"channel": "sharon", "require_content": true}}"#).unwrap();

        let config = SessionConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.channel, "sharon");
        assert!(config.require_content);
        assert_eq!(config.feed_limit, DEFAULT_FEED_LIMIT);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(matches!(
            SessionConfig::from_json_file("/definitely/not/here.json"),
            Err(ConfigError::Io(_))
        ));
    }
}
