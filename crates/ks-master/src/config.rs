//! Session configuration, loaded from YAML.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::pool::MAX_VISORS;

/// How end-of-playback is detected.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// Status polling only; engine callbacks are ignored.
    #[default]
    Polling,
    /// Engine end notices are honored as well as polling.
    Callback,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Number of visor slots (at most `MAX_VISORS`)
    pub capacity: usize,
    pub dispatch: DispatchMode,
    /// Engine notices that can wait for the next update
    pub mailbox_capacity: usize,
    /// Ranges each visor buffer holds before growing
    pub buffer_reserve: usize,
    /// Return stopped visors to the pool automatically
    pub auto_release: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            capacity: 16,
            dispatch: DispatchMode::Polling,
            mailbox_capacity: 64,
            buffer_reserve: 8,
            auto_release: true,
        }
    }
}

impl SessionConfig {
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let config: SessionConfig = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a YAML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml(&text)?;
        log::info!("loaded session config from {}", path.display());
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::Invalid("capacity must be at least 1"));
        }
        if self.capacity > MAX_VISORS {
            return Err(ConfigError::Invalid("capacity exceeds MAX_VISORS"));
        }
        if self.mailbox_capacity == 0 {
            return Err(ConfigError::Invalid("mailbox_capacity must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config = SessionConfig::from_yaml("dispatch: callback\n").unwrap();
        assert_eq!(config.dispatch, DispatchMode::Callback);
        assert_eq!(config.capacity, SessionConfig::default().capacity);
        assert!(config.auto_release);
    }

    #[test]
    fn full_document_parses() {
        let yaml = "capacity: 4\ndispatch: polling\nmailbox_capacity: 8\nbuffer_reserve: 2\nauto_release: false\n";
        let config = SessionConfig::from_yaml(yaml).unwrap();
        assert_eq!(
            config,
            SessionConfig {
                capacity: 4,
                dispatch: DispatchMode::Polling,
                mailbox_capacity: 8,
                buffer_reserve: 2,
                auto_release: false,
            }
        );
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let err = SessionConfig::from_yaml("capacity: 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn oversized_capacity_is_rejected() {
        let yaml = format!("capacity: {}\n", MAX_VISORS + 1);
        assert!(matches!(
            SessionConfig::from_yaml(&yaml),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn unknown_dispatch_mode_is_a_parse_error() {
        assert!(matches!(
            SessionConfig::from_yaml("dispatch: telepathy\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn yaml_output_reloads() {
        let config = SessionConfig {
            capacity: 3,
            ..SessionConfig::default()
        };
        let text = config.to_yaml().unwrap();
        assert_eq!(SessionConfig::from_yaml(&text).unwrap(), config);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = SessionConfig::load(Path::new("/nonexistent/koreosync.yaml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/koreosync.yaml"));
    }
}
