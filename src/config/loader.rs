use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::types::Config;

/// Why a port profile file could not be used.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read port profiles from '{path}': {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed port profiles in '{path}': {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Inconsistent port profiles: {message}")]
    Inconsistent { message: String },
}

impl Config {
    /// `<config dir>/serial-stream/config.toml`, or `./serial-stream/...`
    /// when the platform has no config directory.
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        config_dir.join("serial-stream").join("config.toml")
    }

    /// Profiles from the per-user file. No file means no profiles.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path();
        if !path.exists() {
            return Ok(Config::default());
        }
        Self::load_from(&path)
    }

    /// Profiles from a file named on the command line; it must exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&content, path)
    }

    fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content).map_err(|e| ConfigError::Malformed {
            path: path.to_path_buf(),
            source: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// The `[defaults]` profile must exist and every profile needs a device.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(name) = &self.defaults.profile {
            if !self.profiles.contains_key(name) {
                return Err(ConfigError::Inconsistent {
                    message: format!("Default profile '{}' not found in profiles", name),
                });
            }
        }

        for (name, profile) in &self.profiles {
            if profile.device.as_os_str().is_empty() {
                return Err(ConfigError::Inconsistent {
                    message: format!("Profile '{}' has an empty device path", name),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::{BaudRate, CharacterSize, FlowControl, Parity, StopBits};

    fn parse(content: &str) -> Result<Config, ConfigError> {
        Config::parse(content, Path::new("test.toml"))
    }

    #[test]
    fn empty_file_is_default_config() {
        let config = parse("").unwrap();
        assert_eq!(config, Config::default());
        assert!(config.default_profile().is_none());
    }

    #[test]
    fn profile_fields_default_when_missing() {
        let config = parse(
            r#"
[profiles.bare]
device = "/dev/ttyS0"
"#,
        )
        .unwrap();
        let profile = config.profile("bare").unwrap();
        assert_eq!(profile.line.baud_rate, BaudRate::DEFAULT);
        assert_eq!(profile.line.character_size, CharacterSize::Eight);
        assert_eq!(profile.line.parity, Parity::None);
        assert_eq!(profile.line.vtime, 0);
    }

    #[test]
    fn full_profile_parses() {
        let config = parse(
            r#"
[defaults]
profile = "gps"

[profiles.gps]
device = "/dev/ttyUSB0"
baud_rate = 9600
character_size = 7
parity = "even"
stop_bits = 2
flow_control = "software"
vmin = 1
vtime = 10
"#,
        )
        .unwrap();
        let (name, profile) = config.default_profile().unwrap();
        assert_eq!(name, "gps");
        assert_eq!(profile.device, PathBuf::from("/dev/ttyUSB0"));
        assert_eq!(profile.line.baud_rate, BaudRate::Baud9600);
        assert_eq!(profile.line.character_size, CharacterSize::Seven);
        assert_eq!(profile.line.parity, Parity::Even);
        assert_eq!(profile.line.stop_bits, StopBits::Two);
        assert_eq!(profile.line.flow_control, FlowControl::Software);
        assert_eq!(profile.line.vmin, 1);
        assert_eq!(profile.line.vtime, 10);
    }

    #[test]
    fn unsupported_baud_rate_is_a_parse_error() {
        let err = parse(
            r#"
[profiles.odd]
device = "/dev/ttyS0"
baud_rate = 12345
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { .. }));
    }

    #[test]
    fn invalid_parity_name_is_a_parse_error() {
        let err = parse(
            r#"
[profiles.odd]
device = "/dev/ttyS0"
parity = "invalid"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { .. }));
    }

    #[test]
    fn vtime_out_of_range_is_a_parse_error() {
        let err = parse(
            r#"
[profiles.slow]
device = "/dev/ttyS0"
vtime = 256
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { .. }));
    }

    #[test]
    fn missing_default_profile_fails_validation() {
        let err = parse(
            r#"
[defaults]
profile = "nope"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Inconsistent { .. }));
    }

    #[test]
    fn empty_device_fails_validation() {
        let err = parse(
            r#"
[profiles.blank]
device = ""
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Inconsistent { .. }));
    }
}
