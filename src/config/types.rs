use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::port::LineSettings;

/// Root configuration container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub defaults: Defaults,
    /// Named port profiles, keyed by profile name.
    #[serde(default)]
    pub profiles: BTreeMap<String, PortProfile>,
}

/// Default settings for the application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Defaults {
    /// Profile used when none is named on the command line.
    #[serde(default)]
    pub profile: Option<String>,
}

/// A device path plus the line parameters to apply after opening it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortProfile {
    /// Serial device (e.g., "/dev/ttyUSB0").
    pub device: PathBuf,
    /// Missing fields take their defaults (115200 8N1, no flow control).
    #[serde(flatten)]
    pub line: LineSettings,
}

impl Config {
    pub fn profile(&self, name: &str) -> Option<&PortProfile> {
        self.profiles.get(name)
    }

    /// The profile named in `[defaults]`, if any.
    pub fn default_profile(&self) -> Option<(&str, &PortProfile)> {
        let name = self.defaults.profile.as_deref()?;
        self.profiles
            .get_key_value(name)
            .map(|(name, profile)| (name.as_str(), profile))
    }
}
