//! Library configuration.
//!
//! Loaded from TOML or JSON (chosen by file extension), or parsed from a string. Every
//! section is optional; missing fields take their defaults.
//!
//! ```toml
//! [xinput]
//! max_revision = "1.4"   # never bind anything newer
//! enable = true
//!
//! [registry]
//! max_controllers = 2
//!
//! [effects.hit]
//! keyframes = [
//!     { time = 0,   left = 1.0, right = 0.2 },
//!     { time = 120, left = 0.0, right = 0.0 },
//! ]
//!
//! [effects.engine]
//! loops = true
//! keyframes = [{ time = 0, left = 0.1, right = 0.0 }, { time = 500, left = 0.3, right = 0.0 }]
//! ```

use crate::error::Result;
use crate::keyboard::Keyboard;
use crate::metadata::DeviceKind;
use crate::mouse::Mouse;
use crate::vibration::VibrationSequence;
use crate::xinput::{Controller, Revision};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub xinput: XInputConfig,
    pub registry: RegistryConfig,
    /// Named vibration effects.
    pub effects: BTreeMap<String, VibrationSequence>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct XInputConfig {
    /// Newest revision the resolver may bind. `None` allows all.
    pub max_revision: Option<Revision>,
    /// `false` binds the library with reporting turned off.
    pub enable: bool,
}

impl Default for XInputConfig {
    fn default() -> Self {
        Self {
            max_revision: None,
            enable: true,
        }
    }
}

/// Per-kind device caps. Values above the fixed maximum are clamped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub max_keyboards: usize,
    pub max_mice: usize,
    pub max_controllers: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_keyboards: Keyboard::MAX_DEVICES,
            max_mice: Mouse::MAX_DEVICES,
            max_controllers: Controller::MAX_DEVICES,
        }
    }
}

impl RegistryConfig {
    /// Configured cap for `kind`; `None` for kinds without a registry.
    pub fn limit(&self, kind: DeviceKind) -> Option<usize> {
        match kind {
            DeviceKind::Keyboard => Some(self.max_keyboards),
            DeviceKind::Mouse => Some(self.max_mice),
            DeviceKind::Controller => Some(self.max_controllers),
            DeviceKind::Hid => None,
        }
    }
}

impl Config {
    /// Load from a `.json` file, or TOML for any other extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        let config = if is_json {
            Self::from_json_str(&text)?
        } else {
            Self::from_toml_str(&text)?
        };
        debug!(path = %path.display(), effects = config.effects.len(), "loaded config");
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn effect(&self, name: &str) -> Option<&VibrationSequence> {
        self.effects.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vibration::Vibration;
    use crate::InputError;

    #[test]
    fn empty_document_is_default() {
        let cfg = Config::from_toml_str("").unwrap();
        assert_eq!(cfg, Config::default());
        assert!(cfg.xinput.enable);
        assert_eq!(cfg.registry.max_mice, 4);
    }

    #[test]
    fn toml_sections_parse() {
        let cfg = Config::from_toml_str(
            r#"
            [xinput]
            max_revision = "1.3"

            [registry]
            max_controllers = 2

            [effects.hit]
            keyframes = [
                { time = 100, left = 0.0, right = 0.0 },
                { time = 0, left = 1.0, right = 0.5 },
            ]
            "#,
        )
        .unwrap();

        assert_eq!(cfg.xinput.max_revision, Some(Revision::V1_3));
        assert_eq!(cfg.registry.max_controllers, 2);
        assert_eq!(cfg.registry.max_keyboards, 4);

        let hit = cfg.effect("hit").unwrap();
        assert_eq!(hit.keyframe_times(), vec![0, 100]);
        assert_eq!(hit.at(0), Vibration::new(1.0, 0.5).unwrap());
        assert!(cfg.effect("missing").is_none());
    }

    #[test]
    fn registry_limits_by_kind() {
        let cfg = Config::from_toml_str("[registry]\nmax_mice = 1").unwrap();
        assert_eq!(cfg.registry.limit(DeviceKind::Mouse), Some(1));
        assert_eq!(cfg.registry.limit(DeviceKind::Keyboard), Some(4));
        assert_eq!(cfg.registry.limit(DeviceKind::Hid), None);
    }

    #[test]
    fn invalid_keyframes_are_rejected() {
        let err = Config::from_toml_str(
            r#"
            [effects.bad]
            keyframes = [{ time = -5, left = 0.0, right = 0.0 }]
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, InputError::ConfigToml(_)));
    }

    #[test]
    fn json_is_chosen_by_extension() {
        let dir = std::env::temp_dir().join(format!("padstate-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("input.JSON");
        std::fs::write(&path, r#"{ "xinput": { "enable": false } }"#).unwrap();

        let cfg = Config::load(&path).unwrap();
        assert!(!cfg.xinput.enable);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = Config::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, InputError::ConfigIo(_)));
    }
}
