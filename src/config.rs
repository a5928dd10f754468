//! Configuration for the panic gesture agent.

use crate::core::{CHOP_THRESHOLD, REFRACTORY_PERIOD_MS, RESET_WINDOW_MS, TRIGGER_THRESHOLD};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration for the agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Timing and threshold parameters of both detectors
    pub detectors: DetectorSettings,

    /// Which gestures to listen for
    pub gestures: GestureSelection,

    /// Minimum spacing between two deliveries (0 delivers every trigger)
    #[serde(with = "duration_ms_serde")]
    pub min_delivery_interval: Duration,

    /// Path for storing the transparency log
    pub data_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("panic-gesture-agent");

        Self {
            detectors: DetectorSettings::default(),
            gestures: GestureSelection::default(),
            min_delivery_interval: Duration::ZERO,
            data_path: data_dir,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`, or defaults if it does not exist.
    ///
    /// A file that exists but does not parse or validate is an error, never
    /// silently replaced by defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content =
                std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        self.validate()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("panic-gesture-agent")
            .join("config.json")
    }

    /// Ensure all required directories exist.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.data_path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.detectors.validate()
    }

    pub fn transparency_path(&self) -> PathBuf {
        self.data_path.join("transparency.json")
    }
}

/// Detector parameters. Fixed for the lifetime of an engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectorSettings {
    /// Power-press: a gap longer than this discards the partial sequence
    pub reset_window_ms: u64,
    /// Chop: minimum spacing between two counted chops
    pub refractory_period_ms: u64,
    /// Chop: |z| must exceed this (m/s²) to qualify
    pub chop_threshold: f64,
    /// Qualifying events needed to trigger, for both detectors
    pub trigger_threshold: u32,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            reset_window_ms: RESET_WINDOW_MS,
            refractory_period_ms: REFRACTORY_PERIOD_MS,
            chop_threshold: CHOP_THRESHOLD,
            trigger_threshold: TRIGGER_THRESHOLD,
        }
    }
}

impl DetectorSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.trigger_threshold == 0 {
            return Err(ConfigError::Invalid(
                "trigger_threshold must be at least 1".to_string(),
            ));
        }
        if !self.chop_threshold.is_finite() || self.chop_threshold < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "chop_threshold must be a finite, non-negative number (got {})",
                self.chop_threshold
            )));
        }
        if self.reset_window_ms > i64::MAX as u64 || self.refractory_period_ms > i64::MAX as u64 {
            return Err(ConfigError::Invalid("time window out of range".to_string()));
        }
        Ok(())
    }
}

/// Which gestures are enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GestureSelection {
    pub power_press: bool,
    pub chop: bool,
}

impl Default for GestureSelection {
    fn default() -> Self {
        Self {
            power_press: true,
            chop: true,
        }
    }
}

impl GestureSelection {
    /// Parse a gesture selection from a comma-separated string.
    pub fn from_csv(s: &str) -> Self {
        let gestures: Vec<String> = s.split(',').map(|s| s.trim().to_lowercase()).collect();

        Self {
            power_press: gestures
                .iter()
                .any(|s| s == "power" || s == "power-press" || s == "all"),
            chop: gestures.iter().any(|s| s == "chop" || s == "all"),
        }
    }

    /// Check if at least one gesture is enabled.
    pub fn any_enabled(&self) -> bool {
        self.power_press || self.chop
    }

    /// Enable every gesture that is enabled in `other`.
    pub fn union(self, other: Self) -> Self {
        Self {
            power_press: self.power_press || other.power_press,
            chop: self.chop || other.chop,
        }
    }

    /// Disable every gesture that is enabled in `other`.
    pub fn without(self, other: Self) -> Self {
        Self {
            power_press: self.power_press && !other.power_press,
            chop: self.chop && !other.chop,
        }
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
            ConfigError::Invalid(e) => write!(f, "Invalid configuration: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Serde support for Duration as whole milliseconds.
mod duration_ms_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gesture_selection_parsing() {
        let selection = GestureSelection::from_csv("power,chop");
        assert!(selection.power_press);
        assert!(selection.chop);

        let selection = GestureSelection::from_csv(" Chop ");
        assert!(!selection.power_press);
        assert!(selection.chop);

        let selection = GestureSelection::from_csv("all");
        assert!(selection.power_press);
        assert!(selection.chop);

        assert!(!GestureSelection::from_csv("shake").any_enabled());
    }

    #[test]
    fn test_gesture_selection_toggling() {
        let all = GestureSelection::default();
        let chop_only = all.without(GestureSelection::from_csv("power"));
        assert_eq!(
            chop_only,
            GestureSelection {
                power_press: false,
                chop: true
            }
        );
        assert_eq!(chop_only.union(GestureSelection::from_csv("power")), all);
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.detectors.reset_window_ms, 2000);
        assert_eq!(config.detectors.refractory_period_ms, 500);
        assert_eq!(config.detectors.chop_threshold, 15.0);
        assert_eq!(config.detectors.trigger_threshold, 3);
        assert_eq!(config.min_delivery_interval, Duration::ZERO);
        assert!(config.gestures.any_enabled());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_detector_settings() {
        let mut settings = DetectorSettings::default();
        settings.trigger_threshold = 0;
        assert!(matches!(settings.validate(), Err(ConfigError::Invalid(_))));

        let mut settings = DetectorSettings::default();
        settings.chop_threshold = f64::NAN;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_config_json_uses_millis() {
        let mut config = Config::default();
        config.min_delivery_interval = Duration::from_millis(1500);
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["min_delivery_interval"], 1500);

        let back: Config = serde_json::from_value(json).unwrap();
        assert_eq!(back.min_delivery_interval, Duration::from_millis(1500));
    }

    #[test]
    fn test_invalid_file_is_reported_and_left_alone() {
        let dir = std::env::temp_dir().join(format!("panic-gesture-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");

        let mut config = Config::default();
        config.detectors.reset_window_ms = 3000;
        config.min_delivery_interval = Duration::from_millis(750);
        let mut json = serde_json::to_value(&config).unwrap();
        json["detectors"]["trigger_threshold"] = 0.into();
        let original = serde_json::to_string_pretty(&json).unwrap();
        std::fs::write(&path, &original).unwrap();

        assert!(matches!(Config::load_from(&path), Err(ConfigError::Invalid(_))));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), original);

        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(Config::load_from(&path), Err(ConfigError::ParseError(_))));

        config.gestures.chop = false;
        config.save_to(&path).unwrap();
        let back = Config::load_from(&path).unwrap();
        assert_eq!(back.detectors.reset_window_ms, 3000);
        assert_eq!(back.min_delivery_interval, Duration::from_millis(750));
        assert!(!back.gestures.chop);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_file_loads_defaults() {
        let path = std::env::temp_dir().join("panic-gesture-config-missing/config.json");
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.detectors, DetectorSettings::default());
    }
}
