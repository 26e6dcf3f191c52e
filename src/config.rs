use serde::{Deserialize, Deserializer};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::propagation::{ElementSource, ObserverCoordinate, DEFAULT_PERIOD, DEFAULT_STALL_FACTOR};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Starting observer, `[lat_deg, lon_deg, alt_km]`. Replaced by live
    /// geolocation once it arrives.
    #[serde(default = "default_observer")]
    pub observer: ObserverCoordinate,
    #[serde(default)]
    pub tracker: TrackerConfig,
    #[serde(default)]
    pub view: ViewConfig,
    #[serde(default)]
    pub sensors: SensorsConfig,
}

fn default_observer() -> ObserverCoordinate {
    ObserverCoordinate::new(0.0, 0.0, 0.0)
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackerConfig {
    #[serde(default = "default_elements")]
    pub elements: ElementSource,
    #[serde(default = "default_period", deserialize_with = "human_duration")]
    pub period: Duration,
    #[serde(default = "default_ar_period", deserialize_with = "human_duration")]
    pub ar_period: Duration,
    #[serde(default = "default_stall_factor")]
    pub stall_factor: u32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            elements: default_elements(),
            period: default_period(),
            ar_period: default_ar_period(),
            stall_factor: default_stall_factor(),
        }
    }
}

fn default_elements() -> ElementSource {
    ElementSource::Url(
        "https://celestrak.org/NORAD/elements/gp.php?GROUP=starlink&FORMAT=json".to_string(),
    )
}

fn default_period() -> Duration {
    DEFAULT_PERIOD
}

fn default_ar_period() -> Duration {
    Duration::from_millis(100)
}

fn default_stall_factor() -> u32 {
    DEFAULT_STALL_FACTOR
}

#[derive(Debug, Clone, Deserialize)]
pub struct ViewConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            frame_rate: default_frame_rate(),
        }
    }
}

fn default_width() -> u32 {
    1280
}

fn default_height() -> u32 {
    720
}

fn default_frame_rate() -> u32 {
    60
}

impl ViewConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs(1) / self.frame_rate.max(1)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SensorsConfig {
    /// Use simulated devices instead of none at all.
    #[serde(default = "default_simulated")]
    pub simulated: bool,
    #[serde(default = "default_frequency_hz")]
    pub frequency_hz: f64,
    #[serde(default)]
    pub camera: bool,
}

impl Default for SensorsConfig {
    fn default() -> Self {
        Self {
            simulated: default_simulated(),
            frequency_hz: default_frequency_hz(),
            camera: false,
        }
    }
}

fn default_simulated() -> bool {
    true
}

fn default_frequency_hz() -> f64 {
    50.0
}

fn human_duration<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    let s = String::deserialize(deserializer)?;
    humantime::parse_duration(s.trim()).map_err(serde::de::Error::custom)
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_config() {
        let yaml = r#"
observer: [47.37, 8.54, 0.4]
tracker:
  elements:
    file: data/stations.json
  period: 2s
  ar_period: 250ms
  stall_factor: 5
view:
  width: 800
  height: 600
  frame_rate: 30
sensors:
  simulated: false
  frequency_hz: 20
  camera: true
"#;
        let c = Config::from_str(yaml).unwrap();
        assert_eq!(c.observer, ObserverCoordinate::new(47.37, 8.54, 0.4));
        assert_eq!(c.tracker.elements, ElementSource::File("data/stations.json".into()));
        assert_eq!(c.tracker.period, Duration::from_secs(2));
        assert_eq!(c.tracker.ar_period, Duration::from_millis(250));
        assert_eq!(c.tracker.stall_factor, 5);
        assert_eq!(c.view.frame_interval(), Duration::from_secs(1) / 30);
        assert!(!c.sensors.simulated);
        assert!(c.sensors.camera);
    }

    #[test]
    fn empty_config_uses_defaults() {
        let c = Config::from_str("{}").unwrap();
        assert_eq!(c.tracker.period, Duration::from_secs(1));
        assert_eq!(c.tracker.ar_period, Duration::from_millis(100));
        assert_eq!(c.tracker.stall_factor, 3);
        assert!(matches!(c.tracker.elements, ElementSource::Url(_)));
        assert!(c.sensors.simulated);
    }

    #[test]
    fn bad_duration_is_rejected() {
        let yaml = "tracker:\n  period: soon\n";
        assert!(matches!(Config::from_str(yaml), Err(ConfigError::Yaml(_))));
    }
}
