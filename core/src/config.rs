use crate::prelude::{EngineError, EngineResult, Mode};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Retry policy applied to every gateway fetch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay_ms: u64,
}

impl RetryPolicy {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// At least one attempt is always made.
    pub fn attempts(&self) -> u32 {
        self.attempts.max(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            delay_ms: 1000,
        }
    }
}

/// Where the year selector gets its options from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum YearSource {
    /// Years reported by `get_available_years`.
    Backend,
    /// Every year from `start_year` to the current year.
    Enumerated { start_year: i32 },
}

impl Default for YearSource {
    fn default() -> Self {
        YearSource::Backend
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub mode: Mode,
    pub bridge_url: String,
    pub retry: RetryPolicy,
    pub historical_poll_ms: u64,
    pub nowcast_poll_ms: u64,
    pub max_boat_detections: usize,
    pub years: YearSource,
    pub ranked_axis_cap: f64,
    pub default_country: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Historical,
            bridge_url: "http://127.0.0.1:9000".into(),
            retry: RetryPolicy::default(),
            historical_poll_ms: 500,
            nowcast_poll_ms: 2000,
            max_boat_detections: 5000,
            years: YearSource::default(),
            ranked_axis_cap: 1000.0,
            default_country: None,
        }
    }
}

impl EngineConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref).map_err(|err| {
            EngineError::Config(format!("reading {}: {}", path_ref.display(), err))
        })?;
        Self::from_yaml(&contents)
            .map_err(|err| EngineError::Config(format!("parsing {}: {}", path_ref.display(), err)))
    }

    pub fn from_yaml(contents: &str) -> EngineResult<Self> {
        let config: EngineConfig = serde_yaml::from_str(contents)
            .map_err(|err| EngineError::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.max_boat_detections == 0 {
            return Err(EngineError::Config(
                "max_boat_detections must be positive".into(),
            ));
        }
        if !(self.ranked_axis_cap.is_finite() && self.ranked_axis_cap >= 1.0) {
            return Err(EngineError::Config("ranked_axis_cap must be >= 1".into()));
        }
        Ok(())
    }

    pub fn poll_interval(&self, mode: Mode) -> Duration {
        match mode {
            Mode::Historical => Duration::from_millis(self.historical_poll_ms),
            Mode::Nowcast => Duration::from_millis(self.nowcast_poll_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_follow_dashboard_conventions() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.retry.attempts, 5);
        assert_eq!(cfg.retry.delay(), Duration::from_secs(1));
        assert_eq!(cfg.poll_interval(Mode::Historical), Duration::from_millis(500));
        assert_eq!(cfg.poll_interval(Mode::Nowcast), Duration::from_millis(2000));
        assert_eq!(cfg.max_boat_detections, 5000);
    }

    #[test]
    fn config_load_reads_yaml() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(
            b"mode: nowcast\nretry:\n  attempts: 2\nyears:\n  source: enumerated\n  start_year: 2015\n",
        )
        .unwrap();
        let path = temp.into_temp_path();
        let cfg = EngineConfig::load(&path).unwrap();
        assert_eq!(cfg.mode, Mode::Nowcast);
        assert_eq!(cfg.retry.attempts, 2);
        assert_eq!(cfg.retry.delay_ms, 1000);
        assert_eq!(cfg.years, YearSource::Enumerated { start_year: 2015 });
    }

    #[test]
    fn zero_detection_cap_is_rejected() {
        let err = EngineConfig::from_yaml("max_boat_detections: 0\n").unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }
}
