//! stagegrid.toml configuration parser.
//!
//! Every section is optional. Missing sections fall back to the defaults
//! below; a missing `[[stages]]` list falls back to the built-in catalog.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::catalog::StageCatalog;
use crate::error::{ConfigError, ConfigResult};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StageGridConfig {
    pub control: ControlConfig,
    pub tuning: TuningConfig,
    pub io: IoConfig,
    pub stages: Vec<StageConfig>,
}

/// Which strategy turns the setpoint into a residual target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    Naive,
    RateLimited,
    Proportional,
    #[default]
    OptimalRateLimited,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Naive => "naive",
            StrategyKind::RateLimited => "rate-limited",
            StrategyKind::Proportional => "proportional",
            StrategyKind::OptimalRateLimited => "optimal-rate-limited",
        }
    }
}

/// Where the loop takes "previous achieved" from each cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Recovery {
    /// In-memory control state. The history log is audit only.
    #[default]
    Memory,
    /// Last row of the history log, 0 when it cannot be read.
    History,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Delay between cycles, e.g. "500ms", "2s", "1m".
    pub cadence: String,
    pub strategy: StrategyKind,
    pub recovery: Recovery,
    /// Continue cycle numbering and achieved output from the last history row.
    pub resume: bool,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            cadence: "500ms".to_string(),
            strategy: StrategyKind::default(),
            recovery: Recovery::default(),
            resume: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TuningConfig {
    /// Largest change in achieved output per cycle.
    pub max_rate: f64,
    /// Amount the optimal strategy aims below target before gap correction.
    pub undershoot_margin: f64,
    /// Fraction of the remaining distance the proportional strategy closes
    /// each cycle.
    pub proportional_gain: f64,
}

impl Default for TuningConfig {
    fn default() -> Self {
        Self {
            max_rate: 5.0,
            undershoot_margin: 5.0,
            proportional_gain: 0.1,
        }
    }
}

impl TuningConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if !self.max_rate.is_finite() || self.max_rate < 0.0 {
            return Err(ConfigError::InvalidTuning {
                name: "max_rate",
                value: self.max_rate,
                reason: "must be finite and >= 0",
            });
        }
        if !self.undershoot_margin.is_finite() || self.undershoot_margin < 0.0 {
            return Err(ConfigError::InvalidTuning {
                name: "undershoot_margin",
                value: self.undershoot_margin,
                reason: "must be finite and >= 0",
            });
        }
        if !(self.proportional_gain > 0.0 && self.proportional_gain <= 1.0) {
            return Err(ConfigError::InvalidTuning {
                name: "proportional_gain",
                value: self.proportional_gain,
                reason: "must be in (0, 1]",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IoConfig {
    pub setpoint_path: PathBuf,
    /// Name of the numeric field holding the setpoint.
    pub setpoint_field: String,
    pub history_path: PathBuf,
    /// Truncate the history log at startup.
    pub fresh_history: bool,
}

impl Default for IoConfig {
    fn default() -> Self {
        Self {
            setpoint_path: PathBuf::from("setpoint.json"),
            setpoint_field: "setpoint".to_string(),
            history_path: PathBuf::from("history.csv"),
            fresh_history: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StageConfig {
    pub value: f64,
    pub max_quantity: u32,
    /// Pin the variance factor instead of drawing it at startup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variance_factor: Option<f64>,
}

/// Built-in catalog used when the config lists no stages.
pub fn default_stages() -> Vec<StageConfig> {
    [(0.1, 100), (1.0, 1), (2.0, 2), (5.0, 1), (10.0, 6)]
        .into_iter()
        .map(|(value, max_quantity)| StageConfig {
            value,
            max_quantity,
            variance_factor: None,
        })
        .collect()
}

impl StageGridConfig {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Check everything that can be checked without building the catalog.
    pub fn validate(&self) -> ConfigResult<()> {
        self.tuning.validate()?;
        self.cadence()?;
        Ok(())
    }

    pub fn cadence(&self) -> ConfigResult<Duration> {
        parse_duration(&self.control.cadence)
    }

    /// Build the stage catalog, falling back to the built-in stages.
    pub fn catalog(&self) -> ConfigResult<StageCatalog> {
        if self.stages.is_empty() {
            StageCatalog::from_config(&default_stages())
        } else {
            StageCatalog::from_config(&self.stages)
        }
    }
}

/// Parse a duration string like "250ms", "30s", "5m". A bare number is
/// seconds. Zero is rejected.
pub fn parse_duration(s: &str) -> ConfigResult<Duration> {
    let s = s.trim();
    let invalid = || ConfigError::InvalidDuration(s.to_string());

    let duration = if let Some(ms) = s.strip_suffix("ms") {
        Duration::from_millis(ms.trim().parse().map_err(|_| invalid())?)
    } else if let Some(secs) = s.strip_suffix('s') {
        Duration::from_secs(secs.trim().parse().map_err(|_| invalid())?)
    } else if let Some(mins) = s.strip_suffix('m') {
        let mins: u64 = mins.trim().parse().map_err(|_| invalid())?;
        Duration::from_secs(mins.checked_mul(60).ok_or_else(invalid)?)
    } else {
        Duration::from_secs(s.parse().map_err(|_| invalid())?)
    };

    if duration.is_zero() {
        return Err(invalid());
    }
    Ok(duration)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_uses_defaults() {
        let config = StageGridConfig::parse("").unwrap();
        assert_eq!(config.control.strategy, StrategyKind::OptimalRateLimited);
        assert_eq!(config.control.recovery, Recovery::Memory);
        assert_eq!(config.tuning, TuningConfig::default());
        assert_eq!(config.cadence().unwrap(), Duration::from_millis(500));
        assert!(config.io.fresh_history);

        let catalog = config.catalog().unwrap();
        assert_eq!(catalog.len(), 5);
        assert_eq!(catalog.smallest().value, 0.1);
    }

    #[test]
    fn test_parse_full() {
        let toml_str = r#"
[control]
cadence = "2s"
strategy = "proportional"
recovery = "history"
resume = true

[tuning]
max_rate = 2.5
proportional_gain = 0.25

[io]
setpoint_path = "/tmp/tpo.json"
setpoint_field = "tpo"

[[stages]]
value = 1.0
max_quantity = 50

[[stages]]
value = 10.0
max_quantity = 3
variance_factor = 1.02
"#;
        let config = StageGridConfig::parse(toml_str).unwrap();
        assert_eq!(config.control.strategy, StrategyKind::Proportional);
        assert_eq!(config.control.recovery, Recovery::History);
        assert!(config.control.resume);
        assert_eq!(config.tuning.max_rate, 2.5);
        assert_eq!(config.tuning.undershoot_margin, 5.0);
        assert_eq!(config.io.setpoint_field, "tpo");
        assert_eq!(config.io.history_path, PathBuf::from("history.csv"));
        assert_eq!(config.stages.len(), 2);
        config.validate().unwrap();

        let catalog = config.catalog().unwrap();
        assert_eq!(catalog.stages()[0].value, 10.0);
        assert_eq!(catalog.stages()[0].variance_factor, 1.02);
    }

    #[test]
    fn test_unknown_strategy_is_parse_error() {
        let err = StageGridConfig::parse("[control]\nstrategy = \"bang-bang\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_invalid_tuning() {
        let mut config = StageGridConfig::default();
        config.tuning.max_rate = -1.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidTuning { name: "max_rate", .. })
        ));

        let mut config = StageGridConfig::default();
        config.tuning.proportional_gain = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidTuning { name: "proportional_gain", .. })
        ));

        let mut config = StageGridConfig::default();
        config.tuning.undershoot_margin = f64::INFINITY;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_duration_values() {
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("7").unwrap(), Duration::from_secs(7));
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("soon").is_err());
    }

    #[test]
    fn test_parse_duration_minute_overflow() {
        assert!(matches!(
            parse_duration("307445734561825861m"),
            Err(ConfigError::InvalidDuration(_))
        ));
        assert_eq!(
            parse_duration("307445734561825860m").unwrap(),
            Duration::from_secs(307445734561825860 * 60)
        );
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stagegrid.toml");
        std::fs::write(&path, "[control]\nstrategy = \"naive\"\n").unwrap();
        let config = StageGridConfig::from_file(&path).unwrap();
        assert_eq!(config.control.strategy, StrategyKind::Naive);

        let missing = StageGridConfig::from_file(&dir.path().join("nope.toml"));
        assert!(matches!(missing, Err(ConfigError::Read(_))));
    }
}
