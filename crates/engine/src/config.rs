use serde::Deserialize;

use crate::error::EngineError;
use crate::reconcile::ReconSource;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Engine configuration, normally loaded from `tally.toml`. Every field has a
/// default matching the rule constants, so an absent file means stock
/// behavior.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default)]
    pub reconcile: ReconcileDefaults,
}

impl EngineConfig {
    pub fn from_toml(s: &str) -> Result<Self, EngineError> {
        let config: Self =
            toml::from_str(s).map_err(|e| EngineError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), EngineError> {
        let t = &self.thresholds;
        if t.max_weekly_hours <= 0.0 || t.max_daily_hours <= 0.0 {
            return Err(EngineError::ConfigValidation(
                "hour limits must be positive".into(),
            ));
        }
        if !(0.0..=1.0).contains(&t.min_mean_confidence) {
            return Err(EngineError::ConfigValidation(format!(
                "min_mean_confidence {} outside [0, 1]",
                t.min_mean_confidence
            )));
        }
        if t.hours_epsilon <= 0.0 {
            return Err(EngineError::ConfigValidation(
                "hours_epsilon must be positive".into(),
            ));
        }
        if self.reconcile.tolerance_pct < 0.0 {
            return Err(EngineError::ConfigValidation(format!(
                "tolerance_pct {} is negative",
                self.reconcile.tolerance_pct
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Rule thresholds
// ---------------------------------------------------------------------------

/// Numeric limits used by the validation and matching rules.
#[derive(Debug, Clone, Deserialize)]
pub struct Thresholds {
    /// Document total above this warns (possible overtime), never fails.
    #[serde(default = "default_max_weekly_hours")]
    pub max_weekly_hours: f64,
    /// Single-line hours above this warn, never fail.
    #[serde(default = "default_max_daily_hours")]
    pub max_daily_hours: f64,
    /// Mean extraction confidence below this warns (advisory only).
    #[serde(default = "default_min_mean_confidence")]
    pub min_mean_confidence: f64,
    /// Hour totals closer than this compare as equal.
    #[serde(default = "default_hours_epsilon")]
    pub hours_epsilon: f64,
    /// Cap on the number of lines given line-level checks. Unset means every
    /// line is checked; when set, the run records a SAMPLING_POLICY warning
    /// naming the cap, so a capped run is never silent truncation.
    #[serde(default)]
    pub line_check_cap: Option<usize>,
}

fn default_max_weekly_hours() -> f64 {
    60.0
}

fn default_max_daily_hours() -> f64 {
    24.0
}

fn default_min_mean_confidence() -> f64 {
    0.7
}

fn default_hours_epsilon() -> f64 {
    0.01
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            max_weekly_hours: default_max_weekly_hours(),
            max_daily_hours: default_max_daily_hours(),
            min_mean_confidence: default_min_mean_confidence(),
            hours_epsilon: default_hours_epsilon(),
            line_check_cap: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Reconciliation defaults
// ---------------------------------------------------------------------------

/// CLI-level defaults for `tally reconcile`; flags override these.
#[derive(Debug, Clone, Deserialize)]
pub struct ReconcileDefaults {
    #[serde(default = "default_hourly_rate")]
    pub hourly_rate: f64,
    #[serde(default = "default_tolerance_pct")]
    pub tolerance_pct: f64,
    #[serde(default)]
    pub source: ReconSource,
}

fn default_hourly_rate() -> f64 {
    150.0
}

fn default_tolerance_pct() -> f64 {
    1.0
}

impl Default for ReconcileDefaults {
    fn default() -> Self {
        Self {
            hourly_rate: default_hourly_rate(),
            tolerance_pct: default_tolerance_pct(),
            source: ReconSource::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_stock_thresholds() {
        let config = EngineConfig::from_toml("").unwrap();
        assert_eq!(config.thresholds.max_weekly_hours, 60.0);
        assert_eq!(config.thresholds.max_daily_hours, 24.0);
        assert_eq!(config.thresholds.min_mean_confidence, 0.7);
        assert_eq!(config.thresholds.hours_epsilon, 0.01);
        assert_eq!(config.thresholds.line_check_cap, None);
        assert_eq!(config.reconcile.hourly_rate, 150.0);
        assert_eq!(config.reconcile.tolerance_pct, 1.0);
    }

    #[test]
    fn partial_override() {
        let config = EngineConfig::from_toml(
            r#"
[thresholds]
max_weekly_hours = 45.0
line_check_cap = 5

[reconcile]
hourly_rate = 125.0
source = "raw"
"#,
        )
        .unwrap();
        assert_eq!(config.thresholds.max_weekly_hours, 45.0);
        assert_eq!(config.thresholds.line_check_cap, Some(5));
        assert_eq!(config.thresholds.max_daily_hours, 24.0);
        assert_eq!(config.reconcile.hourly_rate, 125.0);
        assert_eq!(config.reconcile.source, ReconSource::Raw);
    }

    #[test]
    fn bad_values_rejected() {
        assert!(EngineConfig::from_toml("[thresholds]\nmin_mean_confidence = 1.5").is_err());
        assert!(EngineConfig::from_toml("[reconcile]\ntolerance_pct = -1.0").is_err());
        assert!(EngineConfig::from_toml("[thresholds]\nhours_epsilon = 0.0").is_err());
    }

    #[test]
    fn parse_error_is_reported() {
        let err = EngineConfig::from_toml("not toml at all [").unwrap_err();
        assert!(err.to_string().contains("config parse error"));
    }
}
