//! Configuration loading from TOML with validation.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Validation is fatal at startup: the process refuses to run with an
//! out-of-range calibration config rather than silently using defaults.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;

use crate::types::RecalError;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub engine: EngineConfig,
    pub calibration: CalibrationConfig,
    pub storage: StorageConfig,
    pub dashboard: DashboardConfig,
}

/// Control-loop settings.
#[derive(Debug, Deserialize, Clone)]
pub struct EngineConfig {
    /// Seconds between recalibration ticks.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_secs: u64,
    /// Hard wall-clock budget for one tick; exceeding it cancels the tick.
    #[serde(default = "default_tick_budget")]
    pub tick_budget_secs: u64,
    /// Timeout for a single outcome-store fetch.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
    /// The configured base-learner roster.
    pub algorithms: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: default_tick_interval(),
            tick_budget_secs: default_tick_budget(),
            fetch_timeout_secs: default_fetch_timeout(),
            algorithms: Vec::new(),
        }
    }
}

fn default_tick_interval() -> u64 {
    900
}
fn default_tick_budget() -> u64 {
    30
}
fn default_fetch_timeout() -> u64 {
    10
}

/// Tunables for the performance → health → weight pipeline.
#[derive(Debug, Deserialize, Clone)]
pub struct CalibrationConfig {
    pub short_term_days: u32,
    pub medium_term_days: u32,
    pub long_term_days: u32,
    /// Settled predictions required before pause/resume and confidence
    /// actions are allowed.
    pub min_sample_size: u32,
    /// Short-term health below this pauses an algorithm (0–100).
    pub pause_health_threshold: u8,
    /// Short-term health at or above this is flagged as boost-worthy (0–100).
    pub boost_health_threshold: u8,
    /// Per-tick cap on how far a weight may move (0–1).
    pub max_weight_delta: f64,
    /// "No-edge" win-rate reference (0.5 for moneyline).
    pub baseline_win_rate: f64,
    /// Resume requires health >= pause threshold + this margin.
    #[serde(default = "default_hysteresis_margin")]
    pub hysteresis_margin: u8,
    /// No active algorithm drops below this weight unless paused.
    #[serde(default = "default_min_weight_floor")]
    pub min_weight_floor: f64,
    /// Points of health per unit of win-rate edge over baseline.
    #[serde(default = "default_win_rate_scale")]
    pub win_rate_scale: f64,
    /// Multiplier changes smaller than this are treated as noise.
    #[serde(default = "default_multiplier_noise")]
    pub multiplier_noise_threshold: f64,
}

fn default_hysteresis_margin() -> u8 {
    10
}
fn default_min_weight_floor() -> f64 {
    0.05
}
fn default_win_rate_scale() -> f64 {
    200.0
}
fn default_multiplier_noise() -> f64 {
    0.02
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            short_term_days: 7,
            medium_term_days: 30,
            long_term_days: 90,
            min_sample_size: 10,
            pause_health_threshold: 30,
            boost_health_threshold: 75,
            max_weight_delta: 0.10,
            baseline_win_rate: 0.5,
            hysteresis_margin: default_hysteresis_margin(),
            min_weight_floor: default_min_weight_floor(),
            win_rate_scale: default_win_rate_scale(),
            multiplier_noise_threshold: default_multiplier_noise(),
        }
    }
}

impl CalibrationConfig {
    /// Range and ordering checks. ConfigInvalid is fatal at startup.
    pub fn validate(&self) -> Result<(), RecalError> {
        if self.short_term_days == 0 {
            return Err(RecalError::ConfigInvalid(
                "short_term_days must be > 0".to_string(),
            ));
        }
        if self.medium_term_days <= self.short_term_days {
            return Err(RecalError::ConfigInvalid(
                "medium_term_days must be > short_term_days".to_string(),
            ));
        }
        if self.long_term_days <= self.medium_term_days {
            return Err(RecalError::ConfigInvalid(
                "long_term_days must be > medium_term_days".to_string(),
            ));
        }
        if self.min_sample_size == 0 {
            return Err(RecalError::ConfigInvalid(
                "min_sample_size must be >= 1".to_string(),
            ));
        }
        if self.pause_health_threshold > 100 || self.boost_health_threshold > 100 {
            return Err(RecalError::ConfigInvalid(
                "health thresholds must be in 0..=100".to_string(),
            ));
        }
        if self.pause_health_threshold as u32 + self.hysteresis_margin as u32 > 100 {
            return Err(RecalError::ConfigInvalid(
                "pause_health_threshold + hysteresis_margin must be <= 100".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.max_weight_delta) {
            return Err(RecalError::ConfigInvalid(
                "max_weight_delta must be in 0..=1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.baseline_win_rate) {
            return Err(RecalError::ConfigInvalid(
                "baseline_win_rate must be in 0..=1".to_string(),
            ));
        }
        if !(0.0..0.5).contains(&self.min_weight_floor) {
            return Err(RecalError::ConfigInvalid(
                "min_weight_floor must be in 0..0.5".to_string(),
            ));
        }
        Ok(())
    }

    /// Resume bar: a strictly higher hurdle than the pause threshold.
    pub fn resume_threshold(&self) -> u8 {
        self.pause_health_threshold.saturating_add(self.hysteresis_margin)
    }
}

/// Outcome/weight storage backend selection.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// "memory" | "sqlite"
    pub backend: String,
    /// Database path for the sqlite backend.
    #[serde(default)]
    pub path: Option<String>,
}

impl StorageConfig {
    pub fn validate(&self) -> Result<(), RecalError> {
        match self.backend.as_str() {
            "memory" => Ok(()),
            "sqlite" => {
                if self.path.as_deref().unwrap_or("").is_empty() {
                    Err(RecalError::ConfigInvalid(
                        "storage.path required for sqlite backend".to_string(),
                    ))
                } else {
                    Ok(())
                }
            }
            other => Err(RecalError::ConfigInvalid(format!(
                "unknown storage backend: {other}"
            ))),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardConfig {
    pub enabled: bool,
    pub port: u16,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        Ok(config)
    }

    /// Validate all sections. Called once at startup, before any tick runs.
    pub fn validate(&self) -> Result<(), RecalError> {
        if self.engine.algorithms.is_empty() {
            return Err(RecalError::ConfigInvalid(
                "engine.algorithms must list at least one algorithm".to_string(),
            ));
        }
        if self.engine.tick_budget_secs == 0 {
            return Err(RecalError::ConfigInvalid(
                "engine.tick_budget_secs must be > 0".to_string(),
            ));
        }
        self.calibration.validate()?;
        self.storage.validate()?;
        Ok(())
    }
}
