//! Simulation configuration.
//!
//! Every tunable parameter has a default taken from `global_variables`, so a
//! configuration file only needs to name the values it changes:
//!
//! ```toml
//! delivery = "fan-out"
//! seed = 7
//!
//! [channel]
//! decode-threshold = 1.2
//! ```

use crate::error::{V2vError, V2vResult};
use crate::global_variables::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// How the optical channel hands transmitted signals to listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeliveryMode {
    /// One shared queue: each signal reaches exactly one listener.
    WorkStealing,
    /// One inbox per listener: each signal is copied to every vehicle except its sender.
    #[default]
    FanOut,
}

/// Parameters of the vehicle kinematics update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct KinematicsConfig {
    pub initial_speed_mps: f64,
    /// Simulation step `dt` in seconds.
    pub time_step_s: f64,
    /// Acceleration applied on a hard brake. Negative.
    pub emergency_decel_mps2: f64,
    /// Half-width of the uniform acceleration drift while cruising.
    pub drift_mps2: f64,
}

impl Default for KinematicsConfig {
    fn default() -> Self {
        Self {
            initial_speed_mps: DEFAULT_INITIAL_SPEED_MPS,
            time_step_s: DEFAULT_TIME_STEP_S,
            emergency_decel_mps2: DEFAULT_EMERGENCY_DECEL_MPS2,
            drift_mps2: DEFAULT_DRIFT_MPS2,
        }
    }
}

/// Noise model of the optical channel.
///
/// A `1` bit is sent as `N(0, base_sigma) + N(0, one_sigma)`, a `0` bit as
/// `N(0, base_sigma) + N(0, zero_sigma)`. The receiver reads a `1` whenever
/// the absolute sample exceeds `decode_threshold`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ChannelProfile {
    pub base_sigma: f64,
    pub one_sigma: f64,
    pub zero_sigma: f64,
    pub decode_threshold: f64,
}

impl Default for ChannelProfile {
    fn default() -> Self {
        Self {
            base_sigma: DEFAULT_BASE_SIGMA,
            one_sigma: DEFAULT_ONE_SIGMA,
            zero_sigma: DEFAULT_ZERO_SIGMA,
            decode_threshold: DEFAULT_DECODE_THRESHOLD,
        }
    }
}

impl ChannelProfile {
    /// A practically noiseless profile: zero bits stay near zero and the
    /// threshold sits far below the spread of a one bit.
    pub fn clear_air() -> Self {
        Self {
            base_sigma: 0.0,
            one_sigma: DEFAULT_ONE_SIGMA,
            zero_sigma: 1e-9,
            decode_threshold: 1e-6,
        }
    }

    pub fn validate(&self) -> V2vResult<()> {
        for (name, sigma) in [
            ("base-sigma", self.base_sigma),
            ("one-sigma", self.one_sigma),
            ("zero-sigma", self.zero_sigma),
        ] {
            if !sigma.is_finite() || sigma < 0.0 {
                return Err(V2vError::Config(format!(
                    "channel.{} must be a finite, non-negative number (got {})",
                    name, sigma
                )));
            }
        }
        if !self.decode_threshold.is_finite() || self.decode_threshold <= 0.0 {
            return Err(V2vError::Config(format!(
                "channel.decode-threshold must be positive (got {})",
                self.decode_threshold
            )));
        }
        Ok(())
    }
}

/// Listener behaviour of every vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ListenerConfig {
    /// Upper bound on a single `receive` wait.
    pub receive_timeout_ms: u64,
    /// Skip the rebroadcast when an alert reaches a vehicle that is already braking.
    pub cascade_guard: bool,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            receive_timeout_ms: DEFAULT_RECEIVE_TIMEOUT_MS,
            cascade_guard: true,
        }
    }
}

impl ListenerConfig {
    pub fn receive_timeout(&self) -> Duration {
        Duration::from_millis(self.receive_timeout_ms)
    }
}

/// Settings of the convoy demo driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DemoConfig {
    pub vehicles: Vec<String>,
    pub ticks: u32,
    /// Tick on which `brake_vehicle` hard-brakes.
    pub brake_tick: u32,
    pub brake_vehicle: String,
    pub tick_interval_ms: u64,
    /// When set, every ADAS event is appended to this CSV file.
    pub event_log: Option<PathBuf>,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            vehicles: DEMO_VEHICLES.iter().map(|name| name.to_string()).collect(),
            ticks: DEMO_TICKS,
            brake_tick: DEMO_BRAKE_TICK,
            brake_vehicle: DEMO_VEHICLES[0].to_string(),
            tick_interval_ms: DEMO_TICK_INTERVAL_MS,
            event_log: None,
        }
    }
}

/// Root configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SimulationConfig {
    pub delivery: DeliveryMode,
    /// Seed for every random source. `None` draws fresh entropy per run.
    pub seed: Option<u64>,
    pub kinematics: KinematicsConfig,
    pub channel: ChannelProfile,
    pub listener: ListenerConfig,
    pub demo: DemoConfig,
}

impl SimulationConfig {
    /// Load and validate configuration from a TOML file.
    pub fn load(config_path: &Path) -> V2vResult<Self> {
        let content = std::fs::read_to_string(config_path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> V2vResult<Self> {
        let config: SimulationConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> V2vResult<()> {
        self.channel.validate()?;

        let k = &self.kinematics;
        if !k.time_step_s.is_finite() || k.time_step_s <= 0.0 {
            return Err(V2vError::Config(format!(
                "kinematics.time-step-s must be positive (got {})",
                k.time_step_s
            )));
        }
        if !k.emergency_decel_mps2.is_finite() || k.emergency_decel_mps2 > 0.0 {
            return Err(V2vError::Config(format!(
                "kinematics.emergency-decel-mps2 must not be positive (got {})",
                k.emergency_decel_mps2
            )));
        }
        // The drift range spans 2 * drift, which must stay finite to be sampled.
        if !(2.0 * k.drift_mps2).is_finite() || k.drift_mps2 < 0.0 {
            return Err(V2vError::Config(format!(
                "kinematics.drift-mps2 must be non-negative and finite when doubled (got {})",
                k.drift_mps2
            )));
        }
        if !k.initial_speed_mps.is_finite() || k.initial_speed_mps < 0.0 {
            return Err(V2vError::Config(format!(
                "kinematics.initial-speed-mps must not be negative (got {})",
                k.initial_speed_mps
            )));
        }
        if self.listener.receive_timeout_ms == 0 {
            return Err(V2vError::Config(
                "listener.receive-timeout-ms must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
