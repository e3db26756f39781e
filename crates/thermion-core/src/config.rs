// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Construction-time configuration for the control loop.
//!
//! Every section implements `Default` and derives serde traits with
//! `#[serde(default)]`, so hosts can load a partial file in any serde format
//! and only override what they need. [`ControlConfig::validate`] must pass
//! before any component is built; components call it themselves.

use crate::error::{ConfigError, ConfigResult};
use crate::quality::QualityProfiles;
use serde::{Deserialize, Serialize};

/// Complete configuration for the control loop.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Thermal estimation.
    pub estimator: EstimatorConfig,
    /// Frame timing collection.
    pub sampler: SamplerConfig,
    /// Tier → settings records.
    pub quality: QualityProfiles,
    /// Input admission.
    pub input: InputThrottleConfig,
    /// Check intervals and service tick rate.
    pub cadence: CadenceConfig,
}

impl ControlConfig {
    /// Validates every section, failing on the first problem found.
    pub fn validate(&self) -> ConfigResult<()> {
        self.estimator.validate()?;
        self.sampler.validate()?;
        self.quality.validate()?;
        self.input.validate()?;
        self.cadence.validate()
    }
}

/// Hardware temperature breakpoints, as normalized levels in `[0, 1]`.
///
/// A level at or above a breakpoint enters that breakpoint's severity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemperatureBreakpoints {
    /// Entry level for `Elevated`.
    pub warm: f32,
    /// Entry level for `Serious`.
    pub hot: f32,
    /// Entry level for `Critical`.
    pub critical: f32,
    /// Entry level for `Emergency`.
    pub emergency: f32,
}

impl TemperatureBreakpoints {
    /// Breakpoints ordered from the mildest to the most severe level.
    pub fn levels(&self) -> [f32; 4] {
        [self.warm, self.hot, self.critical, self.emergency]
    }

    /// Checks ranges and ordering of this section.
    pub fn validate(&self) -> ConfigResult<()> {
        let levels = self.levels();
        for (name, value) in ["warm", "hot", "critical", "emergency"].iter().zip(levels) {
            check_range(&format!("estimator.temperature.{name}"), value, 0.0, 1.0)?;
        }
        if !levels.windows(2).all(|w| w[0] < w[1]) {
            return Err(ConfigError::NonMonotonicBreakpoints {
                scale: "temperature",
                direction: "increasing",
                values: levels.to_vec(),
            });
        }
        Ok(())
    }
}

impl Default for TemperatureBreakpoints {
    fn default() -> Self {
        Self {
            warm: 0.60,
            hot: 0.75,
            critical: 0.85,
            emergency: 0.95,
        }
    }
}

/// Performance-ratio (`fps / target`) breakpoints.
///
/// A ratio strictly below a breakpoint enters that breakpoint's severity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatioBreakpoints {
    /// Below this ratio: `Elevated`.
    pub warm: f32,
    /// Below this ratio: `Serious`.
    pub hot: f32,
    /// Below this ratio: `Critical`.
    pub critical: f32,
    /// Below this ratio: `Emergency`.
    pub emergency: f32,
}

impl RatioBreakpoints {
    /// Breakpoints ordered from the mildest to the most severe level.
    pub fn levels(&self) -> [f32; 4] {
        [self.warm, self.hot, self.critical, self.emergency]
    }

    /// Checks ranges and ordering of this section.
    pub fn validate(&self) -> ConfigResult<()> {
        let levels = self.levels();
        for (name, value) in ["warm", "hot", "critical", "emergency"].iter().zip(levels) {
            check_range(&format!("estimator.performance.{name}"), value, 0.0, 1.0)?;
        }
        if !levels.windows(2).all(|w| w[0] > w[1]) {
            return Err(ConfigError::NonMonotonicBreakpoints {
                scale: "performance ratio",
                direction: "decreasing",
                values: levels.to_vec(),
            });
        }
        Ok(())
    }
}

impl Default for RatioBreakpoints {
    fn default() -> Self {
        Self {
            warm: 0.8,
            hot: 0.6,
            critical: 0.4,
            emergency: 0.2,
        }
    }
}

/// Configuration of the thermal estimator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Frame rate the performance ratio is measured against.
    pub target_fps: f32,
    /// Hardware path breakpoints.
    pub temperature: TemperatureBreakpoints,
    /// Fallback path breakpoints.
    pub performance: RatioBreakpoints,
    /// Trend at or above which a reading close to the next breakpoint
    /// escalates early. Values above `1.0`, the default, disable preemption.
    pub rising_trend_threshold: f32,
    /// How close (in normalized level) a rising reading must be to the next
    /// breakpoint to escalate early.
    pub trend_lookahead: f32,
    /// Consecutive milder evaluations required before severity drops.
    /// Escalation is always immediate. `1`, the default, de-escalates at once.
    pub recovery_evaluations: u32,
}

impl EstimatorConfig {
    /// Checks ranges and ordering of this section.
    pub fn validate(&self) -> ConfigResult<()> {
        check_positive("estimator.target_fps", self.target_fps as f64)?;
        self.temperature.validate()?;
        self.performance.validate()?;
        check_range(
            "estimator.rising_trend_threshold",
            self.rising_trend_threshold,
            0.0,
            f32::MAX,
        )?;
        check_range("estimator.trend_lookahead", self.trend_lookahead, 0.0, 1.0)?;
        check_positive(
            "estimator.recovery_evaluations",
            self.recovery_evaluations as f64,
        )
    }
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            target_fps: 60.0,
            temperature: TemperatureBreakpoints::default(),
            performance: RatioBreakpoints::default(),
            rising_trend_threshold: 2.0,
            trend_lookahead: 0.05,
            recovery_evaluations: 1,
        }
    }
}

/// Configuration of the metrics sampler.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Seconds of frames folded into one sample when the sampler flushes
    /// itself. `0` flushes on every call.
    pub flush_interval: f32,
    /// Seconds between two process memory probes.
    pub memory_probe_interval: f32,
}

impl SamplerConfig {
    /// Checks ranges and ordering of this section.
    pub fn validate(&self) -> ConfigResult<()> {
        check_range("sampler.flush_interval", self.flush_interval, 0.0, f32::MAX)?;
        check_range(
            "sampler.memory_probe_interval",
            self.memory_probe_interval,
            0.0,
            f32::MAX,
        )
    }
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            flush_interval: 1.0,
            memory_probe_interval: 5.0,
        }
    }
}

/// Configuration of the input throttle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputThrottleConfig {
    /// Events per tick when the device is cool.
    pub base_max_events_per_tick: u32,
    /// Events per tick in the `Emergency` state. Must not exceed the base.
    pub emergency_max_events_per_tick: u32,
    /// Capacity of the overflow queue.
    pub queue_capacity: usize,
}

impl InputThrottleConfig {
    /// Checks ranges and ordering of this section.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.base_max_events_per_tick == 0 {
            return Err(ConfigError::InvalidBudget(
                "base_max_events_per_tick must be at least 1".into(),
            ));
        }
        if self.emergency_max_events_per_tick > self.base_max_events_per_tick {
            return Err(ConfigError::InvalidBudget(format!(
                "emergency_max_events_per_tick ({}) exceeds base_max_events_per_tick ({})",
                self.emergency_max_events_per_tick, self.base_max_events_per_tick
            )));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::InvalidBudget(
                "queue_capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

impl Default for InputThrottleConfig {
    fn default() -> Self {
        Self {
            base_max_events_per_tick: 32,
            emergency_max_events_per_tick: 4,
            queue_capacity: 256,
        }
    }
}

/// Check intervals of the two consumers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CadenceConfig {
    /// Seconds between thermal/quality evaluations. `0` evaluates every tick.
    pub thermal_check_interval: f32,
    /// Seconds between input budget refreshes. `0` refreshes every tick.
    pub input_check_interval: f32,
}

impl CadenceConfig {
    /// Checks ranges and ordering of this section.
    pub fn validate(&self) -> ConfigResult<()> {
        check_range(
            "cadence.thermal_check_interval",
            self.thermal_check_interval,
            0.0,
            f32::MAX,
        )?;
        check_range(
            "cadence.input_check_interval",
            self.input_check_interval,
            0.0,
            f32::MAX,
        )
    }
}

impl Default for CadenceConfig {
    fn default() -> Self {
        Self {
            thermal_check_interval: 1.0,
            input_check_interval: 0.5,
        }
    }
}

fn check_range(field: &str, value: f32, min: f32, max: f32) -> ConfigResult<()> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field: field.to_string(),
            value,
            min,
            max,
        })
    }
}

fn check_positive(field: &str, value: f64) -> ConfigResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive {
            field: field.to_string(),
            value,
        })
    }
}
