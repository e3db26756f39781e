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

//! The canonical severity scale and its per-subsystem projections.
//!
//! The estimator produces a single [`Severity`]. Each consumer reads it
//! through its own projection ([`ThermalState`] for rendering quality,
//! [`InputThermalState`] for input throttling), so both subsystems always
//! agree on relative severity even though their granularity differs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Temperature, in degrees Celsius, that maps to a normalized level of `1.0`.
pub const CELSIUS_FULL_SCALE: f32 = 100.0;

/// The canonical, totally ordered severity scale.
///
/// The declaration order defines the ordering: `Nominal` is the mildest,
/// `Emergency` the most severe.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum Severity {
    /// Device is running well within its envelope.
    #[default]
    Nominal,
    /// Device is warming up or frame rate is slipping.
    Elevated,
    /// Sustained heat or a clear frame-rate drop.
    Serious,
    /// The device is at its thermal or performance limit.
    Critical,
    /// Beyond critical; only the input path reacts to this level separately.
    Emergency,
}

impl Severity {
    /// All levels, mildest first.
    pub const ALL: [Severity; 5] = [
        Severity::Nominal,
        Severity::Elevated,
        Severity::Serious,
        Severity::Critical,
        Severity::Emergency,
    ];

    /// The worst-of combinator: returns the more severe of the two levels.
    pub fn worst(self, other: Severity) -> Severity {
        self.max(other)
    }

    /// Returns the next more severe level, saturating at `Emergency`.
    pub fn escalate(self) -> Severity {
        match self {
            Severity::Nominal => Severity::Elevated,
            Severity::Elevated => Severity::Serious,
            Severity::Serious => Severity::Critical,
            Severity::Critical | Severity::Emergency => Severity::Emergency,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// The four-level thermal state consumed by the quality controller.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum ThermalState {
    /// Full quality is sustainable.
    #[default]
    Optimal,
    /// Slight pressure.
    Warm,
    /// Heavy pressure.
    Hot,
    /// At the limit. `Emergency` collapses into this state.
    Critical,
}

impl From<Severity> for ThermalState {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Nominal => ThermalState::Optimal,
            Severity::Elevated => ThermalState::Warm,
            Severity::Serious => ThermalState::Hot,
            Severity::Critical | Severity::Emergency => ThermalState::Critical,
        }
    }
}

impl fmt::Display for ThermalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// The five-level state consumed by the input throttle.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum InputThermalState {
    /// No throttling.
    #[default]
    Cool,
    /// Light throttling.
    Warm,
    /// Moderate throttling.
    Hot,
    /// Heavy throttling.
    Critical,
    /// Minimal input admission.
    Emergency,
}

impl From<Severity> for InputThermalState {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Nominal => InputThermalState::Cool,
            Severity::Elevated => InputThermalState::Warm,
            Severity::Serious => InputThermalState::Hot,
            Severity::Critical => InputThermalState::Critical,
            Severity::Emergency => InputThermalState::Emergency,
        }
    }
}

impl fmt::Display for InputThermalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A hardware thermal reading supplied by the host platform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThermalSignal {
    /// Normalized temperature level in `[0, 1]`.
    pub temperature_level: f32,
    /// Temperature trend in `[-1, 1]`; positive means heating up.
    pub trend: f32,
}

impl ThermalSignal {
    /// Creates a signal, clamping both fields into their valid ranges.
    pub fn new(temperature_level: f32, trend: f32) -> Self {
        Self {
            temperature_level: clamp_or(temperature_level, 0.0, 1.0, 0.0),
            trend: clamp_or(trend, -1.0, 1.0, 0.0),
        }
    }

    /// Creates a signal from a raw temperature in degrees Celsius.
    ///
    /// The reading is normalized against [`CELSIUS_FULL_SCALE`].
    pub fn from_celsius(celsius: f32, trend: f32) -> Self {
        Self::new(celsius / CELSIUS_FULL_SCALE, trend)
    }

    /// Returns the reading expressed in degrees Celsius.
    pub fn celsius(&self) -> f32 {
        self.temperature_level * CELSIUS_FULL_SCALE
    }
}

// NaN maps to `fallback` so a broken sensor never reads as hot.
fn clamp_or(value: f32, min: f32, max: f32, fallback: f32) -> f32 {
    if value.is_nan() {
        fallback
    } else {
        value.clamp(min, max)
    }
}

/// Trait for platform shims that expose a hardware temperature reading.
///
/// Returning `None` means the sensor is unavailable; the estimator then
/// falls back to the performance ratio without surfacing an error.
pub trait ThermalSensor: Send + Sync {
    /// Returns the latest reading, if the platform provides one.
    fn read(&self) -> Option<ThermalSignal>;
}

impl<F> ThermalSensor for F
where
    F: Fn() -> Option<ThermalSignal> + Send + Sync,
{
    fn read(&self) -> Option<ThermalSignal> {
        self()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_is_totally_ordered() {
        for pair in Severity::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn test_worst_picks_more_severe() {
        assert_eq!(
            Severity::Nominal.worst(Severity::Critical),
            Severity::Critical
        );
        assert_eq!(
            Severity::Emergency.worst(Severity::Elevated),
            Severity::Emergency
        );
        assert_eq!(Severity::Serious.worst(Severity::Serious), Severity::Serious);
    }

    #[test]
    fn test_escalate_saturates() {
        assert_eq!(Severity::Nominal.escalate(), Severity::Elevated);
        assert_eq!(Severity::Critical.escalate(), Severity::Emergency);
        assert_eq!(Severity::Emergency.escalate(), Severity::Emergency);
    }

    #[test]
    fn test_projections_preserve_order() {
        let thermal: Vec<ThermalState> = Severity::ALL.iter().map(|&s| s.into()).collect();
        let input: Vec<InputThermalState> = Severity::ALL.iter().map(|&s| s.into()).collect();
        for pair in thermal.windows(2) {
            assert!(pair[0] <= pair[1]);
        }
        for pair in input.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn test_emergency_collapses_for_quality() {
        assert_eq!(
            ThermalState::from(Severity::Emergency),
            ThermalState::Critical
        );
        assert_eq!(
            InputThermalState::from(Severity::Emergency),
            InputThermalState::Emergency
        );
    }

    #[test]
    fn test_signal_from_celsius() {
        let signal = ThermalSignal::from_celsius(90.0, 0.0);
        assert!((signal.temperature_level - 0.9).abs() < 1e-6);
        assert!((signal.celsius() - 90.0).abs() < 1e-4);
    }

    #[test]
    fn test_signal_clamps_out_of_range() {
        let signal = ThermalSignal::new(1.7, -3.0);
        assert_eq!(signal.temperature_level, 1.0);
        assert_eq!(signal.trend, -1.0);

        let broken = ThermalSignal::new(f32::NAN, f32::NAN);
        assert_eq!(broken.temperature_level, 0.0);
        assert_eq!(broken.trend, 0.0);
    }

    #[test]
    fn test_closure_sensor() {
        let sensor = || Some(ThermalSignal::new(0.5, 0.1));
        assert_eq!(sensor.read().map(|s| s.temperature_level), Some(0.5));
    }
}
