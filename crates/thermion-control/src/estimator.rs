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

//! Thermal estimation.
//!
//! The [`ThermalEstimator`] turns a [`PerformanceSample`] and an optional
//! hardware reading into one [`Severity`] on the canonical scale. Two paths
//! feed it:
//!
//! 1. **Hardware**: the normalized temperature level against increasing
//!    breakpoints. Optionally escalated one level early when the reading
//!    rises fast and sits just below the next breakpoint.
//! 2. **Frame rate**: `fps / target` against decreasing breakpoints.
//!
//! When both are available the worse one wins. Both controllers consume the
//! resulting [`ThermalSnapshot`], so they always agree on relative severity.

use thermion_core::config::{EstimatorConfig, RatioBreakpoints};
use thermion_core::{
    ConfigResult, InputThermalState, PerformanceSample, Severity, ThermalSignal, ThermalState,
    Transition,
};

/// The outcome of one estimation, shared by every consumer.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ThermalSnapshot {
    /// Settled severity after the worst-of rule and recovery hysteresis.
    pub severity: Severity,
    /// What the hardware path alone read, if a signal was available.
    pub hardware: Option<Severity>,
    /// What the frame-rate path alone read, if the sample had frames.
    pub performance: Option<Severity>,
    /// The ratio the frame-rate path classified.
    pub performance_ratio: Option<f32>,
}

impl ThermalSnapshot {
    /// Four-level projection used by the quality path.
    pub fn thermal_state(&self) -> ThermalState {
        self.severity.into()
    }

    /// Five-level projection used by the input path.
    pub fn input_state(&self) -> InputThermalState {
        self.severity.into()
    }
}

/// Result of [`ThermalEstimator::estimate`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimate {
    /// The new snapshot.
    pub snapshot: ThermalSnapshot,
    /// Set only when the four-level state differs from the previous estimate.
    pub changed: Option<Transition<ThermalState>>,
}

impl Estimate {
    /// The four-level state of this estimate.
    pub fn state(&self) -> ThermalState {
        self.snapshot.thermal_state()
    }
}

/// Classifies a hardware reading. `None` when the level is not a number.
pub fn classify_temperature(config: &EstimatorConfig, signal: ThermalSignal) -> Option<Severity> {
    let level = signal.temperature_level;
    if !level.is_finite() {
        return None;
    }
    let levels = config.temperature.levels();
    let crossed = levels.iter().take_while(|&&bp| level >= bp).count();
    let mut severity = Severity::ALL[crossed];

    if let Some(&next) = levels.get(crossed) {
        if signal.trend >= config.rising_trend_threshold && next - level <= config.trend_lookahead {
            log::debug!(
                "ThermalEstimator: level {:.3} rising ({:+.2}) near {:.2}, escalating early.",
                level,
                signal.trend,
                next
            );
            severity = severity.escalate();
        }
    }
    Some(severity)
}

/// Classifies a performance ratio. `None` when the ratio is not a number.
pub fn classify_ratio(breakpoints: &RatioBreakpoints, ratio: f32) -> Option<Severity> {
    if !ratio.is_finite() {
        return None;
    }
    let crossed = breakpoints
        .levels()
        .iter()
        .take_while(|&&bp| ratio < bp)
        .count();
    Some(Severity::ALL[crossed])
}

/// Stateful estimator producing edge-triggered thermal state changes.
#[derive(Debug)]
pub struct ThermalEstimator {
    config: EstimatorConfig,
    current: ThermalSnapshot,
    recovery: Option<(Severity, u32)>,
    sensor_available: Option<bool>,
    evaluations: u64,
}

impl ThermalEstimator {
    /// Creates an estimator, rejecting invalid breakpoints.
    pub fn new(config: EstimatorConfig) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            current: ThermalSnapshot::default(),
            recovery: None,
            sensor_available: None,
            evaluations: 0,
        })
    }

    /// The configuration this estimator was built with.
    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    /// The most recent snapshot. `Nominal` before the first estimate.
    pub fn current(&self) -> ThermalSnapshot {
        self.current
    }

    /// Number of estimates performed.
    pub fn evaluations(&self) -> u64 {
        self.evaluations
    }

    /// Estimates the severity for `sample`.
    ///
    /// `signal` overrides the hardware reading carried by the sample. With
    /// neither a signal nor frames in the sample, the reading is `Nominal`.
    pub fn estimate(
        &mut self,
        sample: &PerformanceSample,
        signal: Option<ThermalSignal>,
    ) -> Estimate {
        let signal = signal.or_else(|| sample.thermal_signal());
        self.note_sensor(signal.is_some());

        let hardware = signal.and_then(|s| classify_temperature(&self.config, s));
        let performance_ratio = sample.performance_ratio(self.config.target_fps);
        let performance =
            performance_ratio.and_then(|r| classify_ratio(&self.config.performance, r));

        let measured = match (hardware, performance) {
            (Some(h), Some(p)) => h.worst(p),
            (Some(s), None) | (None, Some(s)) => s,
            (None, None) => Severity::Nominal,
        };

        let previous = self.current.severity;
        let severity = self.settle(previous, measured);
        self.evaluations += 1;
        self.current = ThermalSnapshot {
            severity,
            hardware,
            performance,
            performance_ratio,
        };

        log::debug!(
            "ThermalEstimator: hw={:?} perf={:?} (ratio {:?}) -> measured {}, settled {}",
            hardware,
            performance,
            performance_ratio,
            measured,
            severity
        );

        let changed = Transition::between(ThermalState::from(previous), ThermalState::from(severity));
        if let Some(t) = changed {
            log::info!("ThermalEstimator: thermal state {} -> {}", t.from, t.to);
        }
        Estimate {
            snapshot: self.current,
            changed,
        }
    }

    // Escalation is immediate; recovery waits for enough milder readings and
    // lands on the worst of them.
    fn settle(&mut self, previous: Severity, measured: Severity) -> Severity {
        if measured >= previous {
            self.recovery = None;
            return measured;
        }
        let (pending, count) = match self.recovery {
            Some((pending, count)) => (pending.worst(measured), count + 1),
            None => (measured, 1),
        };
        if count >= self.config.recovery_evaluations {
            self.recovery = None;
            pending
        } else {
            log::trace!(
                "ThermalEstimator: recovery {}/{} towards {}",
                count,
                self.config.recovery_evaluations,
                pending
            );
            self.recovery = Some((pending, count));
            previous
        }
    }

    fn note_sensor(&mut self, available: bool) {
        if self.sensor_available == Some(available) {
            return;
        }
        if available {
            log::debug!("ThermalEstimator: hardware thermal signal available.");
        } else {
            log::debug!("ThermalEstimator: no hardware thermal signal, using frame-rate fallback.");
        }
        self.sensor_available = Some(available);
    }
}
