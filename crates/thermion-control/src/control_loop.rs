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

//! The tick-driven control loop.
//!
//! [`ControlLoop`] owns every component and runs them from a single
//! [`tick`](ControlLoop::tick) call made by the host once per frame. Two
//! cadences run inside it:
//!
//! - the **thermal check** flushes the sampler, runs the estimator and feeds
//!   the quality controller;
//! - the **input check** re-maps the latest estimate onto an input budget.
//!
//! Both read the same [`ThermalSnapshot`]. The input queue is drained on
//! every tick regardless of cadence.

use crate::estimator::{ThermalEstimator, ThermalSnapshot};
use crate::input::{InputSubmitter, InputThrottleController, ThrottleStats};
use crate::quality::{QualityTierController, RenderSettingsSink};
use crossbeam_channel::Receiver;
use thermion_core::config::CadenceConfig;
use thermion_core::{
    ConfigResult, ControlConfig, ControlEvent, ControlEventKind, EventBroadcaster, HandlerError,
    InputBudget, InputEvent, InputThermalState, PerformanceSample, ProcessedInput, QualityTier,
    Submission, SubscriptionId, ThermalSignal, ThermalState,
};
use thermion_telemetry::{MemoryProbe, MetricsSampler};

/// Read-only view of the loop's latest decisions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlSnapshot {
    /// The sample the last thermal check classified.
    pub sample: PerformanceSample,
    /// The last estimate.
    pub thermal: ThermalSnapshot,
    /// Four-level state of the last estimate.
    pub thermal_state: ThermalState,
    /// State currently driving the input budget.
    pub input_state: InputThermalState,
    /// Active quality tier.
    pub tier: QualityTier,
    /// Input budget in force.
    pub budget: InputBudget,
    /// Throttle counters.
    pub throttle: ThrottleStats,
    /// Ticks run so far.
    pub ticks: u64,
}

/// Single-threaded orchestration of sampling, estimation, quality and input.
pub struct ControlLoop {
    cadence: CadenceConfig,
    sampler: MetricsSampler,
    estimator: ThermalEstimator,
    quality: QualityTierController,
    input: InputThrottleController,
    events: EventBroadcaster,
    signal: Option<ThermalSignal>,
    latest_sample: PerformanceSample,
    thermal_elapsed: f32,
    input_elapsed: f32,
    ticks: u64,
}

impl ControlLoop {
    /// Builds a loop reading process memory through `sysinfo`.
    ///
    /// Returns the loop and the receiving end of the input dispatch channel.
    pub fn new(config: ControlConfig) -> ConfigResult<(Self, Receiver<ProcessedInput>)> {
        let sampler = MetricsSampler::new(config.sampler);
        Self::build(config, sampler)
    }

    /// Builds a loop with a custom memory probe.
    pub fn with_memory_probe(
        config: ControlConfig,
        probe: Box<dyn MemoryProbe>,
    ) -> ConfigResult<(Self, Receiver<ProcessedInput>)> {
        let sampler = MetricsSampler::with_memory_probe(config.sampler, probe);
        Self::build(config, sampler)
    }

    fn build(
        config: ControlConfig,
        sampler: MetricsSampler,
    ) -> ConfigResult<(Self, Receiver<ProcessedInput>)> {
        config.validate()?;
        let estimator = ThermalEstimator::new(config.estimator)?;
        let quality = QualityTierController::new(config.quality)?;
        let (input, dispatched) = InputThrottleController::new(config.input)?;

        log::info!(
            "ControlLoop: ready (target {} fps, thermal check {}s, input check {}s)",
            config.estimator.target_fps,
            config.cadence.thermal_check_interval,
            config.cadence.input_check_interval
        );

        let control = Self {
            cadence: config.cadence,
            sampler,
            estimator,
            quality,
            input,
            events: EventBroadcaster::new(),
            signal: None,
            latest_sample: PerformanceSample::unknown(),
            thermal_elapsed: 0.0,
            input_elapsed: 0.0,
            ticks: 0,
        };
        Ok((control, dispatched))
    }

    /// Installs the sink receiving quality settings on tier changes.
    pub fn set_render_sink(&mut self, sink: impl RenderSettingsSink + 'static) {
        self.quality.set_sink(sink);
    }

    /// Subscribes `handler` to events of `kind`.
    pub fn subscribe<F>(&mut self, kind: ControlEventKind, handler: F) -> SubscriptionId
    where
        F: FnMut(&ControlEvent) -> Result<(), HandlerError> + Send + 'static,
    {
        self.events.subscribe(kind, handler)
    }

    /// Removes a subscription.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// The broadcaster, for channel subscriptions and diagnostics.
    pub fn events_mut(&mut self) -> &mut EventBroadcaster {
        &mut self.events
    }

    /// A cloneable handle for submitting input from any thread.
    pub fn submitter(&self) -> InputSubmitter {
        self.input.submitter()
    }

    /// Submits an input event.
    pub fn submit(&self, event: InputEvent) -> Submission {
        self.input.submit(event)
    }

    /// Whether a submission right now would be dispatched immediately.
    pub fn can_process_now(&self) -> bool {
        self.input.can_process_now()
    }

    /// Folds one frame into the sampler without advancing the cadences.
    pub fn record_frame(&mut self, dt: f32) {
        self.sampler.record_frame(dt);
    }

    /// Replaces the hardware reading used by the next thermal check.
    ///
    /// `None` means the sensor is unavailable; the estimator then relies on
    /// the frame rate alone.
    pub fn set_signal(&mut self, signal: Option<ThermalSignal>) {
        self.signal = signal;
    }

    /// The hardware reading currently held.
    pub fn signal(&self) -> Option<ThermalSignal> {
        self.signal
    }

    /// Records a frame of `dt` seconds with its hardware reading, then
    /// advances the loop.
    pub fn tick(&mut self, dt: f32, signal: Option<ThermalSignal>) {
        self.record_frame(dt);
        self.set_signal(signal);
        self.advance(dt);
    }

    /// Advances the cadence timers by `dt` seconds and starts a new input
    /// tick. Non-finite or negative `dt` advances nothing but still ticks.
    pub fn advance(&mut self, dt: f32) {
        let dt = if dt.is_finite() && dt > 0.0 { dt } else { 0.0 };
        self.ticks += 1;
        self.thermal_elapsed += dt;
        self.input_elapsed += dt;

        if self.thermal_elapsed >= self.cadence.thermal_check_interval {
            self.thermal_elapsed = 0.0;
            self.check_thermal();
        }
        if self.input_elapsed >= self.cadence.input_check_interval {
            self.input_elapsed = 0.0;
            self.check_input();
        }

        let budget = self.input.on_tick();
        log::trace!(
            "ControlLoop: tick {} budget {} events x{}",
            self.ticks,
            budget.max_events_per_tick,
            budget.value_multiplier
        );
    }

    /// Runs both checks immediately and restarts their timers.
    pub fn evaluate_now(&mut self) {
        self.thermal_elapsed = 0.0;
        self.input_elapsed = 0.0;
        self.check_thermal();
        self.check_input();
    }

    /// Re-sends the active quality settings to the render sink.
    pub fn force_apply_quality(&mut self) {
        self.quality.force_apply();
    }

    /// The latest decisions.
    pub fn snapshot(&self) -> ControlSnapshot {
        let thermal = self.estimator.current();
        ControlSnapshot {
            sample: self.latest_sample,
            thermal,
            thermal_state: thermal.thermal_state(),
            input_state: self.input.state(),
            tier: self.quality.active_tier(),
            budget: self.input.budget(),
            throttle: self.input.stats(),
            ticks: self.ticks,
        }
    }

    /// The sampler, for frame-time statistics.
    pub fn sampler(&self) -> &MetricsSampler {
        &self.sampler
    }

    /// The estimator.
    pub fn estimator(&self) -> &ThermalEstimator {
        &self.estimator
    }

    /// The quality controller.
    pub fn quality(&self) -> &QualityTierController {
        &self.quality
    }

    /// The input throttle.
    pub fn input(&self) -> &InputThrottleController {
        &self.input
    }

    /// Check intervals and tick rate in use.
    pub fn cadence(&self) -> &CadenceConfig {
        &self.cadence
    }

    fn check_thermal(&mut self) {
        let sample = self.sampler.flush(self.signal);
        self.latest_sample = sample;
        let estimate = self.estimator.estimate(&sample, None);

        if let Some(transition) = estimate.changed {
            self.events
                .publish(ControlEvent::ThermalStateChanged(transition));
        }
        self.quality
            .on_thermal_state(estimate.state(), &mut self.events);
    }

    fn check_input(&mut self) {
        let state = self.estimator.current().input_state();
        let tier = self.quality.active_tier();
        if let Some(transition) = self.input.apply_state(state, tier) {
            let budget = self.input.budget();
            self.events
                .publish(ControlEvent::InputThermalStateChanged { transition, budget });
        }
    }
}

impl std::fmt::Debug for ControlLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlLoop")
            .field("ticks", &self.ticks)
            .field("estimator", &self.estimator)
            .field("quality", &self.quality)
            .field("input", &self.input)
            .finish_non_exhaustive()
    }
}
