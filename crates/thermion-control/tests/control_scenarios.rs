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

use crossbeam_channel::Receiver;
use thermion_control::ControlLoop;
use thermion_core::{
    ControlConfig, InputEvent, ProcessedInput, QualityTier, Submission, ThermalSignal,
    ThermalState,
};
use thermion_telemetry::FixedMemoryProbe;

/// A loop evaluating on every tick, so each scenario needs a single frame.
fn every_tick(config: ControlConfig) -> (ControlLoop, Receiver<ProcessedInput>) {
    let mut config = config;
    config.cadence.thermal_check_interval = 0.0;
    config.cadence.input_check_interval = 0.0;
    ControlLoop::with_memory_probe(config, Box::new(FixedMemoryProbe(Some(0)))).unwrap()
}

fn action_ids(rx: &Receiver<ProcessedInput>) -> Vec<u32> {
    rx.try_iter().map(|p| p.event.action_id).collect()
}

#[test]
fn full_frame_rate_stays_optimal() {
    let (mut control, _rx) = every_tick(ControlConfig::default());
    control.tick(1.0 / 60.0, None);

    let snapshot = control.snapshot();
    assert_eq!(snapshot.thermal_state, ThermalState::Optimal);
    assert_eq!(snapshot.tier, QualityTier::High);
    assert_eq!(snapshot.budget.value_multiplier, 1.0);
}

#[test]
fn third_of_target_frame_rate_is_critical() {
    let (mut control, _rx) = every_tick(ControlConfig::default());
    control.tick(1.0 / 20.0, None);

    let snapshot = control.snapshot();
    assert!(snapshot.thermal.performance_ratio.unwrap() < 0.4);
    assert_eq!(snapshot.thermal_state, ThermalState::Critical);
    assert_eq!(snapshot.tier, QualityTier::Survival);
    assert_eq!(snapshot.budget.value_multiplier, 0.25);
}

#[test]
fn over_budget_submissions_drain_next_tick_in_order() {
    let mut config = ControlConfig::default();
    config.input.base_max_events_per_tick = 10;
    let (mut control, rx) = every_tick(config);
    control.tick(1.0 / 60.0, None);
    action_ids(&rx);

    let outcomes: Vec<Submission> = (0..15).map(|id| control.submit(InputEvent::new(id))).collect();
    assert_eq!(&outcomes[..10], &[Submission::Accepted; 10]);
    assert_eq!(&outcomes[10..], &[Submission::Queued; 5]);
    assert_eq!(action_ids(&rx), (0..10).collect::<Vec<_>>());

    control.tick(1.0 / 60.0, None);
    assert_eq!(action_ids(&rx), (10..15).collect::<Vec<_>>());
    assert_eq!(control.snapshot().throttle.queue_len, 0);
}

#[test]
fn hot_hardware_dominates_healthy_frame_rate() {
    let (mut control, _rx) = every_tick(ControlConfig::default());
    control.tick(1.0 / 58.0, Some(ThermalSignal::from_celsius(90.0, 0.0)));

    let snapshot = control.snapshot();
    assert!(snapshot.thermal.performance_ratio.unwrap() > 0.95);
    assert_eq!(snapshot.thermal_state, ThermalState::Critical);
    assert_eq!(snapshot.tier, QualityTier::Survival);
}

#[test]
fn full_queue_evicts_oldest_on_overflow() {
    let mut config = ControlConfig::default();
    config.input.base_max_events_per_tick = 1;
    config.input.emergency_max_events_per_tick = 1;
    config.input.queue_capacity = 4;
    let (mut control, rx) = every_tick(config);

    // One dispatched, four fill the queue.
    for id in 0..5 {
        control.submit(InputEvent::new(id));
    }
    assert_eq!(control.snapshot().throttle.queue_len, 4);
    assert_eq!(control.snapshot().throttle.dropped, 0);

    assert_eq!(control.submit(InputEvent::new(5)), Submission::Queued);
    let stats = control.snapshot().throttle;
    assert_eq!(stats.dropped, 1);
    assert_eq!(stats.queue_len, 4);

    action_ids(&rx);
    for _ in 0..4 {
        control.tick(1.0 / 60.0, None);
    }
    assert_eq!(action_ids(&rx), vec![2, 3, 4, 5]);
}

#[test]
fn collapsed_frame_rate_under_survival_cap_stays_hot() {
    let (mut control, _rx) = every_tick(ControlConfig::default());
    control.tick(1.0 / 20.0, None);
    assert_eq!(control.snapshot().tier, QualityTier::Survival);

    for _ in 0..3 {
        control.tick(1.0 / 25.0, None);
        let snapshot = control.snapshot();
        let ratio = snapshot.thermal.performance_ratio.unwrap();
        assert!((ratio - 25.0 / 60.0).abs() < 1e-3);
        assert_eq!(snapshot.thermal_state, ThermalState::Hot);
        assert_eq!(snapshot.tier, QualityTier::Low);
    }
    assert_eq!(control.quality().change_count(), 2);
}

#[test]
fn default_cadence_follows_frame_rate_without_sensor() {
    let (mut control, _rx) =
        ControlLoop::with_memory_probe(ControlConfig::default(), Box::new(FixedMemoryProbe(None)))
            .unwrap();

    let phases = [
        (60u32, ThermalState::Optimal, QualityTier::High),
        (20, ThermalState::Critical, QualityTier::Survival),
        (25, ThermalState::Hot, QualityTier::Low),
        (60, ThermalState::Optimal, QualityTier::High),
    ];
    for (fps, state, tier) in phases {
        let ticks = fps * 4;
        let settled_from = fps * 5 / 2;
        for i in 0..ticks {
            control.tick(1.0 / fps as f32, None);
            // Later checks only see frames of this phase.
            if i >= settled_from {
                let snapshot = control.snapshot();
                assert_eq!(snapshot.thermal_state, state, "{fps} fps, tick {i}");
                assert_eq!(snapshot.tier, tier, "{fps} fps, tick {i}");
            }
        }
    }
}

#[test]
fn device_heats_then_cools_back_to_high() {
    let mut config = ControlConfig::default();
    config.estimator.recovery_evaluations = 2;
    let (mut control, _rx) = every_tick(config);

    let mut tiers = Vec::new();
    for celsius in [40.0, 70.0, 80.0, 90.0, 96.0, 80.0, 80.0, 40.0, 40.0] {
        control.tick(1.0 / 60.0, Some(ThermalSignal::from_celsius(celsius, 0.0)));
        tiers.push(control.snapshot().tier);
    }
    assert_eq!(
        tiers,
        vec![
            QualityTier::High,
            QualityTier::Medium,
            QualityTier::Low,
            QualityTier::Survival,
            QualityTier::Survival,
            QualityTier::Survival,
            QualityTier::Low,
            QualityTier::Low,
            QualityTier::High,
        ]
    );
}
