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

//! Input events and the per-tick admission budget.

use crate::quality::QualityTier;
use crate::thermal::InputThermalState;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Largest magnitude an axis value may have once admitted.
pub const MAX_AXIS_MAGNITUDE: f32 = 1.0;

/// A single user input action, as produced by the host.
#[derive(Debug, Clone, PartialEq)]
pub struct InputEvent {
    /// Host-defined action identifier.
    pub action_id: u32,
    /// One-dimensional value (trigger, scroll, axis) in `[-1, 1]`.
    pub value_1d: f32,
    /// Two-dimensional value (stick, pointer delta), magnitude at most 1.
    pub value_2d: [f32; 2],
    /// The action went down this frame.
    pub pressed: bool,
    /// The action is being held.
    pub held: bool,
    /// The action went up this frame.
    pub released: bool,
    /// Seconds the action has been held.
    pub hold_duration: f32,
    /// When the host created the event.
    pub source_timestamp: Instant,
}

impl InputEvent {
    /// Creates an empty event for `action_id`, timestamped now.
    pub fn new(action_id: u32) -> Self {
        Self {
            action_id,
            value_1d: 0.0,
            value_2d: [0.0, 0.0],
            pressed: false,
            held: false,
            released: false,
            hold_duration: 0.0,
            source_timestamp: Instant::now(),
        }
    }

    /// Sets the one-dimensional value.
    pub fn with_value_1d(mut self, value: f32) -> Self {
        self.value_1d = value;
        self
    }

    /// Sets the two-dimensional value.
    pub fn with_value_2d(mut self, x: f32, y: f32) -> Self {
        self.value_2d = [x, y];
        self
    }

    /// Marks the event as a press.
    pub fn pressed(mut self) -> Self {
        self.pressed = true;
        self
    }

    /// Marks the event as a hold of `duration` seconds.
    pub fn held_for(mut self, duration: f32) -> Self {
        self.held = true;
        self.hold_duration = duration;
        self
    }

    /// Marks the event as a release.
    pub fn released(mut self) -> Self {
        self.released = true;
        self
    }

    /// Clamps every magnitude into its valid range.
    ///
    /// Returns `true` if anything had to be corrected. Non-finite values
    /// become zero; the 2D value is rescaled along its direction so its
    /// length does not exceed [`MAX_AXIS_MAGNITUDE`].
    pub fn sanitize(&mut self) -> bool {
        let mut corrected = false;

        if !self.value_1d.is_finite() {
            self.value_1d = 0.0;
            corrected = true;
        } else if self.value_1d.abs() > MAX_AXIS_MAGNITUDE {
            self.value_1d = self.value_1d.clamp(-MAX_AXIS_MAGNITUDE, MAX_AXIS_MAGNITUDE);
            corrected = true;
        }

        if self.value_2d.iter().any(|v| !v.is_finite()) {
            self.value_2d = [0.0, 0.0];
            corrected = true;
        } else {
            let [x, y] = self.value_2d;
            let length = x.hypot(y);
            if length > MAX_AXIS_MAGNITUDE {
                let scale = MAX_AXIS_MAGNITUDE / length;
                self.value_2d = [x * scale, y * scale];
                corrected = true;
            }
        }

        if !self.hold_duration.is_finite() || self.hold_duration < 0.0 {
            self.hold_duration = 0.0;
            corrected = true;
        }

        corrected
    }

    /// Scales both axis values by `multiplier`.
    pub fn scale(&mut self, multiplier: f32) {
        self.value_1d *= multiplier;
        self.value_2d[0] *= multiplier;
        self.value_2d[1] *= multiplier;
    }
}

/// How many events may be processed per tick, and how much to scale them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InputBudget {
    /// Events admitted per tick; never exceeds the configured base maximum.
    pub max_events_per_tick: u32,
    /// Factor applied to admitted magnitudes, in `(0, 1]`.
    pub value_multiplier: f32,
}

/// Outcome of submitting an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// Dispatched immediately within this tick's budget.
    Accepted,
    /// Over budget; buffered for a later tick.
    Queued,
}

/// Thermal/quality context stamped onto an event when it is processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputTag {
    /// Input throttle state at processing time.
    pub thermal: InputThermalState,
    /// Active quality tier at processing time.
    pub tier: QualityTier,
    /// Index of the tick that processed the event.
    pub tick: u64,
}

impl Default for InputTag {
    fn default() -> Self {
        Self {
            thermal: InputThermalState::Cool,
            tier: QualityTier::High,
            tick: 0,
        }
    }
}

/// An admitted event, scaled and tagged.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedInput {
    /// The event with magnitudes already multiplied by the budget factor.
    pub event: InputEvent,
    /// Context at processing time.
    pub tag: InputTag,
    /// Whether the event waited in the overflow queue.
    pub was_queued: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let event = InputEvent::new(7)
            .with_value_1d(0.5)
            .with_value_2d(0.1, -0.2)
            .pressed()
            .held_for(1.5);
        assert_eq!(event.action_id, 7);
        assert!(event.pressed && event.held && !event.released);
        assert_eq!(event.hold_duration, 1.5);
    }

    #[test]
    fn test_sanitize_leaves_valid_event_untouched() {
        let mut event = InputEvent::new(1).with_value_1d(-0.4).with_value_2d(0.3, 0.4);
        assert!(!event.sanitize());
        assert_eq!(event.value_1d, -0.4);
        assert_eq!(event.value_2d, [0.3, 0.4]);
    }

    #[test]
    fn test_sanitize_clamps_1d() {
        let mut event = InputEvent::new(1).with_value_1d(-4.0);
        assert!(event.sanitize());
        assert_eq!(event.value_1d, -1.0);
    }

    #[test]
    fn test_sanitize_rescales_2d_along_direction() {
        let mut event = InputEvent::new(1).with_value_2d(3.0, 4.0);
        assert!(event.sanitize());
        assert!((event.value_2d[0] - 0.6).abs() < 1e-6);
        assert!((event.value_2d[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_sanitize_rescales_huge_finite_2d() {
        let mut event = InputEvent::new(1).with_value_2d(3e19, 0.0);
        assert!(event.sanitize());
        assert!((event.value_2d[0] - 1.0).abs() < 1e-6);
        assert_eq!(event.value_2d[1], 0.0);
    }

    #[test]
    fn test_sanitize_zeroes_non_finite() {
        let mut event = InputEvent::new(1)
            .with_value_1d(f32::NAN)
            .with_value_2d(f32::INFINITY, 0.0)
            .held_for(-2.0);
        assert!(event.sanitize());
        assert_eq!(event.value_1d, 0.0);
        assert_eq!(event.value_2d, [0.0, 0.0]);
        assert_eq!(event.hold_duration, 0.0);
    }

    #[test]
    fn test_scale() {
        let mut event = InputEvent::new(1).with_value_1d(0.8).with_value_2d(0.4, -0.4);
        event.scale(0.25);
        assert!((event.value_1d - 0.2).abs() < 1e-6);
        assert!((event.value_2d[0] - 0.1).abs() < 1e-6);
        assert!((event.value_2d[1] + 0.1).abs() < 1e-6);
    }
}
