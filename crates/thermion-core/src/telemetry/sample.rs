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

use crate::thermal::ThermalSignal;
use std::time::Instant;

/// One flushed window of frame timing, folded from every frame since the
/// previous flush.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerformanceSample {
    /// When the window was flushed.
    pub timestamp: Instant,
    /// Average frame time over the window, in milliseconds.
    pub frame_time_ms: f32,
    /// Frames per second derived from the average frame time.
    pub fps: f32,
    /// Process memory usage estimate, in megabytes.
    pub memory_usage_mb: f32,
    /// Normalized hardware temperature level, if a sensor reported one.
    pub hw_temperature: Option<f32>,
    /// Hardware temperature trend, if a sensor reported one.
    pub hw_trend: Option<f32>,
    /// Number of frames folded into this sample. Zero means "unknown".
    pub frames: u32,
}

impl PerformanceSample {
    /// The sentinel returned before any frame has been observed.
    pub fn unknown() -> Self {
        Self {
            timestamp: Instant::now(),
            frame_time_ms: 0.0,
            fps: 0.0,
            memory_usage_mb: 0.0,
            hw_temperature: None,
            hw_trend: None,
            frames: 0,
        }
    }

    /// Returns `true` for the no-data sentinel.
    pub fn is_unknown(&self) -> bool {
        self.frames == 0
    }

    /// Returns `fps / target_fps`, or `None` without usable data.
    pub fn performance_ratio(&self, target_fps: f32) -> Option<f32> {
        if self.is_unknown() || target_fps.is_nan() || target_fps <= 0.0 {
            return None;
        }
        let ratio = self.fps / target_fps;
        ratio.is_finite().then_some(ratio)
    }

    /// Returns the hardware reading carried by this sample, if any.
    pub fn thermal_signal(&self) -> Option<ThermalSignal> {
        self.hw_temperature
            .map(|level| ThermalSignal::new(level, self.hw_trend.unwrap_or(0.0)))
    }
}

impl Default for PerformanceSample {
    fn default() -> Self {
        Self::unknown()
    }
}
