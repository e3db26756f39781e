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

//! A toy thermal model of a handheld device.

use thermion_core::{QualitySettings, ThermalSignal};

const AMBIENT_C: f32 = 35.0;
const PEAK_C: f32 = 100.0;
const THROTTLE_START_C: f32 = 80.0;
/// Degrees per second reported as a full-scale trend.
const TREND_FULL_SCALE: f32 = 2.0;

/// Heats up with rendering load and throttles its frame rate when hot.
pub struct SimulatedDevice {
    cool_fps: f32,
    celsius: f32,
    degrees_per_second: f32,
}

impl SimulatedDevice {
    pub fn new(cool_fps: f32) -> Self {
        Self {
            cool_fps: cool_fps.max(1.0),
            celsius: AMBIENT_C + 10.0,
            degrees_per_second: 0.0,
        }
    }

    pub fn celsius(&self) -> f32 {
        self.celsius
    }

    /// Renders one frame with `settings` and returns its duration in seconds.
    ///
    /// `progress` in `[0, 1]` drives the scenario: the environment heats up
    /// over the first 60% of the run, then cools down.
    pub fn step(&mut self, progress: f32, settings: &QualitySettings) -> f32 {
        let load = workload(settings);
        let frame_time = self.frame_time(load, settings.target_frame_rate);

        let envelope = if progress < 0.6 {
            progress / 0.6
        } else {
            (1.0 - progress) / 0.4
        };
        let target = AMBIENT_C + (PEAK_C - AMBIENT_C) * envelope.clamp(0.0, 1.0) * load;
        let before = self.celsius;
        self.celsius += (target - self.celsius) * (frame_time * 0.4).min(1.0);
        self.degrees_per_second = (self.celsius - before) / frame_time;
        frame_time
    }

    pub fn signal(&self) -> ThermalSignal {
        ThermalSignal::from_celsius(self.celsius, self.degrees_per_second / TREND_FULL_SCALE)
    }

    fn frame_time(&self, load: f32, cap: u32) -> f32 {
        let throttle = if self.celsius > THROTTLE_START_C {
            1.0 - (self.celsius - THROTTLE_START_C) / 40.0
        } else {
            1.0
        };
        let fps = (self.cool_fps * throttle.max(0.25) / load.max(0.1))
            .min(cap as f32)
            .max(1.0);
        1.0 / fps
    }
}

/// Relative GPU load of a settings record; `1.0` at full quality.
fn workload(settings: &QualitySettings) -> f32 {
    let flag = |on: bool| if on { 0.05 } else { 0.0 };
    0.4 + 0.15 * settings.texture_quality
        + 0.15 * settings.shadow_quality
        + 0.1 * settings.particle_density
        + 0.1 * settings.lod_bias
        + flag(settings.post_processing)
        + flag(settings.reflections)
}

#[cfg(test)]
mod tests {
    use super::*;
    use thermion_core::quality::QualityProfiles;
    use thermion_core::QualityTier;

    #[test]
    fn test_full_quality_is_full_load() {
        let profiles = QualityProfiles::default();
        assert!((workload(profiles.settings(QualityTier::High)) - 1.0).abs() < 1e-6);
        assert!(workload(profiles.settings(QualityTier::Survival)) < 0.5);
    }

    #[test]
    fn test_device_heats_under_load() {
        let profiles = QualityProfiles::default();
        let mut device = SimulatedDevice::new(60.0);
        let start = device.celsius();
        for _ in 0..600 {
            device.step(0.5, profiles.settings(QualityTier::High));
        }
        assert!(device.celsius() > start);
        assert!(device.signal().temperature_level > 0.5);
    }
}
