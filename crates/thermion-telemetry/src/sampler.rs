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

//! Frame-time accumulation and sample flushing.

use crate::memory::{MemoryProbe, SysinfoMemoryProbe};
use crate::rolling::RingBuffer;
use std::time::Instant;
use thermion_core::config::SamplerConfig;
use thermion_core::{PerformanceSample, ThermalSignal};

/// Number of flushed samples kept in the rolling frame-time window.
pub const FRAME_WINDOW: usize = 120;

const BYTES_PER_MB: f32 = 1024.0 * 1024.0;

/// Folds per-frame deltas into [`PerformanceSample`]s.
///
/// Frames are accumulated until [`flush`](Self::flush) is called, either
/// explicitly by the control loop or implicitly by [`sample`](Self::sample)
/// once `flush_interval` seconds of frames have been recorded.
pub struct MetricsSampler {
    config: SamplerConfig,
    accumulated: f64,
    frames: u32,
    since_auto_flush: f32,
    since_memory_probe: f32,
    memory_usage_mb: f32,
    total_frames: u64,
    latest: PerformanceSample,
    frame_times: RingBuffer<f32, FRAME_WINDOW>,
    memory: Box<dyn MemoryProbe>,
}

impl MetricsSampler {
    /// Creates a sampler reading process memory through `sysinfo`.
    pub fn new(config: SamplerConfig) -> Self {
        Self::with_memory_probe(config, Box::new(SysinfoMemoryProbe::new()))
    }

    /// Creates a sampler with a custom memory probe.
    pub fn with_memory_probe(config: SamplerConfig, memory: Box<dyn MemoryProbe>) -> Self {
        Self {
            config,
            accumulated: 0.0,
            frames: 0,
            since_auto_flush: 0.0,
            // Probe on the first flush.
            since_memory_probe: f32::INFINITY,
            memory_usage_mb: 0.0,
            total_frames: 0,
            latest: PerformanceSample::unknown(),
            frame_times: RingBuffer::new(),
            memory,
        }
    }

    /// Folds one frame of `dt` seconds. Non-finite or non-positive deltas are ignored.
    pub fn record_frame(&mut self, dt: f32) {
        if !dt.is_finite() || dt <= 0.0 {
            log::trace!("MetricsSampler: ignoring frame delta {dt}");
            return;
        }
        self.accumulated += f64::from(dt);
        self.frames += 1;
        self.total_frames += 1;
        self.since_auto_flush += dt;
    }

    /// Closes the current window and returns the resulting sample.
    ///
    /// With no frames recorded since the previous flush, the previous timing
    /// is carried forward (or the unknown sentinel before the first frame)
    /// and only the hardware reading is refreshed.
    pub fn flush(&mut self, signal: Option<ThermalSignal>) -> PerformanceSample {
        let elapsed = self.accumulated as f32;
        self.probe_memory(elapsed);

        let mut sample = if self.frames == 0 {
            self.latest
        } else {
            let average = self.accumulated / f64::from(self.frames);
            let frame_time_ms = (average * 1000.0) as f32;
            self.frame_times.push(frame_time_ms);
            PerformanceSample {
                timestamp: Instant::now(),
                frame_time_ms,
                fps: (1.0 / average) as f32,
                memory_usage_mb: self.memory_usage_mb,
                hw_temperature: None,
                hw_trend: None,
                frames: self.frames,
            }
        };
        sample.timestamp = Instant::now();
        sample.memory_usage_mb = self.memory_usage_mb;
        sample.hw_temperature = signal.map(|s| s.temperature_level);
        sample.hw_trend = signal.map(|s| s.trend);

        self.accumulated = 0.0;
        self.frames = 0;
        self.since_auto_flush = 0.0;
        self.latest = sample;

        log::trace!(
            "MetricsSampler: flushed {} frames, {:.2} ms avg, {:.1} fps",
            sample.frames,
            sample.frame_time_ms,
            sample.fps
        );
        sample
    }

    /// Records a frame and flushes once `flush_interval` has elapsed.
    ///
    /// Returns the most recently flushed sample, or the unknown sentinel.
    pub fn sample(&mut self, dt: f32, signal: Option<ThermalSignal>) -> PerformanceSample {
        self.record_frame(dt);
        if self.frames > 0 && self.since_auto_flush >= self.config.flush_interval {
            return self.flush(signal);
        }
        self.latest
    }

    /// The most recently flushed sample.
    pub fn latest(&self) -> PerformanceSample {
        self.latest
    }

    /// Frames recorded since the last flush.
    pub fn pending_frames(&self) -> u32 {
        self.frames
    }

    /// Frames recorded since creation.
    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    /// Rolling window of flushed average frame times, in milliseconds.
    pub fn frame_times(&self) -> &RingBuffer<f32, FRAME_WINDOW> {
        &self.frame_times
    }

    /// Frame-time variance across the rolling window. High values mean stutter.
    pub fn frame_time_variance(&self) -> f32 {
        self.frame_times.variance()
    }

    /// Frame-time trend across the rolling window. Positive when frames get slower.
    pub fn frame_time_trend(&self) -> f32 {
        self.frame_times.trend()
    }

    fn probe_memory(&mut self, elapsed: f32) {
        self.since_memory_probe += elapsed;
        if self.since_memory_probe < self.config.memory_probe_interval {
            return;
        }
        self.since_memory_probe = 0.0;
        match self.memory.resident_bytes() {
            Some(bytes) => self.memory_usage_mb = bytes as f32 / BYTES_PER_MB,
            None => log::trace!("MetricsSampler: memory probe returned nothing"),
        }
    }
}

impl std::fmt::Debug for MetricsSampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsSampler")
            .field("config", &self.config)
            .field("pending_frames", &self.frames)
            .field("total_frames", &self.total_frames)
            .field("latest", &self.latest)
            .finish_non_exhaustive()
    }
}
