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

//! Threaded fixed-rate runner for the [`ControlLoop`].

use crate::control_loop::{ControlLoop, ControlSnapshot};
use crate::input::InputSubmitter;
use crossbeam_channel::{Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::thread;
use std::time::{Duration, Instant};
use thermion_core::{ConfigError, ConfigResult, TelemetryEvent, ThermalSensor};

/// Configuration of the [`ControlService`].
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Ticks per second.
    pub tick_rate: u32,
    /// Capacity of the telemetry inbox. Senders see the channel as full
    /// beyond this. Events sent while stopped wait in the inbox.
    pub telemetry_buffer_size: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60,
            telemetry_buffer_size: 1024,
        }
    }
}

/// Runs a [`ControlLoop`] on a background thread at a fixed rate.
///
/// Hosts feed frame times and hardware readings through the telemetry
/// sender, submit input through the [`InputSubmitter`], and read decisions
/// through [`snapshot`](Self::snapshot). Event subscriptions and the render
/// sink are installed on the loop while the service is stopped, either before
/// it is handed over or through [`control_loop_mut`](Self::control_loop_mut).
/// The service may be started again after [`stop`](Self::stop).
pub struct ControlService {
    config: ServiceConfig,
    control: Option<(ControlLoop, Receiver<TelemetryEvent>)>,
    sensor: Option<Arc<dyn ThermalSensor>>,
    snapshot: Arc<RwLock<ControlSnapshot>>,
    submitter: InputSubmitter,
    running: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<(ControlLoop, Receiver<TelemetryEvent>)>>,
    event_tx: Sender<TelemetryEvent>,
}

impl ControlService {
    /// Wraps `control`, rejecting a zero tick rate.
    pub fn new(control: ControlLoop, config: ServiceConfig) -> ConfigResult<Self> {
        if config.tick_rate == 0 {
            return Err(ConfigError::NotPositive {
                field: "service.tick_rate".into(),
                value: 0.0,
            });
        }
        let (tx, rx) = crossbeam_channel::bounded(config.telemetry_buffer_size.max(1));
        let service = Self {
            snapshot: Arc::new(RwLock::new(control.snapshot())),
            submitter: control.submitter(),
            control: Some((control, rx)),
            sensor: None,
            config,
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
            event_tx: tx,
        };
        Ok(service)
    }

    /// Installs a sensor polled once per tick. Takes effect on the next start.
    pub fn set_sensor(&mut self, sensor: impl ThermalSensor + 'static) {
        self.sensor = Some(Arc::new(sensor));
    }

    /// Starts the background thread. Does nothing if already running.
    pub fn start(&mut self) {
        if self.running.load(Ordering::SeqCst) {
            return;
        }
        let Some((mut control, event_rx)) = self.control.take() else {
            log::error!("ControlService: control loop lost, cannot start.");
            return;
        };

        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);
        let snapshot = Arc::clone(&self.snapshot);
        let sensor = self.sensor.clone();
        let tick_duration = Duration::from_secs_f32(1.0 / self.config.tick_rate as f32);

        let handle = thread::spawn(move || {
            log::info!("ControlService thread started.");
            let mut last_tick = Instant::now();

            while running.load(Ordering::Relaxed) {
                let start_time = Instant::now();

                // 1. Ingest pending telemetry
                while let Ok(event) = event_rx.try_recv() {
                    match event {
                        TelemetryEvent::FrameTime(dt) => control.record_frame(dt),
                        TelemetryEvent::Thermal(signal) => control.set_signal(Some(signal)),
                        TelemetryEvent::SensorLost => control.set_signal(None),
                    }
                }

                // 2. Poll the sensor, if any
                if let Some(sensor) = &sensor {
                    control.set_signal(sensor.read());
                }

                // 3. Advance the loop by wall-clock time
                let dt = start_time.duration_since(last_tick).as_secs_f32();
                last_tick = start_time;
                control.advance(dt);

                *snapshot.write().unwrap_or_else(PoisonError::into_inner) = control.snapshot();

                // 4. Sleep until next tick
                let elapsed = start_time.elapsed();
                if elapsed < tick_duration {
                    thread::sleep(tick_duration - elapsed);
                }
            }
            log::info!("ControlService thread stopped.");
            (control, event_rx)
        });

        self.handle = Some(handle);
    }

    /// Stops the background thread after its current tick completes.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            match handle.join() {
                Ok(parts) => self.control = Some(parts),
                Err(_) => log::error!("ControlService thread panicked; control loop dropped."),
            }
        }
    }

    /// Whether the background thread is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Returns a sender handle to submit telemetry to the service.
    pub fn telemetry_sender(&self) -> Sender<TelemetryEvent> {
        self.event_tx.clone()
    }

    /// Returns a handle for submitting input.
    pub fn submitter(&self) -> InputSubmitter {
        self.submitter.clone()
    }

    /// The latest decisions published by the background thread.
    pub fn snapshot(&self) -> ControlSnapshot {
        *self.snapshot.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// The control loop, while the service is stopped.
    pub fn control_loop(&self) -> Option<&ControlLoop> {
        self.control.as_ref().map(|(control, _)| control)
    }

    /// Mutable access to the control loop, while the service is stopped.
    pub fn control_loop_mut(&mut self) -> Option<&mut ControlLoop> {
        self.control.as_mut().map(|(control, _)| control)
    }
}

impl Drop for ControlService {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thermion_core::{ControlConfig, InputEvent, QualityTier, ThermalSignal, ThermalState};
    use thermion_telemetry::FixedMemoryProbe;

    fn service(tick_rate: u32) -> ControlService {
        let mut config = ControlConfig::default();
        config.cadence.thermal_check_interval = 0.0;
        config.cadence.input_check_interval = 0.0;
        let (control, _dispatched) =
            ControlLoop::with_memory_probe(config, Box::new(FixedMemoryProbe(None))).unwrap();
        ControlService::new(
            control,
            ServiceConfig {
                tick_rate,
                ..Default::default()
            },
        )
        .unwrap()
    }

    fn wait_for(service: &ControlService, predicate: impl Fn(&ControlSnapshot) -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if predicate(&service.snapshot()) {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn test_service_lifecycle() {
        let mut service = service(100);
        service.start();
        assert!(service.is_running());
        assert!(service.control_loop().is_none());
        service.stop();
        assert!(!service.is_running());
        assert!(service.control_loop().is_some());
    }

    #[test]
    fn test_zero_tick_rate_rejected() {
        let (control, _rx) = ControlLoop::with_memory_probe(
            ControlConfig::default(),
            Box::new(FixedMemoryProbe(None)),
        )
        .unwrap();
        let result = ControlService::new(
            control,
            ServiceConfig {
                tick_rate: 0,
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(ConfigError::NotPositive { .. })));
    }

    #[test]
    fn test_frame_times_drive_state() {
        let mut service = service(200);
        let tx = service.telemetry_sender();
        service.start();

        for _ in 0..5 {
            tx.send(TelemetryEvent::FrameTime(1.0 / 20.0)).unwrap();
        }
        assert!(wait_for(&service, |s| s.thermal_state == ThermalState::Critical));
        assert_eq!(service.snapshot().tier, QualityTier::Survival);
        service.stop();
    }

    #[test]
    fn test_thermal_reading_and_sensor_loss() {
        let mut service = service(200);
        let tx = service.telemetry_sender();
        service.start();

        tx.send(TelemetryEvent::FrameTime(1.0 / 60.0)).unwrap();
        tx.send(TelemetryEvent::Thermal(ThermalSignal::new(0.8, 0.0)))
            .unwrap();
        assert!(wait_for(&service, |s| s.thermal_state == ThermalState::Hot));

        tx.send(TelemetryEvent::SensorLost).unwrap();
        assert!(wait_for(&service, |s| s.thermal.hardware.is_none()));
        service.stop();
    }

    #[test]
    fn test_polled_sensor() {
        let mut service = service(200);
        service.set_sensor(|| Some(ThermalSignal::from_celsius(90.0, 0.0)));
        service.start();
        assert!(wait_for(&service, |s| s.thermal_state == ThermalState::Critical));
        service.stop();
    }

    #[test]
    fn test_submitter_usable_while_running() {
        let mut service = service(200);
        let submitter = service.submitter();
        service.start();
        submitter.submit(InputEvent::new(7));
        assert!(wait_for(&service, |s| s.throttle.dispatched == 1));
        service.stop();
    }

    #[test]
    fn test_restart_after_stop() {
        let mut service = service(200);
        let tx = service.telemetry_sender();
        service.start();
        service.stop();

        tx.send(TelemetryEvent::FrameTime(1.0 / 20.0)).unwrap();
        service.start();
        assert!(service.is_running());
        assert!(wait_for(&service, |s| s.thermal_state == ThermalState::Critical));
        service.stop();

        service.set_sensor(|| Some(ThermalSignal::new(0.8, 0.0)));
        tx.send(TelemetryEvent::FrameTime(1.0 / 60.0)).unwrap();
        service.start();
        assert!(wait_for(&service, |s| s.thermal_state == ThermalState::Hot));
        service.stop();
        assert!(service.control_loop().is_some());
    }

    #[test]
    fn test_drop_stops_thread() {
        let mut service = service(100);
        let running = Arc::clone(&service.running);
        service.start();
        drop(service);
        assert!(!running.load(Ordering::SeqCst));
    }
}
