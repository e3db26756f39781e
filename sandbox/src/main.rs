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

//! Host simulation: a device heats up under load, then cools down, while the
//! control loop adapts quality and input admission.

mod device;

use anyhow::{Context, Result};
use clap::Parser;
use device::SimulatedDevice;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use thermion_control::{ControlLoop, ControlService, ServiceConfig};
use thermion_core::quality::QualityProfiles;
use thermion_core::{
    ControlConfig, ControlEvent, ControlEventKind, InputEvent, QualitySettings, QualityTier,
    TelemetryEvent,
};

#[derive(Parser, Debug)]
#[command(name = "sandbox")]
#[command(version, about = "Simulates a device heating up and cooling down under the control loop")]
struct Cli {
    /// RON file overriding the default control configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the effective configuration as RON and exit
    #[arg(long)]
    dump_config: bool,

    /// Simulated seconds to run
    #[arg(long, default_value_t = 60.0)]
    duration: f32,

    /// Frame rate the simulated device reaches when cool
    #[arg(long, default_value_t = 60.0)]
    device_fps: f32,

    /// Input events submitted per frame
    #[arg(long, default_value_t = 8)]
    input_rate: u32,

    /// Rely on the frame rate alone, as on platforms without a sensor
    #[arg(long)]
    no_sensor: bool,

    /// Run the loop on the background service in real time
    #[arg(long)]
    service: bool,

    /// Ticks per second of the background service
    #[arg(long, default_value_t = 60)]
    tick_rate: u32,
}

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    if cli.dump_config {
        let text = ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let profiles = config.quality;
    let (mut control, dispatched) = ControlLoop::new(config)?;
    subscribe_loggers(&mut control);
    control.set_render_sink(|tier: QualityTier, settings: &QualitySettings| {
        log::debug!("Render sink: {tier} -> {settings:?}");
    });

    let frame_inputs = thread::spawn(move || dispatched.iter().count());

    if cli.service {
        run_service(&cli, control, &profiles)?;
    } else {
        run_simulated(&cli, control);
    }

    let processed = frame_inputs
        .join()
        .map_err(|_| anyhow::anyhow!("input consumer panicked"))?;
    log::info!("Sandbox: host consumed {processed} processed input events.");
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<ControlConfig> {
    let Some(path) = path else {
        return Ok(ControlConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config: ControlConfig =
        ron::from_str(&text).with_context(|| format!("parsing config {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("validating config {}", path.display()))?;
    log::info!("Sandbox: loaded configuration from {}", path.display());
    Ok(config)
}

fn subscribe_loggers(control: &mut ControlLoop) {
    control.subscribe(ControlEventKind::ThermalStateChanged, |event| {
        if let ControlEvent::ThermalStateChanged(t) = event {
            log::info!("Event: thermal state {} -> {}", t.from, t.to);
        }
        Ok(())
    });
    control.subscribe(ControlEventKind::QualityTierChanged, |event| {
        if let ControlEvent::QualityTierChanged { transition, settings } = event {
            log::info!(
                "Event: quality {} -> {} ({} fps cap, {} cascades)",
                transition.from,
                transition.to,
                settings.target_frame_rate,
                settings.shadow_cascades
            );
        }
        Ok(())
    });
    control.subscribe(ControlEventKind::InputThermalStateChanged, |event| {
        if let ControlEvent::InputThermalStateChanged { transition, budget } = event {
            log::info!(
                "Event: input {} -> {} ({} events/tick, x{})",
                transition.from,
                transition.to,
                budget.max_events_per_tick,
                budget.value_multiplier
            );
        }
        Ok(())
    });
}

fn submit_inputs(submit: impl Fn(InputEvent), frame: u64, count: u32) {
    let phase = frame as f32 * 0.05;
    for i in 0..count {
        submit(
            InputEvent::new(i)
                .with_value_1d(phase.sin())
                .with_value_2d(phase.cos(), phase.sin())
                .held_for(frame as f32 / 60.0),
        );
    }
}

fn run_simulated(cli: &Cli, mut control: ControlLoop) {
    let mut device = SimulatedDevice::new(cli.device_fps);
    let mut elapsed = 0.0;
    let mut frame = 0u64;

    log::info!("Sandbox: simulating {:.0}s of frames.", cli.duration);
    while elapsed < cli.duration {
        let tier = control.quality().active_tier();
        let dt = device.step(elapsed / cli.duration, control.quality().active_settings());
        let signal = (!cli.no_sensor).then(|| device.signal());

        submit_inputs(
            |e| {
                control.submit(e);
            },
            frame,
            cli.input_rate,
        );
        control.tick(dt, signal);

        if frame % 600 == 0 {
            log::info!(
                "t={:5.1}s {:5.1}C {:5.1} fps tier={}",
                elapsed,
                device.celsius(),
                1.0 / dt,
                tier
            );
        }
        elapsed += dt;
        frame += 1;
    }

    let snapshot = control.snapshot();
    log::info!(
        "Sandbox: done after {} ticks, tier {}, {} tier changes, frame time variance {:.3}",
        snapshot.ticks,
        snapshot.tier,
        control.quality().change_count(),
        control.sampler().frame_time_variance()
    );
    log::info!("Sandbox: throttle {:?}", snapshot.throttle);
}

fn run_service(cli: &Cli, control: ControlLoop, profiles: &QualityProfiles) -> Result<()> {
    let mut device = SimulatedDevice::new(cli.device_fps);
    let mut service = ControlService::new(
        control,
        ServiceConfig {
            tick_rate: cli.tick_rate,
            ..Default::default()
        },
    )?;
    let telemetry = service.telemetry_sender();
    let submitter = service.submitter();
    service.start();

    log::info!("Sandbox: running the service for {:.0}s of real time.", cli.duration);
    let mut elapsed = 0.0;
    let mut frame = 0u64;
    while elapsed < cli.duration {
        let tier = service.snapshot().tier;
        let dt = device.step(elapsed / cli.duration, profiles.settings(tier));

        if telemetry.try_send(TelemetryEvent::FrameTime(dt)).is_err() {
            log::warn!("Sandbox: telemetry inbox full, frame dropped.");
        }
        if !cli.no_sensor && telemetry.try_send(TelemetryEvent::Thermal(device.signal())).is_err() {
            log::warn!("Sandbox: telemetry inbox full, thermal reading dropped.");
        }
        submit_inputs(
            |e| {
                submitter.submit(e);
            },
            frame,
            cli.input_rate,
        );

        thread::sleep(Duration::from_secs_f32(dt));
        elapsed += dt;
        frame += 1;
    }

    service.stop();
    let snapshot = service.snapshot();
    log::info!(
        "Sandbox: service stopped after {} ticks, tier {}, throttle {:?}",
        snapshot.ticks,
        snapshot.tier,
        snapshot.throttle
    );
    Ok(())
}
