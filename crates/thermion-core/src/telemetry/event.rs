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

//! Event types for host-to-service telemetry.

use crate::thermal::ThermalSignal;

/// A telemetry event produced by the host's frame loop or platform sensors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TelemetryEvent {
    /// A frame finished; the value is its duration in seconds.
    FrameTime(f32),
    /// A fresh hardware thermal reading.
    Thermal(ThermalSignal),
    /// The hardware sensor stopped reporting.
    SensorLost,
}
