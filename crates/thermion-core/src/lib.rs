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

//! # Thermion Core
//!
//! Foundational crate containing the severity scale, data contracts and the
//! event broadcaster shared by the telemetry and control crates.

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod event;
pub mod input;
pub mod quality;
pub mod telemetry;
pub mod thermal;

pub use config::ControlConfig;
pub use error::{ConfigError, ConfigResult, HandlerError};
pub use event::{ControlEvent, ControlEventKind, EventBroadcaster, SubscriptionId, Transition};
pub use input::{InputBudget, InputEvent, InputTag, ProcessedInput, Submission};
pub use quality::{QualityScalar, QualitySettings, QualityTier};
pub use telemetry::{PerformanceSample, TelemetryEvent};
pub use thermal::{InputThermalState, Severity, ThermalSensor, ThermalSignal, ThermalState};
