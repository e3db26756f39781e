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

//! # Thermion Control
//!
//! Turns telemetry into decisions: a single [`ThermalEstimator`] feeds both
//! the [`QualityTierController`] and the [`InputThrottleController`], and the
//! [`ControlLoop`] runs them from the host's tick. [`ControlService`] wraps the
//! loop in a fixed-rate background thread for hosts without a frame loop of
//! their own.

#![warn(missing_docs)]

pub mod control_loop;
pub mod estimator;
pub mod input;
pub mod quality;
pub mod service;

pub use control_loop::{ControlLoop, ControlSnapshot};
pub use estimator::{classify_ratio, classify_temperature, Estimate, ThermalEstimator, ThermalSnapshot};
pub use input::{budget_for, BoundedInputQueue, InputSubmitter, InputThrottleController, ThrottleStats};
pub use quality::{QualityTierController, RenderSettingsSink};
pub use service::{ControlService, ServiceConfig};
