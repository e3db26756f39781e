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

//! Error types.
//!
//! Only configuration problems are fatal. Everything else the control loop
//! encounters at runtime (missing sensor, queue overflow, malformed input) is
//! corrected locally and surfaced through counters instead.

use thiserror::Error;

/// A specialized `Result` type for configuration validation.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// An invalid configuration, rejected before the loop starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// A breakpoint table is not strictly monotonic in the required direction.
    #[error("{scale} breakpoints must be strictly {direction}: {values:?}")]
    NonMonotonicBreakpoints {
        /// Which table was rejected.
        scale: &'static str,
        /// The required direction ("increasing" or "decreasing").
        direction: &'static str,
        /// The offending values, mildest level first.
        values: Vec<f32>,
    },
    /// A value that must lie in a closed range does not.
    #[error("{field} = {value} is outside [{min}, {max}]")]
    OutOfRange {
        /// Dotted path of the rejected field.
        field: String,
        /// The rejected value.
        value: f32,
        /// Inclusive lower bound.
        min: f32,
        /// Inclusive upper bound.
        max: f32,
    },
    /// A value that must be strictly positive is zero, negative or not finite.
    #[error("{field} must be positive and finite, got {value}")]
    NotPositive {
        /// Dotted path of the rejected field.
        field: String,
        /// The rejected value.
        value: f64,
    },
    /// The input budget table is inconsistent.
    #[error("invalid input budget: {0}")]
    InvalidBudget(String),
}

/// Failure reported by an event subscriber.
///
/// Failures are isolated by the broadcaster: they are logged and never
/// stop delivery to the remaining subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    /// The subscriber is gone; the broadcaster drops the subscription.
    #[error("subscriber disconnected")]
    Disconnected,
    /// The subscriber failed to handle this event but stays subscribed.
    #[error("handler failed: {0}")]
    Failed(String),
}
