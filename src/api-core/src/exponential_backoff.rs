// Copyright 2024 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Truncated exponential backoff.
//!
//! The retry loop uses [ExponentialBackoff] twice: once to compute the delay
//! between attempts, and once to compute the timeout for each attempt. For
//! attempt `n` (starting at zero) the value is
//! `min(initial * scaling^n, maximum)`. There is no jitter, the values are
//! deterministic.

use std::time::Duration;

/// The error type for exponential backoff creation.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Error {
    #[error("the scaling value ({0}) should be >= 1.0")]
    InvalidScalingFactor(f64),
    #[error("the initial value ({0:?}) should be greater than zero")]
    InvalidInitial(Duration),
    #[error(
        "the maximum value ({maximum:?}) should be greater than or equal to the initial value ({initial:?})"
    )]
    EmptyRange {
        maximum: Duration,
        initial: Duration,
    },
}

/// Builder for exponential backoff policies.
///
/// # Example
/// ```
/// # use google_cloud_api_core::exponential_backoff::*;
/// use std::time::Duration;
/// let backoff = ExponentialBackoffBuilder::new()
///     .with_initial(Duration::from_millis(100))
///     .with_maximum(Duration::from_secs(5))
///     .with_scaling(4.0)
///     .build()?;
/// assert_eq!(backoff.delay(1), Duration::from_millis(400));
/// # Ok::<(), Error>(())
/// ```
#[derive(Clone, Debug)]
pub struct ExponentialBackoffBuilder {
    initial: Duration,
    maximum: Duration,
    scaling: f64,
}

impl ExponentialBackoffBuilder {
    /// Creates a builder with the default parameters.
    ///
    /// The default parameters are an initial value of 100ms, a maximum of 60
    /// seconds, and a scaling factor of 1.3.
    pub fn new() -> Self {
        Self {
            initial: Duration::from_millis(100),
            maximum: Duration::from_secs(60),
            scaling: 1.3,
        }
    }

    /// Change the initial value.
    pub fn with_initial<V: Into<Duration>>(mut self, v: V) -> Self {
        self.initial = v.into();
        self
    }

    /// Change the maximum value.
    pub fn with_maximum<V: Into<Duration>>(mut self, v: V) -> Self {
        self.maximum = v.into();
        self
    }

    /// Change the scaling factor.
    pub fn with_scaling<V: Into<f64>>(mut self, v: V) -> Self {
        self.scaling = v.into();
        self
    }

    /// Creates a new exponential backoff policy, validating the parameters.
    pub fn build(self) -> Result<ExponentialBackoff, Error> {
        if self.scaling.is_nan() || self.scaling < 1.0 {
            return Err(Error::InvalidScalingFactor(self.scaling));
        }
        if self.initial.is_zero() {
            return Err(Error::InvalidInitial(self.initial));
        }
        if self.maximum < self.initial {
            return Err(Error::EmptyRange {
                maximum: self.maximum,
                initial: self.initial,
            });
        }
        Ok(ExponentialBackoff {
            initial: self.initial,
            maximum: self.maximum,
            scaling: self.scaling,
        })
    }

    /// Creates a new exponential backoff policy, clamping the parameters into
    /// a valid range.
    ///
    /// The scaling factor is at least 1.0, the initial value is at least 1ms,
    /// and the maximum is at least the initial value.
    pub fn clamp(self) -> ExponentialBackoff {
        let scaling = if self.scaling >= 1.0 {
            self.scaling
        } else {
            1.0
        };
        let initial = self.initial.max(Duration::from_millis(1));
        let maximum = self.maximum.max(initial);
        ExponentialBackoff {
            initial,
            maximum,
            scaling,
        }
    }
}

impl Default for ExponentialBackoffBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Implements truncated exponential backoff without jitter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExponentialBackoff {
    initial: Duration,
    maximum: Duration,
    scaling: f64,
}

impl ExponentialBackoff {
    pub fn initial(&self) -> Duration {
        self.initial
    }

    pub fn maximum(&self) -> Duration {
        self.maximum
    }

    pub fn scaling(&self) -> f64 {
        self.scaling
    }

    /// The value for attempt `attempt`, starting at zero.
    pub fn delay(&self, attempt: u32) -> Duration {
        let exp = std::cmp::min(i32::MAX as u32, attempt) as i32;
        let scaling = self.scaling.powi(exp);
        if scaling >= self.maximum.div_duration_f64(self.initial) {
            return self.maximum;
        }
        // `as u64` saturates, and we just checked that the product is smaller
        // than `self.maximum`.
        Duration::from_nanos((self.initial.as_nanos() as f64 * scaling) as u64)
    }

    pub(crate) fn to_builder(self) -> ExponentialBackoffBuilder {
        ExponentialBackoffBuilder {
            initial: self.initial,
            maximum: self.maximum,
            scaling: self.scaling,
        }
    }
}
