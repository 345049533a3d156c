// Copyright 2025 Google LLC
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

//! Defines types to query retry policies.

use tokio::time::Instant;

/// The input into a retry policy query.
///
/// On an error, the retry loop queries the retry policy to decide if the loop
/// should continue. This type contains the state of the loop at that point.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct RetryState {
    /// The start time for the retry loop.
    pub start: Instant,

    /// The number of attempts made so far, including the attempt that failed.
    pub attempt_count: u32,
}

impl RetryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the [start][RetryState::start] field.
    pub fn set_start<T: Into<Instant>>(mut self, v: T) -> Self {
        self.start = v.into();
        self
    }

    /// Sets the [attempt_count][RetryState::attempt_count] field.
    pub fn set_attempt_count<T: Into<u32>>(mut self, v: T) -> Self {
        self.attempt_count = v.into();
        self
    }
}

impl std::default::Default for RetryState {
    fn default() -> Self {
        Self {
            start: Instant::now(),
            attempt_count: 0,
        }
    }
}
