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

//! Defines the trait for retry policies and some common implementations.
//!
//! The retry loop consults a retry policy after each failed attempt. The
//! default policy retries errors whose status code is in the retryable codes
//! of the [RetrySettings][crate::retry_settings::RetrySettings]. Applications
//! may install their own policy with
//! [with_retry_policy][crate::retry_settings::RetrySettingsBuilder::with_retry_policy].

use crate::error::Error;
use crate::error::rpc::Code;
use crate::retry_result::RetryResult;
use crate::retry_state::RetryState;
use std::collections::HashSet;

/// Determines how errors are handled in the retry loop.
///
/// Implementations of this trait decide if an error is retryable. The retry
/// loop enforces the deadline and the backoff, the policy only needs to
/// classify errors.
pub trait RetryPolicy: Send + Sync + std::fmt::Debug {
    /// Query the retry policy after an error.
    ///
    /// # Parameters
    /// * `state` - the state of the retry loop, including the number of
    ///   attempts made so far.
    /// * `error` - the last error received by the retry loop.
    fn on_error(&self, state: &RetryState, error: Error) -> RetryResult;
}

/// Extension trait for [`RetryPolicy`]
pub trait RetryPolicyExt: RetryPolicy + Sized {
    /// Decorate a [`RetryPolicy`] to limit the number of attempts.
    ///
    /// # Example
    /// ```
    /// # use google_cloud_api_core::retry_policy::*;
    /// # use google_cloud_api_core::error::rpc::Code;
    /// let policy = RetryableCodes::new([Code::Unavailable]).with_attempt_limit(3);
    /// ```
    fn with_attempt_limit(self, maximum_attempts: u32) -> LimitedAttemptCount<Self> {
        LimitedAttemptCount::custom(self, maximum_attempts)
    }
}

impl<T: RetryPolicy> RetryPolicyExt for T {}

impl<T> RetryPolicy for std::sync::Arc<T>
where
    T: RetryPolicy + ?Sized,
{
    fn on_error(&self, state: &RetryState, error: Error) -> RetryResult {
        self.as_ref().on_error(state, error)
    }
}

/// Retries errors whose status code is in a fixed set.
///
/// Local errors are never retried: invalid request arguments, such as a
/// resource name that does not match its template, and serialization or
/// deserialization problems. Errors without a status code are not retried
/// either.
///
/// Transport errors, where the request did not reach the service or the
/// connection broke, report [Code::Unavailable] and are retried if that code
/// is in the set.
///
/// # Example
/// ```
/// # use google_cloud_api_core::retry_policy::*;
/// # use google_cloud_api_core::retry_state::RetryState;
/// # use google_cloud_api_core::error::{Error, rpc::{Code, Status}};
/// let policy = RetryableCodes::new([Code::Unavailable, Code::DeadlineExceeded]);
/// let unavailable = Error::service(Status::default().set_code(Code::Unavailable));
/// assert!(policy.on_error(&RetryState::new(), unavailable).is_continue());
/// let not_found = Error::service(Status::default().set_code(Code::NotFound));
/// assert!(policy.on_error(&RetryState::new(), not_found).is_permanent());
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RetryableCodes {
    codes: HashSet<Code>,
}

impl RetryableCodes {
    pub fn new<I: IntoIterator<Item = Code>>(codes: I) -> Self {
        Self {
            codes: codes.into_iter().collect(),
        }
    }

    pub fn codes(&self) -> &HashSet<Code> {
        &self.codes
    }
}

impl RetryPolicy for RetryableCodes {
    fn on_error(&self, _state: &RetryState, error: Error) -> RetryResult {
        if error.is_binding() || error.is_serialization() || error.is_deserialization() {
            return RetryResult::Permanent(error);
        }
        match error.code() {
            Some(code) if self.codes.contains(&code) => RetryResult::Continue(error),
            _ => RetryResult::Permanent(error),
        }
    }
}

/// A retry policy decorator that limits the number of attempts.
///
/// This policy decorates an inner policy and limits the total number of
/// attempts. Note that `max_attempts` is not the number of retries: the
/// initial attempt is included.
///
/// The policy passes through the results from the inner policy as long as
/// `attempt_count < maximum_attempts`. Once the maximum number of attempts is
/// reached, the policy returns [Exhausted][RetryResult::Exhausted] if the
/// inner policy returns [Continue][RetryResult::Continue].
#[derive(Debug)]
pub struct LimitedAttemptCount<P = RetryableCodes>
where
    P: RetryPolicy,
{
    inner: P,
    maximum_attempts: u32,
}

impl LimitedAttemptCount {
    /// Creates a new instance, with the default inner policy.
    pub fn new(maximum_attempts: u32) -> Self {
        Self {
            inner: RetryableCodes::new([Code::Unavailable]),
            maximum_attempts,
        }
    }
}

impl<P> LimitedAttemptCount<P>
where
    P: RetryPolicy,
{
    /// Creates a new instance with a custom inner policy.
    pub fn custom(inner: P, maximum_attempts: u32) -> Self {
        Self {
            inner,
            maximum_attempts,
        }
    }
}

impl<P> RetryPolicy for LimitedAttemptCount<P>
where
    P: RetryPolicy,
{
    fn on_error(&self, state: &RetryState, error: Error) -> RetryResult {
        match self.inner.on_error(state, error) {
            RetryResult::Continue(e) if state.attempt_count >= self.maximum_attempts => {
                RetryResult::Exhausted(e)
            }
            result => result,
        }
    }
}
