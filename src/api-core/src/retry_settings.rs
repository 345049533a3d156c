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

//! Retry settings for RPCs.
//!
//! [RetrySettings] describe whether a call is retried, which status codes are
//! retryable, how long to wait between attempts, how long each attempt may
//! take, and the deadline for the whole call. Settings are immutable: use
//! [RetrySettings::with] to derive new settings from existing ones.
//!
//! # Example
//! ```
//! # use google_cloud_api_core::retry_settings::*;
//! # use google_cloud_api_core::error::rpc::Code;
//! use std::time::Duration;
//! let settings = RetrySettingsBuilder::new()
//!     .with_retryable_codes([Code::Unavailable])
//!     .with_initial_retry_delay(Duration::from_millis(100))
//!     .with_retry_delay_multiplier(1.3)
//!     .with_max_retry_delay(Duration::from_secs(60))
//!     .with_initial_rpc_timeout(Duration::from_secs(20))
//!     .with_rpc_timeout_multiplier(1.0)
//!     .with_max_rpc_timeout(Duration::from_secs(20))
//!     .with_total_timeout(Duration::from_secs(600))
//!     .build()?;
//! assert!(settings.retries_enabled());
//!
//! let quick = RetrySettingsBuilder::new().with_total_timeout(Duration::from_secs(5));
//! let quick = settings.with(quick);
//! assert_eq!(quick.total_timeout(), Duration::from_secs(5));
//! assert_eq!(settings.total_timeout(), Duration::from_secs(600));
//! # Ok::<(), Error>(())
//! ```

use crate::error::rpc::Code;
use crate::exponential_backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use crate::retry_policy::{LimitedAttemptCount, RetryPolicy, RetryableCodes};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

/// Configuration errors for [RetrySettings].
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Error {
    #[error("the retry settings are missing the required field `{0}`")]
    MissingField(&'static str),
    #[error("invalid {field} backoff: {source}")]
    InvalidBackoff {
        field: &'static str,
        #[source]
        source: crate::exponential_backoff::Error,
    },
}

/// Immutable retry and timeout configuration for one RPC method.
#[derive(Clone, Debug)]
pub struct RetrySettings {
    retryable_codes: BTreeSet<Code>,
    retry_delay: ExponentialBackoff,
    rpc_timeout: ExponentialBackoff,
    total_timeout: Duration,
    retries_enabled: Option<bool>,
    no_retries_rpc_timeout: Option<Duration>,
    max_retries: u32,
    retry_policy: Option<Arc<dyn RetryPolicy>>,
}

impl RetrySettings {
    /// Returns new settings, using the values in `partial` where present, and
    /// the values in `self` otherwise.
    ///
    /// `self` is not modified. Backoff parameters that become inconsistent,
    /// for example an initial delay larger than the maximum delay, are
    /// clamped into a valid range.
    pub fn with(&self, partial: RetrySettingsBuilder) -> RetrySettings {
        let retry_delay = merge_backoff(
            self.retry_delay,
            partial.initial_retry_delay,
            partial.retry_delay_multiplier,
            partial.max_retry_delay,
        );
        let rpc_timeout = merge_backoff(
            self.rpc_timeout,
            partial.initial_rpc_timeout,
            partial.rpc_timeout_multiplier,
            partial.max_rpc_timeout,
        );
        RetrySettings {
            retryable_codes: partial
                .retryable_codes
                .unwrap_or_else(|| self.retryable_codes.clone()),
            retry_delay,
            rpc_timeout,
            total_timeout: partial.total_timeout.unwrap_or(self.total_timeout),
            retries_enabled: partial.retries_enabled.or(self.retries_enabled),
            no_retries_rpc_timeout: partial.no_retries_rpc_timeout.or(self.no_retries_rpc_timeout),
            max_retries: partial.max_retries.unwrap_or(self.max_retries),
            retry_policy: partial.retry_policy.or_else(|| self.retry_policy.clone()),
        }
    }

    /// The partial settings for a call with a single overall timeout.
    ///
    /// Applying this partial with [with][RetrySettings::with] disables
    /// retries on status codes, and sets every timeout to `timeout`.
    ///
    /// # Example
    /// ```
    /// # use google_cloud_api_core::retry_settings::*;
    /// # use google_cloud_api_core::error::rpc::Code;
    /// # use std::time::Duration;
    /// # let settings = RetrySettingsBuilder::new()
    /// #     .with_retryable_codes([Code::Unavailable])
    /// #     .with_initial_retry_delay(Duration::from_millis(100))
    /// #     .with_retry_delay_multiplier(1.3)
    /// #     .with_max_retry_delay(Duration::from_secs(60))
    /// #     .with_initial_rpc_timeout(Duration::from_secs(20))
    /// #     .with_rpc_timeout_multiplier(1.0)
    /// #     .with_max_rpc_timeout(Duration::from_secs(20))
    /// #     .with_total_timeout(Duration::from_secs(600))
    /// #     .build()?;
    /// let timeout = Duration::from_secs(5);
    /// let got = settings.with(RetrySettings::logical_timeout(timeout));
    /// assert!(!got.retries_enabled());
    /// assert_eq!(got.no_retries_rpc_timeout(), timeout);
    /// assert_eq!(got.total_timeout(), timeout);
    /// # Ok::<(), Error>(())
    /// ```
    pub fn logical_timeout(timeout: Duration) -> RetrySettingsBuilder {
        RetrySettingsBuilder::new()
            .with_initial_rpc_timeout(timeout)
            .with_rpc_timeout_multiplier(1.0)
            .with_max_rpc_timeout(timeout)
            .with_total_timeout(timeout)
            .with_no_retries_rpc_timeout(timeout)
            .with_retryable_codes([])
    }

    /// Returns settings that never retry, using `timeout` as the RPC and
    /// total timeout.
    ///
    /// The retry delay uses the default [ExponentialBackoffBuilder]
    /// parameters. A zero `timeout` is raised to 1ms.
    pub fn no_retries(timeout: Duration) -> RetrySettings {
        let rpc_timeout = ExponentialBackoffBuilder::new()
            .with_initial(timeout)
            .with_scaling(1.0)
            .with_maximum(timeout)
            .clamp();
        RetrySettings {
            retryable_codes: BTreeSet::new(),
            retry_delay: ExponentialBackoffBuilder::new().clamp(),
            rpc_timeout,
            total_timeout: rpc_timeout.initial(),
            retries_enabled: Some(false),
            no_retries_rpc_timeout: Some(rpc_timeout.initial()),
            max_retries: 0,
            retry_policy: None,
        }
    }

    /// Returns true if the call should be retried at all.
    ///
    /// Unless set explicitly, retries are enabled if there are retryable
    /// codes or a custom retry policy.
    pub fn retries_enabled(&self) -> bool {
        self.retries_enabled
            .unwrap_or(!self.retryable_codes.is_empty() || self.retry_policy.is_some())
    }

    pub fn retryable_codes(&self) -> &BTreeSet<Code> {
        &self.retryable_codes
    }

    pub fn initial_retry_delay(&self) -> Duration {
        self.retry_delay.initial()
    }

    pub fn retry_delay_multiplier(&self) -> f64 {
        self.retry_delay.scaling()
    }

    pub fn max_retry_delay(&self) -> Duration {
        self.retry_delay.maximum()
    }

    pub fn initial_rpc_timeout(&self) -> Duration {
        self.rpc_timeout.initial()
    }

    pub fn rpc_timeout_multiplier(&self) -> f64 {
        self.rpc_timeout.scaling()
    }

    pub fn max_rpc_timeout(&self) -> Duration {
        self.rpc_timeout.maximum()
    }

    pub fn total_timeout(&self) -> Duration {
        self.total_timeout
    }

    /// The timeout for the only attempt when retries are disabled.
    ///
    /// Defaults to the initial RPC timeout.
    pub fn no_retries_rpc_timeout(&self) -> Duration {
        self.no_retries_rpc_timeout
            .unwrap_or_else(|| self.rpc_timeout.initial())
    }

    /// The maximum number of retries, zero means unlimited.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// The backoff for the delay between attempts.
    pub fn retry_delay(&self) -> &ExponentialBackoff {
        &self.retry_delay
    }

    /// The backoff for the timeout of each attempt.
    pub fn rpc_timeout(&self) -> &ExponentialBackoff {
        &self.rpc_timeout
    }

    /// The retry policy used by the retry loop.
    ///
    /// This is the custom policy, if any, or a policy retrying the retryable
    /// codes, limited to `max_retries + 1` attempts when `max_retries` is not
    /// zero.
    pub fn retry_policy(&self) -> LimitedAttemptCount<Arc<dyn RetryPolicy>> {
        let inner: Arc<dyn RetryPolicy> = match &self.retry_policy {
            Some(p) => p.clone(),
            None => Arc::new(RetryableCodes::new(self.retryable_codes.iter().copied())),
        };
        let maximum_attempts = match self.max_retries {
            0 => u32::MAX,
            n => n.saturating_add(1),
        };
        LimitedAttemptCount::custom(inner, maximum_attempts)
    }
}

impl PartialEq for RetrySettings {
    fn eq(&self, other: &Self) -> bool {
        let same_policy = match (&self.retry_policy, &other.retry_policy) {
            (None, None) => true,
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        };
        same_policy
            && self.retryable_codes == other.retryable_codes
            && self.retry_delay == other.retry_delay
            && self.rpc_timeout == other.rpc_timeout
            && self.total_timeout == other.total_timeout
            && self.retries_enabled == other.retries_enabled
            && self.no_retries_rpc_timeout == other.no_retries_rpc_timeout
            && self.max_retries == other.max_retries
    }
}

fn merge_backoff(
    base: ExponentialBackoff,
    initial: Option<Duration>,
    scaling: Option<f64>,
    maximum: Option<Duration>,
) -> ExponentialBackoff {
    if initial.is_none() && scaling.is_none() && maximum.is_none() {
        return base;
    }
    let builder = base.to_builder();
    let builder = initial.into_iter().fold(builder, |b, v| b.with_initial(v));
    let builder = scaling.into_iter().fold(builder, |b, v| b.with_scaling(v));
    let builder = maximum.into_iter().fold(builder, |b, v| b.with_maximum(v));
    builder.clamp()
}

/// A builder for [RetrySettings].
///
/// All the fields are optional in the builder. [build][Self::build] requires
/// the retryable codes, the retry delay and RPC timeout parameters, and the
/// total timeout. When used as the argument to [RetrySettings::with], the
/// fields that are set override the base settings.
#[derive(Clone, Debug, Default)]
pub struct RetrySettingsBuilder {
    retryable_codes: Option<BTreeSet<Code>>,
    initial_retry_delay: Option<Duration>,
    retry_delay_multiplier: Option<f64>,
    max_retry_delay: Option<Duration>,
    initial_rpc_timeout: Option<Duration>,
    rpc_timeout_multiplier: Option<f64>,
    max_rpc_timeout: Option<Duration>,
    total_timeout: Option<Duration>,
    retries_enabled: Option<bool>,
    no_retries_rpc_timeout: Option<Duration>,
    max_retries: Option<u32>,
    retry_policy: Option<Arc<dyn RetryPolicy>>,
}

impl RetrySettingsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retryable_codes<I: IntoIterator<Item = Code>>(mut self, v: I) -> Self {
        self.retryable_codes = Some(v.into_iter().collect());
        self
    }

    pub fn with_initial_retry_delay<V: Into<Duration>>(mut self, v: V) -> Self {
        self.initial_retry_delay = Some(v.into());
        self
    }

    pub fn with_retry_delay_multiplier<V: Into<f64>>(mut self, v: V) -> Self {
        self.retry_delay_multiplier = Some(v.into());
        self
    }

    pub fn with_max_retry_delay<V: Into<Duration>>(mut self, v: V) -> Self {
        self.max_retry_delay = Some(v.into());
        self
    }

    pub fn with_initial_rpc_timeout<V: Into<Duration>>(mut self, v: V) -> Self {
        self.initial_rpc_timeout = Some(v.into());
        self
    }

    pub fn with_rpc_timeout_multiplier<V: Into<f64>>(mut self, v: V) -> Self {
        self.rpc_timeout_multiplier = Some(v.into());
        self
    }

    pub fn with_max_rpc_timeout<V: Into<Duration>>(mut self, v: V) -> Self {
        self.max_rpc_timeout = Some(v.into());
        self
    }

    pub fn with_total_timeout<V: Into<Duration>>(mut self, v: V) -> Self {
        self.total_timeout = Some(v.into());
        self
    }

    /// Overrides the default for
    /// [retries_enabled][RetrySettings::retries_enabled].
    pub fn with_retries_enabled(mut self, v: bool) -> Self {
        self.retries_enabled = Some(v);
        self
    }

    pub fn with_no_retries_rpc_timeout<V: Into<Duration>>(mut self, v: V) -> Self {
        self.no_retries_rpc_timeout = Some(v.into());
        self
    }

    /// Limits the number of retries, zero means unlimited.
    pub fn with_max_retries(mut self, v: u32) -> Self {
        self.max_retries = Some(v);
        self
    }

    /// Replaces the retryable codes check with a custom policy.
    ///
    /// # Example
    /// ```
    /// # use google_cloud_api_core::retry_settings::*;
    /// # use google_cloud_api_core::retry_policy::*;
    /// # use google_cloud_api_core::error::rpc::Code;
    /// let partial = RetrySettingsBuilder::new()
    ///     .with_retry_policy(RetryableCodes::new([Code::Aborted]).with_attempt_limit(5));
    /// ```
    pub fn with_retry_policy<P: RetryPolicy + 'static>(mut self, v: P) -> Self {
        self.retry_policy = Some(Arc::new(v));
        self
    }

    /// Creates the [RetrySettings], validating the required fields.
    pub fn build(self) -> Result<RetrySettings, Error> {
        let retryable_codes = self
            .retryable_codes
            .ok_or(Error::MissingField("retryable_codes"))?;
        let retry_delay = ExponentialBackoffBuilder::new()
            .with_initial(
                self.initial_retry_delay
                    .ok_or(Error::MissingField("initial_retry_delay"))?,
            )
            .with_scaling(
                self.retry_delay_multiplier
                    .ok_or(Error::MissingField("retry_delay_multiplier"))?,
            )
            .with_maximum(
                self.max_retry_delay
                    .ok_or(Error::MissingField("max_retry_delay"))?,
            )
            .build()
            .map_err(|source| Error::InvalidBackoff {
                field: "retry delay",
                source,
            })?;
        let rpc_timeout = ExponentialBackoffBuilder::new()
            .with_initial(
                self.initial_rpc_timeout
                    .ok_or(Error::MissingField("initial_rpc_timeout"))?,
            )
            .with_scaling(
                self.rpc_timeout_multiplier
                    .ok_or(Error::MissingField("rpc_timeout_multiplier"))?,
            )
            .with_maximum(
                self.max_rpc_timeout
                    .ok_or(Error::MissingField("max_rpc_timeout"))?,
            )
            .build()
            .map_err(|source| Error::InvalidBackoff {
                field: "rpc timeout",
                source,
            })?;
        let total_timeout = self
            .total_timeout
            .ok_or(Error::MissingField("total_timeout"))?;
        Ok(RetrySettings {
            retryable_codes,
            retry_delay,
            rpc_timeout,
            total_timeout,
            retries_enabled: self.retries_enabled,
            no_retries_rpc_timeout: self.no_retries_rpc_timeout,
            max_retries: self.max_retries.unwrap_or(0),
            retry_policy: self.retry_policy,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::rpc::Status;
    use crate::retry_state::RetryState;
    use test_case::test_case;

    pub(crate) fn test_builder() -> RetrySettingsBuilder {
        RetrySettingsBuilder::new()
            .with_retryable_codes([Code::Unavailable])
            .with_initial_retry_delay(Duration::from_millis(10))
            .with_retry_delay_multiplier(2.0)
            .with_max_retry_delay(Duration::from_millis(50))
            .with_initial_rpc_timeout(Duration::from_millis(100))
            .with_rpc_timeout_multiplier(1.5)
            .with_max_rpc_timeout(Duration::from_millis(300))
            .with_total_timeout(Duration::from_secs(1))
    }

    pub(crate) fn test_settings() -> RetrySettings {
        test_builder()
            .build()
            .expect("hard-coded test settings are valid")
    }

    #[test]
    fn build() -> anyhow::Result<()> {
        let settings = test_builder().build()?;
        assert_eq!(
            settings.retryable_codes(),
            &BTreeSet::from([Code::Unavailable])
        );
        assert_eq!(settings.initial_retry_delay(), Duration::from_millis(10));
        assert_eq!(settings.retry_delay_multiplier(), 2.0);
        assert_eq!(settings.max_retry_delay(), Duration::from_millis(50));
        assert_eq!(settings.initial_rpc_timeout(), Duration::from_millis(100));
        assert_eq!(settings.rpc_timeout_multiplier(), 1.5);
        assert_eq!(settings.max_rpc_timeout(), Duration::from_millis(300));
        assert_eq!(settings.total_timeout(), Duration::from_secs(1));
        assert!(settings.retries_enabled());
        assert_eq!(settings.no_retries_rpc_timeout(), Duration::from_millis(100));
        assert_eq!(settings.max_retries(), 0);
        assert_eq!(settings.retry_delay().delay(1), Duration::from_millis(20));
        assert_eq!(settings.rpc_timeout().delay(1), Duration::from_millis(150));
        Ok(())
    }

    #[test]
    fn retries_enabled_defaults() -> anyhow::Result<()> {
        let settings = test_builder().with_retryable_codes([]).build()?;
        assert!(!settings.retries_enabled());

        let settings = test_builder()
            .with_retryable_codes([])
            .with_retries_enabled(true)
            .build()?;
        assert!(settings.retries_enabled());

        let settings = test_builder().with_retries_enabled(false).build()?;
        assert!(!settings.retries_enabled());

        let settings = test_builder()
            .with_retryable_codes([])
            .with_retry_policy(RetryableCodes::new([Code::Aborted]))
            .build()?;
        assert!(settings.retries_enabled());
        Ok(())
    }

    #[test_case(RetrySettingsBuilder::new(), "retryable_codes")]
    #[test_case(RetrySettingsBuilder::new().with_retryable_codes([]), "initial_retry_delay")]
    #[test_case(RetrySettingsBuilder::new().with_retryable_codes([]).with_initial_retry_delay(Duration::from_millis(1)), "retry_delay_multiplier")]
    #[test_case(RetrySettingsBuilder::new().with_retryable_codes([]).with_initial_retry_delay(Duration::from_millis(1)).with_retry_delay_multiplier(1.0), "max_retry_delay")]
    fn missing_field(builder: RetrySettingsBuilder, want: &'static str) {
        let got = builder.build();
        assert!(
            matches!(got, Err(Error::MissingField(f)) if f == want),
            "{got:?}"
        );
    }

    #[test]
    fn missing_rpc_timeout_fields() {
        let base = || {
            RetrySettingsBuilder::new()
                .with_retryable_codes([])
                .with_initial_retry_delay(Duration::from_millis(1))
                .with_retry_delay_multiplier(1.0)
                .with_max_retry_delay(Duration::from_millis(1))
        };
        let got = base().build();
        assert!(
            matches!(got, Err(Error::MissingField("initial_rpc_timeout"))),
            "{got:?}"
        );
        let got = base()
            .with_initial_rpc_timeout(Duration::from_secs(1))
            .with_rpc_timeout_multiplier(1.0)
            .with_max_rpc_timeout(Duration::from_secs(1))
            .build();
        assert!(
            matches!(got, Err(Error::MissingField("total_timeout"))),
            "{got:?}"
        );
    }

    #[test]
    fn invalid_backoff() {
        let got = test_builder()
            .with_max_retry_delay(Duration::from_millis(1))
            .build();
        assert!(
            matches!(got, Err(Error::InvalidBackoff { field: "retry delay", .. })),
            "{got:?}"
        );
        let got = test_builder().with_rpc_timeout_multiplier(0.5).build();
        assert!(
            matches!(got, Err(Error::InvalidBackoff { field: "rpc timeout", .. })),
            "{got:?}"
        );
    }

    #[test]
    fn with_does_not_mutate() {
        let a = test_settings();
        let snapshot = a.clone();
        let b = a.with(RetrySettingsBuilder::new().with_max_retries(1));
        assert_eq!(a, snapshot);
        assert_ne!(a, b);
        assert_eq!(b.max_retries(), 1);
        let b_restored = b.with(RetrySettingsBuilder::new().with_max_retries(0));
        assert_eq!(a, b_restored);
    }

    #[test]
    fn with_empty_partial() {
        let a = test_settings();
        assert_eq!(a.with(RetrySettingsBuilder::new()), a);
    }

    #[test]
    fn with_overrides() {
        let a = test_settings();
        let b = a.with(
            RetrySettingsBuilder::new()
                .with_retryable_codes([Code::Aborted, Code::Unavailable])
                .with_initial_retry_delay(Duration::from_millis(20))
                .with_total_timeout(Duration::from_secs(5)),
        );
        assert_eq!(
            b.retryable_codes(),
            &BTreeSet::from([Code::Aborted, Code::Unavailable])
        );
        assert_eq!(b.initial_retry_delay(), Duration::from_millis(20));
        assert_eq!(b.retry_delay_multiplier(), a.retry_delay_multiplier());
        assert_eq!(b.max_retry_delay(), a.max_retry_delay());
        assert_eq!(b.rpc_timeout(), a.rpc_timeout());
        assert_eq!(b.total_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn with_clamps_backoff() {
        let a = test_settings();
        let b =
            a.with(RetrySettingsBuilder::new().with_initial_retry_delay(Duration::from_secs(1)));
        assert_eq!(b.initial_retry_delay(), Duration::from_secs(1));
        assert_eq!(b.max_retry_delay(), Duration::from_secs(1));
    }

    #[test]
    fn no_retries() {
        let settings = RetrySettings::no_retries(Duration::from_secs(30));
        assert!(!settings.retries_enabled());
        assert!(settings.retryable_codes().is_empty());
        assert_eq!(settings.no_retries_rpc_timeout(), Duration::from_secs(30));
        assert_eq!(settings.initial_rpc_timeout(), Duration::from_secs(30));
        assert_eq!(settings.max_rpc_timeout(), Duration::from_secs(30));
        assert_eq!(settings.total_timeout(), Duration::from_secs(30));

        let settings = RetrySettings::no_retries(Duration::ZERO);
        assert_eq!(settings.no_retries_rpc_timeout(), Duration::from_millis(1));
    }

    #[test]
    fn logical_timeout() {
        let a = test_settings();
        let timeout = Duration::from_millis(250);
        let b = a.with(RetrySettings::logical_timeout(timeout));
        assert!(!b.retries_enabled());
        assert!(b.retryable_codes().is_empty());
        assert_eq!(b.initial_rpc_timeout(), timeout);
        assert_eq!(b.rpc_timeout_multiplier(), 1.0);
        assert_eq!(b.max_rpc_timeout(), timeout);
        assert_eq!(b.total_timeout(), timeout);
        assert_eq!(b.no_retries_rpc_timeout(), timeout);
        assert_eq!(b.retry_delay(), a.retry_delay());
    }

    fn unavailable() -> crate::error::Error {
        crate::error::Error::service(Status::default().set_code(Code::Unavailable))
    }

    #[test]
    fn retry_policy_unlimited() {
        let settings = test_settings();
        let policy = settings.retry_policy();
        let state = RetryState::new().set_attempt_count(1000_u32);
        assert!(policy.on_error(&state, unavailable()).is_continue());
    }

    #[test]
    fn retry_policy_max_retries() {
        let settings = test_builder().with_max_retries(2).build().expect("valid");
        let policy = settings.retry_policy();
        for (count, want) in [(1_u32, true), (2, true), (3, false)] {
            let state = RetryState::new().set_attempt_count(count);
            let got = policy.on_error(&state, unavailable());
            assert_eq!(got.is_continue(), want, "{count} {got:?}");
        }
    }

    #[test]
    fn retry_policy_custom() {
        let settings = test_builder()
            .with_retry_policy(RetryableCodes::new([Code::Aborted]))
            .build()
            .expect("valid");
        let policy = settings.retry_policy();
        let got = policy.on_error(&RetryState::new(), unavailable());
        assert!(got.is_permanent(), "{got:?}");
    }

    #[test]
    fn custom_policy_equality() {
        let a = test_builder()
            .with_retry_policy(RetryableCodes::new([Code::Aborted]))
            .build()
            .expect("valid");
        let b = a.clone();
        assert_eq!(a, b);
        let c = test_builder()
            .with_retry_policy(RetryableCodes::new([Code::Aborted]))
            .build()
            .expect("valid");
        assert_ne!(a, c);
    }

    #[test]
    fn send_and_sync() {
        static_assertions::assert_impl_all!(RetrySettings: Send, Sync, Clone);
        static_assertions::assert_impl_all!(RetrySettingsBuilder: Send, Sync, Clone);
    }
}
