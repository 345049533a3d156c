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

//! The retry loop.
//!
//! [retry_loop] calls an inner function until it succeeds, fails with an
//! error the retry policy does not retry, or the deadline expires. Between
//! attempts it waits for the delay computed by the retry delay backoff. Each
//! attempt receives a timeout computed by the RPC timeout backoff, capped by
//! the time remaining until the deadline.

use crate::Result;
use crate::error::Error;
use crate::retry_policy::RetryPolicy;
use crate::retry_result::RetryResult;
use crate::retry_settings::RetrySettings;
use crate::retry_state::RetryState;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Runs the retry loop for a given function.
///
/// * `inner` - makes one attempt, the argument is the timeout for the attempt.
/// * `sleep` - waits between attempts, typically [tokio::time::sleep].
/// * `settings` - the retry settings for the call.
/// * `deadline` - a pinned deadline, if `None` the deadline is the start of
///   the loop plus the total timeout.
/// * `cancel` - if the token is cancelled the loop stops before the next
///   attempt or during the next sleep.
///
/// When retries are disabled the function makes a single attempt, using the
/// no-retries RPC timeout.
///
/// The deadline is checked after a retryable error and before sleeping. Once
/// the deadline expires the loop returns a
/// [deadline exceeded][Error::is_deadline_exceeded] error, wrapping the last
/// error.
///
/// # Example
/// ```
/// # use google_cloud_api_core::retry_loop::retry_loop;
/// # use google_cloud_api_core::retry_settings::RetrySettingsBuilder;
/// # use google_cloud_api_core::error::rpc::Code;
/// # use std::time::Duration;
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> anyhow::Result<()> {
/// let settings = RetrySettingsBuilder::new()
///     .with_retryable_codes([Code::Unavailable])
///     .with_initial_retry_delay(Duration::from_millis(10))
///     .with_retry_delay_multiplier(2.0)
///     .with_max_retry_delay(Duration::from_millis(50))
///     .with_initial_rpc_timeout(Duration::from_secs(1))
///     .with_rpc_timeout_multiplier(1.0)
///     .with_max_rpc_timeout(Duration::from_secs(1))
///     .with_total_timeout(Duration::from_secs(10))
///     .build()?;
/// let response = retry_loop(
///     |timeout| async move { Ok(format!("attempt timeout is {timeout:?}")) },
///     tokio::time::sleep,
///     &settings,
///     None,
///     None,
/// )
/// .await?;
/// assert_eq!(response, "attempt timeout is 1s");
/// # Ok(())
/// # }
/// ```
pub async fn retry_loop<F, Fut, S, SFut, Response>(
    mut inner: F,
    sleep: S,
    settings: &RetrySettings,
    deadline: Option<Instant>,
    cancel: Option<&CancellationToken>,
) -> Result<Response>
where
    F: FnMut(Duration) -> Fut + Send,
    Fut: Future<Output = Result<Response>> + Send,
    S: Fn(Duration) -> SFut + Send,
    SFut: Future<Output = ()> + Send,
{
    let start = Instant::now();
    let is_cancelled = || cancel.is_some_and(|t| t.is_cancelled());

    if !settings.retries_enabled() {
        if is_cancelled() {
            return Err(Error::cancelled());
        }
        let timeout = settings.no_retries_rpc_timeout();
        let timeout = deadline
            .map(|d| timeout.min(d.saturating_duration_since(start)))
            .unwrap_or(timeout);
        return inner(timeout).await;
    }

    let deadline = deadline.unwrap_or(start + settings.total_timeout());
    let policy = settings.retry_policy();
    let mut attempt_count = 0_u32;
    loop {
        if is_cancelled() {
            return Err(Error::cancelled());
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        let timeout = settings.rpc_timeout().delay(attempt_count).min(remaining);
        attempt_count += 1;
        let error = match inner(timeout).await {
            Ok(response) => return Ok(response),
            Err(e) => e,
        };
        let state = RetryState::new()
            .set_start(start)
            .set_attempt_count(attempt_count);
        let error = match policy.on_error(&state, error) {
            RetryResult::Continue(e) => e,
            RetryResult::Permanent(e) | RetryResult::Exhausted(e) => return Err(e),
        };
        if Instant::now() >= deadline {
            tracing::warn!(
                attempt_count,
                elapsed = ?start.elapsed(),
                "retry deadline exceeded: {error}"
            );
            return Err(Error::deadline_exceeded(error));
        }
        let delay = settings.retry_delay().delay(attempt_count - 1);
        tracing::debug!(attempt_count, ?delay, "retrying after error: {error}");
        match cancel {
            Some(token) => {
                tokio::select! {
                    _ = token.cancelled() => return Err(Error::cancelled()),
                    _ = sleep(delay) => {},
                }
            }
            None => sleep(delay).await,
        }
    }
}
