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

//! Per-call options.
//!
//! Applications use [CallOptions] to change the behavior of a single call:
//! add request headers, set a timeout, override the retry settings, or cancel
//! the call. The call stack consumes some of these options, and the
//! [option filter][crate::call_stack::OptionsFilterMiddleware] removes any
//! option the transport is not expected to see.

use crate::retry_settings::RetrySettingsBuilder;
use http::HeaderMap;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// The option names used by [CallOptions::retain].
pub mod names {
    pub const HEADERS: &str = "headers";
    pub const TIMEOUT: &str = "timeout";
    pub const RETRY_SETTINGS: &str = "retry_settings";
    pub const AUDIENCE: &str = "audience";
    pub const CANCELLATION: &str = "cancellation";
    pub const TRANSPORT_OPTIONS: &str = "transport_options";

    /// Every option name.
    pub const ALL: [&str; 6] = [
        HEADERS,
        TIMEOUT,
        RETRY_SETTINGS,
        AUDIENCE,
        CANCELLATION,
        TRANSPORT_OPTIONS,
    ];
}

/// Options for one call.
///
/// # Example
/// ```
/// # use google_cloud_api_core::options::CallOptions;
/// # use std::time::Duration;
/// let mut options = CallOptions::default();
/// options.set_timeout(Duration::from_secs(30));
/// options.insert_header(
///     http::HeaderName::from_static("x-goog-request-params"),
///     http::HeaderValue::from_static("name=projects/p"),
/// );
/// ```
#[derive(Clone, Debug, Default)]
pub struct CallOptions {
    headers: HeaderMap,
    timeout: Option<Duration>,
    retry_settings: Option<RetrySettingsBuilder>,
    audience: Option<String>,
    cancellation: Option<CancellationToken>,
    transport_options: BTreeMap<String, serde_json::Value>,
}

impl CallOptions {
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Adds a request header, replacing any previous values for the name.
    pub fn insert_header(&mut self, name: http::HeaderName, value: http::HeaderValue) {
        self.headers.insert(name, value);
    }

    /// The timeout.
    ///
    /// Set by the application, this is the overall timeout for the call,
    /// including retries. The retry middleware replaces it with the timeout
    /// for each attempt.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn set_timeout<T: Into<Duration>>(&mut self, v: T) {
        self.timeout = Some(v.into());
    }

    /// Overrides some fields in the retry settings of the method.
    pub fn retry_settings(&self) -> Option<&RetrySettingsBuilder> {
        self.retry_settings.as_ref()
    }

    pub fn set_retry_settings(&mut self, v: RetrySettingsBuilder) {
        self.retry_settings = Some(v);
    }

    /// The audience for the credentials, if the method needs one.
    pub fn audience(&self) -> Option<&str> {
        self.audience.as_deref()
    }

    pub fn set_audience<T: Into<String>>(&mut self, v: T) {
        self.audience = Some(v.into());
    }

    pub fn cancellation(&self) -> Option<&CancellationToken> {
        self.cancellation.as_ref()
    }

    /// Cancels the call when `v` is cancelled.
    pub fn set_cancellation(&mut self, v: CancellationToken) {
        self.cancellation = Some(v);
    }

    /// Options consumed by the transport, keyed by name.
    pub fn transport_options(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.transport_options
    }

    pub fn set_transport_option<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<serde_json::Value>,
    {
        self.transport_options.insert(key.into(), value.into());
    }

    /// Keeps only the options for which `keep` returns true.
    ///
    /// The predicate is called with the names in [names]. Transport options
    /// are kept if [TRANSPORT_OPTIONS][names::TRANSPORT_OPTIONS] is kept, or
    /// if their own key is kept.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&str) -> bool,
    {
        if !keep(names::HEADERS) {
            self.headers.clear();
        }
        if !keep(names::TIMEOUT) {
            self.timeout = None;
        }
        if !keep(names::RETRY_SETTINGS) {
            self.retry_settings = None;
        }
        if !keep(names::AUDIENCE) {
            self.audience = None;
        }
        if !keep(names::CANCELLATION) {
            self.cancellation = None;
        }
        if !keep(names::TRANSPORT_OPTIONS) {
            self.transport_options.retain(|k, _| keep(k));
        }
    }

    /// Keeps only the transport options whose key satisfies `keep`.
    pub fn retain_transport_options<F>(&mut self, mut keep: F)
    where
        F: FnMut(&str) -> bool,
    {
        self.transport_options.retain(|k, _| keep(k));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{HeaderName, HeaderValue};
    use serde_json::json;

    fn full_options() -> CallOptions {
        let mut options = CallOptions::default();
        options.insert_header(
            HeaderName::from_static("x-test"),
            HeaderValue::from_static("v"),
        );
        options.set_timeout(Duration::from_secs(5));
        options.set_retry_settings(RetrySettingsBuilder::new().with_max_retries(3));
        options.set_audience("https://example.googleapis.com/");
        options.set_cancellation(CancellationToken::new());
        options.set_transport_option("restOptions", json!({"verify": false}));
        options.set_transport_option("grpcOptions", json!({"compression": "gzip"}));
        options
    }

    #[test]
    fn accessors() {
        let options = full_options();
        assert_eq!(
            options.headers().get("x-test"),
            Some(&HeaderValue::from_static("v"))
        );
        assert_eq!(options.timeout(), Some(Duration::from_secs(5)));
        assert!(options.retry_settings().is_some(), "{options:?}");
        assert_eq!(options.audience(), Some("https://example.googleapis.com/"));
        assert!(options.cancellation().is_some(), "{options:?}");
        assert_eq!(options.transport_options().len(), 2);
    }

    #[test]
    fn default() {
        let options = CallOptions::default();
        assert!(options.headers().is_empty());
        assert!(options.timeout().is_none());
        assert!(options.retry_settings().is_none());
        assert!(options.audience().is_none());
        assert!(options.cancellation().is_none());
        assert!(options.transport_options().is_empty());
    }

    #[test]
    fn retain_all() {
        let mut options = full_options();
        options.retain(|_| true);
        assert!(!options.headers().is_empty());
        assert!(options.timeout().is_some());
        assert!(options.retry_settings().is_some());
        assert!(options.audience().is_some());
        assert!(options.cancellation().is_some());
        assert_eq!(options.transport_options().len(), 2);
    }

    #[test]
    fn retain_none() {
        let mut options = full_options();
        options.retain(|_| false);
        assert!(options.headers().is_empty());
        assert!(options.timeout().is_none());
        assert!(options.retry_settings().is_none());
        assert!(options.audience().is_none());
        assert!(options.cancellation().is_none());
        assert!(options.transport_options().is_empty());
    }

    #[test]
    fn retain_some() {
        let mut options = full_options();
        options.retain(|name| [names::HEADERS, names::TIMEOUT, "restOptions"].contains(&name));
        assert!(!options.headers().is_empty());
        assert!(options.timeout().is_some());
        assert!(options.retry_settings().is_none());
        assert!(options.audience().is_none());
        assert!(options.cancellation().is_none());
        let keys = options.transport_options().keys().collect::<Vec<_>>();
        assert_eq!(keys, vec!["restOptions"]);
    }

    #[test]
    fn retain_transport_options() {
        let mut options = full_options();
        options.set_transport_option("x-keep", json!(1));
        options.retain_transport_options(|k| k == "x-keep");
        let keys = options.transport_options().keys().collect::<Vec<_>>();
        assert_eq!(keys, vec!["x-keep"]);
        assert!(options.timeout().is_some());
    }
}
