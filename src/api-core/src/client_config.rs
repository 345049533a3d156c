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

//! Client configuration.
//!
//! [ClientConfig] holds the settings shared by every call made with a
//! client. Retry settings can be configured in code, or loaded from the GAPIC
//! client configuration files shipped with many Google APIs:
//!
//! ```json
//! {
//!   "interfaces": {
//!     "google.example.library.v1.LibraryService": {
//!       "retry_codes": { "idempotent": ["UNAVAILABLE"], "non_idempotent": [] },
//!       "retry_params": {
//!         "default": {
//!           "initial_retry_delay_millis": 100,
//!           "retry_delay_multiplier": 1.3,
//!           "max_retry_delay_millis": 60000,
//!           "initial_rpc_timeout_millis": 20000,
//!           "rpc_timeout_multiplier": 1.0,
//!           "max_rpc_timeout_millis": 20000,
//!           "total_timeout_millis": 600000
//!         }
//!       },
//!       "methods": {
//!         "GetBook": {
//!           "timeout_millis": 60000,
//!           "retry_codes_name": "idempotent",
//!           "retry_params_name": "default"
//!         }
//!       }
//!     }
//!   }
//! }
//! ```

use crate::credentials::Credentials;
use crate::error::rpc::Code;
use crate::exponential_backoff::ExponentialBackoffBuilder;
use crate::retry_settings::{RetrySettings, RetrySettingsBuilder};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// The environment variable enabling tracing for all clients.
pub const LOGGING_VAR: &str = "GOOGLE_CLOUD_RUST_LOGGING";

/// The RPC timeout for methods without a timeout in the client configuration.
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors loading the client configuration.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("cannot parse the client configuration: {0}")]
    Json(#[from] serde_json::Error),
    #[error("service `{0}` not found in the client configuration")]
    UnknownService(String),
    #[error("method `{method}` uses unknown retry codes `{name}`")]
    UnknownRetryCodes { method: String, name: String },
    #[error("method `{method}` uses unknown retry parameters `{name}`")]
    UnknownRetryParams { method: String, name: String },
    #[error("unknown status code `{0}`")]
    UnknownCode(String),
    #[error("invalid retry settings for method `{method}`")]
    InvalidSettings {
        method: String,
        #[source]
        source: crate::retry_settings::Error,
    },
}

/// Configure a client.
///
/// A client is configured with the credentials, headers, retry settings, and
/// the transport options it forwards. The defaults use anonymous credentials
/// and do not retry any call.
///
/// # Example
/// ```
/// # use google_cloud_api_core::client_config::ClientConfig;
/// # use google_cloud_api_core::credentials::Credentials;
/// # fn main() -> anyhow::Result<()> {
/// let config = ClientConfig::new()
///     .set_credentials(Credentials::bearer("my-token")?)
///     .set_quota_project("my-project")
///     .enable_tracing();
/// assert!(config.tracing_enabled());
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct ClientConfig {
    pub(crate) credentials: Option<Credentials>,
    pub(crate) user_agent: Option<String>,
    pub(crate) quota_project: Option<String>,
    pub(crate) retry_settings: Option<RetrySettings>,
    pub(crate) method_retry_settings: HashMap<String, RetrySettings>,
    pub(crate) allowed_options: Vec<String>,
    pub(crate) tracing: bool,
}

impl ClientConfig {
    /// Returns a default [ClientConfig].
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if tracing is enabled in the configuration or through
    /// the `GOOGLE_CLOUD_RUST_LOGGING` environment variable.
    pub fn tracing_enabled(&self) -> bool {
        if self.tracing {
            return true;
        }
        std::env::var(LOGGING_VAR)
            .map(|v| v == "true")
            .unwrap_or(false)
    }

    /// Enables tracing.
    pub fn enable_tracing(mut self) -> Self {
        self.tracing = true;
        self
    }

    /// Disables tracing.
    pub fn disable_tracing(mut self) -> Self {
        self.tracing = false;
        self
    }

    /// Configure the authentication credentials.
    pub fn set_credentials<T: Into<Option<Credentials>>>(mut self, v: T) -> Self {
        self.credentials = v.into();
        self
    }

    /// Configure a prefix for the `user-agent` header.
    pub fn set_user_agent<T: Into<String>>(mut self, v: T) -> Self {
        self.user_agent = Some(v.into());
        self
    }

    /// Configure the project billed for quota, sent in the
    /// `x-goog-user-project` header.
    pub fn set_quota_project<T: Into<String>>(mut self, v: T) -> Self {
        self.quota_project = Some(v.into());
        self
    }

    /// Configure the retry settings for methods without specific settings.
    pub fn set_retry_settings(mut self, v: RetrySettings) -> Self {
        self.retry_settings = Some(v);
        self
    }

    /// Configure the retry settings for one method.
    pub fn set_method_retry_settings<T: Into<String>>(
        mut self,
        method: T,
        v: RetrySettings,
    ) -> Self {
        self.method_retry_settings.insert(method.into(), v);
        self
    }

    /// Configure the retry settings for many methods, for example, the
    /// settings returned by [load_retry_settings][Self::load_retry_settings].
    pub fn extend_method_retry_settings<I, K>(mut self, v: I) -> Self
    where
        I: IntoIterator<Item = (K, RetrySettings)>,
        K: Into<String>,
    {
        self.method_retry_settings
            .extend(v.into_iter().map(|(k, s)| (k.into(), s)));
        self
    }

    /// Forwards the option named `v` to the transport.
    ///
    /// Transport option keys added here restrict the transport options
    /// forwarded to the allowed keys.
    ///
    /// See [OptionsFilterMiddleware][crate::call_stack::OptionsFilterMiddleware].
    pub fn add_allowed_option<T: Into<String>>(mut self, v: T) -> Self {
        self.allowed_options.push(v.into());
        self
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }

    pub fn quota_project(&self) -> Option<&str> {
        self.quota_project.as_deref()
    }

    pub fn allowed_options(&self) -> &[String] {
        &self.allowed_options
    }

    /// Returns the retry settings for `method`.
    ///
    /// The lookup uses the full method name first, such as
    /// `google.example.library.v1.LibraryService/GetBook`, then the name
    /// after the last `/` or `.`, such as `GetBook`. If neither is configured
    /// it returns the default retry settings, if any.
    pub fn retry_settings(&self, method: &str) -> Option<&RetrySettings> {
        let short = method
            .rsplit_once(['/', '.'])
            .map(|(_, m)| m)
            .unwrap_or(method);
        self.method_retry_settings
            .get(method)
            .or_else(|| self.method_retry_settings.get(short))
            .or(self.retry_settings.as_ref())
    }

    /// Parses a GAPIC client configuration, returning the retry settings for
    /// each method of `service`.
    ///
    /// Methods without retry codes, or with an empty list of retry codes,
    /// do not retry. The method `timeout_millis` is used as the RPC timeout
    /// when retries are disabled.
    ///
    /// # Example
    /// ```
    /// # use google_cloud_api_core::client_config::ClientConfig;
    /// # fn main() -> anyhow::Result<()> {
    /// let json = r#"{"interfaces": {"test.v1.Service": {
    ///     "methods": {"Get": {"timeout_millis": 5000}}
    /// }}}"#;
    /// let settings = ClientConfig::load_retry_settings("test.v1.Service", json)?;
    /// assert!(!settings["Get"].retries_enabled());
    /// # Ok(())
    /// # }
    /// ```
    pub fn load_retry_settings(
        service: &str,
        json: &str,
    ) -> Result<BTreeMap<String, RetrySettings>, Error> {
        let mut config = serde_json::from_str::<GapicConfig>(json)?;
        let interface = config
            .interfaces
            .remove(service)
            .ok_or_else(|| Error::UnknownService(service.to_string()))?;
        interface
            .methods
            .iter()
            .map(|(method, m)| {
                method_settings(&interface, method, m).map(|s| (method.clone(), s))
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct GapicConfig {
    #[serde(default)]
    interfaces: HashMap<String, InterfaceConfig>,
}

#[derive(Debug, Deserialize)]
struct InterfaceConfig {
    #[serde(default)]
    retry_codes: HashMap<String, Vec<String>>,
    #[serde(default)]
    retry_params: HashMap<String, RetryParams>,
    #[serde(default)]
    methods: HashMap<String, MethodConfig>,
}

#[derive(Debug, Deserialize)]
struct RetryParams {
    initial_retry_delay_millis: u64,
    retry_delay_multiplier: f64,
    max_retry_delay_millis: u64,
    initial_rpc_timeout_millis: u64,
    rpc_timeout_multiplier: f64,
    max_rpc_timeout_millis: u64,
    total_timeout_millis: u64,
}

#[derive(Debug, Deserialize)]
struct MethodConfig {
    timeout_millis: Option<u64>,
    retry_codes_name: Option<String>,
    retry_params_name: Option<String>,
}

/// Returns settings without retry codes, using `timeout` for every RPC.
pub(crate) fn no_retry_builder(timeout: Duration) -> RetrySettingsBuilder {
    let delay = ExponentialBackoffBuilder::new().clamp();
    RetrySettingsBuilder::new()
        .with_retryable_codes([])
        .with_initial_retry_delay(delay.initial())
        .with_retry_delay_multiplier(delay.scaling())
        .with_max_retry_delay(delay.maximum())
        .with_initial_rpc_timeout(timeout)
        .with_rpc_timeout_multiplier(1.0)
        .with_max_rpc_timeout(timeout)
        .with_total_timeout(timeout)
}

fn method_settings(
    interface: &InterfaceConfig,
    method: &str,
    config: &MethodConfig,
) -> Result<RetrySettings, Error> {
    let codes = match &config.retry_codes_name {
        None => Vec::new(),
        Some(name) => interface
            .retry_codes
            .get(name)
            .ok_or_else(|| Error::UnknownRetryCodes {
                method: method.to_string(),
                name: name.clone(),
            })?
            .iter()
            .map(|c| Code::try_from(c.as_str()).map_err(|_| Error::UnknownCode(c.clone())))
            .collect::<Result<Vec<_>, _>>()?,
    };
    let timeout = config
        .timeout_millis
        .map(Duration::from_millis)
        .unwrap_or(DEFAULT_RPC_TIMEOUT);

    let builder = match &config.retry_params_name {
        Some(name) => {
            let params =
                interface
                    .retry_params
                    .get(name)
                    .ok_or_else(|| Error::UnknownRetryParams {
                        method: method.to_string(),
                        name: name.clone(),
                    })?;
            RetrySettingsBuilder::new()
                .with_initial_retry_delay(Duration::from_millis(params.initial_retry_delay_millis))
                .with_retry_delay_multiplier(params.retry_delay_multiplier)
                .with_max_retry_delay(Duration::from_millis(params.max_retry_delay_millis))
                .with_initial_rpc_timeout(Duration::from_millis(params.initial_rpc_timeout_millis))
                .with_rpc_timeout_multiplier(params.rpc_timeout_multiplier)
                .with_max_rpc_timeout(Duration::from_millis(params.max_rpc_timeout_millis))
                .with_total_timeout(Duration::from_millis(params.total_timeout_millis))
        }
        None => no_retry_builder(timeout),
    };
    builder
        .with_retryable_codes(codes)
        .with_no_retries_rpc_timeout(timeout)
        .build()
        .map_err(|source| Error::InvalidSettings {
            method: method.to_string(),
            source,
        })
}
