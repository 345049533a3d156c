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

//! The stub used by generated clients to make calls.

use crate::Result;
use crate::api_header::{XGoogApiClient, fixed_headers};
use crate::call::{Call, CallType, Response};
use crate::call_stack::{CallStack, CallStackBuilder, Middleware};
use crate::client_config::{ClientConfig, DEFAULT_RPC_TIMEOUT};
use crate::credentials::Credentials;
use crate::error::Error;
use crate::options::CallOptions;
use crate::retry_settings::{RetrySettings, RetrySettingsBuilder};
use crate::transport::Transport;
use futures::StreamExt;
use futures::stream::BoxStream;
use http::HeaderMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Makes calls on behalf of a generated client.
///
/// The stub builds a new [CallStack] for each call. The retry settings for
/// the call start from the settings configured for the method, then apply
/// the call [timeout][CallOptions::timeout] as a
/// [logical timeout][RetrySettings::logical_timeout], and finally the
/// [retry settings][CallOptions::retry_settings] in the call options.
/// Methods without configured settings start from
/// [no retries][RetrySettings::no_retries] with [DEFAULT_RPC_TIMEOUT].
#[derive(Clone, Debug)]
pub struct ClientStub {
    transport: Arc<dyn Transport>,
    config: ClientConfig,
    fallback_settings: RetrySettings,
    fixed_headers: HeaderMap,
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl ClientStub {
    /// Creates a stub sending calls with `transport`.
    ///
    /// Fails if the user agent or quota project in `config` are not valid
    /// header values.
    pub fn new(
        transport: Arc<dyn Transport>,
        config: ClientConfig,
        api_client: &XGoogApiClient,
    ) -> Result<Self> {
        let fixed_headers =
            fixed_headers(api_client, config.user_agent(), config.quota_project())?;
        Ok(Self {
            transport,
            config,
            fallback_settings: RetrySettings::no_retries(DEFAULT_RPC_TIMEOUT),
            fixed_headers,
            middlewares: Vec::new(),
        })
    }

    /// Adds a middleware to every call stack created by this stub.
    pub fn with_middleware<M: Middleware + 'static>(mut self, v: M) -> Self {
        self.middlewares.push(Arc::new(v));
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns the retry settings used for `method` with `options`, if any.
    pub fn retry_settings(&self, method: &str, options: &CallOptions) -> Option<RetrySettings> {
        let base = self.config.retry_settings(method);
        let timeout = options.timeout().map(RetrySettings::logical_timeout);
        let overrides = options.retry_settings().cloned();
        if base.is_none() && timeout.is_none() && overrides.is_none() {
            return None;
        }
        let base = base.unwrap_or(&self.fallback_settings).clone();
        let settings = [timeout, overrides]
            .into_iter()
            .flatten()
            .fold(base, |settings, partial: RetrySettingsBuilder| {
                settings.with(partial)
            });
        Some(settings)
    }

    /// Builds the call stack for `method` with `options`.
    pub fn call_stack(&self, method: &str, options: &CallOptions) -> CallStack {
        let builder = CallStackBuilder::new(self.transport.clone())
            .with_credentials(
                self.config
                    .credentials()
                    .cloned()
                    .unwrap_or_else(Credentials::anonymous),
            )
            .with_fixed_headers(self.fixed_headers.clone())
            .with_tracing(self.config.tracing_enabled());
        let builder = match self.retry_settings(method, options) {
            Some(s) => builder.with_retry_settings(s),
            None => builder,
        };
        let builder = self
            .config
            .allowed_options()
            .iter()
            .fold(builder, |b, o| b.with_allowed_option(o.as_str()));
        let builder = self
            .middlewares
            .iter()
            .fold(builder, |b, m| b.with_middleware(m.clone()));
        builder.build()
    }

    /// Sends `call` through a new call stack.
    pub async fn invoke(&self, call: &Call, options: CallOptions) -> Result<Response> {
        let stack = self.call_stack(call.method(), &options);
        stack.invoke(call, options).await
    }

    /// Sends a unary call, converting the request and response with serde.
    pub async fn execute<I, O>(
        &self,
        method: &str,
        request: &I,
        options: CallOptions,
    ) -> Result<O>
    where
        I: Serialize,
        O: DeserializeOwned,
    {
        let call = Call::new(method, CallType::Unary)
            .with_message(serde_json::to_value(request).map_err(Error::ser)?)
            .with_response_type(std::any::type_name::<O>());
        let response = self.invoke(&call, options).await?.into_message()?;
        serde_json::from_value(response).map_err(Error::deser)
    }

    /// Starts a server streaming call, converting each response with serde.
    pub async fn server_streaming<I, O>(
        &self,
        method: &str,
        request: &I,
        options: CallOptions,
    ) -> Result<BoxStream<'static, Result<O>>>
    where
        I: Serialize,
        O: DeserializeOwned + Send + 'static,
    {
        let call = Call::new(method, CallType::ServerStreaming)
            .with_message(serde_json::to_value(request).map_err(Error::ser)?)
            .with_response_type(std::any::type_name::<O>());
        let stream = self.invoke(&call, options).await?.into_stream()?;
        Ok(stream
            .map(|r| r.and_then(|v| serde_json::from_value(v).map_err(Error::deser)))
            .boxed())
    }
}
