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

//! The middleware stack wrapping every remote call.
//!
//! A [CallStack] is a chain of [Handler]s. The innermost handler sends the
//! call using a [Transport]. The [CallStackBuilder] wraps it, in order, with:
//!
//! 1. [CredentialsMiddleware], attaching the credential headers.
//! 2. [FixedHeaderMiddleware], attaching the client headers, such as
//!    `x-goog-api-client`.
//! 3. [RetryMiddleware], retrying failed attempts.
//! 4. [OptionsFilterMiddleware], dropping the options the transport does not
//!    need.
//! 5. The application [Middleware]s, in registration order.
//!
//! Each step wraps the previous one, so the last registered middleware sees
//! the call first.

use crate::Result;
use crate::call::{Call, Response};
use crate::credentials::Credentials;
use crate::error::Error;
use crate::options::{CallOptions, names};
use crate::retry_loop::retry_loop;
use crate::retry_settings::RetrySettings;
use crate::transport::{Transport, dispatch};
use http::HeaderMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

/// Handles one call, typically by calling an inner handler.
#[async_trait::async_trait]
pub trait Handler: Send + Sync + std::fmt::Debug {
    /// Handles `call`. Implementations that wrap another handler should call
    /// it at most once, unless they implement a retry policy.
    async fn invoke(&self, call: &Call, options: CallOptions) -> Result<Response>;
}

/// Wraps a handler with additional behavior.
///
/// # Example
/// ```
/// # use google_cloud_api_core::call::{Call, Response};
/// # use google_cloud_api_core::call_stack::{Handler, Middleware};
/// # use google_cloud_api_core::options::CallOptions;
/// # use std::sync::Arc;
/// #[derive(Debug)]
/// struct Counter(Arc<dyn Handler>, Arc<std::sync::atomic::AtomicUsize>);
///
/// #[async_trait::async_trait]
/// impl Handler for Counter {
///     async fn invoke(&self, call: &Call, options: CallOptions) -> google_cloud_api_core::Result<Response> {
///         self.1.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
///         self.0.invoke(call, options).await
///     }
/// }
///
/// #[derive(Debug, Default)]
/// struct CountingMiddleware(Arc<std::sync::atomic::AtomicUsize>);
///
/// impl Middleware for CountingMiddleware {
///     fn layer(&self, inner: Arc<dyn Handler>) -> Arc<dyn Handler> {
///         Arc::new(Counter(inner, self.0.clone()))
///     }
/// }
/// ```
pub trait Middleware: Send + Sync + std::fmt::Debug {
    /// Returns a handler wrapping `inner`.
    fn layer(&self, inner: Arc<dyn Handler>) -> Arc<dyn Handler>;
}

impl<T: Middleware + ?Sized> Middleware for Arc<T> {
    fn layer(&self, inner: Arc<dyn Handler>) -> Arc<dyn Handler> {
        T::layer(self, inner)
    }
}

/// The innermost handler, sending calls using a [Transport].
#[derive(Clone, Debug)]
pub struct TransportHandler {
    transport: Arc<dyn Transport>,
}

impl TransportHandler {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}

#[async_trait::async_trait]
impl Handler for TransportHandler {
    async fn invoke(&self, call: &Call, options: CallOptions) -> Result<Response> {
        dispatch(self.transport.as_ref(), call, options).await
    }
}

/// Attaches the headers returned by some [Credentials].
///
/// The credentials receive the [audience][CallOptions::audience] of the call.
/// Credential headers replace any request headers with the same name.
#[derive(Clone, Debug)]
pub struct CredentialsMiddleware {
    credentials: Credentials,
}

impl CredentialsMiddleware {
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }
}

impl Middleware for CredentialsMiddleware {
    fn layer(&self, inner: Arc<dyn Handler>) -> Arc<dyn Handler> {
        Arc::new(CredentialsHandler {
            inner,
            credentials: self.credentials.clone(),
        })
    }
}

#[derive(Debug)]
struct CredentialsHandler {
    inner: Arc<dyn Handler>,
    credentials: Credentials,
}

#[async_trait::async_trait]
impl Handler for CredentialsHandler {
    async fn invoke(&self, call: &Call, mut options: CallOptions) -> Result<Response> {
        let credential_headers = self
            .credentials
            .headers(options.audience())
            .await
            .map_err(|e| {
                if e.is_authentication() {
                    e
                } else {
                    Error::authentication(e)
                }
            })?;
        let headers = options.headers_mut();
        for name in credential_headers.keys() {
            headers.remove(name);
        }
        for (name, value) in credential_headers.iter() {
            headers.append(name.clone(), value.clone());
        }
        self.inner.invoke(call, options).await
    }
}

/// Attaches a fixed set of headers to every call.
///
/// Request headers take precedence: a fixed header is only added if the
/// request has no header with the same name.
#[derive(Clone, Debug)]
pub struct FixedHeaderMiddleware {
    headers: Arc<HeaderMap>,
}

impl FixedHeaderMiddleware {
    pub fn new(headers: HeaderMap) -> Self {
        Self {
            headers: Arc::new(headers),
        }
    }
}

impl Middleware for FixedHeaderMiddleware {
    fn layer(&self, inner: Arc<dyn Handler>) -> Arc<dyn Handler> {
        Arc::new(FixedHeaderHandler {
            inner,
            headers: self.headers.clone(),
        })
    }
}

#[derive(Debug)]
struct FixedHeaderHandler {
    inner: Arc<dyn Handler>,
    headers: Arc<HeaderMap>,
}

#[async_trait::async_trait]
impl Handler for FixedHeaderHandler {
    async fn invoke(&self, call: &Call, mut options: CallOptions) -> Result<Response> {
        let headers = options.headers_mut();
        for name in self.headers.keys() {
            if headers.contains_key(name) {
                continue;
            }
            for value in self.headers.get_all(name) {
                headers.append(name.clone(), value.clone());
            }
        }
        self.inner.invoke(call, options).await
    }
}

/// Retries failed attempts using the [retry loop][retry_loop].
///
/// Each attempt receives a copy of the options with the
/// [timeout][CallOptions::timeout] set to the timeout for that attempt. The
/// [cancellation token][CallOptions::cancellation] in the options stops the
/// loop.
///
/// Streaming calls are never retried: a partially consumed stream cannot be
/// replayed. They are sent once, with the options unchanged.
#[derive(Clone, Debug)]
pub struct RetryMiddleware {
    settings: Arc<RetrySettings>,
}

impl RetryMiddleware {
    pub fn new(settings: RetrySettings) -> Self {
        Self {
            settings: Arc::new(settings),
        }
    }

    pub fn settings(&self) -> &RetrySettings {
        &self.settings
    }
}

impl Middleware for RetryMiddleware {
    fn layer(&self, inner: Arc<dyn Handler>) -> Arc<dyn Handler> {
        Arc::new(RetryHandler {
            inner,
            settings: self.settings.clone(),
        })
    }
}

#[derive(Debug)]
struct RetryHandler {
    inner: Arc<dyn Handler>,
    settings: Arc<RetrySettings>,
}

#[async_trait::async_trait]
impl Handler for RetryHandler {
    async fn invoke(&self, call: &Call, options: CallOptions) -> Result<Response> {
        if call.call_type().is_streaming() {
            return self.inner.invoke(call, options).await;
        }
        let cancel = options.cancellation().cloned();
        let inner = &self.inner;
        let attempt = |timeout: Duration| {
            let mut options = options.clone();
            options.set_timeout(timeout);
            async move { inner.invoke(call, options).await }
        };
        retry_loop(
            attempt,
            tokio::time::sleep,
            &self.settings,
            None,
            cancel.as_ref(),
        )
        .await
    }
}

/// The options forwarded to the transport by default.
pub const DEFAULT_ALLOWED_OPTIONS: [&str; 5] = [
    names::HEADERS,
    names::TIMEOUT,
    names::TRANSPORT_OPTIONS,
    names::AUDIENCE,
    names::CANCELLATION,
];

/// Removes the options that are not in an allow-list.
///
/// Some options, such as the retry settings, only configure the call stack
/// and are removed before the call reaches the transport. See
/// [CallOptions::retain] for how option names are filtered.
///
/// With only the [DEFAULT_ALLOWED_OPTIONS], every transport option is
/// forwarded. Once the allow-list contains a name that is not one of the
/// [option names][names::ALL], that name is treated as a transport option key
/// and only the transport options whose key is in the allow-list are
/// forwarded.
#[derive(Clone, Debug)]
pub struct OptionsFilterMiddleware {
    allowed: Arc<BTreeSet<String>>,
    filter_transport_options: bool,
}

impl OptionsFilterMiddleware {
    /// Creates a filter keeping [DEFAULT_ALLOWED_OPTIONS] and `additional`.
    pub fn new<I, S>(additional: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let allowed: BTreeSet<String> = DEFAULT_ALLOWED_OPTIONS
            .iter()
            .map(|s| s.to_string())
            .chain(additional.into_iter().map(Into::into))
            .collect();
        let filter_transport_options = allowed
            .iter()
            .any(|name| !names::ALL.contains(&name.as_str()));
        Self {
            allowed: Arc::new(allowed),
            filter_transport_options,
        }
    }

    pub fn allowed(&self) -> &BTreeSet<String> {
        &self.allowed
    }
}

impl Default for OptionsFilterMiddleware {
    fn default() -> Self {
        Self::new(std::iter::empty::<String>())
    }
}

impl Middleware for OptionsFilterMiddleware {
    fn layer(&self, inner: Arc<dyn Handler>) -> Arc<dyn Handler> {
        Arc::new(OptionsFilterHandler {
            inner,
            allowed: self.allowed.clone(),
            filter_transport_options: self.filter_transport_options,
        })
    }
}

#[derive(Debug)]
struct OptionsFilterHandler {
    inner: Arc<dyn Handler>,
    allowed: Arc<BTreeSet<String>>,
    filter_transport_options: bool,
}

#[async_trait::async_trait]
impl Handler for OptionsFilterHandler {
    async fn invoke(&self, call: &Call, mut options: CallOptions) -> Result<Response> {
        options.retain(|name| self.allowed.contains(name));
        if self.filter_transport_options {
            options.retain_transport_options(|key| self.allowed.contains(key));
        }
        self.inner.invoke(call, options).await
    }
}

/// A composed stack of handlers, ready to send calls.
#[derive(Clone, Debug)]
pub struct CallStack {
    handler: Arc<dyn Handler>,
    tracing: bool,
}

impl CallStack {
    /// Sends `call` through the stack.
    ///
    /// If tracing is enabled the call runs in an `api_core::call` span.
    pub async fn invoke(&self, call: &Call, options: CallOptions) -> Result<Response> {
        if !self.tracing {
            return self.handler.invoke(call, options).await;
        }
        let span = tracing::info_span!(
            "api_core::call",
            method = call.method(),
            call_type = call.call_type().name(),
        );
        self.handler.invoke(call, options).instrument(span).await
    }
}

#[async_trait::async_trait]
impl Handler for CallStack {
    async fn invoke(&self, call: &Call, options: CallOptions) -> Result<Response> {
        CallStack::invoke(self, call, options).await
    }
}

/// Composes a [CallStack].
#[derive(Clone, Debug)]
pub struct CallStackBuilder {
    transport: Arc<dyn Transport>,
    credentials: Credentials,
    fixed_headers: HeaderMap,
    retry_settings: Option<RetrySettings>,
    allowed_options: Vec<String>,
    middlewares: Vec<Arc<dyn Middleware>>,
    tracing: bool,
}

impl CallStackBuilder {
    /// Creates a builder sending calls with `transport`.
    ///
    /// By default the stack uses [anonymous credentials][Credentials::anonymous],
    /// no fixed headers, and does not retry.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            credentials: Credentials::anonymous(),
            fixed_headers: HeaderMap::new(),
            retry_settings: None,
            allowed_options: Vec::new(),
            middlewares: Vec::new(),
            tracing: false,
        }
    }

    pub fn with_credentials(mut self, v: Credentials) -> Self {
        self.credentials = v;
        self
    }

    pub fn with_fixed_headers(mut self, v: HeaderMap) -> Self {
        self.fixed_headers = v;
        self
    }

    pub fn with_retry_settings(mut self, v: RetrySettings) -> Self {
        self.retry_settings = Some(v);
        self
    }

    /// Forwards the option named `v` to the transport, in addition to
    /// [DEFAULT_ALLOWED_OPTIONS].
    ///
    /// A `v` that is not an option name is a transport option key. Adding
    /// one restricts the transport options to the allowed keys, see
    /// [OptionsFilterMiddleware].
    pub fn with_allowed_option<T: Into<String>>(mut self, v: T) -> Self {
        self.allowed_options.push(v.into());
        self
    }

    /// Adds an application middleware.
    ///
    /// Middlewares wrap the stack in registration order, the last one added
    /// is the first to see each call.
    pub fn with_middleware<M: Middleware + 'static>(mut self, v: M) -> Self {
        self.middlewares.push(Arc::new(v));
        self
    }

    pub fn with_tracing(mut self, v: bool) -> Self {
        self.tracing = v;
        self
    }

    pub fn build(self) -> CallStack {
        let mut handler: Arc<dyn Handler> = Arc::new(TransportHandler::new(self.transport));
        handler = CredentialsMiddleware::new(self.credentials).layer(handler);
        handler = FixedHeaderMiddleware::new(self.fixed_headers).layer(handler);
        if let Some(settings) = self.retry_settings {
            handler = RetryMiddleware::new(settings).layer(handler);
        }
        handler = OptionsFilterMiddleware::new(self.allowed_options).layer(handler);
        for middleware in &self.middlewares {
            handler = middleware.layer(handler);
        }
        CallStack {
            handler,
            tracing: self.tracing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::CallType;
    use crate::credentials::CredentialsProvider;
    use crate::error::rpc::{Code, Status};
    use crate::retry_settings::tests::test_builder;
    use http::{HeaderName, HeaderValue};
    use serde_json::{Value, json};
    use std::sync::Mutex;
    use tokio_util::sync::CancellationToken;

    type Attempt = (Call, CallOptions);

    // Records every call and replies with the next canned result.
    #[derive(Debug)]
    struct FakeTransport {
        calls: Mutex<Vec<Attempt>>,
        results: Mutex<Vec<Result<Value>>>,
    }

    impl FakeTransport {
        fn new<I: IntoIterator<Item = Result<Value>>>(results: I) -> Arc<Self> {
            let mut results: Vec<_> = results.into_iter().collect();
            results.reverse();
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                results: Mutex::new(results),
            })
        }

        fn calls(&self) -> Vec<Attempt> {
            self.calls.lock().expect("mutex is not poisoned").clone()
        }
    }

    #[async_trait::async_trait]
    impl Transport for FakeTransport {
        async fn start_unary_call(&self, call: &Call, options: CallOptions) -> Result<Response> {
            self.calls
                .lock()
                .expect("mutex is not poisoned")
                .push((call.clone(), options));
            self.results
                .lock()
                .expect("mutex is not poisoned")
                .pop()
                .unwrap_or_else(|| Ok(json!("default")))
                .map(Response::Message)
        }

        async fn start_server_streaming_call(
            &self,
            call: &Call,
            options: CallOptions,
        ) -> Result<Response> {
            self.start_unary_call(call, options).await
        }
    }

    fn unavailable() -> Error {
        Error::service(Status::default().set_code(Code::Unavailable).set_message("try-again"))
    }

    fn header(options: &CallOptions, name: &str) -> Vec<String> {
        options
            .headers()
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok().map(str::to_string))
            .collect()
    }

    #[tokio::test]
    async fn minimal_stack() -> anyhow::Result<()> {
        let transport = FakeTransport::new([Ok(json!({"name": "a"}))]);
        let stack = CallStackBuilder::new(transport.clone()).build();
        let call = Call::new("test.v1.Service/Get", CallType::Unary).with_message(json!({}));
        let response = stack.invoke(&call, CallOptions::default()).await?;
        assert_eq!(response.into_message()?, json!({"name": "a"}));
        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0.method(), "test.v1.Service/Get");
        assert!(calls[0].1.headers().is_empty(), "{:?}", calls[0].1);
        Ok(())
    }

    #[tokio::test]
    async fn credentials_headers() -> anyhow::Result<()> {
        let transport = FakeTransport::new([]);
        let stack = CallStackBuilder::new(transport.clone())
            .with_credentials(Credentials::bearer("token")?)
            .build();
        let mut options = CallOptions::default();
        options.insert_header(
            http::header::AUTHORIZATION,
            HeaderValue::from_static("Bearer stale"),
        );
        stack
            .invoke(&Call::new("m", CallType::Unary), options)
            .await?;
        let calls = transport.calls();
        assert_eq!(header(&calls[0].1, "authorization"), vec!["Bearer token"]);
        Ok(())
    }

    #[derive(Debug)]
    struct AudienceCredentials;

    impl CredentialsProvider for AudienceCredentials {
        async fn headers(&self, audience: Option<&str>) -> Result<HeaderMap> {
            let mut headers = HeaderMap::new();
            if let Some(a) = audience {
                headers.insert(
                    "x-audience",
                    HeaderValue::from_str(a).map_err(Error::authentication)?,
                );
            }
            Ok(headers)
        }
    }

    #[tokio::test]
    async fn credentials_audience() -> anyhow::Result<()> {
        let transport = FakeTransport::new([]);
        let stack = CallStackBuilder::new(transport.clone())
            .with_credentials(Credentials::from(AudienceCredentials))
            .build();
        let mut options = CallOptions::default();
        options.set_audience("https://test.googleapis.com/");
        stack
            .invoke(&Call::new("m", CallType::Unary), options)
            .await?;
        let calls = transport.calls();
        assert_eq!(
            header(&calls[0].1, "x-audience"),
            vec!["https://test.googleapis.com/"]
        );
        Ok(())
    }

    #[derive(Debug)]
    struct BrokenCredentials;

    impl CredentialsProvider for BrokenCredentials {
        async fn headers(&self, _audience: Option<&str>) -> Result<HeaderMap> {
            Err(Error::io("cannot read key file"))
        }
    }

    #[tokio::test]
    async fn credentials_error() {
        let transport = FakeTransport::new([]);
        let stack = CallStackBuilder::new(transport.clone())
            .with_credentials(Credentials::from(BrokenCredentials))
            .build();
        let got = stack
            .invoke(&Call::new("m", CallType::Unary), CallOptions::default())
            .await;
        let err = got.unwrap_err();
        assert!(err.is_authentication(), "{err:?}");
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn fixed_headers_request_wins() -> anyhow::Result<()> {
        let transport = FakeTransport::new([]);
        let mut fixed = HeaderMap::new();
        fixed.insert("x-goog-api-client", HeaderValue::from_static("gax/1.0"));
        fixed.append("x-multi", HeaderValue::from_static("a"));
        fixed.append("x-multi", HeaderValue::from_static("b"));
        fixed.insert("user-agent", HeaderValue::from_static("fixed-agent"));
        let stack = CallStackBuilder::new(transport.clone())
            .with_fixed_headers(fixed)
            .build();
        let mut options = CallOptions::default();
        options.insert_header(
            HeaderName::from_static("user-agent"),
            HeaderValue::from_static("request-agent"),
        );
        stack
            .invoke(&Call::new("m", CallType::Unary), options)
            .await?;
        let calls = transport.calls();
        let options = &calls[0].1;
        assert_eq!(header(options, "x-goog-api-client"), vec!["gax/1.0"]);
        assert_eq!(header(options, "x-multi"), vec!["a", "b"]);
        assert_eq!(header(options, "user-agent"), vec!["request-agent"]);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn retry_then_success() -> anyhow::Result<()> {
        let transport = FakeTransport::new([Err(unavailable()), Err(unavailable()), Ok(json!(3))]);
        let stack = CallStackBuilder::new(transport.clone())
            .with_retry_settings(test_builder().build()?)
            .build();
        let start = tokio::time::Instant::now();
        let response = stack
            .invoke(&Call::new("m", CallType::Unary), CallOptions::default())
            .await?;
        assert_eq!(response.into_message()?, json!(3));
        assert_eq!(start.elapsed(), Duration::from_millis(30));
        let timeouts: Vec<_> = transport
            .calls()
            .iter()
            .map(|(_, o)| o.timeout())
            .collect();
        assert_eq!(
            timeouts,
            vec![
                Some(Duration::from_millis(100)),
                Some(Duration::from_millis(150)),
                Some(Duration::from_millis(225)),
            ]
        );
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn streaming_not_retried() {
        let transport = FakeTransport::new([Err(unavailable()), Ok(json!("unused"))]);
        let stack = CallStackBuilder::new(transport.clone())
            .with_retry_settings(crate::retry_settings::tests::test_settings())
            .build();
        let got = stack
            .invoke(
                &Call::new("m", CallType::ServerStreaming),
                CallOptions::default(),
            )
            .await;
        let err = got.unwrap_err();
        assert_eq!(err.code(), Some(Code::Unavailable), "{err:?}");
        assert_eq!(transport.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_cancelled() {
        let transport = FakeTransport::new([Err(unavailable()), Ok(json!("unused"))]);
        let stack = CallStackBuilder::new(transport.clone())
            .with_retry_settings(crate::retry_settings::tests::test_settings())
            .build();
        let token = CancellationToken::new();
        token.cancel();
        let mut options = CallOptions::default();
        options.set_cancellation(token);
        let got = stack
            .invoke(&Call::new("m", CallType::Unary), options)
            .await;
        let err = got.unwrap_err();
        assert!(err.is_cancelled(), "{err:?}");
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn options_filtered() -> anyhow::Result<()> {
        let transport = FakeTransport::new([]);
        let stack = CallStackBuilder::new(transport.clone())
            .with_allowed_option("x-allowed")
            .build();
        let mut options = CallOptions::default();
        options.set_timeout(Duration::from_secs(3));
        options.set_audience("aud");
        options.set_retry_settings(test_builder());
        options.set_transport_option("x-allowed", json!(1));
        options.set_transport_option("x-dropped", json!(2));
        stack
            .invoke(&Call::new("m", CallType::Unary), options)
            .await?;
        let calls = transport.calls();
        let got = &calls[0].1;
        assert_eq!(got.timeout(), Some(Duration::from_secs(3)));
        assert_eq!(got.audience(), Some("aud"));
        assert!(got.retry_settings().is_none(), "{got:?}");
        assert_eq!(
            got.transport_options().keys().collect::<Vec<_>>(),
            vec!["x-allowed"]
        );
        Ok(())
    }

    #[tokio::test]
    async fn transport_options_forwarded_by_default() -> anyhow::Result<()> {
        let transport = FakeTransport::new([]);
        let stack = CallStackBuilder::new(transport.clone()).build();
        let mut options = CallOptions::default();
        options.set_transport_option("x-first", json!(1));
        options.set_transport_option("x-second", json!(2));
        stack
            .invoke(&Call::new("m", CallType::Unary), options)
            .await?;
        let calls = transport.calls();
        assert_eq!(
            calls[0].1.transport_options().keys().collect::<Vec<_>>(),
            vec!["x-first", "x-second"]
        );
        Ok(())
    }

    #[test]
    fn default_filter() {
        let filter = OptionsFilterMiddleware::default();
        let got: Vec<_> = filter.allowed().iter().map(String::as_str).collect();
        assert_eq!(
            got,
            vec!["audience", "cancellation", "headers", "timeout", "transport_options"]
        );
    }

    // Appends its name to a shared log on the way in and on the way out.
    #[derive(Debug)]
    struct Tracer {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    #[derive(Debug)]
    struct TracerHandler {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
        inner: Arc<dyn Handler>,
    }

    impl Middleware for Tracer {
        fn layer(&self, inner: Arc<dyn Handler>) -> Arc<dyn Handler> {
            Arc::new(TracerHandler {
                name: self.name,
                log: self.log.clone(),
                inner,
            })
        }
    }

    #[async_trait::async_trait]
    impl Handler for TracerHandler {
        async fn invoke(&self, call: &Call, options: CallOptions) -> Result<Response> {
            self.log
                .lock()
                .expect("mutex is not poisoned")
                .push(format!("{}-in", self.name));
            let response = self.inner.invoke(call, options).await;
            self.log
                .lock()
                .expect("mutex is not poisoned")
                .push(format!("{}-out", self.name));
            response
        }
    }

    #[tokio::test]
    async fn middleware_order() -> anyhow::Result<()> {
        let log = Arc::new(Mutex::new(Vec::new()));
        let transport = FakeTransport::new([]);
        let stack = CallStackBuilder::new(transport.clone())
            .with_middleware(Tracer {
                name: "first",
                log: log.clone(),
            })
            .with_middleware(Tracer {
                name: "second",
                log: log.clone(),
            })
            .build();
        stack
            .invoke(&Call::new("m", CallType::Unary), CallOptions::default())
            .await?;
        let got = log.lock().expect("mutex is not poisoned").clone();
        assert_eq!(got, vec!["second-in", "first-in", "first-out", "second-out"]);
        Ok(())
    }

    #[tokio::test]
    async fn user_middleware_sees_unfiltered_options() -> anyhow::Result<()> {
        #[derive(Debug)]
        struct Check;
        #[derive(Debug)]
        struct CheckHandler(Arc<dyn Handler>);
        impl Middleware for Check {
            fn layer(&self, inner: Arc<dyn Handler>) -> Arc<dyn Handler> {
                Arc::new(CheckHandler(inner))
            }
        }
        #[async_trait::async_trait]
        impl Handler for CheckHandler {
            async fn invoke(&self, call: &Call, options: CallOptions) -> Result<Response> {
                assert!(options.retry_settings().is_some(), "{options:?}");
                self.0.invoke(call, options).await
            }
        }

        let transport = FakeTransport::new([]);
        let stack = CallStackBuilder::new(transport.clone())
            .with_middleware(Check)
            .build();
        let mut options = CallOptions::default();
        options.set_retry_settings(test_builder());
        stack
            .invoke(&Call::new("m", CallType::Unary), options)
            .await?;
        assert!(transport.calls()[0].1.retry_settings().is_none());
        Ok(())
    }

    #[tokio::test]
    async fn traced_call() -> anyhow::Result<()> {
        let transport = FakeTransport::new([Ok(json!("traced"))]);
        let stack = CallStackBuilder::new(transport.clone())
            .with_tracing(true)
            .build();
        let response = Handler::invoke(
            &stack,
            &Call::new("m", CallType::Unary),
            CallOptions::default(),
        )
        .await?;
        assert_eq!(response.into_message()?, json!("traced"));
        Ok(())
    }

    #[test]
    fn send_and_sync() {
        static_assertions::assert_impl_all!(CallStack: Send, Sync);
        static_assertions::assert_impl_all!(CallStackBuilder: Send, Sync);
    }
}
