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

//! Types and functions to attach credentials to requests.
//!
//! Obtaining and refreshing tokens is outside the scope of this crate.
//! Applications, or authentication libraries, implement [CredentialsProvider]
//! and wrap the implementation in [Credentials].

use crate::Result;
use crate::error::Error;
use http::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use std::future::Future;
use std::sync::Arc;

/// A shared handle to a credentials provider.
///
/// # Example
/// ```
/// # use google_cloud_api_core::credentials::Credentials;
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> anyhow::Result<()> {
/// let credentials = Credentials::bearer("my-token")?;
/// let headers = credentials.headers(None).await?;
/// assert_eq!(headers.get("authorization").map(|v| v.to_str()).transpose()?, Some("Bearer my-token"));
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Credentials {
    // Credentials are shared by every call made with a client, possibly from
    // many tasks.
    inner: Arc<dyn dynamic::CredentialsProvider>,
}

impl<T> std::convert::From<T> for Credentials
where
    T: CredentialsProvider + Send + Sync + 'static,
{
    fn from(value: T) -> Self {
        Self {
            inner: Arc::new(value),
        }
    }
}

impl Credentials {
    /// Credentials that do not add any headers.
    pub fn anonymous() -> Self {
        Self::from(AnonymousCredentials)
    }

    /// Credentials that always send the same bearer token.
    pub fn bearer<T: AsRef<str>>(token: T) -> Result<Self> {
        Ok(Self::from(StaticBearerCredentials::new(token)?))
    }

    /// Returns the headers to add to a request.
    ///
    /// `audience` is the audience for self-signed tokens, if the method
    /// requires one.
    pub async fn headers(&self, audience: Option<&str>) -> Result<HeaderMap> {
        self.inner.headers(audience).await
    }
}

/// Produces the authentication headers for requests.
pub trait CredentialsProvider: std::fmt::Debug {
    /// Asynchronously constructs the authentication headers.
    fn headers(&self, audience: Option<&str>) -> impl Future<Output = Result<HeaderMap>> + Send;
}

/// Credentials that do not add any headers.
///
/// Useful for local emulators and for tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct AnonymousCredentials;

impl CredentialsProvider for AnonymousCredentials {
    async fn headers(&self, _audience: Option<&str>) -> Result<HeaderMap> {
        Ok(HeaderMap::new())
    }
}

/// Credentials that always send the same bearer token.
#[derive(Clone, Debug)]
pub struct StaticBearerCredentials {
    value: HeaderValue,
}

impl StaticBearerCredentials {
    pub fn new<T: AsRef<str>>(token: T) -> Result<Self> {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token.as_ref()))
            .map_err(Error::authentication)?;
        value.set_sensitive(true);
        Ok(Self { value })
    }
}

impl CredentialsProvider for StaticBearerCredentials {
    async fn headers(&self, _audience: Option<&str>) -> Result<HeaderMap> {
        Ok(HeaderMap::from_iter([(AUTHORIZATION, self.value.clone())]))
    }
}

pub(crate) mod dynamic {
    use super::{HeaderMap, Result};

    /// A dyn-compatible, crate-private version of `CredentialsProvider`.
    #[async_trait::async_trait]
    pub trait CredentialsProvider: Send + Sync + std::fmt::Debug {
        async fn headers(&self, audience: Option<&str>) -> Result<HeaderMap>;
    }

    /// The public CredentialsProvider implements the dyn-compatible
    /// CredentialsProvider.
    #[async_trait::async_trait]
    impl<T> CredentialsProvider for T
    where
        T: super::CredentialsProvider + Send + Sync,
    {
        async fn headers(&self, audience: Option<&str>) -> Result<HeaderMap> {
            T::headers(self, audience).await
        }
    }
}
