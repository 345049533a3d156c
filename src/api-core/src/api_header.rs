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

use crate::Result;
use crate::error::Error;
use http::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};

/// The header reporting the client library and language versions.
pub const X_GOOG_API_CLIENT: HeaderName = HeaderName::from_static("x-goog-api-client");

/// The header selecting the project billed for quota.
pub const X_GOOG_USER_PROJECT: HeaderName = HeaderName::from_static("x-goog-user-project");

/// Identifies the library making calls.
///
/// Generated libraries create one static instance of this struct and use it
/// to compute the `x-goog-api-client` header value.
#[derive(Debug, PartialEq)]
pub struct XGoogApiClient {
    pub library_type: &'static str,
    pub version: &'static str,
}

pub const GAPIC: &str = "gapic";
pub const GCCL: &str = "gccl";

mod build_info {
    // The file has been placed there by the build script.
    include!(concat!(env!("OUT_DIR"), "/build_env.rs"));

    pub(crate) const PKG_NAME: &str = env!("CARGO_PKG_NAME");
    pub(crate) const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");
}

impl XGoogApiClient {
    /// Format the struct as needed for the `x-goog-api-client` header.
    pub fn header_value(&self) -> String {
        let rustc_version = build_info::RUSTC_VERSION;
        let rustc_version = rustc_version
            .strip_prefix("rustc ")
            .unwrap_or(build_info::RUSTC_VERSION);
        format!(
            "gl-rust/{rustc_version} gax/{} {}/{}",
            build_info::PKG_VERSION,
            self.library_type,
            self.version
        )
    }
}

/// The default `user-agent` value, optionally preceded by an application
/// prefix.
pub fn user_agent(prefix: Option<&str>) -> String {
    let agent = format!("{}/{}", build_info::PKG_NAME, build_info::PKG_VERSION);
    match prefix {
        Some(p) if !p.is_empty() => format!("{p} {agent}"),
        _ => agent,
    }
}

/// Computes the headers attached to every call made by a client.
///
/// Returns a [binding][Error::is_binding] error if the user agent prefix or
/// the quota project are not valid header values.
pub fn fixed_headers(
    api_client: &XGoogApiClient,
    user_agent_prefix: Option<&str>,
    quota_project: Option<&str>,
) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(
        X_GOOG_API_CLIENT,
        HeaderValue::try_from(api_client.header_value()).map_err(Error::binding)?,
    );
    headers.insert(
        USER_AGENT,
        HeaderValue::try_from(user_agent(user_agent_prefix)).map_err(Error::binding)?,
    );
    if let Some(project) = quota_project {
        headers.insert(
            X_GOOG_USER_PROJECT,
            HeaderValue::from_str(project).map_err(Error::binding)?,
        );
    }
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn breakdown(formatted: &str) -> HashMap<String, String> {
        formatted
            .split(" ")
            .filter_map(|v| v.find('/').map(|i| v.split_at(i)))
            .map(|(k, v)| (k, &v[1..]))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    const TEST_CLIENT: XGoogApiClient = XGoogApiClient {
        library_type: GAPIC,
        version: "1.2.3",
    };

    #[test]
    fn format() {
        let fields = breakdown(TEST_CLIENT.header_value().as_str());

        let got = fields.get(GAPIC).map(String::to_owned);
        assert_eq!(got.as_deref(), Some("1.2.3"));

        let got = fields.get("gax").map(String::to_owned);
        assert_eq!(got.as_deref(), Some(build_info::PKG_VERSION));

        let got = fields.get("gl-rust").map(String::to_owned);
        let want = build_info::RUSTC_VERSION;
        assert!(
            got.as_ref()
                .map(|s| want.contains(s) && !s.is_empty())
                .unwrap_or(false),
            "mismatched rustc version {want} and {got:?}"
        );
    }

    #[test]
    fn agent() {
        let want = format!("google-cloud-api-core/{}", build_info::PKG_VERSION);
        assert_eq!(user_agent(None), want);
        assert_eq!(user_agent(Some("")), want);
        assert_eq!(user_agent(Some("my-app/2.0")), format!("my-app/2.0 {want}"));
    }

    #[test]
    fn headers() -> anyhow::Result<()> {
        let headers = fixed_headers(&TEST_CLIENT, Some("my-app"), Some("my-project"))?;
        assert_eq!(
            headers.get(&X_GOOG_API_CLIENT).map(|v| v.to_str()).transpose()?,
            Some(TEST_CLIENT.header_value().as_str())
        );
        let agent = headers.get(USER_AGENT).map(|v| v.to_str()).transpose()?;
        assert!(
            agent.is_some_and(|a| a.starts_with("my-app ")),
            "{agent:?}"
        );
        assert_eq!(
            headers.get(&X_GOOG_USER_PROJECT).map(|v| v.to_str()).transpose()?,
            Some("my-project")
        );

        let headers = fixed_headers(&TEST_CLIENT, None, None)?;
        assert!(headers.get(&X_GOOG_USER_PROJECT).is_none(), "{headers:?}");
        Ok(())
    }

    #[test]
    fn invalid_header_value() {
        let got = fixed_headers(&TEST_CLIENT, None, Some("bad\nproject"));
        let err = got.unwrap_err();
        assert!(err.is_binding(), "{err:?}");
    }
}
