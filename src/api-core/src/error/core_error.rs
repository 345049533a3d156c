// Copyright 2024 Google LLC
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

use super::rpc::{Code, Status};
use http::HeaderMap;
use std::error::Error as StdError;

type BoxError = Box<dyn StdError + Send + Sync>;

/// The core error returned by all the operations in this crate.
///
/// Errors come from multiple sources. The service may return an error, the
/// transport may be unable to reach the service, an attempt may run out of
/// time, the retry loop may hit its deadline, or a resource name may not match
/// any path template.
///
/// Most applications will just return the error or log it. Applications that
/// need more details can use the predicates and accessors in this type, or
/// query the error [source][std::error::Error::source].
///
/// # Example
/// ```
/// use google_cloud_api_core::error::Error;
/// use google_cloud_api_core::error::rpc::Code;
/// fn describe(result: Result<String, Error>) -> String {
///     match result {
///         Ok(name) => format!("found {name}"),
///         Err(e) if e.is_deadline_exceeded() => format!("gave up: {e}"),
///         Err(e) if e.code() == Some(Code::NotFound) => "missing".to_string(),
///         Err(e) => format!("failed: {e}"),
///     }
/// }
/// let err = Error::binding("value for key `project` not provided");
/// assert!(describe(Err(err)).starts_with("failed"));
/// ```
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    source: Option<BoxError>,
}

impl Error {
    /// Creates an error with the information returned by the service.
    ///
    /// # Example
    /// ```
    /// use google_cloud_api_core::error::Error;
    /// use google_cloud_api_core::error::rpc::{Code, Status};
    /// let status = Status::default().set_code(Code::NotFound).set_message("NOT FOUND");
    /// let error = Error::service(status.clone());
    /// assert_eq!(error.status(), Some(&status));
    /// ```
    pub fn service(status: Status) -> Self {
        Self::service_with_headers(status, None)
    }

    /// Creates a service error that also carries the response headers.
    pub fn service_with_headers(status: Status, headers: Option<HeaderMap>) -> Self {
        let details = ServiceDetails { status, headers };
        Self {
            kind: ErrorKind::Service(Box::new(details)),
            source: None,
        }
    }

    /// The service status, if this error was returned by the service.
    pub fn status(&self) -> Option<&Status> {
        match &self.kind {
            ErrorKind::Service(d) => Some(&d.status),
            _ => None,
        }
    }

    /// The response headers, if the transport captured any.
    pub fn headers(&self) -> Option<&HeaderMap> {
        match &self.kind {
            ErrorKind::Service(d) => d.headers.as_ref(),
            ErrorKind::Transport(h) => h.as_ref(),
            _ => None,
        }
    }

    /// The canonical status code for this error.
    ///
    /// Errors generated on the client side map to the code a service would
    /// use for the same condition. Serialization problems have no code.
    ///
    /// # Example
    /// ```
    /// use google_cloud_api_core::error::Error;
    /// use google_cloud_api_core::error::rpc::Code;
    /// let error = Error::timeout("simulated timeout");
    /// assert_eq!(error.code(), Some(Code::DeadlineExceeded));
    /// ```
    pub fn code(&self) -> Option<Code> {
        match &self.kind {
            ErrorKind::Service(d) => Some(d.status.code),
            ErrorKind::Timeout | ErrorKind::DeadlineExceeded => Some(Code::DeadlineExceeded),
            ErrorKind::Cancelled => Some(Code::Cancelled),
            ErrorKind::Transport(_) => Some(Code::Unavailable),
            ErrorKind::Authentication => Some(Code::Unauthenticated),
            ErrorKind::Binding => Some(Code::InvalidArgument),
            ErrorKind::Serialization | ErrorKind::Deserialization => None,
        }
    }

    /// Creates an error representing a single attempt running out of time.
    ///
    /// # Example
    /// ```
    /// use std::error::Error as _;
    /// use google_cloud_api_core::error::Error;
    /// let error = Error::timeout("simulated timeout");
    /// assert!(error.is_timeout());
    /// assert!(error.source().is_some());
    /// ```
    pub fn timeout<T: Into<BoxError>>(source: T) -> Self {
        Self {
            kind: ErrorKind::Timeout,
            source: Some(source.into()),
        }
    }

    /// A single attempt did not complete before its timeout.
    ///
    /// The request may or may not have reached the service.
    pub fn is_timeout(&self) -> bool {
        matches!(self.kind, ErrorKind::Timeout)
    }

    /// Creates an error representing an expired retry deadline.
    ///
    /// The `source` is the error returned by the last attempt.
    pub fn deadline_exceeded<T: Into<BoxError>>(source: T) -> Self {
        Self {
            kind: ErrorKind::DeadlineExceeded,
            source: Some(source.into()),
        }
    }

    /// The retry loop ran out of time before the request succeeded.
    ///
    /// This is always a client-side generated error, but it is the result of
    /// one or more errors received from the service. The last of these errors
    /// is available via [source][std::error::Error::source].
    ///
    /// # Troubleshooting
    ///
    /// The most common cause of this problem is a transient problem that lasts
    /// longer than the total timeout in your retry settings. If your
    /// application can tolerate longer recovery times then extend the total
    /// timeout.
    pub fn is_deadline_exceeded(&self) -> bool {
        matches!(self.kind, ErrorKind::DeadlineExceeded)
    }

    /// Creates an error representing a request cancelled by the caller.
    pub fn cancelled() -> Self {
        Self {
            kind: ErrorKind::Cancelled,
            source: None,
        }
    }

    /// The caller cancelled the request.
    pub fn is_cancelled(&self) -> bool {
        matches!(self.kind, ErrorKind::Cancelled)
    }

    /// Creates an error representing a problem formatting the request.
    pub fn ser<T: Into<BoxError>>(source: T) -> Self {
        Self {
            kind: ErrorKind::Serialization,
            source: Some(source.into()),
        }
    }

    /// The request could not be serialized.
    pub fn is_serialization(&self) -> bool {
        matches!(self.kind, ErrorKind::Serialization)
    }

    /// Creates an error representing a deserialization problem.
    ///
    /// # Example
    /// ```
    /// use std::error::Error as _;
    /// use google_cloud_api_core::error::Error;
    /// let error = Error::deser("simulated problem");
    /// assert!(error.is_deserialization());
    /// assert!(error.source().is_some());
    /// ```
    pub fn deser<T: Into<BoxError>>(source: T) -> Self {
        Self {
            kind: ErrorKind::Deserialization,
            source: Some(source.into()),
        }
    }

    /// The response could not be deserialized.
    ///
    /// # Troubleshooting
    ///
    /// The most common cause for deserialization problems are bugs in the
    /// client library and (rarely) bugs in the service.
    pub fn is_deserialization(&self) -> bool {
        matches!(self.kind, ErrorKind::Deserialization)
    }

    /// Creates an error representing an invalid request argument.
    ///
    /// Path template errors use this kind, as do header values that cannot
    /// be encoded.
    pub fn binding<T: Into<BoxError>>(source: T) -> Self {
        Self {
            kind: ErrorKind::Binding,
            source: Some(source.into()),
        }
    }

    /// A request argument, such as a resource name, is invalid.
    pub fn is_binding(&self) -> bool {
        matches!(self.kind, ErrorKind::Binding)
    }

    /// Creates an error representing a failure to obtain credentials.
    pub fn authentication<T: Into<BoxError>>(source: T) -> Self {
        Self {
            kind: ErrorKind::Authentication,
            source: Some(source.into()),
        }
    }

    /// The request could not be authenticated.
    pub fn is_authentication(&self) -> bool {
        matches!(self.kind, ErrorKind::Authentication)
    }

    /// Creates an error representing a failure to reach the service.
    pub fn io<T: Into<BoxError>>(source: T) -> Self {
        Self {
            kind: ErrorKind::Transport(None),
            source: Some(source.into()),
        }
    }

    /// Creates a transport error that captured the response headers.
    pub fn transport<T: Into<BoxError>>(headers: HeaderMap, source: T) -> Self {
        Self {
            kind: ErrorKind::Transport(Some(headers)),
            source: Some(source.into()),
        }
    }

    /// The request could not be sent, or the response could not be received.
    ///
    /// # Troubleshooting
    ///
    /// Most of the time this is a transient network problem, and retrying
    /// with `UNAVAILABLE` in the retryable codes is the right remedy.
    pub fn is_transport(&self) -> bool {
        matches!(self.kind, ErrorKind::Transport(_))
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.kind, &self.source) {
            (ErrorKind::Service(d), _) => write!(
                f,
                "the service reports an error with code {} described as: {}",
                d.status.code, d.status.message
            ),
            (ErrorKind::Cancelled, _) => write!(f, "the request was cancelled by the caller"),
            (ErrorKind::Binding, Some(e)) => write!(f, "invalid request argument: {e}"),
            (ErrorKind::Serialization, Some(e)) => write!(f, "cannot serialize the request {e}"),
            (ErrorKind::Deserialization, Some(e)) => {
                write!(f, "cannot deserialize the response {e}")
            }
            (ErrorKind::Authentication, Some(e)) => {
                write!(f, "cannot create the authentication headers {e}")
            }
            (ErrorKind::Timeout, Some(e)) => {
                write!(f, "the attempt exceeded its timeout {e}")
            }
            (ErrorKind::DeadlineExceeded, Some(e)) => {
                write!(f, "the retry deadline expired, the last error was: {e}")
            }
            (ErrorKind::Transport(_), Some(e)) => {
                write!(f, "the transport reports an error: {e}")
            }
            (_, None) => unreachable!("no constructor allows this"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error))
    }
}

#[derive(Debug)]
enum ErrorKind {
    Binding,
    Serialization,
    Deserialization,
    Authentication,
    Timeout,
    DeadlineExceeded,
    Cancelled,
    Transport(Option<HeaderMap>),
    Service(Box<ServiceDetails>),
}

#[derive(Debug)]
struct ServiceDetails {
    status: Status,
    headers: Option<HeaderMap>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as StdError;
    use test_case::test_case;

    #[test]
    fn service() {
        let status = Status::default()
            .set_code(Code::NotFound)
            .set_message("NOT FOUND");
        let error = Error::service(status.clone());
        assert_eq!(error.status(), Some(&status));
        assert_eq!(error.code(), Some(Code::NotFound));
        assert!(error.source().is_none(), "{error:?}");
        assert!(error.headers().is_none(), "{error:?}");
        let got = error.to_string();
        assert!(got.contains("NOT_FOUND"), "{got}");
        assert!(got.contains("NOT FOUND"), "{got}");
    }

    #[test]
    fn service_with_headers() {
        let headers = HeaderMap::from_iter([(
            http::header::CONTENT_TYPE,
            http::HeaderValue::from_static("application/json"),
        )]);
        let status = Status::default().set_code(Code::Unavailable);
        let error = Error::service_with_headers(status, Some(headers.clone()));
        assert_eq!(error.headers(), Some(&headers));
        assert_eq!(error.code(), Some(Code::Unavailable));
    }

    #[test]
    fn deadline_exceeded_keeps_last_error() {
        let last = Error::service(Status::default().set_code(Code::Unavailable));
        let error = Error::deadline_exceeded(last);
        assert!(error.is_deadline_exceeded(), "{error:?}");
        assert!(!error.is_timeout(), "{error:?}");
        assert_eq!(error.code(), Some(Code::DeadlineExceeded));
        let source = error
            .source()
            .and_then(|e| e.downcast_ref::<Error>())
            .expect("source should be the last error");
        assert_eq!(source.code(), Some(Code::Unavailable));
    }

    #[test]
    fn cancelled() {
        let error = Error::cancelled();
        assert!(error.is_cancelled(), "{error:?}");
        assert!(error.source().is_none(), "{error:?}");
        assert_eq!(error.code(), Some(Code::Cancelled));
        assert!(error.to_string().contains("cancelled"), "{error}");
    }

    #[test]
    fn transport() {
        let headers = HeaderMap::new();
        let error = Error::transport(headers.clone(), "connection reset");
        assert!(error.is_transport(), "{error:?}");
        assert_eq!(error.headers(), Some(&headers));
        let error = Error::io("connection reset");
        assert!(error.is_transport(), "{error:?}");
        assert!(error.headers().is_none(), "{error:?}");
    }

    #[test_case(Error::timeout("t"), Some(Code::DeadlineExceeded))]
    #[test_case(Error::io("io"), Some(Code::Unavailable))]
    #[test_case(Error::authentication("auth"), Some(Code::Unauthenticated))]
    #[test_case(Error::binding("bind"), Some(Code::InvalidArgument))]
    #[test_case(Error::ser("ser"), None)]
    #[test_case(Error::deser("deser"), None)]
    fn client_side_codes(error: Error, want: Option<Code>) {
        assert_eq!(error.code(), want, "{error:?}");
        assert!(error.source().is_some(), "{error:?}");
        assert!(error.status().is_none(), "{error:?}");
    }

    #[test]
    fn predicates() {
        assert!(Error::ser("e").is_serialization());
        assert!(Error::deser("e").is_deserialization());
        assert!(Error::binding("e").is_binding());
        assert!(Error::authentication("e").is_authentication());
        assert!(Error::timeout("e").is_timeout());
        assert!(!Error::timeout("e").is_deadline_exceeded());
    }

    #[test]
    fn display_includes_source() {
        let error = Error::binding("missing binding `name`");
        let got = error.to_string();
        assert!(got.contains("missing binding `name`"), "{got}");
    }
}
