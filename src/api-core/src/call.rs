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

//! The descriptor for one remote call.

use crate::Result;
use crate::error::Error;
use futures::stream::{Stream, StreamExt};
use std::pin::Pin;

/// The request and response payloads.
///
/// Messages are exchanged with the transport in their JSON representation.
/// The transport is responsible for any wire encoding.
pub type Payload = serde_json::Value;

/// A stream of response messages.
pub type PayloadStream = Pin<Box<dyn Stream<Item = Result<Payload>> + Send>>;

/// The kind of remote call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum CallType {
    Unary,
    ServerStreaming,
    ClientStreaming,
    BidiStreaming,
    /// A unary call returning one page of a list.
    Paginated,
    /// A unary call starting a long-running operation.
    LongRunning,
}

impl CallType {
    /// Returns true for the call types that return a stream of responses or
    /// send a stream of requests.
    pub fn is_streaming(&self) -> bool {
        matches!(
            self,
            Self::ServerStreaming | Self::ClientStreaming | Self::BidiStreaming
        )
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Unary => "unary",
            Self::ServerStreaming => "server_streaming",
            Self::ClientStreaming => "client_streaming",
            Self::BidiStreaming => "bidi_streaming",
            Self::Paginated => "paginated",
            Self::LongRunning => "long_running",
        }
    }
}

impl std::fmt::Display for CallType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Describes one invocation of a remote method.
///
/// # Example
/// ```
/// # use google_cloud_api_core::call::{Call, CallType};
/// let call = Call::new("google.pubsub.v1.Publisher/Publish", CallType::Unary)
///     .with_response_type("google.pubsub.v1.PublishResponse")
///     .with_message(serde_json::json!({"topic": "projects/p/topics/t"}));
/// assert_eq!(call.method(), "google.pubsub.v1.Publisher/Publish");
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Call {
    method: String,
    response_type: String,
    message: Option<Payload>,
    call_type: CallType,
}

impl Call {
    pub fn new<M: Into<String>>(method: M, call_type: CallType) -> Self {
        Self {
            method: method.into(),
            response_type: String::new(),
            message: None,
            call_type,
        }
    }

    pub fn with_response_type<T: Into<String>>(mut self, v: T) -> Self {
        self.response_type = v.into();
        self
    }

    pub fn with_message<T: Into<Payload>>(mut self, v: T) -> Self {
        self.message = Some(v.into());
        self
    }

    /// The fully qualified method name.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// The fully qualified name of the response message type.
    pub fn response_type(&self) -> &str {
        &self.response_type
    }

    pub fn message(&self) -> Option<&Payload> {
        self.message.as_ref()
    }

    pub fn call_type(&self) -> CallType {
        self.call_type
    }
}

/// The result of a call: a single message, or a stream of messages.
pub enum Response {
    Message(Payload),
    Stream(PayloadStream),
}

impl Response {
    /// Returns the single response message.
    pub fn into_message(self) -> Result<Payload> {
        match self {
            Self::Message(m) => Ok(m),
            Self::Stream(_) => Err(Error::deser("expected a single message, got a stream")),
        }
    }

    /// Returns the stream of response messages.
    pub fn into_stream(self) -> Result<PayloadStream> {
        match self {
            Self::Stream(s) => Ok(s),
            Self::Message(_) => Err(Error::deser("expected a stream, got a single message")),
        }
    }

    /// Creates a stream response from a fixed list of results.
    pub fn from_results<I>(results: I) -> Self
    where
        I: IntoIterator<Item = Result<Payload>>,
        I::IntoIter: Send + 'static,
    {
        Self::Stream(futures::stream::iter(results).boxed())
    }
}

impl std::fmt::Debug for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Message(m) => f.debug_tuple("Message").field(m).finish(),
            Self::Stream(_) => f.debug_tuple("Stream").finish_non_exhaustive(),
        }
    }
}
