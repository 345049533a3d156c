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

//! The transport boundary.
//!
//! This crate does not implement any wire protocol. Transports implement the
//! [Transport] trait, and the call stack dispatches each call to the method
//! matching its [CallType].

use crate::Result;
use crate::call::{Call, CallType, Response};
use crate::error::Error;
use crate::error::rpc::{Code, Status};
use crate::options::CallOptions;

/// Sends calls to the service.
///
/// Transports receive the options that survive the
/// [option filter][crate::call_stack::OptionsFilterMiddleware], including the
/// request headers and the timeout for the attempt. Transports should return
/// [Error::service] for errors reported by the service, so the retry loop can
/// use their status code.
#[async_trait::async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Sends a unary call.
    async fn start_unary_call(&self, call: &Call, options: CallOptions) -> Result<Response>;

    /// Starts a call returning a stream of responses.
    async fn start_server_streaming_call(
        &self,
        call: &Call,
        _options: CallOptions,
    ) -> Result<Response> {
        Err(unimplemented(call))
    }

    /// Starts a call sending a stream of requests.
    async fn start_client_streaming_call(
        &self,
        call: &Call,
        _options: CallOptions,
    ) -> Result<Response> {
        Err(unimplemented(call))
    }

    /// Starts a call with streams in both directions.
    async fn start_bidi_streaming_call(
        &self,
        call: &Call,
        _options: CallOptions,
    ) -> Result<Response> {
        Err(unimplemented(call))
    }
}

/// Sends `call` using the transport method for its call type.
///
/// Paginated and long-running calls are unary calls on the wire.
pub async fn dispatch(
    transport: &dyn Transport,
    call: &Call,
    options: CallOptions,
) -> Result<Response> {
    match call.call_type() {
        CallType::Unary | CallType::Paginated | CallType::LongRunning => {
            transport.start_unary_call(call, options).await
        }
        CallType::ServerStreaming => transport.start_server_streaming_call(call, options).await,
        CallType::ClientStreaming => transport.start_client_streaming_call(call, options).await,
        CallType::BidiStreaming => transport.start_bidi_streaming_call(call, options).await,
    }
}

fn unimplemented(call: &Call) -> Error {
    Error::service(
        Status::default()
            .set_code(Code::Unimplemented)
            .set_message(format!(
                "the transport does not support {} calls, method {}",
                call.call_type(),
                call.method()
            )),
    )
}
