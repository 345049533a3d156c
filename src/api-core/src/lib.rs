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

//! Google APIs core helpers.
//!
//! This crate contains the pieces shared by generated Google Cloud clients
//! that are not tied to a specific wire transport:
//!
//! - [path_template] parses resource name templates such as
//!   `projects/{project}/locations/{location=**}`, renders resource names from
//!   variable bindings, and extracts the bindings back out of a resource name.
//! - [call_stack] composes the middleware that wraps every remote call:
//!   credentials, fixed headers, retries, and option filtering, plus any
//!   application supplied [Middleware][call_stack::Middleware].
//! - [retry_settings] and [retry_loop] implement truncated exponential
//!   backoff with a hard deadline.
//!
//! Transports and credential sources are external collaborators, represented
//! by the [transport::Transport] and [credentials::CredentialsProvider]
//! traits.

/// An alias of [std::result::Result] where the error is always [crate::error::Error].
///
/// This is the result type used by all functions wrapping RPCs.
pub type Result<T> = std::result::Result<T, crate::error::Error>;

/// The core error types used by generated clients.
pub mod error;

pub mod path_template;

pub mod exponential_backoff;
pub mod retry_loop;
pub mod retry_policy;
pub mod retry_result;
pub mod retry_settings;
pub mod retry_state;

pub mod call;
pub mod call_stack;
pub mod client;
pub mod client_config;
pub mod credentials;
pub mod options;
pub mod transport;

/// Implements helpers to create telemetry headers.
pub mod api_header;
