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

//! Resolve Google Cloud credentials from a connection string.
//!
//! Tools that connect to Google Cloud services often receive a
//! connection string, such as `bigquery://my-project/my-dataset`. This crate
//! finds the credentials for such a connection, consulting, in order:
//!
//! 1. a base64 encoded JSON credential document in the `credentials` query
//!    parameter of the connection string,
//! 2. a JSON credential document (as-is or base64 encoded) in the
//!    `GCPUTIL_GOOGLE_APPLICATION_CREDENTIALS` environment variable,
//! 3. the [Application Default Credentials] of the environment.
//!
//! The [resolver::Resolver] returns live [credentials::Credentials], which
//! mint access tokens, together with a [context::CredentialContext]: the
//! project, client and key metadata found in the JSON document.
//!
//! [Authentication methods at Google] is a good introduction on the topic of
//! authentication for Google Cloud services, and describes the common
//! terminology used with authentication, such as [Principals], [Tokens], and
//! [Credentials].
//!
//! [Application Default Credentials]: https://cloud.google.com/docs/authentication/application-default-credentials
//! [Authentication methods at Google]: https://cloud.google.com/docs/authentication
//! [Principals]: https://cloud.google.com/docs/authentication#principal
//! [Tokens]: https://cloud.google.com/docs/authentication#token
//! [Credentials]: https://cloud.google.com/docs/authentication#credentials

pub mod build_errors;
pub mod context;

/// Types and functions to work with Google Cloud authentication [Credentials].
///
/// [Credentials]: https://cloud.google.com/docs/authentication#credentials
pub mod credentials;

pub mod discovery;
pub mod environment;
pub mod errors;
pub mod loader;
pub mod resolve_errors;
pub mod resolver;
pub mod token;

mod constants;
pub use constants::{CREDENTIALS_ENV_VAR, CREDENTIALS_QUERY_PARAM};

pub(crate) mod headers_util;

/// The token cache
pub(crate) mod token_cache;
