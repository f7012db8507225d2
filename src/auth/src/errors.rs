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

//! Errors returned while using [Credentials] to mint tokens.
//!
//! [Credentials]: crate::credentials::Credentials

use http::StatusCode;
use std::error::Error;
use std::sync::Arc;

/// Represents an error using [Credentials](crate::credentials::Credentials).
///
/// The library never retries. The [is_transient](Self::is_transient) flag
/// lets the application decide whether a later attempt may succeed.
#[derive(Clone, Debug, thiserror::Error)]
#[error("cannot create access token, {}, source: {source}", transience_msg(*.is_transient))]
pub struct CredentialsError {
    is_transient: bool,
    #[source]
    source: SourceImpl,
}

#[derive(Clone, Debug, thiserror::Error)]
enum SourceImpl {
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Source(Arc<dyn Error + Send + Sync>),
}

const TRANSIENT_MSG: &str = "but future attempts may succeed";
const PERMANENT_MSG: &str = "and future attempts will not succeed";

fn transience_msg(is_transient: bool) -> &'static str {
    if is_transient {
        TRANSIENT_MSG
    } else {
        PERMANENT_MSG
    }
}

impl CredentialsError {
    /// Creates a new error wrapping `source`.
    pub fn from_source<T: Error + Send + Sync + 'static>(is_transient: bool, source: T) -> Self {
        CredentialsError {
            is_transient,
            source: SourceImpl::Source(Arc::new(source)),
        }
    }

    /// Creates a new error from a message.
    pub fn from_msg<T: Into<String>>(is_transient: bool, message: T) -> Self {
        CredentialsError {
            is_transient,
            source: SourceImpl::Message(message.into()),
        }
    }

    /// Returns `true` if a future attempt may succeed.
    pub fn is_transient(&self) -> bool {
        self.is_transient
    }
}

pub(crate) fn transient<T: Error + Send + Sync + 'static>(source: T) -> CredentialsError {
    CredentialsError::from_source(true, source)
}

pub(crate) fn permanent<T: Error + Send + Sync + 'static>(source: T) -> CredentialsError {
    CredentialsError::from_source(false, source)
}

pub(crate) fn permanent_from_msg<T: Into<String>>(message: T) -> CredentialsError {
    CredentialsError::from_msg(false, message)
}

/// Classifies HTTP status codes returned by token endpoints.
pub(crate) fn is_transient(c: StatusCode) -> bool {
    matches!(
        c,
        StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::REQUEST_TIMEOUT
            | StatusCode::TOO_MANY_REQUESTS
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(StatusCode::INTERNAL_SERVER_ERROR)]
    #[test_case(StatusCode::SERVICE_UNAVAILABLE)]
    #[test_case(StatusCode::REQUEST_TIMEOUT)]
    #[test_case(StatusCode::TOO_MANY_REQUESTS)]
    fn transient_status(c: StatusCode) {
        assert!(is_transient(c));
    }

    #[test_case(StatusCode::NOT_FOUND)]
    #[test_case(StatusCode::UNAUTHORIZED)]
    #[test_case(StatusCode::BAD_REQUEST)]
    #[test_case(StatusCode::BAD_GATEWAY)]
    fn permanent_status(c: StatusCode) {
        assert!(!is_transient(c));
    }

    #[test]
    fn fmt() {
        let e = CredentialsError::from_msg(true, "test-only-err-123");
        let got = format!("{e}");
        assert!(got.contains("test-only-err-123"), "{got}");
        assert!(got.contains(TRANSIENT_MSG), "{got}");
        assert!(e.is_transient(), "{e:?}");

        let e = permanent_from_msg("test-only-err-123");
        let got = format!("{e}");
        assert!(got.contains("test-only-err-123"), "{got}");
        assert!(got.contains(PERMANENT_MSG), "{got}");
        assert!(!e.is_transient(), "{e:?}");
    }

    #[test]
    fn source() {
        let io = std::io::Error::other("test-only-io");
        let e = transient(io);
        assert!(e.is_transient());
        let source = e.source().expect("the error should have a source");
        assert!(source.to_string().contains("test-only-io"), "{source}");
    }
}
