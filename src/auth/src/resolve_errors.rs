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

//! Errors returned by the [Resolver](crate::resolver::Resolver).
//!
//! The taxonomy is flat: every failure is terminal, and no partial results
//! are produced. Use the `is_*()` predicates to classify an error, and
//! [source_kind](Error::source_kind) to find which credential source failed.

use crate::build_errors::BoxError;
use crate::resolver::CredentialSource;

/// The error type for [Resolver::resolve](crate::resolver::Resolver::resolve).
#[derive(thiserror::Error, Debug)]
#[error("{kind}{}", origin_suffix(.origin))]
pub struct Error {
    #[source]
    kind: ErrorKind,
    origin: Option<CredentialSource>,
}

fn origin_suffix(origin: &Option<CredentialSource>) -> String {
    origin
        .map(|o| format!(" (credential source: {o})"))
        .unwrap_or_default()
}

impl Error {
    /// The connection string is not a valid URL.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self.kind, ErrorKind::InvalidInput(_))
    }

    /// A base64 credential payload is malformed.
    pub fn is_decode_failed(&self) -> bool {
        matches!(self.kind, ErrorKind::DecodeFailed(_))
    }

    /// The credential JSON was rejected, the ambient discovery failed, or
    /// the credential metadata is malformed.
    pub fn is_credential_parse(&self) -> bool {
        matches!(self.kind, ErrorKind::CredentialParse(_))
    }

    /// No credential source produced credentials.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self.kind, ErrorKind::Unauthorized)
    }

    /// The credential source that produced this error, if any.
    pub fn source_kind(&self) -> Option<CredentialSource> {
        self.origin
    }

    /// Creates an error for a connection string that cannot be parsed.
    pub fn invalid_input<T: Into<BoxError>>(source: T) -> Self {
        Self::new(ErrorKind::InvalidInput(source.into()))
    }

    /// Creates an error for a malformed base64 payload.
    pub fn decode_failed<T: Into<BoxError>>(source: T) -> Self {
        Self::new(ErrorKind::DecodeFailed(source.into()))
    }

    /// Creates an error for credentials that cannot be loaded or parsed.
    ///
    /// Custom [Strategy](crate::resolver::Strategy) implementations use this
    /// to report failures of their credential source.
    pub fn credential_parse<T: Into<BoxError>>(source: T) -> Self {
        Self::new(ErrorKind::CredentialParse(source.into()))
    }

    /// Creates an error for a resolution where no source applied.
    pub fn unauthorized() -> Self {
        Self::new(ErrorKind::Unauthorized)
    }

    /// Annotates the error with the credential source that produced it.
    pub fn with_origin(mut self, origin: CredentialSource) -> Self {
        self.origin = Some(origin);
        self
    }

    fn new(kind: ErrorKind) -> Self {
        Self { kind, origin: None }
    }
}

#[derive(thiserror::Error, Debug)]
enum ErrorKind {
    #[error("the connection string is not a valid URL: {0}")]
    InvalidInput(#[source] BoxError),
    #[error("cannot decode the base64 credentials: {0}")]
    DecodeFailed(#[source] BoxError),
    #[error("cannot parse the credentials: {0}")]
    CredentialParse(#[source] BoxError),
    #[error("unauthorized, no credentials were found")]
    Unauthorized,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn constructors() {
        let error = Error::invalid_input("test message");
        assert!(error.is_invalid_input(), "{error:?}");
        assert!(error.source().is_some(), "{error:?}");
        assert!(error.to_string().contains("test message"), "{error}");
        assert_eq!(error.source_kind(), None);

        let error = Error::decode_failed("test message");
        assert!(error.is_decode_failed(), "{error:?}");
        assert!(error.to_string().contains("test message"), "{error}");

        let error = Error::credential_parse("test message");
        assert!(error.is_credential_parse(), "{error:?}");
        assert!(error.to_string().contains("test message"), "{error}");

        let error = Error::unauthorized();
        assert!(error.is_unauthorized(), "{error:?}");
        assert!(!error.is_credential_parse(), "{error:?}");
        assert!(error.to_string().contains("unauthorized"), "{error}");
    }

    #[test]
    fn origin() {
        let error = Error::decode_failed("test message")
            .with_origin(CredentialSource::EnvironmentVariable);
        assert_eq!(
            error.source_kind(),
            Some(CredentialSource::EnvironmentVariable)
        );
        let got = error.to_string();
        assert!(got.contains("test message"), "{got}");
        assert!(got.contains("environment variable"), "{got}");
    }
}
