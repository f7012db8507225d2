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

pub mod mds;
pub mod service_account;
pub mod user_account;

use crate::errors::CredentialsError;
use crate::token::Token;
use bytes::Bytes;
use http::HeaderMap;
use std::sync::Arc;

/// A `Result` alias where the `Err` case is [CredentialsError].
pub type Result<T> = std::result::Result<T, CredentialsError>;

/// An implementation of [crate::credentials::dynamic::CredentialsProvider].
///
/// Represents live, usable [Credentials]: they mint access tokens and the
/// HTTP headers carrying them.
///
/// `Credentials` are cheap to clone: all clones share the same token cache.
/// They also keep the raw JSON they were loaded from, if any. Credentials
/// backed by the metadata server have no JSON.
///
/// [Credentials]: https://cloud.google.com/docs/authentication#credentials
#[derive(Clone)]
pub struct Credentials {
    inner: Arc<dyn dynamic::CredentialsProvider>,
    json: Option<Bytes>,
}

// The raw JSON may contain secrets, only its size is printed.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("inner", &self.inner)
            .field("json_len", &self.json.as_ref().map(Bytes::len))
            .finish()
    }
}

impl<T> From<T> for Credentials
where
    T: dynamic::CredentialsProvider + Send + Sync + 'static,
{
    fn from(value: T) -> Self {
        Self {
            inner: Arc::new(value),
            json: None,
        }
    }
}

impl Credentials {
    /// Returns a valid access token, refreshing it if needed.
    pub async fn token(&self) -> Result<Token> {
        self.inner.token().await
    }

    /// Returns the HTTP headers that authenticate a request.
    pub async fn headers(&self) -> Result<HeaderMap> {
        self.inner.headers().await
    }

    /// Returns the raw JSON these credentials were created from.
    ///
    /// Returns `None` if the credentials were not created from JSON, for
    /// example, credentials backed by the metadata server.
    pub fn json(&self) -> Option<&[u8]> {
        self.json.as_deref()
    }

    /// Attaches the raw JSON these credentials were created from.
    pub fn with_json<B: Into<Bytes>>(mut self, json: B) -> Self {
        self.json = Some(json.into());
        self
    }
}

pub mod dynamic {
    use super::Result;
    use crate::token::Token;
    use http::HeaderMap;

    /// A trait to implement custom credentials.
    ///
    /// Most applications use the credentials returned by the
    /// [Resolver](crate::resolver::Resolver). Implement this trait to inject
    /// your own credentials, for example from a custom
    /// [LoadCredentials](crate::loader::LoadCredentials) in tests.
    #[async_trait::async_trait]
    pub trait CredentialsProvider: std::fmt::Debug + Send + Sync {
        /// Asynchronously retrieves a token.
        async fn token(&self) -> Result<Token>;

        /// Asynchronously constructs the auth headers.
        async fn headers(&self) -> Result<HeaderMap>;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::permanent_from_msg;
    use http::header::{AUTHORIZATION, HeaderValue};

    mockall::mock! {
        #[derive(Debug)]
        pub Provider {}

        #[async_trait::async_trait]
        impl dynamic::CredentialsProvider for Provider {
            async fn token(&self) -> Result<Token>;
            async fn headers(&self) -> Result<HeaderMap>;
        }
    }

    #[tokio::test]
    async fn delegates_token() {
        let mut mock = MockProvider::new();
        mock.expect_token().times(1).return_once(|| {
            Ok(Token {
                token: "test-token".to_string(),
                token_type: "Bearer".to_string(),
                expires_at: None,
                metadata: None,
            })
        });
        let creds = Credentials::from(mock);
        let token = creds.token().await.unwrap();
        assert_eq!(token.token, "test-token");
        assert_eq!(creds.json(), None);
    }

    #[tokio::test]
    async fn delegates_headers() {
        let mut mock = MockProvider::new();
        mock.expect_headers().times(1).return_once(|| {
            let mut headers = HeaderMap::new();
            headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer test"));
            Ok(headers)
        });
        mock.expect_token()
            .never()
            .returning(|| Err(permanent_from_msg("unused")));
        let creds = Credentials::from(mock);
        let headers = creds.headers().await.unwrap();
        assert_eq!(
            headers.get(AUTHORIZATION),
            Some(&HeaderValue::from_static("Bearer test"))
        );
    }

    #[test]
    fn json_is_shared_by_clones() {
        let creds = Credentials::from(MockProvider::new()).with_json(r#"{"type":"test"}"#);
        let clone = creds.clone();
        assert_eq!(clone.json(), Some(r#"{"type":"test"}"#.as_bytes()));
        assert_eq!(creds.json(), clone.json());
    }

    #[test]
    fn debug_hides_json() {
        let creds = Credentials::from(MockProvider::new()).with_json(r#"{"private_key":"secret"}"#);
        let fmt = format!("{creds:?}");
        assert!(!fmt.contains("secret"), "{fmt}");
        assert!(fmt.contains("json_len"), "{fmt}");
    }
}
