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

//! [Service Account] Credentials type.
//!
//! A service account key is a JSON document in the format described by
//! [aip/4112]. It contains the service account email and an RSA private key.
//! Treat it like an unencrypted password.
//!
//! The credentials in this module use [Self-signed JWTs] to bypass the
//! intermediate step of exchanging client assertions for OAuth tokens.
//!
//! ```
//! # use gcputil_auth::credentials::service_account::Builder;
//! let key = serde_json::json!({
//!     "type": "service_account",
//!     "client_email": "test-client-email",
//!     "private_key_id": "test-private-key-id",
//!     "private_key": "", // <-- Provide a PKCS#8 PEM key here
//!     "project_id": "test-project-id",
//! });
//! let credentials = Builder::new(key)
//!     .with_scopes(["https://www.googleapis.com/auth/bigquery"])
//!     .build()?;
//! # Ok::<(), gcputil_auth::build_errors::Error>(())
//! ```
//!
//! [aip/4112]: https://google.aip.dev/auth/4112
//! [Self-signed JWTs]: https://google.aip.dev/auth/4111
//! [Service Account]: https://cloud.google.com/iam/docs/service-account-creds

mod jws;

use crate::build_errors::Error as BuildError;
use crate::constants::DEFAULT_SCOPE;
use crate::credentials::dynamic::CredentialsProvider;
use crate::credentials::{Credentials, Result};
use crate::errors::{self, CredentialsError};
use crate::headers_util::build_bearer_headers;
use crate::token::{Token, TokenProvider};
use crate::token_cache::TokenCache;
use base64::prelude::{BASE64_URL_SAFE_NO_PAD, Engine as _};
use http::HeaderMap;
use jws::{CLOCK_SKEW_FUDGE, DEFAULT_TOKEN_TIMEOUT, JwsClaims, JwsHeader};
use rustls::crypto::CryptoProvider;
use rustls::sign::Signer;
use rustls_pemfile::Item;
use serde_json::Value;
use time::OffsetDateTime;
use tokio::time::Instant;

/// Creates service account [Credentials] from a JSON key.
pub struct Builder {
    service_account_key: Value,
    scopes: Option<Vec<String>>,
    audience: Option<String>,
    quota_project_id: Option<String>,
}

impl Builder {
    /// Creates a builder from a service account key in [aip/4112] format.
    ///
    /// [aip/4112]: https://google.aip.dev/auth/4112
    pub fn new(service_account_key: Value) -> Self {
        Self {
            service_account_key,
            scopes: None,
            audience: None,
            quota_project_id: None,
        }
    }

    /// Sets the [scopes] requested for the tokens.
    ///
    /// If neither scopes nor an audience are set, the tokens use the
    /// `https://www.googleapis.com/auth/cloud-platform` scope.
    ///
    /// [scopes]: https://developers.google.com/identity/protocols/oauth2/scopes
    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = Some(scopes.into_iter().map(|s| s.into()).collect());
        self
    }

    /// Sets the audience for the tokens, for example
    /// `https://pubsub.googleapis.com/`.
    ///
    /// An audience takes precedence over the scopes.
    pub fn with_audience<S: Into<String>>(mut self, audience: S) -> Self {
        self.audience = Some(audience.into());
        self
    }

    /// Sets the [quota project] for these credentials.
    ///
    /// [quota project]: https://cloud.google.com/docs/quotas/quota-project
    pub fn with_quota_project_id<S: Into<String>>(mut self, quota_project_id: S) -> Self {
        self.quota_project_id = Some(quota_project_id.into());
        self
    }

    /// Returns a [Credentials] instance with the configured settings.
    ///
    /// # Errors
    ///
    /// Returns a parsing error if the key is not a valid service account
    /// key. The private key itself is only parsed when a token is minted.
    pub fn build(self) -> std::result::Result<Credentials, BuildError> {
        let service_account_key =
            serde_json::from_value::<ServiceAccountKey>(self.service_account_key)
                .map_err(BuildError::parsing)?;
        let scopes = match (&self.audience, self.scopes) {
            (Some(_), _) => None,
            (None, Some(scopes)) if !scopes.is_empty() => Some(scopes.join(" ")),
            (None, _) => Some(DEFAULT_SCOPE.to_string()),
        };
        let token_provider = ServiceAccountTokenProvider {
            service_account_key,
            scopes,
            audience: self.audience,
        };
        Ok(Credentials::from(ServiceAccountCredentials {
            token_provider: TokenCache::new(token_provider),
            quota_project_id: self.quota_project_id,
        }))
    }
}

/// A service account key, as described in [aip/4112].
///
/// [aip/4112]: https://google.aip.dev/auth/4112
#[derive(serde::Deserialize, Default, Clone)]
struct ServiceAccountKey {
    client_email: String,
    #[serde(default)]
    private_key_id: String,
    private_key: String,
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .field("private_key", &"[censored]")
            .finish()
    }
}

#[derive(Debug)]
struct ServiceAccountCredentials<T>
where
    T: TokenProvider,
{
    token_provider: T,
    quota_project_id: Option<String>,
}

#[async_trait::async_trait]
impl<T> CredentialsProvider for ServiceAccountCredentials<T>
where
    T: TokenProvider,
{
    async fn token(&self) -> Result<Token> {
        self.token_provider.token().await
    }

    async fn headers(&self) -> Result<HeaderMap> {
        let token = self.token().await?;
        build_bearer_headers(&token, &self.quota_project_id)
    }
}

#[derive(Debug)]
struct ServiceAccountTokenProvider {
    service_account_key: ServiceAccountKey,
    scopes: Option<String>,
    audience: Option<String>,
}

#[async_trait::async_trait]
impl TokenProvider for ServiceAccountTokenProvider {
    async fn token(&self) -> Result<Token> {
        let signer = signer(&self.service_account_key.private_key)?;

        // The claims encode a unix timestamp, the cache uses an `Instant`.
        let expires_at = Instant::now() - CLOCK_SKEW_FUDGE + DEFAULT_TOKEN_TIMEOUT;
        let iat = OffsetDateTime::now_utc() - CLOCK_SKEW_FUDGE;
        let key = &self.service_account_key;
        let claims = JwsClaims {
            iss: &key.client_email,
            scope: self.scopes.as_deref(),
            aud: self.audience.as_deref(),
            exp: iat + DEFAULT_TOKEN_TIMEOUT,
            iat,
            sub: &key.client_email,
        };
        let header = JwsHeader {
            alg: "RS256",
            typ: "JWT",
            kid: &key.private_key_id,
        };
        let encoded = format!("{}.{}", header.encode()?, claims.encode()?);
        let sig = signer
            .sign(encoded.as_bytes())
            .map_err(errors::permanent)?;

        Ok(Token {
            token: format!("{encoded}.{}", BASE64_URL_SAFE_NO_PAD.encode(sig)),
            token_type: "Bearer".to_string(),
            expires_at: Some(expires_at),
            metadata: None,
        })
    }
}

// Creates a signer using the private key stored in the service account key.
fn signer(private_key: &str) -> Result<Box<dyn Signer>> {
    let key_provider = CryptoProvider::get_default().map_or_else(
        || rustls::crypto::ring::default_provider().key_provider,
        |p| p.key_provider,
    );

    let item = rustls_pemfile::read_one(&mut private_key.as_bytes())
        .map_err(errors::permanent)?
        .ok_or_else(|| errors::permanent_from_msg("missing PEM section in service account key"))?;
    let key = match item {
        Item::Pkcs8Key(key) => key_provider
            .load_private_key(key.into())
            .map_err(errors::permanent)?,
        other => return Err(unexpected_private_key_error(other)),
    };
    key.choose_scheme(&[rustls::SignatureScheme::RSA_PKCS1_SHA256])
        .ok_or_else(|| {
            errors::permanent_from_msg(
                "the service account key does not support the RSA_PKCS1_SHA256 signing scheme",
            )
        })
}

fn unexpected_private_key_error(item: Item) -> CredentialsError {
    errors::permanent_from_msg(format!(
        "expected key to be in form of PKCS8, found {item:?}"
    ))
}
