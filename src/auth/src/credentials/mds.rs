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

//! [Metadata Service] Credentials type.
//!
//! Google Cloud environments such as [Google Compute Engine (GCE)][gce-link],
//! [Google Kubernetes Engine (GKE)][gke-link], or [Cloud Run] provide a
//! metadata service. The service returns access tokens for the
//! [default service account] of the VM (or pod), so no secrets need to be
//! downloaded.
//!
//! Credentials of this type have no JSON document, so
//! [Credentials::json][crate::credentials::Credentials::json] returns `None`.
//!
//! ```
//! # use gcputil_auth::credentials::mds::Builder;
//! let credentials = Builder::default()
//!     .with_quota_project_id("my-quota-project")
//!     .build();
//! assert!(credentials.json().is_none());
//! ```
//!
//! [Cloud Run]: https://cloud.google.com/run
//! [default service account]: https://cloud.google.com/iam/docs/service-account-types#default
//! [gce-link]: https://cloud.google.com/products/compute
//! [gke-link]: https://cloud.google.com/kubernetes-engine
//! [Metadata Service]: https://cloud.google.com/compute/docs/metadata/overview

use crate::constants::{METADATA_FLAVOR, METADATA_FLAVOR_VALUE, METADATA_ROOT};
use crate::credentials::dynamic::CredentialsProvider;
use crate::credentials::{Credentials, Result};
use crate::errors::{self, CredentialsError, is_transient};
use crate::headers_util::build_bearer_headers;
use crate::token::{Token, TokenProvider};
use crate::token_cache::TokenCache;
use http::HeaderMap;
use http::header::HeaderValue;
use reqwest::Client;
use std::time::Duration;
use tokio::time::Instant;

const MDS_TOKEN_PATH: &str = "/computeMetadata/v1/instance/service-accounts/default/token";

/// Creates [Credentials] backed by the metadata service.
#[derive(Debug, Default)]
pub struct Builder {
    endpoint: Option<String>,
    scopes: Option<Vec<String>>,
    quota_project_id: Option<String>,
}

impl Builder {
    /// Sets the endpoint for the metadata service.
    ///
    /// Defaults to `http://metadata.google.internal`.
    pub fn with_endpoint<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Sets the [scopes] requested for the tokens.
    ///
    /// If not set, the metadata service returns tokens with the scopes
    /// configured for the VM.
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

    /// Sets the [quota project] for these credentials.
    ///
    /// [quota project]: https://cloud.google.com/docs/quotas/quota-project
    pub fn with_quota_project_id<S: Into<String>>(mut self, quota_project_id: S) -> Self {
        self.quota_project_id = Some(quota_project_id.into());
        self
    }

    /// Returns a [Credentials] instance with the configured settings.
    ///
    /// No requests are made until the first token is needed.
    pub fn build(self) -> Credentials {
        let endpoint = self
            .endpoint
            .unwrap_or_else(|| METADATA_ROOT.to_string())
            .trim_end_matches('/')
            .to_string();
        let token_provider = MdsTokenProvider {
            endpoint,
            scopes: self.scopes.filter(|s| !s.is_empty()).map(|s| s.join(",")),
        };
        Credentials::from(MdsCredentials {
            token_provider: TokenCache::new(token_provider),
            quota_project_id: self.quota_project_id,
        })
    }
}

#[derive(Debug)]
struct MdsCredentials<T>
where
    T: TokenProvider,
{
    token_provider: T,
    quota_project_id: Option<String>,
}

#[async_trait::async_trait]
impl<T> CredentialsProvider for MdsCredentials<T>
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

#[derive(Debug, serde::Deserialize)]
struct MdsTokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
    token_type: String,
}

#[derive(Debug)]
struct MdsTokenProvider {
    endpoint: String,
    scopes: Option<String>,
}

#[async_trait::async_trait]
impl TokenProvider for MdsTokenProvider {
    async fn token(&self) -> Result<Token> {
        let request = Client::new()
            .get(format!("{}{MDS_TOKEN_PATH}", self.endpoint))
            .header(
                METADATA_FLAVOR,
                HeaderValue::from_static(METADATA_FLAVOR_VALUE),
            );
        // Without explicit scopes the service uses the scopes of the VM.
        let request = self
            .scopes
            .iter()
            .fold(request, |r, s| r.query(&[("scopes", s)]));

        let response = request.send().await.map_err(errors::transient)?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .map_err(|e| CredentialsError::from_source(is_transient(status), e))?;
            return Err(CredentialsError::from_msg(
                is_transient(status),
                format!("failed to fetch token from the metadata service, status: {status}, body: {body}"),
            ));
        }
        let response = response.json::<MdsTokenResponse>().await.map_err(|e| {
            let transient = !e.is_decode();
            CredentialsError::from_source(transient, e)
        })?;
        Ok(Token {
            token: response.access_token,
            token_type: response.token_type,
            expires_at: response
                .expires_in
                .map(|d| Instant::now() + Duration::from_secs(d)),
            metadata: None,
        })
    }
}
