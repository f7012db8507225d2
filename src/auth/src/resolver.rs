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

//! Resolve [Credentials] from a connection string.
//!
//! The [Resolver] consults three sources, in order, and uses the first one
//! that applies:
//!
//! 1. The `credentials` query parameter of the connection string, holding
//!    a base64 encoded JSON credential document.
//! 2. The `GCPUTIL_GOOGLE_APPLICATION_CREDENTIALS` environment variable,
//!    holding a JSON credential document, either as-is or base64 encoded.
//! 3. [Application Default Credentials], discovered from the environment.
//!
//! Along with the credentials the resolver returns a [CredentialContext],
//! the metadata found in the JSON document. Credentials without a JSON
//! document, such as those from the metadata service, have an empty context.
//!
//! ```no_run
//! # use gcputil_auth::resolver::Resolver;
//! # tokio_test::block_on(async {
//! let resolver = Resolver::default();
//! let (credentials, context) = resolver
//!     .resolve(
//!         "bigquery://my-project/my-dataset",
//!         ["https://www.googleapis.com/auth/bigquery"],
//!     )
//!     .await?;
//! println!("project: {}", context.project_id);
//! let headers = credentials.headers().await?;
//! # Ok::<(), anyhow::Error>(())
//! # });
//! ```
//!
//! [Application Default Credentials]: https://cloud.google.com/docs/authentication/application-default-credentials

mod strategy;

pub use strategy::{AmbientStrategy, EnvironmentVariableStrategy, QueryParameterStrategy, Strategy};

use crate::context::CredentialContext;
use crate::credentials::Credentials;
use crate::discovery::{DefaultDiscovery, DiscoverCredentials};
use crate::environment::{Environment, ProcessEnvironment};
use crate::loader::{JsonLoader, LoadCredentials};
use crate::resolve_errors::Error;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// A `Result` alias where the `Err` case is [resolve_errors::Error](Error).
pub type Result<T> = std::result::Result<T, Error>;

// Connection strings are parsed relative to this base, so query-only
// references such as `?credentials=...` are accepted.
const PLACEHOLDER_BASE: &str = "gcputil:///";

/// The sources of credentials consulted by the [Resolver].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CredentialSource {
    /// The `credentials` query parameter of the connection string.
    QueryParameter,
    /// The `GCPUTIL_GOOGLE_APPLICATION_CREDENTIALS` environment variable.
    EnvironmentVariable,
    /// Credentials discovered from the environment.
    Ambient,
}

impl std::fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::QueryParameter => write!(f, "`credentials` query parameter"),
            Self::EnvironmentVariable => write!(
                f,
                "{} environment variable",
                crate::constants::CREDENTIALS_ENV_VAR
            ),
            Self::Ambient => write!(f, "application default credentials"),
        }
    }
}

/// Resolves credentials from a connection string.
///
/// Resolvers are cheap to clone, and concurrent calls to
/// [resolve](Resolver::resolve) are independent.
#[derive(Clone, Debug)]
pub struct Resolver {
    strategies: Vec<Arc<dyn Strategy>>,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Resolver {
    /// Returns a builder to configure a resolver.
    pub fn builder() -> Builder {
        Builder::default()
    }

    /// The credential sources consulted, in order.
    pub fn sources(&self) -> Vec<CredentialSource> {
        self.strategies.iter().map(|s| s.source()).collect()
    }

    /// Resolves the credentials for `connection_string`.
    ///
    /// The `scopes` are requested for the access tokens. The first source
    /// that applies wins, and its errors are returned as-is: the resolver
    /// never falls back to the next source after a failure.
    ///
    /// # Errors
    ///
    /// * [invalid input](Error::is_invalid_input) if the connection string
    ///   is not a valid URL. Parsing follows the WHATWG URL rules, which are
    ///   stricter than some URL parsers: for example, a port outside
    ///   `0..=65535` is rejected.
    /// * [decode failed](Error::is_decode_failed) if the query parameter or
    ///   the environment variable is malformed base64.
    /// * [credential parse](Error::is_credential_parse) if the credentials
    ///   cannot be loaded, discovery fails, or the JSON document is
    ///   malformed.
    /// * [unauthorized](Error::is_unauthorized) if no source applies.
    pub async fn resolve<I, S>(
        &self,
        connection_string: &str,
        scopes: I,
    ) -> Result<(Credentials, CredentialContext)>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let scopes: Vec<String> = scopes.into_iter().map(Into::into).collect();
        let connection = parse_connection_string(connection_string)?;
        for strategy in &self.strategies {
            let source = strategy.source();
            let credentials = strategy
                .credentials(&connection, &scopes)
                .await
                .map_err(|e| e.with_origin(source))?;
            let Some(credentials) = credentials else {
                tracing::debug!(%source, "credential source does not apply");
                continue;
            };
            tracing::debug!(%source, "resolved credentials");
            let context = CredentialContext::from_json(credentials.json().unwrap_or_default())
                .map_err(|e| Error::credential_parse(e).with_origin(source))?;
            return Ok((credentials, context));
        }
        Err(Error::unauthorized())
    }
}

fn parse_connection_string(connection_string: &str) -> Result<Url> {
    let base = Url::parse(PLACEHOLDER_BASE).map_err(Error::invalid_input)?;
    base.join(connection_string).map_err(Error::invalid_input)
}

/// Configures a [Resolver].
///
/// ```
/// # use gcputil_auth::resolver::{CredentialSource, Resolver};
/// # use gcputil_auth::environment::StaticEnvironment;
/// # use std::time::Duration;
/// let resolver = Resolver::builder()
///     .with_environment(StaticEnvironment::default())
///     .with_timeout(Duration::from_secs(10))
///     .build();
/// assert_eq!(
///     resolver.sources(),
///     [
///         CredentialSource::QueryParameter,
///         CredentialSource::EnvironmentVariable,
///         CredentialSource::Ambient,
///     ]
/// );
/// ```
#[derive(Debug, Default)]
pub struct Builder {
    env: Option<Arc<dyn Environment>>,
    loader: Option<Arc<dyn LoadCredentials>>,
    discovery: Option<Arc<dyn DiscoverCredentials>>,
    timeout: Option<Duration>,
    strategies: Option<Vec<Arc<dyn Strategy>>>,
}

impl Builder {
    /// Sets the [Environment] used to look up variables.
    ///
    /// Defaults to [ProcessEnvironment]. The default discovery also uses
    /// this environment.
    pub fn with_environment<E: Environment + 'static>(mut self, env: E) -> Self {
        self.env = Some(Arc::new(env));
        self
    }

    /// Sets the loader for JSON credential documents.
    ///
    /// Defaults to [JsonLoader].
    pub fn with_loader<L: LoadCredentials + 'static>(mut self, loader: L) -> Self {
        self.loader = Some(Arc::new(loader));
        self
    }

    /// Sets the discovery of ambient credentials.
    ///
    /// Defaults to [DefaultDiscovery], configured with the same environment
    /// and loader as the resolver.
    pub fn with_discovery<D: DiscoverCredentials + 'static>(mut self, discovery: D) -> Self {
        self.discovery = Some(Arc::new(discovery));
        self
    }

    /// Bounds the time spent loading or discovering credentials.
    ///
    /// By default there is no bound. Dropping the future returned by
    /// [Resolver::resolve] cancels the resolution in either case.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Replaces the resolution chain.
    ///
    /// The strategies are consulted in order. This overrides the chain built
    /// from the environment, loader, discovery and timeout settings.
    pub fn with_strategies<I>(mut self, strategies: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn Strategy>>,
    {
        self.strategies = Some(strategies.into_iter().collect());
        self
    }

    /// Returns the configured [Resolver].
    pub fn build(self) -> Resolver {
        if let Some(strategies) = self.strategies {
            return Resolver { strategies };
        }
        let env = self.env.unwrap_or_else(|| Arc::new(ProcessEnvironment));
        let loader = self.loader.unwrap_or_else(|| Arc::new(JsonLoader));
        let discovery = self.discovery.unwrap_or_else(|| {
            Arc::new(
                DefaultDiscovery::builder()
                    .with_shared_environment(env.clone())
                    .with_shared_loader(loader.clone())
                    .build(),
            )
        });
        let strategies: Vec<Arc<dyn Strategy>> = vec![
            Arc::new(QueryParameterStrategy::new(loader.clone(), self.timeout)),
            Arc::new(EnvironmentVariableStrategy::new(
                env,
                loader,
                self.timeout,
            )),
            Arc::new(AmbientStrategy::new(discovery, self.timeout)),
        ];
        Resolver { strategies }
    }
}
