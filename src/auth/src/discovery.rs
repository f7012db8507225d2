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

//! Discovery of [Application Default Credentials] (ADC).
//!
//! [DefaultDiscovery] looks for credentials in the following places, and
//! uses the first one it finds:
//!
//! 1. The file named by the `GOOGLE_APPLICATION_CREDENTIALS` environment
//!    variable. If the variable is set the file must exist.
//! 2. The file created by `gcloud auth application-default login`. That is
//!    `$HOME/.config/gcloud/application_default_credentials.json`, or
//!    `%APPDATA%\gcloud\application_default_credentials.json` on Windows.
//! 3. The metadata service, when running on Google Cloud. Discovery assumes
//!    it runs on Google Cloud if `GCE_METADATA_HOST` is set, or if the
//!    metadata service answers a probe.
//!
//! [Application Default Credentials]: https://cloud.google.com/docs/authentication/application-default-credentials

use crate::build_errors::Error as BuildError;
use crate::constants::{
    ADC_ENV_VAR, GCE_METADATA_HOST_ENV_VAR, METADATA_FLAVOR, METADATA_FLAVOR_VALUE, METADATA_ROOT,
    UNIX_HOME_ENV_VAR, WELL_KNOWN_FILE, WINDOWS_APPDATA_ENV_VAR,
};
use crate::credentials::{Credentials, mds};
use crate::environment::{Environment, ProcessEnvironment, non_empty_var};
use crate::loader::{JsonLoader, LoadCredentials, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Finds the credentials of the environment the application runs in.
#[async_trait::async_trait]
pub trait DiscoverCredentials: std::fmt::Debug + Send + Sync {
    /// Returns the default credentials, requesting `scopes` for the tokens.
    async fn discover(&self, scopes: &[String]) -> Result<Credentials>;
}

/// Discovers [Application Default Credentials].
///
/// ```
/// # use gcputil_auth::discovery::DefaultDiscovery;
/// # use gcputil_auth::environment::StaticEnvironment;
/// # use std::time::Duration;
/// let discovery = DefaultDiscovery::builder()
///     .with_environment(StaticEnvironment::default())
///     .with_probe_timeout(Duration::from_millis(500))
///     .build();
/// ```
///
/// [Application Default Credentials]: https://cloud.google.com/docs/authentication/application-default-credentials
#[derive(Clone, Debug)]
pub struct DefaultDiscovery {
    env: Arc<dyn Environment>,
    loader: Arc<dyn LoadCredentials>,
    metadata_endpoint: Option<String>,
    probe_timeout: Duration,
}

impl Default for DefaultDiscovery {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl DefaultDiscovery {
    /// Returns a builder to configure the discovery.
    pub fn builder() -> Builder {
        Builder::default()
    }

    // Returns the contents and path of the first ADC file that applies.
    async fn adc_file(&self) -> Result<Option<(PathBuf, Vec<u8>)>> {
        if let Some(path) = non_empty_var(self.env.as_ref(), ADC_ENV_VAR) {
            let path = PathBuf::from(path);
            let contents = tokio::fs::read(&path).await.map_err(|e| {
                BuildError::loading(format!(
                    "cannot read {}, named by the {ADC_ENV_VAR} environment variable: {e}",
                    path.display()
                ))
            })?;
            return Ok(Some((path, contents)));
        }
        let Some(path) = well_known_file(self.env.as_ref()) else {
            return Ok(None);
        };
        match tokio::fs::read(&path).await {
            Ok(contents) => Ok(Some((path, contents))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(BuildError::loading(format!(
                "cannot read the gcloud credentials file {}: {e}",
                path.display()
            ))),
        }
    }

    fn metadata_endpoint(&self) -> (String, bool) {
        if let Some(endpoint) = &self.metadata_endpoint {
            return (endpoint.clone(), false);
        }
        match non_empty_var(self.env.as_ref(), GCE_METADATA_HOST_ENV_VAR) {
            Some(host) if host.starts_with("http://") || host.starts_with("https://") => {
                (host, true)
            }
            Some(host) => (format!("http://{host}"), true),
            None => (METADATA_ROOT.to_string(), false),
        }
    }

    async fn on_google_cloud(&self, endpoint: &str) -> bool {
        let client = match reqwest::Client::builder()
            .timeout(self.probe_timeout)
            .build()
        {
            Ok(client) => client,
            Err(e) => {
                tracing::warn!("cannot create a client to probe the metadata service: {e}");
                return false;
            }
        };
        let probe = client.get(endpoint).send();
        match tokio::time::timeout(self.probe_timeout, probe).await {
            Ok(Ok(response)) => response
                .headers()
                .get(METADATA_FLAVOR)
                .is_some_and(|v| v == METADATA_FLAVOR_VALUE),
            Ok(Err(e)) => {
                tracing::debug!("metadata service probe failed: {e}");
                false
            }
            Err(_) => {
                tracing::debug!("metadata service probe timed out");
                false
            }
        }
    }
}

#[async_trait::async_trait]
impl DiscoverCredentials for DefaultDiscovery {
    async fn discover(&self, scopes: &[String]) -> Result<Credentials> {
        if let Some((path, contents)) = self.adc_file().await? {
            tracing::debug!(path = %path.display(), "using credentials file");
            return self.loader.load(&contents, scopes).await;
        }

        let (endpoint, from_env) = self.metadata_endpoint();
        if from_env || self.on_google_cloud(&endpoint).await {
            tracing::debug!(%endpoint, "using the metadata service");
            return Ok(mds::Builder::default()
                .with_endpoint(endpoint)
                .with_scopes(scopes.iter().cloned())
                .build());
        }

        tracing::warn!("no application default credentials found");
        Err(BuildError::not_found(format!(
            "set {ADC_ENV_VAR}, run `gcloud auth application-default login`, or run on Google Cloud"
        )))
    }
}

/// Configures a [DefaultDiscovery].
#[derive(Debug)]
pub struct Builder {
    env: Arc<dyn Environment>,
    loader: Arc<dyn LoadCredentials>,
    metadata_endpoint: Option<String>,
    probe_timeout: Duration,
}

impl Default for Builder {
    fn default() -> Self {
        Self {
            env: Arc::new(ProcessEnvironment),
            loader: Arc::new(JsonLoader),
            metadata_endpoint: None,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }
}

impl Builder {
    /// Sets the [Environment] used to look up variables.
    ///
    /// Defaults to [ProcessEnvironment].
    pub fn with_environment<E: Environment + 'static>(mut self, env: E) -> Self {
        self.env = Arc::new(env);
        self
    }

    /// Sets the loader for credential files.
    ///
    /// Defaults to [JsonLoader].
    pub fn with_loader<L: LoadCredentials + 'static>(mut self, loader: L) -> Self {
        self.loader = Arc::new(loader);
        self
    }

    pub(crate) fn with_shared_environment(mut self, env: Arc<dyn Environment>) -> Self {
        self.env = env;
        self
    }

    pub(crate) fn with_shared_loader(mut self, loader: Arc<dyn LoadCredentials>) -> Self {
        self.loader = loader;
        self
    }

    /// Sets the endpoint of the metadata service.
    ///
    /// Setting the endpoint does not skip the probe. Defaults to
    /// `GCE_METADATA_HOST`, if set, or `http://metadata.google.internal`.
    pub fn with_metadata_endpoint<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.metadata_endpoint = Some(endpoint.into());
        self
    }

    /// Bounds the time spent probing the metadata service.
    ///
    /// Defaults to 3 seconds.
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Returns the configured [DefaultDiscovery].
    pub fn build(self) -> DefaultDiscovery {
        DefaultDiscovery {
            env: self.env,
            loader: self.loader,
            metadata_endpoint: self.metadata_endpoint,
            probe_timeout: self.probe_timeout,
        }
    }
}

/// Returns the path of the gcloud credentials file, if it can be computed.
fn well_known_file(env: &dyn Environment) -> Option<PathBuf> {
    if cfg!(windows) {
        let appdata = non_empty_var(env, WINDOWS_APPDATA_ENV_VAR)?;
        Some(well_known_path(Path::new(&appdata).join("gcloud")))
    } else {
        let home = non_empty_var(env, UNIX_HOME_ENV_VAR)?;
        Some(well_known_path(Path::new(&home).join(".config").join("gcloud")))
    }
}

fn well_known_path(dir: PathBuf) -> PathBuf {
    dir.join(WELL_KNOWN_FILE)
}
