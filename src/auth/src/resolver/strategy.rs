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

use super::{CredentialSource, Result};
use crate::build_errors::Error as BuildError;
use crate::constants::{CREDENTIALS_ENV_VAR, CREDENTIALS_QUERY_PARAM};
use crate::credentials::Credentials;
use crate::discovery::DiscoverCredentials;
use crate::environment::{Environment, non_empty_var};
use crate::loader::LoadCredentials;
use crate::resolve_errors::Error;
use base64::prelude::{BASE64_STANDARD, Engine as _};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// One source of credentials in the resolution chain.
///
/// The [Resolver](super::Resolver) tries each strategy in order. A strategy
/// returns `Ok(None)` when its source does not apply, for example when the
/// environment variable is unset, and the resolver moves on to the next one.
/// Any error stops the resolution.
#[async_trait::async_trait]
pub trait Strategy: std::fmt::Debug + Send + Sync {
    /// The source consulted by this strategy.
    fn source(&self) -> CredentialSource;

    /// Returns credentials from this source, or `None` if it does not apply.
    async fn credentials(
        &self,
        connection: &Url,
        scopes: &[String],
    ) -> Result<Option<Credentials>>;
}

/// Loads the base64 credentials in the `credentials` query parameter.
#[derive(Clone, Debug)]
pub struct QueryParameterStrategy {
    loader: Arc<dyn LoadCredentials>,
    timeout: Option<Duration>,
}

impl QueryParameterStrategy {
    pub(crate) fn new(loader: Arc<dyn LoadCredentials>, timeout: Option<Duration>) -> Self {
        Self { loader, timeout }
    }
}

#[async_trait::async_trait]
impl Strategy for QueryParameterStrategy {
    fn source(&self) -> CredentialSource {
        CredentialSource::QueryParameter
    }

    async fn credentials(
        &self,
        connection: &Url,
        scopes: &[String],
    ) -> Result<Option<Credentials>> {
        let Some(encoded) = query_parameter(connection) else {
            return Ok(None);
        };
        let json = decode(&encoded)?;
        bounded(self.timeout, self.loader.load(&json, scopes))
            .await
            .map(Some)
    }
}

/// Loads the credentials in the `GCPUTIL_GOOGLE_APPLICATION_CREDENTIALS`
/// environment variable.
///
/// The value is either the JSON document itself, or its base64 encoding.
#[derive(Clone, Debug)]
pub struct EnvironmentVariableStrategy {
    env: Arc<dyn Environment>,
    loader: Arc<dyn LoadCredentials>,
    timeout: Option<Duration>,
}

impl EnvironmentVariableStrategy {
    pub(crate) fn new(
        env: Arc<dyn Environment>,
        loader: Arc<dyn LoadCredentials>,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            env,
            loader,
            timeout,
        }
    }
}

#[async_trait::async_trait]
impl Strategy for EnvironmentVariableStrategy {
    fn source(&self) -> CredentialSource {
        CredentialSource::EnvironmentVariable
    }

    async fn credentials(
        &self,
        _connection: &Url,
        scopes: &[String],
    ) -> Result<Option<Credentials>> {
        let Some(value) = non_empty_var(self.env.as_ref(), CREDENTIALS_ENV_VAR) else {
            return Ok(None);
        };
        let json = if value.starts_with('{') {
            value.into_bytes()
        } else {
            decode(&value)?
        };
        bounded(self.timeout, self.loader.load(&json, scopes))
            .await
            .map(Some)
    }
}

/// Discovers the credentials of the environment, such as the metadata
/// service on Google Cloud.
///
/// This strategy always applies. Discovery failures are errors.
#[derive(Clone, Debug)]
pub struct AmbientStrategy {
    discovery: Arc<dyn DiscoverCredentials>,
    timeout: Option<Duration>,
}

impl AmbientStrategy {
    pub(crate) fn new(discovery: Arc<dyn DiscoverCredentials>, timeout: Option<Duration>) -> Self {
        Self { discovery, timeout }
    }
}

#[async_trait::async_trait]
impl Strategy for AmbientStrategy {
    fn source(&self) -> CredentialSource {
        CredentialSource::Ambient
    }

    async fn credentials(
        &self,
        _connection: &Url,
        scopes: &[String],
    ) -> Result<Option<Credentials>> {
        bounded(self.timeout, self.discovery.discover(scopes))
            .await
            .map(Some)
    }
}

/// Returns the trimmed `credentials` query parameter, if present and not
/// blank.
fn query_parameter(connection: &Url) -> Option<String> {
    let (_, value) = connection
        .query_pairs()
        .find(|(k, _)| k == CREDENTIALS_QUERY_PARAM)?;
    // Form decoding maps `+` to a space, and spaces never appear in base64.
    let value = without_line_breaks(value.trim()).replace(' ', "+");
    (!value.is_empty()).then_some(value)
}

/// Decodes standard base64, accepting the line-wrapped output of tools such
/// as `base64(1)`.
fn decode(encoded: &str) -> Result<Vec<u8>> {
    BASE64_STANDARD
        .decode(without_line_breaks(encoded))
        .map_err(Error::decode_failed)
}

fn without_line_breaks(value: &str) -> String {
    value.chars().filter(|c| !matches!(c, '\r' | '\n')).collect()
}

async fn bounded<F>(timeout: Option<Duration>, load: F) -> Result<Credentials>
where
    F: Future<Output = std::result::Result<Credentials, BuildError>>,
{
    let Some(timeout) = timeout else {
        return load.await.map_err(Error::credential_parse);
    };
    match tokio::time::timeout(timeout, load).await {
        Ok(result) => result.map_err(Error::credential_parse),
        Err(elapsed) => Err(Error::credential_parse(format!(
            "loading the credentials did not finish in {timeout:?}: {elapsed}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::mds;
    use crate::discovery::tests::MockDiscovery;
    use crate::environment::StaticEnvironment;
    use crate::loader::tests::MockLoader;
    use test_case::test_case;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn mds_credentials() -> Credentials {
        mds::Builder::default().build()
    }

    #[test_case("gcputil:///?credentials=abc", Some("abc"); "simple")]
    #[test_case("gcputil:///?credentials=%20abc%0A", Some("abc"); "trimmed")]
    #[test_case("gcputil:///?credentials=ab+c%3D", Some("ab+c="); "plus restored")]
    #[test_case("gcputil:///?credentials=ab%2Bc", Some("ab+c"); "escaped plus")]
    #[test_case("gcputil:///?credentials=a&credentials=b", Some("a"); "first wins")]
    #[test_case("gcputil:///?credentials=eyJ0eXBl%0AIjoidGVz%0D%0AdCJ9", Some("eyJ0eXBlIjoidGVzdCJ9"); "line wrapped")]
    #[test_case("gcputil:///?credentials=", None; "empty")]
    #[test_case("gcputil:///?credentials=%20%20", None; "blank")]
    #[test_case("gcputil:///?other=abc", None; "missing")]
    #[test_case("gcputil:///", None; "no query")]
    fn query_parameter_value(input: &str, want: Option<&str>) {
        assert_eq!(query_parameter(&url(input)).as_deref(), want);
    }

    #[tokio::test]
    async fn query_parameter_not_applicable() -> anyhow::Result<()> {
        let mut loader = MockLoader::new();
        loader.expect_load().never();
        let strategy = QueryParameterStrategy::new(Arc::new(loader), None);
        assert_eq!(strategy.source(), CredentialSource::QueryParameter);
        let got = strategy.credentials(&url("gcputil:///"), &[]).await?;
        assert!(got.is_none(), "{got:?}");
        Ok(())
    }

    #[tokio::test]
    async fn query_parameter_decodes() -> anyhow::Result<()> {
        let encoded = BASE64_STANDARD.encode(r#"{"type":"test"}"#);
        let mut loader = MockLoader::new();
        loader
            .expect_load()
            .withf(|json, scopes| json == br#"{"type":"test"}"# && scopes == ["scope1"])
            .times(1)
            .returning(|_, _| Ok(mds_credentials()));
        let strategy = QueryParameterStrategy::new(Arc::new(loader), None);
        let connection = url(&format!("gcputil:///?credentials={encoded}"));
        let got = strategy
            .credentials(&connection, &["scope1".to_string()])
            .await?;
        assert!(got.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn query_parameter_bad_base64() {
        let mut loader = MockLoader::new();
        loader.expect_load().never();
        let strategy = QueryParameterStrategy::new(Arc::new(loader), None);
        let err = strategy
            .credentials(&url("gcputil:///?credentials=not-base64!"), &[])
            .await
            .unwrap_err();
        assert!(err.is_decode_failed(), "{err:?}");
    }

    #[tokio::test]
    async fn query_parameter_loader_error() {
        let mut loader = MockLoader::new();
        loader
            .expect_load()
            .times(1)
            .returning(|_, _| Err(BuildError::parsing("bad json")));
        let strategy = QueryParameterStrategy::new(Arc::new(loader), None);
        let encoded = BASE64_STANDARD.encode("{}");
        let err = strategy
            .credentials(&url(&format!("gcputil:///?credentials={encoded}")), &[])
            .await
            .unwrap_err();
        assert!(err.is_credential_parse(), "{err:?}");
        assert!(err.to_string().contains("bad json"), "{err}");
    }

    #[test_case(None; "unset")]
    #[test_case(Some(""); "empty")]
    #[test_case(Some(" \n\t "); "blank")]
    #[tokio::test]
    async fn environment_variable_not_applicable(value: Option<&str>) -> anyhow::Result<()> {
        let env: StaticEnvironment = value
            .map(|v| (CREDENTIALS_ENV_VAR, v))
            .into_iter()
            .collect();
        let mut loader = MockLoader::new();
        loader.expect_load().never();
        let strategy = EnvironmentVariableStrategy::new(Arc::new(env), Arc::new(loader), None);
        assert_eq!(strategy.source(), CredentialSource::EnvironmentVariable);
        let got = strategy.credentials(&url("gcputil:///"), &[]).await?;
        assert!(got.is_none(), "{got:?}");
        Ok(())
    }

    #[test_case(r#"{"type":"test"}"#; "raw json")]
    #[test_case("  \n{\"type\":\"test\"}\t "; "raw json with whitespace")]
    #[test_case("eyJ0eXBlIjoidGVzdCJ9"; "base64")]
    #[test_case(" eyJ0eXBlIjoidGVzdCJ9\n"; "base64 with whitespace")]
    #[test_case("eyJ0eXBl\nIjoidGVz\ndCJ9\n"; "base64 line wrapped")]
    #[test_case("eyJ0eXBl\r\nIjoidGVz\r\ndCJ9"; "base64 crlf wrapped")]
    #[tokio::test]
    async fn environment_variable(value: &str) -> anyhow::Result<()> {
        let env = StaticEnvironment::from([(CREDENTIALS_ENV_VAR, value)]);
        let mut loader = MockLoader::new();
        loader
            .expect_load()
            .withf(|json, _| json == br#"{"type":"test"}"#)
            .times(1)
            .returning(|_, _| Ok(mds_credentials()));
        let strategy = EnvironmentVariableStrategy::new(Arc::new(env), Arc::new(loader), None);
        let got = strategy.credentials(&url("gcputil:///"), &[]).await?;
        assert!(got.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn environment_variable_wrapped_base64() -> anyhow::Result<()> {
        let json = serde_json::json!({
            "type": "service_account",
            "project_id": "test-project-id",
            "client_email": "test-client-email@test-project-id.iam.gserviceaccount.com",
            "private_key_id": "test-private-key-id",
        })
        .to_string();
        let encoded = BASE64_STANDARD.encode(&json);
        let wrapped = encoded
            .as_bytes()
            .chunks(76)
            .map(|line| std::str::from_utf8(line).unwrap())
            .collect::<Vec<_>>()
            .join("\n");
        assert!(wrapped.contains('\n'), "{wrapped}");

        let env = StaticEnvironment::from([(CREDENTIALS_ENV_VAR, wrapped.as_str())]);
        let want = json.clone();
        let mut loader = MockLoader::new();
        loader
            .expect_load()
            .withf(move |got, _| got == want.as_bytes())
            .times(1)
            .returning(|_, _| Ok(mds_credentials()));
        let strategy = EnvironmentVariableStrategy::new(Arc::new(env), Arc::new(loader), None);
        let got = strategy.credentials(&url("gcputil:///"), &[]).await?;
        assert!(got.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn environment_variable_bad_base64() {
        let env = StaticEnvironment::from([(CREDENTIALS_ENV_VAR, "[not base64]")]);
        let mut loader = MockLoader::new();
        loader.expect_load().never();
        let strategy = EnvironmentVariableStrategy::new(Arc::new(env), Arc::new(loader), None);
        let err = strategy
            .credentials(&url("gcputil:///"), &[])
            .await
            .unwrap_err();
        assert!(err.is_decode_failed(), "{err:?}");
    }

    #[tokio::test]
    async fn ambient() -> anyhow::Result<()> {
        let mut discovery = MockDiscovery::new();
        discovery
            .expect_discover()
            .withf(|scopes| scopes == ["scope1"])
            .times(1)
            .returning(|_| Ok(mds_credentials()));
        let strategy = AmbientStrategy::new(Arc::new(discovery), None);
        assert_eq!(strategy.source(), CredentialSource::Ambient);
        let got = strategy
            .credentials(&url("gcputil:///"), &["scope1".to_string()])
            .await?;
        assert!(got.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn ambient_error() {
        let mut discovery = MockDiscovery::new();
        discovery
            .expect_discover()
            .times(1)
            .returning(|_| Err(BuildError::not_found("nothing here")));
        let strategy = AmbientStrategy::new(Arc::new(discovery), None);
        let err = strategy
            .credentials(&url("gcputil:///"), &[])
            .await
            .unwrap_err();
        assert!(err.is_credential_parse(), "{err:?}");
        assert!(err.to_string().contains("nothing here"), "{err}");
    }

    #[derive(Debug)]
    struct SlowDiscovery;

    #[async_trait::async_trait]
    impl DiscoverCredentials for SlowDiscovery {
        async fn discover(
            &self,
            _scopes: &[String],
        ) -> std::result::Result<Credentials, BuildError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(mds_credentials())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn ambient_timeout() {
        let strategy = AmbientStrategy::new(Arc::new(SlowDiscovery), Some(Duration::from_secs(5)));
        let err = strategy
            .credentials(&url("gcputil:///"), &[])
            .await
            .unwrap_err();
        assert!(err.is_credential_parse(), "{err:?}");
        assert!(err.to_string().contains("did not finish"), "{err}");
    }
}
