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

//! Lookup of environment variables.
//!
//! The [Resolver](crate::resolver::Resolver) and the
//! [DefaultDiscovery](crate::discovery::DefaultDiscovery) never read the
//! process environment directly. They consult an [Environment], which
//! defaults to [ProcessEnvironment]. Tests and embedders can inject their
//! own implementation, for example a fixed map of variables.

use std::collections::HashMap;

/// A source of environment variables.
pub trait Environment: std::fmt::Debug + Send + Sync {
    /// Returns the value of the variable `name`, or `None` if it is unset or
    /// not valid unicode.
    fn var(&self, name: &str) -> Option<String>;
}

/// Reads variables from the environment of the current process.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessEnvironment;

impl Environment for ProcessEnvironment {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// An [Environment] backed by a fixed set of variables.
///
/// ```
/// # use gcputil_auth::environment::{Environment, StaticEnvironment};
/// let env = StaticEnvironment::from([("HOME", "/home/test")]);
/// assert_eq!(env.var("HOME").as_deref(), Some("/home/test"));
/// assert_eq!(env.var("USER"), None);
/// ```
#[derive(Clone, Debug, Default)]
pub struct StaticEnvironment(HashMap<String, String>);

impl Environment for StaticEnvironment {
    fn var(&self, name: &str) -> Option<String> {
        self.0.get(name).cloned()
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for StaticEnvironment
where
    K: Into<String>,
    V: Into<String>,
{
    fn from(vars: [(K, V); N]) -> Self {
        Self(
            vars.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl<K, V> FromIterator<(K, V)> for StaticEnvironment
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Returns the trimmed value of `name`, or `None` if it is unset or blank.
pub(crate) fn non_empty_var(env: &dyn Environment, name: &str) -> Option<String> {
    env.var(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use scoped_env::ScopedEnv;
    use serial_test::serial;

    mockall::mock! {
        #[derive(Debug)]
        pub Environment {}

        impl Environment for Environment {
            fn var(&self, name: &str) -> Option<String>;
        }
    }

    #[test]
    #[serial]
    fn process_environment() {
        let _e = ScopedEnv::set("GCPUTIL_TEST_ENVIRONMENT_VAR", "test-value");
        let env = ProcessEnvironment;
        assert_eq!(
            env.var("GCPUTIL_TEST_ENVIRONMENT_VAR").as_deref(),
            Some("test-value")
        );
        assert_eq!(env.var("GCPUTIL_TEST_ENVIRONMENT_VAR_UNSET"), None);
    }

    #[test]
    fn static_environment() {
        let env: StaticEnvironment = [("A", "1"), ("B", "2")].into_iter().collect();
        assert_eq!(env.var("A").as_deref(), Some("1"));
        assert_eq!(env.var("B").as_deref(), Some("2"));
        assert_eq!(env.var("C"), None);
    }

    #[test]
    fn non_empty_var_trims() {
        let env = StaticEnvironment::from([("SET", "  value \n"), ("BLANK", " \t ")]);
        assert_eq!(non_empty_var(&env, "SET").as_deref(), Some("value"));
        assert_eq!(non_empty_var(&env, "BLANK"), None);
        assert_eq!(non_empty_var(&env, "UNSET"), None);
    }

    #[test]
    fn mock_environment() {
        let mut mock = MockEnvironment::new();
        mock.expect_var()
            .withf(|name| name == "HOME")
            .return_const(Some("/home/test".to_string()));
        assert_eq!(non_empty_var(&mock, "HOME").as_deref(), Some("/home/test"));
    }
}
