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

use serde::{Deserialize, Deserializer};

/// A read-only snapshot of the metadata in a credential JSON document.
///
/// The field names follow the service account key format. All fields are
/// optional, missing (or `null`) fields are empty strings. Credentials
/// without a JSON document, such as those backed by the metadata service,
/// produce the default (empty) context.
#[derive(Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CredentialContext {
    /// The credential kind, for example `service_account`.
    #[serde(rename = "type", deserialize_with = "null_as_empty")]
    pub cred_type: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub project_id: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub private_key_id: String,
    /// The PEM-encoded private key.
    #[serde(deserialize_with = "null_as_empty")]
    pub private_key: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub client_email: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub client_id: String,
}

impl CredentialContext {
    /// Decodes the context from a credential JSON document.
    ///
    /// An empty document yields the default context.
    pub fn from_json(json: &[u8]) -> serde_json::Result<Self> {
        if json.is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_slice(json)
    }
}

impl std::fmt::Debug for CredentialContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let private_key = if self.private_key.is_empty() {
            ""
        } else {
            "[censored]"
        };
        f.debug_struct("CredentialContext")
            .field("cred_type", &self.cred_type)
            .field("project_id", &self.project_id)
            .field("private_key_id", &self.private_key_id)
            .field("private_key", &private_key)
            .field("client_email", &self.client_email)
            .field("client_id", &self.client_id)
            .finish()
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
