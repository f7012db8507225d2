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

/// The environment variable holding an inline credential blob.
pub const CREDENTIALS_ENV_VAR: &str = "GCPUTIL_GOOGLE_APPLICATION_CREDENTIALS";
/// The connection string query parameter holding a base64 credential blob.
pub const CREDENTIALS_QUERY_PARAM: &str = "credentials";

pub(crate) const DEFAULT_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";
pub(crate) const QUOTA_PROJECT_KEY: &str = "x-goog-user-project";

/// Application Default Credentials file path.
pub(crate) const ADC_ENV_VAR: &str = "GOOGLE_APPLICATION_CREDENTIALS";
pub(crate) const GCE_METADATA_HOST_ENV_VAR: &str = "GCE_METADATA_HOST";
pub(crate) const WINDOWS_APPDATA_ENV_VAR: &str = "APPDATA";
pub(crate) const UNIX_HOME_ENV_VAR: &str = "HOME";
pub(crate) const WELL_KNOWN_FILE: &str = "application_default_credentials.json";

pub(crate) const METADATA_ROOT: &str = "http://metadata.google.internal";
pub(crate) const METADATA_FLAVOR: &str = "metadata-flavor";
pub(crate) const METADATA_FLAVOR_VALUE: &str = "Google";

pub(crate) const OAUTH2_TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
