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

use crate::constants::QUOTA_PROJECT_KEY;
use crate::credentials::Result;
use crate::errors;
use crate::token::Token;
use http::HeaderMap;
use http::header::{AUTHORIZATION, HeaderName, HeaderValue};

/// Creates the `authorization` header, plus the quota project header if any.
pub(crate) fn build_bearer_headers(
    token: &Token,
    quota_project_id: &Option<String>,
) -> Result<HeaderMap> {
    let mut value = HeaderValue::from_str(&format!("{} {}", token.token_type, token.token))
        .map_err(errors::permanent)?;
    value.set_sensitive(true);

    let mut headers = HeaderMap::with_capacity(2);
    headers.insert(AUTHORIZATION, value);
    if let Some(project) = quota_project_id {
        headers.insert(
            HeaderName::from_static(QUOTA_PROJECT_KEY),
            HeaderValue::from_str(project).map_err(errors::permanent)?,
        );
    }
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_token() -> Token {
        Token {
            token: "test-token".to_string(),
            token_type: "Bearer".to_string(),
            expires_at: None,
            metadata: None,
        }
    }

    #[test]
    fn bearer_only() {
        let headers = build_bearer_headers(&test_token(), &None).unwrap();
        assert_eq!(headers.len(), 1, "{headers:?}");
        let value = headers.get(AUTHORIZATION).unwrap();
        assert_eq!(value, "Bearer test-token");
        assert!(value.is_sensitive());
    }

    #[test]
    fn with_quota_project() {
        let headers =
            build_bearer_headers(&test_token(), &Some("test-project".to_string())).unwrap();
        assert_eq!(headers.len(), 2, "{headers:?}");
        let value = headers.get(QUOTA_PROJECT_KEY).unwrap();
        assert_eq!(value, "test-project");
        assert!(!value.is_sensitive());
    }

    #[test]
    fn invalid_token_value() {
        let mut token = test_token();
        token.token = "bad\nvalue".to_string();
        let err = build_bearer_headers(&token, &None).unwrap_err();
        assert!(!err.is_transient(), "{err:?}");
    }
}
