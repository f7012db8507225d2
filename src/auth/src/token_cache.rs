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

use crate::credentials::Result;
use crate::token::{Token, TokenProvider};
use std::time::Duration;
use tokio::sync::Mutex;
// Using tokio's wrapper makes the cache testable without relying on clock times.
use tokio::time::Instant;

// Tokens are refreshed slightly before they expire.
const EXPIRY_MARGIN: Duration = Duration::from_secs(10);

/// Caches the last token minted by `T`.
///
/// At most one refresh runs at a time: callers arriving during a refresh
/// wait on the lock and then observe the refreshed token. Errors are not
/// cached.
#[derive(Debug)]
pub(crate) struct TokenCache<T>
where
    T: TokenProvider,
{
    token: Mutex<Option<Token>>,
    inner: T,
}

fn usable(token: &Token) -> bool {
    token
        .expires_at
        .is_none_or(|e| e > Instant::now() + EXPIRY_MARGIN)
}

impl<T: TokenProvider> TokenCache<T> {
    pub(crate) fn new(inner: T) -> TokenCache<T> {
        TokenCache {
            token: Mutex::new(None),
            inner,
        }
    }
}

#[async_trait::async_trait]
impl<T: TokenProvider + 'static> TokenProvider for TokenCache<T> {
    async fn token(&self) -> Result<Token> {
        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_ref().filter(|t| usable(t)) {
            return Ok(token.clone());
        }
        tracing::debug!("refreshing access token");
        let token = self.inner.token().await?;
        *guard = Some(token.clone());
        Ok(token)
    }
}
