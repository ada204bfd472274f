// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Read-through cache for the single Strava token.
//!
//! The durable [`TokenBackend`] is the source of truth. Writes go to the
//! backend first and only then to memory, so a failed write never leaves the
//! cache ahead of what was persisted.

use std::sync::Arc;
use tokio::sync::RwLock;

use crate::db::TokenBackend;
use crate::error::AppError;
use crate::models::Token;

/// Shared, concurrency-safe token cache.
pub struct TokenCache {
    backend: Arc<dyn TokenBackend>,
    cached: RwLock<Option<Token>>,
}

impl TokenCache {
    pub fn new(backend: Arc<dyn TokenBackend>) -> Self {
        Self {
            backend,
            cached: RwLock::new(None),
        }
    }

    /// Persist `token`, then cache it.
    pub async fn save_token(&self, token: Token) -> Result<(), AppError> {
        let mut cached = self.cached.write().await;
        self.backend.save_token(&token).await?;
        *cached = Some(token);
        Ok(())
    }

    /// Current token, reading the backend only on a cache miss.
    ///
    /// Concurrent callers that all miss perform a single backend read.
    pub async fn load_token(&self) -> Result<Option<Token>, AppError> {
        // Fast path: shared lock.
        if let Some(token) = self.cached.read().await.as_ref() {
            return Ok(Some(token.clone()));
        }

        let mut cached = self.cached.write().await;

        // Another task may have filled the cache while we waited.
        if let Some(token) = cached.as_ref() {
            return Ok(Some(token.clone()));
        }

        let loaded = self.backend.load_token().await?;
        if loaded.is_some() {
            tracing::debug!("Token loaded into cache");
        }
        *cached = loaded.clone();
        Ok(loaded)
    }

    /// True if a token exists and is outside the expiry buffer.
    pub async fn has_valid_token(&self) -> bool {
        match self.load_token().await {
            Ok(Some(token)) => token.is_valid(),
            Ok(None) => false,
            Err(e) => {
                tracing::warn!(error = %e, "Token lookup failed");
                false
            }
        }
    }

    /// Remove the token from the backend, then from memory.
    pub async fn clear_token(&self) -> Result<(), AppError> {
        let mut cached = self.cached.write().await;
        self.backend.clear_token().await?;
        *cached = None;
        Ok(())
    }
}
