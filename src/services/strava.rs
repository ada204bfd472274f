// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava API client and token lifecycle.
//!
//! Handles:
//! - OAuth authorize URL, code exchange and token refresh
//! - Listing the athlete's recent activities
//! - Keeping a usable access token in the [`TokenCache`] (refresh when expiring)
//! - Mapping rate limits and outages to retryable errors

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::config::{Config, MAX_PAGE_SIZE};
use crate::error::AppError;
use crate::models::Token;
use crate::services::TokenCache;

const DEFAULT_API_BASE: &str = "https://www.strava.com/api/v3";
const DEFAULT_OAUTH_BASE: &str = "https://www.strava.com/oauth";

/// Scopes requested at login.
pub const OAUTH_SCOPE: &str = "read,activity:read_all";

/// Strava API client.
#[derive(Clone)]
pub struct StravaClient {
    http: reqwest::Client,
    api_base: String,
    oauth_base: String,
    client_id: String,
    client_secret: String,
    redirect_url: String,
}

impl StravaClient {
    /// Create a client from the OAuth settings in `config`.
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| AppError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_base: DEFAULT_API_BASE.to_string(),
            oauth_base: DEFAULT_OAUTH_BASE.to_string(),
            client_id: config.strava_client_id.clone(),
            client_secret: config.strava_client_secret.clone(),
            redirect_url: config.strava_redirect_url.clone(),
        })
    }

    /// Point the client at another server (tests use a local mock).
    pub fn with_base_urls(mut self, api_base: &str, oauth_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self.oauth_base = oauth_base.trim_end_matches('/').to_string();
        self
    }

    /// URL the browser is sent to for consent.
    pub fn authorize_url(&self, state: &str) -> String {
        format!(
            "{}/authorize?client_id={}&redirect_uri={}&response_type=code&approval_prompt=auto&scope={}&state={}",
            self.oauth_base,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_url),
            urlencoding::encode(OAUTH_SCOPE),
            urlencoding::encode(state),
        )
    }

    /// Exchange an authorization code for a token.
    pub async fn exchange_code(&self, code: &str) -> Result<Token, AppError> {
        let response = self
            .http
            .post(format!("{}/token", self.oauth_base))
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| send_error("token exchange", e))?;

        let body: TokenResponse = check_response_json(response).await?;
        body.into_token(0)
    }

    /// Trade `token`'s refresh token for a new token pair.
    pub async fn refresh_token(&self, token: &Token) -> Result<Token, AppError> {
        let response = self
            .http
            .post(format!("{}/token", self.oauth_base))
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", token.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| send_error("token refresh", e))?;

        let body: TokenResponse = check_response_json(response).await?;
        // Refresh responses omit the athlete.
        body.into_token(token.athlete_id)
    }

    /// One page of the athlete's activities.
    ///
    /// With `after`, Strava returns activities started after it, oldest
    /// first; without, the most recent ones.
    pub async fn list_activities(
        &self,
        access_token: &str,
        after: Option<DateTime<Utc>>,
        per_page: u32,
    ) -> Result<Vec<StravaActivity>, AppError> {
        let per_page = per_page.clamp(1, MAX_PAGE_SIZE);
        let mut query = vec![("per_page", per_page.to_string())];
        if let Some(after) = after {
            query.push(("after", after.timestamp().to_string()));
        }

        let response = self
            .http
            .get(format!("{}/athlete/activities", self.api_base))
            .bearer_auth(access_token)
            .query(&query)
            .send()
            .await
            .map_err(|e| send_error("list activities", e))?;

        check_response_json(response).await
    }
}

/// Classify a request that never produced a response.
fn send_error(op: &str, e: reqwest::Error) -> AppError {
    if e.is_timeout() {
        AppError::UpstreamUnavailable(format!("{} timed out", op))
    } else {
        AppError::UpstreamUnavailable(format!("{} failed: {}", op, e))
    }
}

/// Check response status and parse the JSON body.
async fn check_response_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, AppError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();

        if status.as_u16() == 429 {
            tracing::warn!("Strava rate limit hit (429)");
            return Err(AppError::UpstreamUnavailable(
                AppError::STRAVA_RATE_LIMIT.to_string(),
            ));
        }

        if status.as_u16() == 401 {
            tracing::warn!("Strava rejected the access token (401)");
            return Err(AppError::AuthenticationRequired);
        }

        if status.is_server_error() {
            return Err(AppError::UpstreamUnavailable(format!("HTTP {}", status)));
        }

        return Err(AppError::StravaApi(format!("HTTP {}: {}", status, body)));
    }

    response
        .json()
        .await
        .map_err(|e| AppError::StravaApi(format!("JSON parse error: {}", e)))
}

/// Token response from `/oauth/token` (both grants).
#[derive(Debug, Clone, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_at: i64,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    athlete: Option<StravaAthlete>,
}

#[derive(Debug, Clone, Deserialize)]
struct StravaAthlete {
    id: u64,
}

impl TokenResponse {
    fn into_token(self, athlete_id: u64) -> Result<Token, AppError> {
        let expires_at = DateTime::from_timestamp(self.expires_at, 0).ok_or_else(|| {
            AppError::StravaApi(format!("Invalid token expiry {}", self.expires_at))
        })?;

        Ok(Token {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            token_type: self.token_type.unwrap_or_else(|| "Bearer".to_string()),
            athlete_id: self.athlete.map(|a| a.id).unwrap_or(athlete_id),
        })
    }
}

/// Summary activity as returned by `/athlete/activities`.
///
/// Missing fields default to zero so one sparse activity does not fail the
/// whole page.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StravaActivity {
    pub id: u64,
    pub name: String,
    pub sport_type: String,
    pub distance: f64,
    pub moving_time: u32,
    pub elapsed_time: u32,
    pub total_elevation_gain: f64,
    /// Kept as text; a value that does not parse drops just this activity.
    pub start_date: String,
    pub average_speed: f64,
    pub max_speed: f64,
    pub calories: f64,
    pub average_heartrate: f64,
    pub max_heartrate: f64,
    pub average_watts: f64,
    pub max_watts: f64,
    pub weighted_average_watts: f64,
    pub kilojoules: f64,
}

// ─────────────────────────────────────────────────────────────────────────────
// StravaService - token lifecycle on top of the client
// ─────────────────────────────────────────────────────────────────────────────

/// High-level Strava service that keeps a usable token in the cache.
///
/// Refreshes are serialized through one mutex; a caller that waited on it
/// re-checks the cache before going to Strava again.
#[derive(Clone)]
pub struct StravaService {
    client: StravaClient,
    tokens: Arc<TokenCache>,
    refresh_lock: Arc<Mutex<()>>,
}

impl StravaService {
    pub fn new(client: StravaClient, tokens: Arc<TokenCache>) -> Self {
        Self {
            client,
            tokens,
            refresh_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn client(&self) -> &StravaClient {
        &self.client
    }

    pub fn tokens(&self) -> &Arc<TokenCache> {
        &self.tokens
    }

    pub fn authorize_url(&self, state: &str) -> String {
        self.client.authorize_url(state)
    }

    /// Access token usable right now, refreshing it first if it is inside
    /// the expiry buffer.
    pub async fn valid_access_token(&self) -> Result<String, AppError> {
        // Fast path
        let token = self
            .tokens
            .load_token()
            .await?
            .ok_or(AppError::AuthenticationRequired)?;
        if token.is_valid() {
            return Ok(token.access_token);
        }

        let _guard = self.refresh_lock.lock().await;

        // Another task may have refreshed while we were waiting.
        let token = self
            .tokens
            .load_token()
            .await?
            .ok_or(AppError::AuthenticationRequired)?;
        if token.is_valid() {
            return Ok(token.access_token);
        }

        tracing::info!(athlete_id = token.athlete_id, "Access token expiring, refreshing");
        let refreshed = self.refresh_locked(&token).await?;
        Ok(refreshed.access_token)
    }

    /// Unconditionally refresh the stored token.
    ///
    /// Returns `Ok(None)` if there is no token to refresh.
    pub async fn refresh(&self) -> Result<Option<Token>, AppError> {
        let _guard = self.refresh_lock.lock().await;

        let Some(token) = self.tokens.load_token().await? else {
            return Ok(None);
        };

        self.refresh_locked(&token).await.map(Some)
    }

    /// Caller must hold `refresh_lock`.
    async fn refresh_locked(&self, token: &Token) -> Result<Token, AppError> {
        let refreshed = self.client.refresh_token(token).await.map_err(|e| {
            if e.is_strava_token_error() {
                tracing::warn!(error = %e, "Strava rejected the refresh token");
            }
            e
        })?;

        self.tokens.save_token(refreshed.clone()).await?;
        tracing::info!(
            athlete_id = refreshed.athlete_id,
            expires_at = %refreshed.expires_at,
            "Token refreshed"
        );
        Ok(refreshed)
    }

    /// Complete the OAuth handshake and store the resulting token.
    pub async fn exchange_code(&self, code: &str) -> Result<Token, AppError> {
        let token = self.client.exchange_code(code).await?;
        self.tokens.save_token(token.clone()).await?;

        tracing::info!(athlete_id = token.athlete_id, "OAuth exchange complete, token stored");
        Ok(token)
    }

    pub async fn logout(&self) -> Result<(), AppError> {
        self.tokens.clear_token().await?;
        tracing::info!("Token cleared");
        Ok(())
    }

    /// Activities using the current token (see [`StravaClient::list_activities`]).
    pub async fn list_activities(
        &self,
        after: Option<DateTime<Utc>>,
        per_page: u32,
    ) -> Result<Vec<StravaActivity>, AppError> {
        let access_token = self.valid_access_token().await?;
        self.client
            .list_activities(&access_token, after, per_page)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorize_url() {
        let client = StravaClient::new(&Config::test_default()).unwrap();
        let url = client.authorize_url("abc_123");

        assert!(url.starts_with("https://www.strava.com/oauth/authorize?"));
        assert!(url.contains("client_id=test_client_id"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A9090%2Fauth%2Fcallback"));
        assert!(url.contains("scope=read%2Cactivity%3Aread_all"));
        assert!(url.contains("approval_prompt=auto"));
        assert!(url.ends_with("state=abc_123"));
    }

    #[test]
    fn test_sparse_activity_deserializes() {
        let activity: StravaActivity =
            serde_json::from_str(r#"{"id": 7, "start_date": "2025-01-01T10:00:00Z"}"#).unwrap();
        assert_eq!(activity.id, 7);
        assert_eq!(activity.weighted_average_watts, 0.0);
    }

    #[test]
    fn test_refresh_response_keeps_athlete() {
        let body: TokenResponse = serde_json::from_str(
            r#"{"access_token": "a", "refresh_token": "r", "expires_at": 1750000000}"#,
        )
        .unwrap();
        let token = body.into_token(42).unwrap();
        assert_eq!(token.athlete_id, 42);
        assert_eq!(token.token_type, "Bearer");
        assert_eq!(token.expires_at.timestamp(), 1_750_000_000);
    }
}
