// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Social posts for freshly imported activities.

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::Config;
use crate::error::AppError;
use crate::models::ActivityRecord;

const DEFAULT_TWITTER_API_BASE: &str = "https://api.twitter.com/2";

/// Something that announces a single activity.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn post_activity(&self, activity: &ActivityRecord) -> Result<(), AppError>;
}

/// Publisher for X (Twitter).
///
/// Without an access token it only logs what it would have posted.
#[derive(Clone)]
pub struct TwitterPublisher {
    http: reqwest::Client,
    api_base: String,
    access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TweetResponse {
    data: TweetData,
}

#[derive(Debug, Deserialize)]
struct TweetData {
    id: String,
}

impl TwitterPublisher {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| AppError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_base: DEFAULT_TWITTER_API_BASE.to_string(),
            access_token: config.twitter_access_token.clone(),
        })
    }

    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.access_token.is_some()
    }
}

#[async_trait]
impl Publisher for TwitterPublisher {
    async fn post_activity(&self, activity: &ActivityRecord) -> Result<(), AppError> {
        let text = format_activity_post(activity);

        let Some(access_token) = &self.access_token else {
            tracing::info!(activity_id = activity.id, text = %text, "Posting disabled, would post");
            return Ok(());
        };

        let response = self
            .http
            .post(format!("{}/tweets", self.api_base))
            .bearer_auth(access_token)
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await
            .map_err(|e| AppError::UpstreamUnavailable(format!("post failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status.as_u16() == 429 || status.is_server_error() {
                return Err(AppError::UpstreamUnavailable(format!("X API HTTP {}", status)));
            }
            return Err(AppError::Internal(anyhow::anyhow!(
                "X API HTTP {}: {}",
                status,
                body
            )));
        }

        let posted: TweetResponse = response
            .json()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("X API response: {}", e)))?;

        tracing::info!(activity_id = activity.id, tweet_id = %posted.data.id, "Activity posted");
        Ok(())
    }
}

/// Text of the post for `activity`.
pub fn format_activity_post(activity: &ActivityRecord) -> String {
    format!(
        "{name}\n{date}\nTSS: {tss:.0}\nNP: {np:.0}\nType: {sport}\nCalories: {cal}kcal\nMoving time: {time}\nDistance: {dist:.1}km\nElevation: {elev:.0}m",
        name = activity.name,
        date = activity.start_date.format("%Y-%m-%d (%a)"),
        tss = activity.tss,
        np = activity.normalized_power,
        sport = activity.sport_type,
        cal = group_thousands(activity.calories.round() as i64),
        time = format_duration(activity.moving_time),
        dist = activity.distance / 1000.0,
        elev = activity.total_elevation_gain,
    )
}

/// `5400` -> `1h 30m`, `300` -> `5m`.
pub fn format_duration(seconds: u32) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}

fn group_thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
