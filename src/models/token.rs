// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava OAuth token model.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::time_utils::rfc3339_secs;

/// A token is treated as expired this long before Strava would reject it.
pub const TOKEN_EXPIRY_BUFFER_SECS: i64 = 5 * 60;

/// Strava OAuth token pair for the connected athlete.
///
/// Stored as a single document; every refresh overwrites it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub refresh_token: String,
    /// When the access token expires
    #[serde(with = "rfc3339_secs")]
    pub expires_at: DateTime<Utc>,
    /// Usually "Bearer"
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Strava athlete ID the token belongs to
    #[serde(default)]
    pub athlete_id: u64,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl Token {
    /// True if the access token is still usable at `now`, keeping a
    /// five minute margin before `expires_at`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(TOKEN_EXPIRY_BUFFER_SECS) < self.expires_at
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }
}

// Keep secrets out of logs.
impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .field("token_type", &self.token_type)
            .field("athlete_id", &self.athlete_id)
            .finish()
    }
}
