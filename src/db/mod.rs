// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Durable storage layer.
//!
//! The rest of the crate only sees the [`TokenBackend`] and [`ActivityStore`]
//! traits. [`FirestoreDb`] is the production implementation; [`MemoryStore`]
//! keeps everything in process and is what the tests run against.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryStore;

use crate::error::AppError;
use crate::models::{ActivityRecord, Period, PeriodSummary, Token};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Collection names as constants.
pub mod collections {
    pub const TOKENS: &str = "tokens";
    pub const ACTIVITIES: &str = "activities";
    pub const WEEKLY_SUMMARIES: &str = "weekly_summaries";
    pub const MONTHLY_SUMMARIES: &str = "monthly_summaries";
    pub const YEARLY_SUMMARIES: &str = "yearly_summaries";
}

/// Durable home of the single OAuth token.
#[async_trait]
pub trait TokenBackend: Send + Sync {
    async fn save_token(&self, token: &Token) -> Result<(), AppError>;

    /// `Ok(None)` when no token has ever been saved (or it was cleared).
    async fn load_token(&self) -> Result<Option<Token>, AppError>;

    async fn clear_token(&self) -> Result<(), AppError>;
}

/// Durable home of imported activities and their summaries.
#[async_trait]
pub trait ActivityStore: Send + Sync {
    /// Insert or overwrite the activity keyed by its Strava ID.
    async fn write_activity(&self, activity: &ActivityRecord) -> Result<(), AppError>;

    /// Overwrite the weekly, monthly, or yearly summary for
    /// `summary.period_start`, depending on `summary.period`.
    async fn write_summary(&self, summary: &PeriodSummary) -> Result<(), AppError>;

    /// Stored summary for the period starting at `period_start`.
    async fn get_summary(
        &self,
        period: Period,
        period_start: DateTime<Utc>,
    ) -> Result<Option<PeriodSummary>, AppError>;

    /// Most recently started activity, if any.
    async fn latest_activity(&self) -> Result<Option<ActivityRecord>, AppError>;

    /// Activities with `start <= start_date < end`, oldest first.
    async fn activities_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ActivityRecord>, AppError>;
}
