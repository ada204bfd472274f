// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Tokens (the single Strava OAuth token document)
//! - Activities (enriched Strava activities, keyed by activity ID)
//! - Weekly / monthly / yearly summaries (keyed by period start date)
//!
//! Every call is bounded by a timeout so a stalled backend cannot wedge a
//! scheduled job.

use crate::db::{collections, ActivityStore, TokenBackend};
use crate::error::AppError;
use crate::models::{ActivityRecord, Period, PeriodSummary, Token};
use crate::time_utils::format_utc_rfc3339;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::time::Duration;

/// Document ID of the token in the `tokens` collection.
const TOKEN_DOC_ID: &str = "strava";

const DEFAULT_OP_TIMEOUT: Duration = Duration::from_secs(10);

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
    op_timeout: Duration,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Persistence(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
            op_timeout: DEFAULT_OP_TIMEOUT,
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Persistence(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
            op_timeout: DEFAULT_OP_TIMEOUT,
        })
    }

    /// Create a disconnected client (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self {
            client: None,
            op_timeout: DEFAULT_OP_TIMEOUT,
        }
    }

    /// Override the per-operation timeout.
    pub fn with_op_timeout(mut self, op_timeout: Duration) -> Self {
        self.op_timeout = op_timeout;
        self
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client.as_ref().ok_or_else(|| {
            AppError::Persistence("Database not connected (offline mode)".to_string())
        })
    }

    /// Run one Firestore operation under the configured timeout.
    async fn timed<T, E, F>(&self, op: &'static str, fut: F) -> Result<T, AppError>
    where
        E: std::fmt::Display,
        F: Future<Output = Result<T, E>>,
    {
        match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(result) => result.map_err(|e| AppError::Persistence(format!("{}: {}", op, e))),
            Err(_) => {
                tracing::warn!(op, timeout = ?self.op_timeout, "Firestore operation timed out");
                Err(AppError::Persistence(format!(
                    "{} timed out after {:?}",
                    op, self.op_timeout
                )))
            }
        }
    }

    fn summary_collection(period: Period) -> &'static str {
        match period {
            Period::Week => collections::WEEKLY_SUMMARIES,
            Period::Month => collections::MONTHLY_SUMMARIES,
            Period::Year => collections::YEARLY_SUMMARIES,
        }
    }
}

#[async_trait]
impl TokenBackend for FirestoreDb {
    async fn save_token(&self, token: &Token) -> Result<(), AppError> {
        let client = self.get_client()?;
        let _: () = self
            .timed(
                "save token",
                client
                    .fluent()
                    .update()
                    .in_col(collections::TOKENS)
                    .document_id(TOKEN_DOC_ID)
                    .object(token)
                    .execute(),
            )
            .await?;

        tracing::info!(athlete_id = token.athlete_id, "Token saved to Firestore");
        Ok(())
    }

    async fn load_token(&self) -> Result<Option<Token>, AppError> {
        let client = self.get_client()?;
        let token: Option<Token> = self
            .timed(
                "load token",
                client
                    .fluent()
                    .select()
                    .by_id_in(collections::TOKENS)
                    .obj()
                    .one(TOKEN_DOC_ID),
            )
            .await?;

        match &token {
            Some(t) => tracing::debug!(athlete_id = t.athlete_id, "Token loaded from Firestore"),
            None => tracing::debug!("No token stored in Firestore"),
        }
        Ok(token)
    }

    async fn clear_token(&self) -> Result<(), AppError> {
        let client = self.get_client()?;
        self.timed(
            "clear token",
            client
                .fluent()
                .delete()
                .from(collections::TOKENS)
                .document_id(TOKEN_DOC_ID)
                .execute(),
        )
        .await?;

        tracing::info!("Token removed from Firestore");
        Ok(())
    }
}

#[async_trait]
impl ActivityStore for FirestoreDb {
    async fn write_activity(&self, activity: &ActivityRecord) -> Result<(), AppError> {
        let client = self.get_client()?;
        let _: () = self
            .timed(
                "write activity",
                client
                    .fluent()
                    .update()
                    .in_col(collections::ACTIVITIES)
                    .document_id(activity.id.to_string())
                    .object(activity)
                    .execute(),
            )
            .await?;

        tracing::debug!(activity_id = activity.id, "Activity written to Firestore");
        Ok(())
    }

    async fn write_summary(&self, summary: &PeriodSummary) -> Result<(), AppError> {
        let client = self.get_client()?;
        let _: () = self
            .timed(
                "write summary",
                client
                    .fluent()
                    .update()
                    .in_col(Self::summary_collection(summary.period))
                    .document_id(summary.key())
                    .object(summary)
                    .execute(),
            )
            .await?;

        tracing::info!(
            period = %summary.period,
            period_start = %summary.key(),
            activities = summary.activity_count,
            "Summary written to Firestore"
        );
        Ok(())
    }

    async fn get_summary(
        &self,
        period: Period,
        period_start: DateTime<Utc>,
    ) -> Result<Option<PeriodSummary>, AppError> {
        let client = self.get_client()?;
        let key = period_start.format("%Y-%m-%d").to_string();
        self.timed(
            "get summary",
            client
                .fluent()
                .select()
                .by_id_in(Self::summary_collection(period))
                .obj()
                .one(&key),
        )
        .await
    }

    async fn latest_activity(&self) -> Result<Option<ActivityRecord>, AppError> {
        let client = self.get_client()?;
        let mut latest: Vec<ActivityRecord> = self
            .timed(
                "latest activity",
                client
                    .fluent()
                    .select()
                    .from(collections::ACTIVITIES)
                    .order_by([("start_date", firestore::FirestoreQueryDirection::Descending)])
                    .limit(1)
                    .obj()
                    .query(),
            )
            .await?;

        Ok(latest.pop())
    }

    async fn activities_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ActivityRecord>, AppError> {
        let client = self.get_client()?;
        // start_date is stored fixed-width, so string order is time order.
        let start = format_utc_rfc3339(start);
        let end = format_utc_rfc3339(end);

        self.timed(
            "activities between",
            client
                .fluent()
                .select()
                .from(collections::ACTIVITIES)
                .filter(move |q| {
                    q.for_all([
                        q.field("start_date").greater_than_or_equal(start.clone()),
                        q.field("start_date").less_than(end.clone()),
                    ])
                })
                .order_by([("start_date", firestore::FirestoreQueryDirection::Ascending)])
                .obj()
                .query(),
        )
        .await
    }
}
