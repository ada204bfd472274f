// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! One import run: fetch recent activities, enrich them with FTP-based load
//! metrics, upsert them and announce the fresh ones.
//!
//! Every activity is handled on its own. A record that fails to convert or
//! persist is counted and logged, and the run carries on with the rest.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::config::Config;
use crate::db::ActivityStore;
use crate::error::AppError;
use crate::models::ActivityRecord;
use crate::services::metrics::convert_activity;
use crate::services::{FtpService, Publisher, StravaService};

/// Activities that started less than this long ago get published.
const PUBLISH_WINDOW_MINS: i64 = 60;

/// Outcome counters of one import run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    /// Activities returned by Strava
    pub fetched: usize,
    /// Activities written to the store
    pub persisted: usize,
    /// Activities dropped because they could not be converted
    pub skipped: usize,
    /// Activities whose write failed
    pub failed: usize,
    /// Publish tasks spawned
    pub published: usize,
}

/// Import logic shared by the scheduled job and manual triggers.
pub struct ImportPipeline {
    strava: StravaService,
    store: Arc<dyn ActivityStore>,
    ftp: Arc<FtpService>,
    publisher: Arc<dyn Publisher>,
    overlap: Duration,
    page_size: u32,
}

impl ImportPipeline {
    pub fn new(
        config: &Config,
        strava: StravaService,
        store: Arc<dyn ActivityStore>,
        ftp: Arc<FtpService>,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        Self {
            strava,
            store,
            ftp,
            publisher,
            overlap: config.import_overlap,
            page_size: config.import_page_size,
        }
    }

    /// Import everything started within the overlap window before `now`.
    ///
    /// Returns `Ok(None)` when nobody is logged in.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<Option<ImportReport>, AppError> {
        let access_token = match self.strava.valid_access_token().await {
            Ok(token) => token,
            Err(AppError::AuthenticationRequired) => {
                tracing::info!("No usable token, skipping import");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let since = now - self.overlap;
        self.import(&access_token, since, now).await.map(Some)
    }

    /// Import activities started after `since` using `access_token`.
    pub async fn import(
        &self,
        access_token: &str,
        since: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<ImportReport, AppError> {
        let activities = self
            .strava
            .client()
            .list_activities(access_token, Some(since), self.page_size)
            .await?;

        let mut report = ImportReport {
            fetched: activities.len(),
            ..Default::default()
        };
        tracing::info!(count = report.fetched, since = %since, "Fetched activities");

        // Current FTP applies to the whole batch.
        let ftp = self.ftp.ftp_for_date(now.date_naive());
        let publish_after = now - Duration::minutes(PUBLISH_WINDOW_MINS);

        for raw in &activities {
            let record = match convert_activity(raw, ftp) {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!(activity_id = raw.id, error = %e, "Skipping activity");
                    report.skipped += 1;
                    continue;
                }
            };

            if let Err(e) = self.store.write_activity(&record).await {
                tracing::error!(activity_id = record.id, error = %e, "Failed to write activity");
                report.failed += 1;
                continue;
            }
            report.persisted += 1;

            if record.start_date > publish_after {
                self.spawn_publish(record);
                report.published += 1;
            }
        }

        tracing::info!(
            fetched = report.fetched,
            persisted = report.persisted,
            skipped = report.skipped,
            failed = report.failed,
            published = report.published,
            "Import finished"
        );
        Ok(report)
    }

    /// Fire-and-forget; a failed post is only logged.
    fn spawn_publish(&self, record: ActivityRecord) {
        let publisher = Arc::clone(&self.publisher);
        tokio::spawn(async move {
            if let Err(e) = publisher.post_activity(&record).await {
                tracing::warn!(activity_id = record.id, error = %e, "Failed to publish activity");
            }
        });
    }
}
