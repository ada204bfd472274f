// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Recompute period summaries from stored activities.

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use std::sync::Arc;

use crate::db::ActivityStore;
use crate::error::AppError;
use crate::models::{Period, PeriodSummary};

/// Writes weekly, monthly and yearly summaries.
pub struct Aggregator {
    store: Arc<dyn ActivityStore>,
}

impl Aggregator {
    pub fn new(store: Arc<dyn ActivityStore>) -> Self {
        Self { store }
    }

    /// Rebuild and overwrite the summary of the period starting at `start`.
    pub async fn summarize(
        &self,
        period: Period,
        start: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<PeriodSummary, AppError> {
        let end = period.end_of(start);
        let activities = self.store.activities_between(start, end).await?;
        let summary = PeriodSummary::from_activities(period, start, &activities, now);

        self.store.write_summary(&summary).await?;
        tracing::info!(
            period = %period,
            period_start = %summary.key(),
            activities = summary.activity_count,
            total_tss = summary.total_tss,
            "Summary updated"
        );
        Ok(summary)
    }

    /// Refresh the current and the previous period.
    ///
    /// Both are attempted even if one fails; the first error is returned
    /// after both have run.
    pub async fn run(&self, period: Period, now: DateTime<Utc>) -> Result<Vec<PeriodSummary>, AppError> {
        let current = period.start_of(now);
        let previous = period.previous(current);

        let results = join_all([
            self.summarize(period, current, now),
            self.summarize(period, previous, now),
        ])
        .await;

        let mut summaries = Vec::with_capacity(2);
        let mut first_error = None;
        for result in results {
            match result {
                Ok(summary) => summaries.push(summary),
                Err(e) => {
                    tracing::error!(period = %period, error = %e, "Summary update failed");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(summaries),
        }
    }
}
