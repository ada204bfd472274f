// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! The six recurring jobs.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use super::{ScheduledTask, Scheduler};
use crate::config::ScheduleConfig;
use crate::error::AppError;
use crate::models::Period;
use crate::services::{Aggregator, ImportPipeline, StateStore, StravaService};

pub const TOKEN_REFRESH: &str = "token_refresh";
pub const DATA_IMPORT: &str = "data_import";
pub const WEEKLY_SUMMARY: &str = "weekly_summary";
pub const MONTHLY_SUMMARY: &str = "monthly_summary";
pub const YEARLY_SUMMARY: &str = "yearly_summary";
pub const STATE_SWEEP: &str = "state_sweep";

/// Refresh the stored token ahead of its expiry.
pub struct TokenRefreshTask {
    pub strava: StravaService,
}

#[async_trait]
impl ScheduledTask for TokenRefreshTask {
    async fn run(&self) -> Result<(), AppError> {
        match self.strava.refresh().await? {
            Some(token) => {
                tracing::info!(expires_at = %token.expires_at, "Scheduled token refresh done")
            }
            None => tracing::info!("No token stored, nothing to refresh"),
        }
        Ok(())
    }
}

pub struct ImportTask {
    pub pipeline: Arc<ImportPipeline>,
}

#[async_trait]
impl ScheduledTask for ImportTask {
    async fn run(&self) -> Result<(), AppError> {
        self.pipeline.run(Utc::now()).await.map(|_| ())
    }
}

/// Rebuild the current and previous summary of one period kind.
pub struct SummaryTask {
    pub aggregator: Arc<Aggregator>,
    pub period: Period,
}

#[async_trait]
impl ScheduledTask for SummaryTask {
    async fn run(&self) -> Result<(), AppError> {
        self.aggregator.run(self.period, Utc::now()).await.map(|_| ())
    }
}

pub struct StateSweepTask {
    pub states: Arc<StateStore>,
}

#[async_trait]
impl ScheduledTask for StateSweepTask {
    async fn run(&self) -> Result<(), AppError> {
        let removed = self.states.sweep_expired();
        if removed > 0 {
            tracing::info!(removed, "Expired OAuth states swept");
        }
        Ok(())
    }
}

/// Register every recurring job with its configured schedule.
pub fn register_all(
    scheduler: &Scheduler,
    schedules: &ScheduleConfig,
    strava: StravaService,
    pipeline: Arc<ImportPipeline>,
    aggregator: Arc<Aggregator>,
    states: Arc<StateStore>,
) -> Result<(), AppError> {
    scheduler.register(
        TOKEN_REFRESH,
        &schedules.token_refresh,
        Arc::new(TokenRefreshTask { strava }),
    )?;
    scheduler.register(
        DATA_IMPORT,
        &schedules.data_import,
        Arc::new(ImportTask { pipeline }),
    )?;

    for (name, cron, period) in [
        (WEEKLY_SUMMARY, &schedules.weekly_summary, Period::Week),
        (MONTHLY_SUMMARY, &schedules.monthly_summary, Period::Month),
        (YEARLY_SUMMARY, &schedules.yearly_summary, Period::Year),
    ] {
        scheduler.register(
            name,
            cron,
            Arc::new(SummaryTask {
                aggregator: Arc::clone(&aggregator),
                period,
            }),
        )?;
    }

    scheduler.register(
        STATE_SWEEP,
        &schedules.state_sweep,
        Arc::new(StateSweepTask { states }),
    )?;
    Ok(())
}
