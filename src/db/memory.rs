// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process store used by tests and offline runs.
//!
//! Besides the store traits it exposes a few knobs (read counters, injected
//! latency, injected failures) so callers can observe exactly how often the
//! backend is touched.

use crate::db::{ActivityStore, TokenBackend};
use crate::error::AppError;
use crate::models::{ActivityRecord, Period, PeriodSummary, Token};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Default)]
struct Inner {
    token: Option<Token>,
    activities: BTreeMap<u64, ActivityRecord>,
    summaries: HashMap<(Period, DateTime<Utc>), PeriodSummary>,
    failing_activity_ids: HashSet<u64>,
}

/// Store that keeps everything in memory.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    token_loads: AtomicUsize,
    token_saves: AtomicUsize,
    activity_writes: AtomicUsize,
    fail_token_writes: AtomicBool,
    fail_reads: AtomicBool,
    load_delay_ms: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that already holds `token`.
    pub fn with_token(token: Token) -> Self {
        let store = Self::default();
        store.lock().token = Some(token);
        store
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A panic while holding the lock leaves plain data behind; keep going.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Number of `load_token` calls that reached the store.
    pub fn token_loads(&self) -> usize {
        self.token_loads.load(Ordering::SeqCst)
    }

    /// Number of successful `save_token` calls.
    pub fn token_saves(&self) -> usize {
        self.token_saves.load(Ordering::SeqCst)
    }

    /// Number of successful `write_activity` calls (including overwrites).
    pub fn activity_writes(&self) -> usize {
        self.activity_writes.load(Ordering::SeqCst)
    }

    /// Make `save_token` and `clear_token` fail.
    pub fn fail_token_writes(&self, fail: bool) {
        self.fail_token_writes.store(fail, Ordering::SeqCst);
    }

    /// Make every read fail.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make writes of one specific activity fail.
    pub fn fail_activity(&self, activity_id: u64) {
        self.lock().failing_activity_ids.insert(activity_id);
    }

    /// Delay every `load_token` by `delay`.
    pub fn set_load_delay(&self, delay: Duration) {
        self.load_delay_ms
            .store(delay.as_millis() as usize, Ordering::SeqCst);
    }

    /// Token as currently stored, bypassing counters.
    pub fn stored_token(&self) -> Option<Token> {
        self.lock().token.clone()
    }

    pub fn activities(&self) -> Vec<ActivityRecord> {
        self.lock().activities.values().cloned().collect()
    }

    /// Remove an activity directly (simulates an edit upstream).
    pub fn remove_activity(&self, activity_id: u64) {
        self.lock().activities.remove(&activity_id);
    }

    pub fn summary(&self, period: Period, period_start: DateTime<Utc>) -> Option<PeriodSummary> {
        self.lock().summaries.get(&(period, period_start)).cloned()
    }

    pub fn summary_count(&self) -> usize {
        self.lock().summaries.len()
    }

    fn check_reads(&self) -> Result<(), AppError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(AppError::Persistence("injected read failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl TokenBackend for MemoryStore {
    async fn save_token(&self, token: &Token) -> Result<(), AppError> {
        if self.fail_token_writes.load(Ordering::SeqCst) {
            return Err(AppError::Persistence(
                "injected token write failure".to_string(),
            ));
        }
        self.lock().token = Some(token.clone());
        self.token_saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn load_token(&self) -> Result<Option<Token>, AppError> {
        self.token_loads.fetch_add(1, Ordering::SeqCst);
        let delay = self.load_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay as u64)).await;
        }
        self.check_reads()?;
        Ok(self.lock().token.clone())
    }

    async fn clear_token(&self) -> Result<(), AppError> {
        if self.fail_token_writes.load(Ordering::SeqCst) {
            return Err(AppError::Persistence(
                "injected token write failure".to_string(),
            ));
        }
        self.lock().token = None;
        Ok(())
    }
}

#[async_trait]
impl ActivityStore for MemoryStore {
    async fn write_activity(&self, activity: &ActivityRecord) -> Result<(), AppError> {
        let mut inner = self.lock();
        if inner.failing_activity_ids.contains(&activity.id) {
            return Err(AppError::Persistence(format!(
                "injected write failure for activity {}",
                activity.id
            )));
        }
        inner.activities.insert(activity.id, activity.clone());
        self.activity_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn write_summary(&self, summary: &PeriodSummary) -> Result<(), AppError> {
        self.lock()
            .summaries
            .insert((summary.period, summary.period_start), summary.clone());
        Ok(())
    }

    async fn get_summary(
        &self,
        period: Period,
        period_start: DateTime<Utc>,
    ) -> Result<Option<PeriodSummary>, AppError> {
        self.check_reads()?;
        Ok(self.summary(period, period_start))
    }

    async fn latest_activity(&self) -> Result<Option<ActivityRecord>, AppError> {
        self.check_reads()?;
        Ok(self
            .lock()
            .activities
            .values()
            .max_by_key(|a| a.start_date)
            .cloned())
    }

    async fn activities_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ActivityRecord>, AppError> {
        self.check_reads()?;
        let mut found: Vec<ActivityRecord> = self
            .lock()
            .activities
            .values()
            .filter(|a| a.start_date >= start && a.start_date < end)
            .cloned()
            .collect();
        found.sort_by_key(|a| a.start_date);
        Ok(found)
    }
}
