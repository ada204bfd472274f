// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cron-driven background jobs.
//!
//! Jobs are registered up front and handed to `tokio-cron-scheduler` when the
//! scheduler starts. Every fire runs on its own task under the job timeout;
//! a failure is logged and kept as the job's `last_error`, and never touches
//! other jobs. A fire that arrives while the previous run of the same job is
//! still going is skipped.

pub mod jobs;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_cron_scheduler::{Job, JobScheduler as CronScheduler};

use crate::error::AppError;

/// Work performed by one scheduled job.
#[async_trait]
pub trait ScheduledTask: Send + Sync {
    async fn run(&self) -> Result<(), AppError>;
}

/// Snapshot of one job for logs and the jobs endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobStatus {
    pub name: String,
    pub cron: String,
    pub running: bool,
    pub last_run: Option<DateTime<Utc>>,
    /// Error of the most recent run, `None` if it succeeded
    pub last_error: Option<String>,
    pub runs: u64,
    /// Fires dropped because the job was still running
    pub skipped: u64,
}

#[derive(Default)]
struct RunHistory {
    last_run: Option<DateTime<Utc>>,
    last_error: Option<String>,
    runs: u64,
    skipped: u64,
}

struct JobEntry {
    name: String,
    cron: String,
    task: Arc<dyn ScheduledTask>,
    running: AtomicBool,
    history: Mutex<RunHistory>,
}

impl JobEntry {
    fn history(&self) -> std::sync::MutexGuard<'_, RunHistory> {
        self.history.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn status(&self) -> JobStatus {
        let history = self.history();
        JobStatus {
            name: self.name.clone(),
            cron: self.cron.clone(),
            running: self.running.load(Ordering::SeqCst),
            last_run: history.last_run,
            last_error: history.last_error.clone(),
            runs: history.runs,
            skipped: history.skipped,
        }
    }
}

/// Clears the running flag even if the task panics.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Run `entry` once, unless it is already running. Returns whether it ran.
async fn execute(entry: Arc<JobEntry>, job_timeout: Duration) -> bool {
    if entry.running.swap(true, Ordering::SeqCst) {
        tracing::warn!(job = %entry.name, "Previous run still in progress, skipping");
        entry.history().skipped += 1;
        return false;
    }
    let _running = RunningGuard(&entry.running);

    let started = Utc::now();
    tracing::info!(job = %entry.name, "Job started");

    let outcome = tokio::time::timeout(job_timeout, entry.task.run()).await;
    let elapsed_ms = (Utc::now() - started).num_milliseconds();

    let error = match outcome {
        Ok(Ok(())) => {
            tracing::info!(job = %entry.name, elapsed_ms, "Job finished");
            None
        }
        Ok(Err(e)) => {
            // Transient failures are left to the next scheduled run.
            if e.is_transient() {
                tracing::warn!(job = %entry.name, elapsed_ms, error = %e, retryable = true, "Job failed");
            } else {
                tracing::error!(job = %entry.name, elapsed_ms, error = %e, retryable = false, "Job failed");
            }
            Some(e.to_string())
        }
        Err(_) => {
            tracing::error!(job = %entry.name, elapsed_ms, "Job timed out");
            Some(format!("timed out after {}s", job_timeout.as_secs()))
        }
    };

    let mut history = entry.history();
    history.last_run = Some(started);
    history.last_error = error;
    history.runs += 1;
    true
}

/// Owner of all background jobs.
pub struct Scheduler {
    jobs: RwLock<Vec<Arc<JobEntry>>>,
    job_timeout: Duration,
    cron: tokio::sync::Mutex<Option<CronScheduler>>,
}

impl Scheduler {
    pub fn new(job_timeout: Duration) -> Self {
        Self {
            jobs: RwLock::new(Vec::new()),
            job_timeout,
            cron: tokio::sync::Mutex::new(None),
        }
    }

    fn jobs(&self) -> Vec<Arc<JobEntry>> {
        self.jobs.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn find(&self, name: &str) -> Option<Arc<JobEntry>> {
        self.jobs().into_iter().find(|j| j.name == name)
    }

    /// Add a job. Names must be unique; registration only takes effect on
    /// the next [`Scheduler::start`].
    pub fn register(
        &self,
        name: &str,
        cron: &str,
        task: Arc<dyn ScheduledTask>,
    ) -> Result<(), AppError> {
        let mut jobs = self.jobs.write().unwrap_or_else(|e| e.into_inner());
        if jobs.iter().any(|j| j.name == name) {
            return Err(AppError::Configuration(format!(
                "job '{}' registered twice",
                name
            )));
        }

        jobs.push(Arc::new(JobEntry {
            name: name.to_string(),
            cron: cron.to_string(),
            task,
            running: AtomicBool::new(false),
            history: Mutex::new(RunHistory::default()),
        }));
        tracing::debug!(job = name, cron, "Registered job");
        Ok(())
    }

    /// Start firing jobs. Starting twice is a no-op.
    ///
    /// An unparseable cron expression fails the whole start.
    pub async fn start(&self) -> Result<(), AppError> {
        let mut guard = self.cron.lock().await;
        if guard.is_some() {
            tracing::debug!("Scheduler already started");
            return Ok(());
        }

        let mut cron = CronScheduler::new()
            .await
            .map_err(|e| AppError::Configuration(format!("Failed to create scheduler: {}", e)))?;

        let started = match self.add_jobs(&cron).await {
            Ok(()) => cron
                .start()
                .await
                .map_err(|e| AppError::Configuration(format!("Failed to start scheduler: {}", e))),
            Err(e) => Err(e),
        };
        if let Err(e) = started {
            // Jobs added before the failure must not outlive this call.
            if let Err(shutdown) = cron.shutdown().await {
                tracing::warn!(error = %shutdown, "Failed to shut down partial scheduler");
            }
            return Err(e);
        }

        *guard = Some(cron);
        tracing::info!("Scheduler started");
        Ok(())
    }

    async fn add_jobs(&self, cron: &CronScheduler) -> Result<(), AppError> {
        for entry in self.jobs() {
            let job_timeout = self.job_timeout;
            let fired = Arc::clone(&entry);
            let job = Job::new_async(entry.cron.as_str(), move |_id, _lock| {
                let entry = Arc::clone(&fired);
                Box::pin(async move {
                    // Own task, so a slow job never holds up the cron loop.
                    tokio::spawn(execute(entry, job_timeout));
                })
            })
            .map_err(|e| {
                AppError::Configuration(format!(
                    "Invalid cron expression '{}' for job {}: {}",
                    entry.cron, entry.name, e
                ))
            })?;

            cron.add(job).await.map_err(|e| {
                AppError::Configuration(format!("Failed to add job {}: {}", entry.name, e))
            })?;
            tracing::info!(job = %entry.name, cron = %entry.cron, "Scheduled job");
        }
        Ok(())
    }

    /// Stop firing jobs. Runs already in flight are not waited for.
    pub async fn stop(&self) -> Result<(), AppError> {
        let Some(mut cron) = self.cron.lock().await.take() else {
            return Ok(());
        };

        cron.shutdown()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Scheduler shutdown: {}", e)))?;
        tracing::info!("Scheduler stopped");
        Ok(())
    }

    pub async fn is_started(&self) -> bool {
        self.cron.lock().await.is_some()
    }

    /// Start a run of `name` in the background.
    ///
    /// The handle yields false if the run was skipped because one was
    /// already in progress.
    pub fn trigger(&self, name: &str) -> Result<JoinHandle<bool>, AppError> {
        let entry = self
            .find(name)
            .ok_or_else(|| AppError::NotFound(format!("job {}", name)))?;
        tracing::info!(job = name, "Manual trigger");
        Ok(tokio::spawn(execute(entry, self.job_timeout)))
    }

    /// Run `name` now and wait for it. Returns the job's status afterwards.
    pub async fn run_now(&self, name: &str) -> Result<JobStatus, AppError> {
        let handle = self.trigger(name)?;
        handle
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("job {} panicked: {}", name, e)))?;

        self.status(name)
            .ok_or_else(|| AppError::NotFound(format!("job {}", name)))
    }

    pub fn status(&self, name: &str) -> Option<JobStatus> {
        self.find(name).map(|j| j.status())
    }

    /// Status of every job, in registration order.
    pub fn statuses(&self) -> Vec<JobStatus> {
        self.jobs().iter().map(|j| j.status()).collect()
    }
}
