// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Strava importer: pulls activities from Strava on a schedule
//!
//! Activities are enriched with FTP-based training load (NP, IF, TSS),
//! stored, rolled up into weekly/monthly/yearly summaries, and the fresh ones
//! are announced on X. A small HTTP surface handles the Strava OAuth login,
//! a dashboard payload, and manual job triggers.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod scheduler;
pub mod services;
pub mod time_utils;

use config::Config;
use db::ActivityStore;
use scheduler::Scheduler;
use services::{FtpService, StateStore, StravaService};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn ActivityStore>,
    pub strava: StravaService,
    pub states: Arc<StateStore>,
    pub ftp: Arc<FtpService>,
    pub scheduler: Arc<Scheduler>,
}
