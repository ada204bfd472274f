// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod aggregation;
pub mod ftp;
pub mod import;
pub mod metrics;
pub mod publisher;
pub mod state_store;
pub mod strava;
pub mod token_cache;

pub use aggregation::Aggregator;
pub use ftp::{FtpError, FtpService};
pub use import::{ImportPipeline, ImportReport};
pub use publisher::{Publisher, TwitterPublisher};
pub use state_store::StateStore;
pub use strava::{StravaClient, StravaService};
pub use token_cache::TokenCache;
