// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod activity;
pub mod summary;
pub mod token;

pub use activity::ActivityRecord;
pub use summary::{Period, PeriodSummary};
pub use token::Token;
