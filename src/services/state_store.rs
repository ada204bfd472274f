// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! One-time OAuth `state` values for the Strava redirect handshake.
//!
//! A state is handed to the browser on `/auth/login` and must come back
//! unchanged on `/auth/callback`. Each value validates at most once and is
//! forgotten after [`STATE_TTL_SECS`] even if nobody ever presents it.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use ring::rand::{SecureRandom, SystemRandom};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::error::AppError;

/// How long an issued state stays acceptable.
pub const STATE_TTL_SECS: i64 = 10 * 60;

/// Random bytes behind each state value.
const STATE_BYTES: usize = 32;

/// In-memory set of outstanding OAuth states.
pub struct StateStore {
    rng: SystemRandom,
    states: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore {
    pub fn new() -> Self {
        Self {
            rng: SystemRandom::new(),
            states: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, DateTime<Utc>>> {
        self.states.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Issue a fresh state valid for ten minutes.
    pub fn generate_and_store(&self) -> Result<String, AppError> {
        self.generate_and_store_at(Utc::now())
    }

    pub fn generate_and_store_at(&self, now: DateTime<Utc>) -> Result<String, AppError> {
        let mut bytes = [0u8; STATE_BYTES];
        self.rng.fill(&mut bytes).map_err(|_| {
            AppError::Internal(anyhow::anyhow!("System random source unavailable"))
        })?;
        let state = URL_SAFE_NO_PAD.encode(bytes);

        self.lock()
            .insert(state.clone(), now + Duration::seconds(STATE_TTL_SECS));
        Ok(state)
    }

    /// Consume `state`. True only the first time a live state is presented.
    pub fn validate_and_remove(&self, state: &str) -> bool {
        self.validate_and_remove_at(state, Utc::now())
    }

    pub fn validate_and_remove_at(&self, state: &str, now: DateTime<Utc>) -> bool {
        match self.lock().remove(state) {
            Some(expires_at) => now < expires_at,
            None => false,
        }
    }

    /// Drop every state whose expiry has passed. Returns how many went.
    pub fn sweep_expired(&self) -> usize {
        self.sweep_expired_at(Utc::now())
    }

    pub fn sweep_expired_at(&self, now: DateTime<Utc>) -> usize {
        let mut states = self.lock();
        let before = states.len();
        states.retain(|_, expires_at| now < *expires_at);
        before - states.len()
    }

    /// Outstanding (not yet consumed or swept) states.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
