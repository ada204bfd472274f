// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Middleware modules (login gates, security headers).

pub mod auth;
pub mod security;

pub use auth::{require_token, require_token_api};
