// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! FTP (functional threshold power) history.
//!
//! Read from a small `date,ftp` file such as:
//!
//! ```text
//! date,ftp
//! 2024-01-01,230
//! 2024-06-15,250
//! ```
//!
//! The header is optional. Rows that do not parse are skipped with a warning.

use chrono::{NaiveDate, Utc};
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard};

/// One FTP value and the day it took effect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FtpRecord {
    pub date: NaiveDate,
    pub ftp: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum FtpError {
    #[error("Failed to read FTP file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// FTP lookup table, reloadable while the service runs.
pub struct FtpService {
    path: PathBuf,
    records: RwLock<Vec<FtpRecord>>,
}

impl FtpService {
    /// Empty table backed by `path`; call [`FtpService::reload`] to fill it.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            records: RwLock::new(Vec::new()),
        }
    }

    /// Table with fixed records (tests).
    pub fn from_records(records: Vec<FtpRecord>) -> Self {
        let service = Self::new(PathBuf::new());
        *service
            .records
            .write()
            .unwrap_or_else(|e| e.into_inner()) = sorted(records);
        service
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<FtpRecord>> {
        self.records.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Re-read the backing file. On error the previous table is kept.
    pub fn reload(&self) -> Result<usize, FtpError> {
        let records = load_from_file(&self.path)?;
        let count = records.len();
        *self.records.write().unwrap_or_else(|e| e.into_inner()) = records;

        tracing::info!(path = %self.path.display(), records = count, "Loaded FTP data");
        Ok(count)
    }

    /// Like [`FtpService::reload`], but only logs failures.
    pub fn reload_or_warn(&self) {
        if let Err(e) = self.reload() {
            tracing::warn!(error = %e, "FTP reload failed, keeping previous values");
        }
    }

    /// FTP in effect on `date`: the latest record on or before it, else 0.
    pub fn ftp_for_date(&self, date: NaiveDate) -> f64 {
        self.read()
            .iter()
            .take_while(|r| r.date <= date)
            .last()
            .map_or(0.0, |r| r.ftp)
    }

    pub fn current_ftp(&self) -> f64 {
        self.ftp_for_date(Utc::now().date_naive())
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

fn sorted(mut records: Vec<FtpRecord>) -> Vec<FtpRecord> {
    records.sort_by_key(|r| r.date);
    records
}

/// Read and parse an FTP file.
pub fn load_from_file(path: &Path) -> Result<Vec<FtpRecord>, FtpError> {
    let contents = std::fs::read_to_string(path).map_err(|source| FtpError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_records(&contents))
}

/// Parse `date,ftp` lines, skipping a header and malformed rows.
pub fn parse_records(contents: &str) -> Vec<FtpRecord> {
    let mut records = Vec::new();

    for (line_no, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let mut fields = line.split(',').map(str::trim);
        let (Some(date), Some(ftp)) = (fields.next(), fields.next()) else {
            tracing::warn!(line = line_no + 1, "FTP row has fewer than two fields");
            continue;
        };

        if line_no == 0 && date.eq_ignore_ascii_case("date") {
            continue;
        }

        let date = match NaiveDate::parse_from_str(date, "%Y-%m-%d") {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!(line = line_no + 1, date, error = %e, "Failed to parse FTP date");
                continue;
            }
        };
        let ftp = match ftp.parse::<f64>() {
            Ok(v) if v.is_finite() => v,
            _ => {
                tracing::warn!(line = line_no + 1, ftp, "Failed to parse FTP value");
                continue;
            }
        };

        records.push(FtpRecord { date, ftp });
    }

    sorted(records)
}
