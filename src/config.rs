//! Engine configuration.
//!
//! [`EngineConfig`] is an immutable value built once at startup and passed
//! into every resolver and filter call. The engine never mutates it, so
//! concurrent workers can share it freely.
//!
//! # Example
//!
//! ```rust
//! use voicepack::config::EngineConfig;
//!
//! # fn main() -> voicepack::Result<()> {
//! let config = EngineConfig::new("+15550100100")?
//!     .with_newer_than("2024-01-01")?
//!     .with_alias_required(true)
//!     .with_workers(8);
//!
//! config.validate()?;
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::VoicepackError;
use crate::phone::PhoneNumber;

/// Immutable engine configuration.
///
/// Invalid or contradictory values are rejected by [`validate`]
/// (`EngineConfig::validate`) before any fragment processing begins; no
/// filter or resolver ever sees a half-valid configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// The account holder's number. Excluded from every participant set
    /// used for conversation identity.
    pub own_number: PhoneNumber,

    /// Include only messages at or after this instant.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub newer_than: Option<DateTime<Utc>>,

    /// Include only messages at or before this instant.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub older_than: Option<DateTime<Utc>>,

    /// Require the counterpart to have a registered alias (default: false).
    pub alias_required: bool,

    /// Keep toll-free and short-code counterparts (default: false).
    pub include_service_codes: bool,

    /// Worker pool size for fragment processing (default: 4).
    pub workers: usize,
}

impl EngineConfig {
    /// Creates a configuration with the given own number and defaults.
    ///
    /// # Errors
    ///
    /// Returns [`VoicepackError::InvalidPhoneNumber`] if the own number
    /// doesn't normalize.
    pub fn new(own_number: &str) -> Result<Self, VoicepackError> {
        Ok(Self {
            own_number: PhoneNumber::normalize(own_number)?,
            newer_than: None,
            older_than: None,
            alias_required: false,
            include_service_codes: false,
            workers: 4,
        })
    }

    /// Sets the lower date bound (inclusive, start of day).
    ///
    /// Date format: `YYYY-MM-DD`.
    pub fn with_newer_than(mut self, date_str: &str) -> Result<Self, VoicepackError> {
        let naive = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
            .map_err(|_| VoicepackError::invalid_date(date_str))?;
        self.newer_than = Some(naive.and_hms_opt(0, 0, 0).unwrap().and_utc());
        Ok(self)
    }

    /// Sets the upper date bound (inclusive, end of day).
    ///
    /// Date format: `YYYY-MM-DD`.
    pub fn with_older_than(mut self, date_str: &str) -> Result<Self, VoicepackError> {
        let naive = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
            .map_err(|_| VoicepackError::invalid_date(date_str))?;
        self.older_than = Some(naive.and_hms_opt(23, 59, 59).unwrap().and_utc());
        Ok(self)
    }

    /// Sets the lower bound directly from a parsed [`DateTime`].
    #[must_use]
    pub fn with_newer_than_instant(mut self, dt: DateTime<Utc>) -> Self {
        self.newer_than = Some(dt);
        self
    }

    /// Sets the upper bound directly from a parsed [`DateTime`].
    #[must_use]
    pub fn with_older_than_instant(mut self, dt: DateTime<Utc>) -> Self {
        self.older_than = Some(dt);
        self
    }

    /// Requires counterparts to have a registered alias.
    #[must_use]
    pub fn with_alias_required(mut self, required: bool) -> Self {
        self.alias_required = required;
        self
    }

    /// Keeps toll-free and short-code counterparts.
    #[must_use]
    pub fn with_include_service_codes(mut self, include: bool) -> Self {
        self.include_service_codes = include;
        self
    }

    /// Sets the worker pool size.
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Returns `true` if either date bound is set.
    pub fn has_date_filter(&self) -> bool {
        self.newer_than.is_some() || self.older_than.is_some()
    }

    /// Checks the configuration for contradictions.
    ///
    /// # Errors
    ///
    /// Returns [`VoicepackError::Config`] when `newer_than` is after
    /// `older_than` or the worker count is zero. Fatal at startup, before
    /// any fragment is touched.
    pub fn validate(&self) -> Result<(), VoicepackError> {
        if let (Some(newer), Some(older)) = (self.newer_than, self.older_than) {
            if newer > older {
                return Err(VoicepackError::config(format!(
                    "date range is empty: newer_than {newer} is after older_than {older}"
                )));
            }
        }
        if self.workers == 0 {
            return Err(VoicepackError::config("worker count must be at least 1"));
        }
        Ok(())
    }
}
