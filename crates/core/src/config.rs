//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and passed into services. Nothing in this
//! crate reads environment variables; binaries read them and hand the raw values to the parsing
//! helpers below.

use crate::constants::{DEFAULT_MAX_CONCURRENT_QUERIES, DEFAULT_REQUEST_TIMEOUT_SECS};
use crate::error::{WardError, WardResult};
use std::path::PathBuf;
use std::time::Duration;

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    max_concurrent_queries: usize,
    request_timeout: Duration,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns `WardError::InvalidInput` if `max_concurrent_queries` is zero or the timeout is
    /// zero.
    pub fn new(max_concurrent_queries: usize, request_timeout: Duration) -> WardResult<Self> {
        if max_concurrent_queries == 0 {
            return Err(WardError::InvalidInput(
                "max_concurrent_queries must be at least 1".into(),
            ));
        }
        if request_timeout.is_zero() {
            return Err(WardError::InvalidInput(
                "request_timeout must be greater than zero".into(),
            ));
        }

        Ok(Self {
            max_concurrent_queries,
            request_timeout,
        })
    }

    /// Upper bound on count queries in flight for one aggregation call.
    pub fn max_concurrent_queries(&self) -> usize {
        self.max_concurrent_queries
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }
}

/// Which record source to connect to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceSettings {
    /// Hosted PostgREST endpoint.
    Postgrest { url: String, api_key: String },
    /// In-memory source seeded from a JSON fixture file.
    Fixture(PathBuf),
    /// Empty in-memory source.
    Empty,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse the concurrency cap from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns the default.
pub fn max_concurrent_queries_from_env_value(value: Option<String>) -> WardResult<usize> {
    match non_empty(value) {
        None => Ok(DEFAULT_MAX_CONCURRENT_QUERIES),
        Some(v) => v.parse::<usize>().map_err(|_| {
            WardError::InvalidInput(format!(
                "WARD_MAX_CONCURRENT_QUERIES must be a positive integer, got '{v}'"
            ))
        }),
    }
}

/// Parse the request timeout (whole seconds) from an optional string value.
pub fn request_timeout_from_env_value(value: Option<String>) -> WardResult<Duration> {
    match non_empty(value) {
        None => Ok(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)),
        Some(v) => v.parse::<u64>().map(Duration::from_secs).map_err(|_| {
            WardError::InvalidInput(format!(
                "WARD_REQUEST_TIMEOUT_SECS must be a whole number of seconds, got '{v}'"
            ))
        }),
    }
}

/// Decide the record source from the raw `WARD_SOURCE_URL`, `WARD_SOURCE_KEY` and
/// `WARD_FIXTURE_FILE` values.
///
/// A URL takes precedence over a fixture file and requires a key.
pub fn source_settings_from_env_values(
    url: Option<String>,
    api_key: Option<String>,
    fixture_file: Option<String>,
) -> WardResult<SourceSettings> {
    if let Some(url) = non_empty(url) {
        let api_key = non_empty(api_key).ok_or_else(|| {
            WardError::InvalidInput("WARD_SOURCE_KEY is required when WARD_SOURCE_URL is set".into())
        })?;
        return Ok(SourceSettings::Postgrest { url, api_key });
    }

    Ok(match non_empty(fixture_file) {
        Some(path) => SourceSettings::Fixture(PathBuf::from(path)),
        None => SourceSettings::Empty,
    })
}
