//! Startup configuration shared by the server and the CLI.
//!
//! This is the only place environment variables are read. Values are resolved once and the
//! resulting [`CoreConfig`] is passed into services.

use std::env;
use ward_core::config::{
    max_concurrent_queries_from_env_value, request_timeout_from_env_value,
    source_settings_from_env_values,
};
use ward_core::{source, CoreConfig, SharedSource, SourceSettings, WardResult};

/// Resolves core configuration and the record source settings from `WARD_*` variables.
pub fn settings_from_env() -> WardResult<(CoreConfig, SourceSettings)> {
    let cfg = CoreConfig::new(
        max_concurrent_queries_from_env_value(env::var("WARD_MAX_CONCURRENT_QUERIES").ok())?,
        request_timeout_from_env_value(env::var("WARD_REQUEST_TIMEOUT_SECS").ok())?,
    )?;
    let settings = source_settings_from_env_values(
        env::var("WARD_SOURCE_URL").ok(),
        env::var("WARD_SOURCE_KEY").ok(),
        env::var("WARD_FIXTURE_FILE").ok(),
    )?;
    Ok((cfg, settings))
}

/// [`settings_from_env`] followed by connecting to the selected source.
pub fn connect_from_env() -> WardResult<(CoreConfig, SharedSource)> {
    let (cfg, settings) = settings_from_env()?;
    let source = source::connect(&settings, &cfg)?;
    tracing::info!(
        "record source ready (max {} concurrent queries)",
        cfg.max_concurrent_queries()
    );
    Ok((cfg, source))
}
