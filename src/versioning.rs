//! Update-notification metadata attached to every heartbeat-family response.
//!
//! Sourced from the single CONFIG/VERSION store record, falling back to env
//! configuration. The deprecated `min_version` field was removed from the
//! wire format entirely; no output type carries it.

use rusqlite::Connection;

use crate::config::Config;
use crate::db::queries;
use crate::error::Result;

pub use crate::models::VersionInfo;

/// Resolve the version fields for a response. A missing or unreadable store
/// record falls back to config defaults rather than failing the request.
pub fn compose(conn: &Connection, config: &Config) -> VersionInfo {
    match queries::get_version_config(conn) {
        Ok(Some(info)) => info,
        Ok(None) => from_config(config),
        Err(e) => {
            tracing::warn!("version config read failed, using defaults: {e}");
            from_config(config)
        }
    }
}

fn from_config(config: &Config) -> VersionInfo {
    VersionInfo {
        latest_version: config.latest_version.clone(),
        ready_version: config.ready_version.clone(),
        ready_update_url: config.ready_update_url.clone(),
        release_notes_url: config.release_notes_url.clone(),
    }
}

/// Store or replace the CONFIG/VERSION record.
pub fn store(conn: &Connection, info: &VersionInfo) -> Result<()> {
    queries::put_version_config(conn, info)
}
