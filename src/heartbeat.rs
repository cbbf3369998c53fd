//! Heartbeat rule evaluation: trial vs. licensed handling and the sliding
//! concurrent-device window.
//!
//! This module is pure; handlers feed it records and timestamps and persist
//! its side effects. The window length always arrives from
//! `Config::device_window_hours` so every call site agrees on the same value.

use serde::{Deserialize, Serialize};
use strum::AsRefStr;

use crate::models::{Device, License};

/// Interval hint returned to clients, in seconds.
pub const NEXT_HEARTBEAT_SECS: i64 = 900;

const SECONDS_PER_HOUR: i64 = 3600;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum HeartbeatStatus {
    Trial,
    Active,
    /// Advisory: over the allowance but the heartbeat itself is not blocked
    OverLimit,
    /// Strict: refused at the activation gate
    DeviceLimitExceeded,
}

/// Two call sites historically disagreed on whether exceeding the device
/// limit blocks the call. Both behaviors are kept, explicitly named: the
/// heartbeat route is advisory, the activation gate is strict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnforcementMode {
    Advisory,
    Strict,
}

/// Evaluation result, independent of transport shape.
#[derive(Debug, Clone)]
pub struct Decision {
    pub valid: bool,
    pub status: HeartbeatStatus,
    pub reason: Option<String>,
    pub concurrent_machines: Option<i64>,
    pub max_machines: Option<i64>,
    pub upgrade: Option<String>,
}

/// Count devices whose last-seen timestamp (creation time for never-seen
/// devices) falls within the trailing window. The boundary is inclusive: a
/// device seen exactly `window_hours` ago still counts.
pub fn active_devices_in_window(devices: &[Device], window_hours: i64, now: i64) -> usize {
    let cutoff = now - window_hours * SECONDS_PER_HOUR;
    devices.iter().filter(|d| d.seen_at() >= cutoff).count()
}

/// Fixed decision for the trial branch: always valid, always 1-of-1
/// machines. Device-limit logic is never consulted for trials.
pub fn trial_decision() -> Decision {
    Decision {
        valid: true,
        status: HeartbeatStatus::Trial,
        reason: None,
        concurrent_machines: Some(1),
        max_machines: Some(1),
        upgrade: None,
    }
}

/// Fail-open decision when a well-formed key has no local license record:
/// the key already passed format and checksum, so upstream validity is
/// assumed and limits are reported unknown.
pub fn unknown_license_decision() -> Decision {
    Decision {
        valid: true,
        status: HeartbeatStatus::Active,
        reason: None,
        concurrent_machines: None,
        max_machines: None,
        upgrade: None,
    }
}

/// Evaluate a licensed heartbeat against the license's concurrency window.
pub fn evaluate_license(
    license: &License,
    devices: &[Device],
    window_hours: i64,
    now: i64,
    mode: EnforcementMode,
) -> Decision {
    let concurrent = active_devices_in_window(devices, window_hours, now) as i64;

    if let Some(max) = license.max_devices
        && concurrent > max
    {
        let reason = format!(
            "{concurrent} devices active in the last {window_hours}h exceeds the limit of {max}"
        );
        return match mode {
            EnforcementMode::Advisory => Decision {
                valid: true,
                status: HeartbeatStatus::OverLimit,
                reason: Some(reason),
                concurrent_machines: Some(concurrent),
                max_machines: Some(max),
                upgrade: Some(
                    "Upgrade your plan to run more devices at the same time.".to_string(),
                ),
            },
            EnforcementMode::Strict => Decision {
                valid: false,
                status: HeartbeatStatus::DeviceLimitExceeded,
                reason: Some(reason),
                concurrent_machines: Some(concurrent),
                max_machines: Some(max),
                upgrade: None,
            },
        };
    }

    Decision {
        valid: true,
        status: HeartbeatStatus::Active,
        reason: None,
        concurrent_machines: Some(concurrent),
        max_machines: license.max_devices,
        upgrade: None,
    }
}
