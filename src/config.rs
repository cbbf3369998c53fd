use std::env;

/// Default sliding window (hours) within which a device counts as active.
///
/// Activation, heartbeat, and the store's device-count helper all read the
/// window from `Config::device_window_hours`, which is resolved exactly once
/// here. Callers never read the env var themselves.
pub const DEFAULT_DEVICE_WINDOW_HOURS: i64 = 2;

/// Default trial length in days.
pub const DEFAULT_TRIAL_DAYS: i64 = 14;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    /// Secret for portal bearer tokens and trial tokens (HS256)
    pub jwt_secret: String,
    /// Prefix for generated license keys (PREFIX-XXXX-XXXX-XXXX-CCCC)
    pub license_key_prefix: String,
    /// Sliding window in hours for the concurrent-device count
    pub device_window_hours: i64,
    pub trial_days: i64,
    /// Fallback update-notification metadata when no version record is stored
    pub latest_version: Option<String>,
    pub ready_version: Option<String>,
    pub ready_update_url: Option<String>,
    pub release_notes_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let device_window_hours: i64 = env::var("DEVICE_WINDOW_HOURS")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|h| *h > 0)
            .unwrap_or(DEFAULT_DEVICE_WINDOW_HOURS);

        let trial_days: i64 = env::var("TRIAL_DAYS")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|d| *d > 0)
            .unwrap_or(DEFAULT_TRIAL_DAYS);

        Self {
            host,
            port,
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "seatpulse.db".to_string()),
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| "dev-only-insecure-secret".to_string()),
            license_key_prefix: env::var("LICENSE_KEY_PREFIX")
                .unwrap_or_else(|_| "MOUSE".to_string()),
            device_window_hours,
            trial_days,
            latest_version: env::var("LATEST_VERSION").ok(),
            ready_version: env::var("READY_VERSION").ok(),
            ready_update_url: env::var("READY_UPDATE_URL").ok(),
            release_notes_url: env::var("RELEASE_NOTES_URL").ok(),
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
