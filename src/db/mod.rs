//! Storage plumbing: connection pool, schema, and shared application state.
//!
//! Persistence is a single composite-keyed record table. Domain records are
//! serialized JSON tagged by kind; all typed access goes through
//! [`queries`], which refuses to hand back a record under the wrong kind.

pub mod queries;

use jwt_simple::algorithms::HS256Key;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

use crate::config::Config;
use crate::error::Result;
use crate::rate_limit::RateLimiter;

pub type DbPool = r2d2::Pool<SqliteConnectionManager>;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS records (
    pk          TEXT NOT NULL,
    sk          TEXT NOT NULL,
    kind        TEXT NOT NULL,
    data        TEXT NOT NULL,
    created_at  INTEGER NOT NULL,
    updated_at  INTEGER NOT NULL,
    PRIMARY KEY (pk, sk)
);

CREATE INDEX IF NOT EXISTS idx_records_email
    ON records (json_extract(data, '$.email'))
    WHERE kind IN ('customer', 'membership');

CREATE INDEX IF NOT EXISTS idx_records_license_key
    ON records (json_extract(data, '$.license_key'))
    WHERE kind = 'license';
";

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Config,
    pub limiter: RateLimiter,
    pub auth_key: HS256Key,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        let db = init_pool(&config.database_path)?;
        let auth_key = HS256Key::from_bytes(config.jwt_secret.as_bytes());
        Ok(Self {
            db,
            config,
            limiter: RateLimiter::new(),
            auth_key,
        })
    }
}

/// Open (or create) the database and apply the schema.
pub fn init_pool(path: &str) -> Result<DbPool> {
    let manager = SqliteConnectionManager::file(path).with_init(|conn| {
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA busy_timeout = 5000;")
    });
    let pool = r2d2::Pool::builder().build(manager)?;
    let conn = pool.get()?;
    init_schema(&conn)?;
    Ok(pool)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}
