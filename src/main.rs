use anyhow::Context;
use clap::{Parser, Subcommand};

use seatpulse::auth;
use seatpulse::config::Config;
use seatpulse::db::{AppState, queries};
use seatpulse::handlers;
use seatpulse::license_key;

#[derive(Parser)]
#[command(name = "seatpulse", about = "Licensing heartbeat and seat-concurrency service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Generate license keys; optionally register them for an owner
    GenKey {
        /// Key prefix; defaults to the configured one
        #[arg(long)]
        prefix: Option<String>,
        #[arg(long, default_value_t = 1)]
        count: u32,
        /// Persist a license record owned by this user id
        #[arg(long)]
        owner: Option<String>,
        #[arg(long)]
        max_devices: Option<i64>,
    },
    /// Issue a portal bearer token for local testing
    GenToken {
        #[arg(long)]
        subject: String,
        #[arg(long)]
        email: String,
        #[arg(long, default_value_t = 24)]
        valid_hours: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "seatpulse=info,tower_http=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::GenKey {
            prefix,
            count,
            owner,
            max_devices,
        } => {
            let prefix = prefix.unwrap_or_else(|| config.license_key_prefix.clone());
            let state = AppState::new(config)?;
            let conn = state.db.get()?;
            for _ in 0..count {
                let key = license_key::generate(&prefix)?;
                if let Some(owner) = &owner {
                    let license = queries::create_license(&conn, owner, &key, max_devices)?;
                    println!("{key}  (license {})", license.license_id);
                } else {
                    println!("{key}");
                }
            }
            Ok(())
        }
        Command::GenToken {
            subject,
            email,
            valid_hours,
        } => {
            let state = AppState::new(config)?;
            let token = auth::issue_portal_token(&state.auth_key, &subject, &email, valid_hours)?;
            println!("{token}");
            Ok(())
        }
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let addr = config.addr();
    let state = AppState::new(config).context("failed to initialize application state")?;

    // Keep abandoned rate-limit windows from accumulating.
    let limiter = state.limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(300));
        loop {
            interval.tick().await;
            limiter.cleanup(3_600_000).await;
        }
    });

    let app = handlers::app(state);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("seatpulse listening on {addr}");
    axum::serve(listener, app).await?;
    Ok(())
}
