/// DotaDash: Dota 2 esports dashboard
///
/// Co dělá:
///   1. Každých REFRESH_INTERVAL_SECS stáhne data sledovaných týmů z OpenDota + rozpis z Liquipedie
///   2. Každých LIVE_REFRESH_INTERVAL_SECS obnoví jen live hry
///   3. Servíruje snapshot, hrdiny hráčů, proxy obrázků a frontend z ./public
///
/// Spuštění:
///   PORT=3000 cargo run --bin dota-dash

use anyhow::{Context, Result};
use dota_dash::http::start_http_server;
use dota_dash::refresh::spawn_schedules;
use dota_dash::{Config, DashState};
use dotenv::dotenv;
use std::env;
use std::fs::File;
use std::net::SocketAddr;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let config = Config::from_env()?;

    info!("=== DotaDash ===");
    info!("OpenDota: {} (api key: {})", config.opendota_base_url, if config.api_key.is_some() { "yes" } else { "no" });
    info!("Liquipedia: {}", config.liquipedia_url);
    info!("Static: {:?}, logs: {:?}", config.static_dir, config.log_dir);

    // Single instance lock (per port)
    let lock_file_path = env::temp_dir().join(format!("dota_dash_{}.lock", config.port));
    let lock_file = File::create(&lock_file_path)
        .context(format!("Failed to create lock file at {:?}", lock_file_path))?;

    let mut lock = fd_lock::RwLock::new(lock_file);
    let _write_guard = match lock.try_write() {
        Ok(guard) => {
            info!("Acquired single-instance lock.");
            guard
        }
        Err(_) => {
            warn!("Another instance of dota-dash is already running on port {}! Exiting.", config.port);
            return Ok(());
        }
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let state = DashState::new(config);

    spawn_schedules(state.clone());

    start_http_server(state, addr).await
}
