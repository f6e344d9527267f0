use std::sync::Arc;

use actix_web::middleware::{Logger, NormalizePath};
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use anyhow::Context;

use leave_ledger::config::Config;
use leave_ledger::db::init_db;
use leave_ledger::ledger::{Ledger, MySqlLeaveStore};
use leave_ledger::routes;
use leave_ledger::utils::leave_type_cache::LeaveTypeCache;

use tracing::info;
use tracing_appender::rolling;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(config.log_level)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .init();

    info!(
        addr = %config.server_addr,
        policy = %config.quota_policy,
        "Server starting..."
    );

    let pool = init_db(&config)
        .await
        .context("Failed to connect to the database")?;

    let store = MySqlLeaveStore::new(pool, config.lock_wait_timeout_secs);
    let ledger = Data::new(Ledger::new(
        Arc::new(store),
        config.quota_policy,
        LeaveTypeCache::new(config.leave_type_cache_ttl),
    ));

    // One limiter for all workers
    let limiter = routes::rate_limit(config.rate_protected_per_min);

    let server_addr = config.server_addr.clone();
    let config_data = Data::new(config);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(NormalizePath::trim())
            .app_data(config_data.clone())
            .app_data(ledger.clone())
            .configure(|cfg| routes::configure(cfg, &config_data, &limiter))
    })
    .bind(&server_addr)
    .with_context(|| format!("Failed to bind {server_addr}"))?
    .run()
    .await?;

    info!("Server stopped");
    Ok(())
}
