use std::sync::Arc;

use salvo::conn::TcpListener;
use salvo::{Listener, Router};

use rota_app::app::api::routes;
use rota_app::config::ConfigHandler;
use rota_app::scheduler_handler::SchedulerHandler;
use rota_core::config::load_config;
use rota_db::db::connection::create_pool;
use rota_db::db::migrate;
use rota_service::scheduler::MaterializationScheduler;
use rota_service::store::PgStore;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, reload, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (filter_layer, filter_handle) = reload::Layer::new(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        )
        .init();

    tracing::info!("Starting Rota materialization server");

    let config = load_config()?;

    tracing::info!(config = ?config, "Configuration loaded");

    if let Ok(filter) = EnvFilter::try_new(config.logging.level.as_str()) {
        if let Err(e) = filter_handle.modify(|current| *current = filter) {
            tracing::warn!(error = %e, "Failed to update log filter from config");
        }
    } else {
        tracing::warn!(level = %config.logging.level, "Invalid log level in config, keeping debug");
    }

    migrate::run_pending(&config.database.url).await?;

    let pool = create_pool(
        &config.database.url,
        u32::from(config.database.max_connections),
    )
    .await?;

    tracing::info!("Database connection pool created.");

    let scheduler = MaterializationScheduler::new(
        Arc::new(PgStore::new(pool)),
        config.materializer.clone(),
    );
    let scheduler_handle = scheduler.handle();
    let _scheduler_task = tokio::spawn(scheduler.run());

    let bind_addr = config.server.bind_addr();
    let acceptor = TcpListener::new(bind_addr.clone()).bind().await;

    let router = Router::new()
        .hoop(SchedulerHandler {
            handle: scheduler_handle,
        })
        .hoop(ConfigHandler {
            settings: config.clone(),
        })
        .push(routes());

    tracing::info!("Server listening on {bind_addr}");

    salvo::Server::new(acceptor).serve(router).await;

    Ok(())
}
