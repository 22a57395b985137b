use std::sync::Arc;
use std::time::Duration;

use payment_router::app::config::Config;
use payment_router::handlers;
use payment_router::services::{Distributor, HealthMonitor, ProcessorClient};
use payment_router::store::{PaymentStore, RedisStore, SharedStore};
use redis::aio::ConnectionManager;
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = Config::from_env();
    info!(
        "starting payment router with {} workers on port {}",
        config.workers, config.server_port
    );

    let redis_client =
        redis::Client::open(config.redis_url.as_str()).expect("invalid redis URL");
    let manager = ConnectionManager::new(redis_client)
        .await
        .expect("failed to connect to redis");
    let backend: Arc<dyn SharedStore> = Arc::new(RedisStore::new(manager));
    let store = PaymentStore::new(backend.clone());

    let processor_client = Arc::new(ProcessorClient::new());
    let health = Arc::new(HealthMonitor::new(
        &config,
        backend,
        processor_client.clone(),
    ));
    tokio::spawn(health.clone().run());

    let distributor = Arc::new(Distributor::new(store.clone(), health, processor_client));
    distributor.spawn_workers(config.workers);

    let app = handlers::router(store);

    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = TcpListener::bind(&addr).await.expect("failed to bind listener");
    info!("server listening on {}", addr);

    // Workers não são cancelados no shutdown: claims pendentes ficam nas
    // filas privadas e são recuperados no restart
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received, draining connections");
    // Encerramento forçado se o drain passar do período de graça
    tokio::spawn(async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        std::process::exit(0);
    });
}
