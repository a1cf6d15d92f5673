//! Сервер VaxiShare

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use vaxishare::{api, config::Config, Allocator};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("не удалось загрузить конфигурацию")?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let allocator = Allocator::from_config(&config).await?;
    let status = allocator.status().await;
    info!(
        "Аллокатор готов: {} больниц, {} доз на складе",
        config.hospitals.len(),
        status.available_vaccines
    );

    let addr = config.socket_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("не удалось занять адрес {}", addr))?;
    info!("Сервер слушает http://{}", addr);

    axum::serve(listener, api::router(allocator))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Сервер остановлен");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Не удалось установить обработчик Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Получен сигнал остановки");
}
