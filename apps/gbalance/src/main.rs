use anyhow::Context;
use gbalance_core::bootstrap::bootstrap_from_env;
use gbalance_router::app_router;
use tracing::info;

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("gbalance failed: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let boot = bootstrap_from_env().await?;
    let config = boot.config.load();
    let bind = format!("{}:{}", config.host, config.port);
    info!(
        host = %config.host,
        port = config.port,
        base_url = %config.base_url,
        api_keys = config.api_keys.len(),
        allowed_tokens = config.allowed_tokens.len(),
        admin_enabled = config.auth_token.is_some(),
        proxy = %config.proxy.as_deref().unwrap_or(""),
        "config loaded"
    );

    let app = app_router(boot.gateway);
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("bind {bind}"))?;
    info!(addr = %bind, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serve")?;
    info!("shutdown complete");
    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("gbalance=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // Without a signal handler the server runs until killed.
        std::future::pending::<()>().await;
    }
}
