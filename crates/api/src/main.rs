use certmill_infra::config::Config;

#[tokio::main]
async fn main() {
    certmill_observability::init();

    let config = Config::from_env();

    let runtime = match certmill_api::app::services::build_runtime(&config).await {
        Ok(runtime) => runtime,
        Err(err) => {
            tracing::error!(error = %err, "failed to start");
            std::process::exit(1);
        }
    };

    let app = certmill_api::app::build_app(runtime.ctx.clone());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {addr}: {e}"));

    tracing::info!(%addr, "certmill listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();

    tracing::info!("shutting down worker pool");
    runtime.workers.shutdown();
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
