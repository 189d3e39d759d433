use std::{net::Ipv4Addr, path::PathBuf, sync::Arc, time::Duration};

use {
    axum::{Router, routing::get},
    tower_http::trace::TraceLayer,
    tracing::{error, info, warn},
};

use {buchi_config::BuchiConfig, buchi_passes::PassStore};

use crate::{
    handlers,
    net,
    shutdown::ShutdownHandle,
    state::{AppState, SharedFile},
};

/// How long in-flight transfers get to finish once shutdown is requested.
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Build the service router (shared between production startup and tests).
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/api/fileinfo", get(handlers::fileinfo))
        .route("/download", get(handlers::download))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the service until one download completes or an interrupt arrives.
pub async fn run(config: BuchiConfig, file_path: PathBuf) -> anyhow::Result<()> {
    // Fatal before anything starts: no file, no service.
    if !file_path.is_file() {
        anyhow::bail!("file does not exist: {}", file_path.display());
    }

    let device = buchi_device::connect(&config.device).await?;
    let shutdown = ShutdownHandle::new();
    let state = AppState {
        device: Arc::clone(&device),
        passes: PassStore::new(Duration::from_secs(config.pass_ttl_secs)),
        file: SharedFile::new(file_path),
        shutdown: shutdown.clone(),
    };
    let app = build_app(state);

    let listener =
        tokio::net::TcpListener::bind((Ipv4Addr::UNSPECIFIED, config.http_port)).await?;
    let addr = listener.local_addr()?;
    info!(%addr, "listener bound");

    let drain = shutdown.clone();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { drain.cancelled().await })
            .await
    });

    // The device shows this URL to whoever is standing next to it.
    let url = format!("http://{}:{}", net::share_host(), addr.port());
    info!(%url, "share url ready");
    if let Err(e) = device.write_url(&url).await {
        warn!(error = %e, "failed to write share url to device");
    }

    let interrupted = shutdown.clone();
    tokio::spawn(async move {
        interrupt_signal().await;
        info!("interrupt received");
        interrupted.trigger();
    });

    // First trigger wins, completed download or interrupt.
    shutdown.cancelled().await;

    match tokio::time::timeout(DRAIN_TIMEOUT, &mut server).await {
        Ok(Ok(Ok(()))) => info!("server stopped gracefully"),
        Ok(Ok(Err(e))) => error!(error = %e, "server error during shutdown"),
        Ok(Err(e)) => error!(error = %e, "server task failed"),
        Err(_) => {
            server.abort();
            warn!("graceful drain timed out, forcing stop");
        },
    }

    // Release the device whichever way we got here.
    if let Err(e) = device.close().await {
        warn!(error = %e, "device close failed");
    }
    Ok(())
}

/// Resolves on SIGINT or SIGTERM.
async fn interrupt_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install SIGINT handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            },
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
