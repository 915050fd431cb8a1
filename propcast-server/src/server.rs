use std::net::SocketAddr;
use std::time::Duration;

use axum_server::Handle;
use tracing::{error, info};

use propcast_core::{Database, Error};

use crate::config::Args;
use crate::routes::router;
use crate::state::AppState;

/// Connects, migrates and serves until Ctrl-C or SIGTERM.
pub async fn run_server(args: Args) -> Result<(), Error> {
    let addr: SocketAddr = args
        .listen_addr
        .parse()
        .map_err(|e| Error::Config(format!("invalid listen address '{}': {e}", args.listen_addr)))?;

    let db = Database::new(&args.database_url, args.db_max_connections).await?;
    db.migrate().await?;

    let state = AppState::from_database(&args, &db)?;
    if state.debug_routes {
        info!("Debug routes enabled.");
    }
    let app = router(state);

    let handle = Handle::new();
    tokio::spawn(shutdown_on_signal(handle.clone()));

    info!("Propcast listening on http://{}", addr);
    axum_server::bind(addr)
        .handle(handle)
        .serve(app.into_make_service_with_connect_info::<SocketAddr>())
        .await?;

    db.pool().close().await;
    info!("Server shut down.");
    Ok(())
}

async fn shutdown_on_signal(handle: Handle) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => error!("Failed to listen for SIGTERM: {}", e),
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received; draining connections.");
    handle.graceful_shutdown(Some(Duration::from_secs(10)));
}
