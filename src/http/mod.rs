//! HTTP API used by the web view.
//!
//! An Axum server on its own tokio runtime thread, sharing the button store
//! and the sound engine with the desktop window.

mod routes;

pub use routes::{AppState, build_router, run_http_server};

use log::{error, info};
use std::net::SocketAddr;
use std::thread::{self, JoinHandle};

/// Start the API server on a dedicated thread
///
/// Bind and runtime failures are logged; the desktop window keeps running
/// without the web view.
pub fn spawn_server(state: AppState, addr: SocketAddr) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("soundboard-http".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_multi_thread()
                .worker_threads(2)
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(err) => {
                    error!("Failed to build tokio runtime for HTTP server: {}", err);
                    return;
                }
            };

            info!("HTTP API binding {}", addr);
            runtime.block_on(async move {
                if let Err(err) = run_http_server(state, addr).await {
                    error!("HTTP server stopped: {}", err);
                }
            });
        })
}
