//! HTTP server lifecycle: bind, serve `clinic_router()`, shut down on
//! Ctrl+C or SIGTERM.
//!
//! `start_server_on` binds and spawns the server in a background task,
//! returning a handle with a shutdown channel. `serve` drives that handle
//! from the process signals and is what the binary runs.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::api::router::clinic_router;
use crate::config::Config;
use crate::core_state::CoreState;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },
    #[error("Server I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Server task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Handle to a running server.
pub struct ClinicServer {
    pub addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<(), std::io::Error>>,
}

impl ClinicServer {
    /// Ask the server to stop accepting connections and drain.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            tracing::info!("Server shutdown signal sent");
        }
    }

    /// Wait for the server task to finish.
    pub async fn stopped(self) -> Result<(), ServerError> {
        self.task.await??;
        Ok(())
    }
}

/// Bind `addr` and serve the clinic in a background task.
///
/// Port 0 picks an ephemeral port; the bound address is on the handle.
pub async fn start_server_on(
    core: Arc<CoreState>,
    addr: SocketAddr,
    public_dir: Option<PathBuf>,
) -> Result<ClinicServer, ServerError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    let addr = listener.local_addr()?;

    let app = clinic_router(core, public_dir);
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        tracing::info!(%addr, "Server started");
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await;
        tracing::info!("Server stopped");
        result
    });

    Ok(ClinicServer {
        addr,
        shutdown_tx: Some(shutdown_tx),
        task,
    })
}

/// Serve until Ctrl+C or SIGTERM, then shut down gracefully.
pub async fn serve(core: Arc<CoreState>, config: &Config) -> Result<(), ServerError> {
    let addr = SocketAddr::new(config.bind, config.port);
    let mut server = start_server_on(core, addr, Some(config.public_dir.clone())).await?;

    let finished_early = tokio::select! {
        () = shutdown_signal() => None,
        result = &mut server.task => Some(result),
    };

    match finished_early {
        Some(result) => {
            result??;
            Ok(())
        }
        None => {
            server.shutdown();
            server.stopped().await
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                tracing::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn test_core() -> (Arc<CoreState>, tempfile::TempDir) {
        let tmp = tempfile::tempdir().unwrap();
        let core = CoreState::open(&tmp.path().join("clinic.db"), 1_000).unwrap();
        (Arc::new(core), tmp)
    }

    fn localhost() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)
    }

    #[tokio::test]
    async fn start_serve_and_stop() {
        let (core, _tmp) = test_core();
        let mut server = start_server_on(core, localhost(), None)
            .await
            .expect("server should start");
        assert!(server.addr.port() > 0);

        let mut stream = tokio::net::TcpStream::connect(server.addr).await.unwrap();
        stream
            .write_all(b"GET /home HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut raw = Vec::new();
        stream.read_to_end(&mut raw).await.unwrap();
        let text = String::from_utf8_lossy(&raw);
        assert!(text.starts_with("HTTP/1.1 200"), "got: {text}");
        assert!(text.contains("clinic_session="));

        server.shutdown();
        server.stopped().await.unwrap();
    }

    #[tokio::test]
    async fn bind_conflict_is_reported() {
        let (core, _tmp) = test_core();
        let mut first = start_server_on(core.clone(), localhost(), None).await.unwrap();

        let err = start_server_on(core, first.addr, None).await.err().unwrap();
        assert!(matches!(err, ServerError::Bind { .. }));

        first.shutdown();
        first.stopped().await.unwrap();
    }
}
