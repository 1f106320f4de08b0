//! HTTP/1 listener: one task per connection, graceful shutdown.

use crate::handler::{Relay, Upstream};
use eyre::Context;
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper::{Request, server::conn::http1};
use hyper_util::rt::TokioIo;
use hyper_util::server::graceful::GracefulShutdown;
use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// How long in-flight connections get to finish once shutdown starts.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Accepts connections on `listener` until `shutdown` resolves.
///
/// After that no new connections are accepted, and open ones are asked to finish their
/// current request and close.
pub async fn serve<U>(
    listener: TcpListener,
    relay: Arc<Relay<U>>,
    shutdown: impl Future<Output = ()>,
) -> eyre::Result<()>
where
    U: Upstream + 'static,
{
    let graceful = GracefulShutdown::new();
    let mut shutdown = std::pin::pin!(shutdown);

    loop {
        let (stream, peer) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(accepted) => accepted,
                Err(e) => {
                    // Usually fd exhaustion; keep serving the connections we have.
                    tracing::warn!(error = %e, "failed to accept connection");
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    continue;
                }
            },
            () = &mut shutdown => break,
        };
        tracing::trace!(%peer, "accepted connection");

        let relay = Arc::clone(&relay);
        let service = service_fn(move |req: Request<Incoming>| {
            let relay = Arc::clone(&relay);
            async move { Ok::<_, Infallible>(relay.handle(req).await) }
        });
        let conn = http1::Builder::new().serve_connection(TokioIo::new(stream), service);
        let conn = graceful.watch(conn);
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                tracing::debug!(%peer, error = %e, "connection closed with error");
            }
        });
    }

    tracing::info!("shutting down, waiting for open connections");
    tokio::select! {
        () = graceful.shutdown() => {
            tracing::info!("all connections closed");
        }
        () = tokio::time::sleep(SHUTDOWN_GRACE) => {
            tracing::warn!("timed out waiting for connections to close");
        }
    }
    Ok(())
}

/// Binds `addr` and serves until Ctrl-C.
pub async fn run<U>(addr: std::net::SocketAddr, relay: Relay<U>) -> eyre::Result<()>
where
    U: Upstream + 'static,
{
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind to {addr}"))?;
    let local = listener.local_addr().context("get local address")?;
    tracing::info!(addr = %local, "server running on http://{local}");

    serve(listener, Arc::new(relay), async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    })
    .await
}
