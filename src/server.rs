//! HTTP listener.
//!
//! Accepts TCP connections and serves each one on its own tokio task with
//! hyper's HTTP/1 connection driver. Every request goes through the shared
//! [`Dispatcher`].

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use http::Request;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info};

use crate::dispatcher::Dispatcher;
use crate::error::ServerError;

/// The simulator's HTTP server, bound and ready to accept.
pub struct Server {
    listener: TcpListener,
    dispatcher: Arc<Dispatcher>,
}

impl Server {
    /// Bind the listener to `addr`.
    pub async fn bind(addr: SocketAddr, dispatcher: Dispatcher) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.to_string(),
                source,
            })?;

        Ok(Self {
            listener,
            dispatcher: Arc::new(dispatcher),
        })
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until SIGTERM or SIGINT.
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_until(wait_for_os_signal()).await
    }

    /// Serve until `shutdown` completes.
    ///
    /// Connections already accepted keep running on their own tasks.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        let addr = self.local_addr()?;
        info!(
            addr = %addr,
            routes = self.dispatcher.table().len(),
            "Simulator listening"
        );

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                result = self.listener.accept() => {
                    match result {
                        Ok((stream, remote_addr)) => {
                            let dispatcher = Arc::clone(&self.dispatcher);
                            tokio::spawn(serve_connection(stream, remote_addr, dispatcher));
                        }
                        Err(e) => {
                            error!(error = %e, "Failed to accept connection");
                        }
                    }
                }

                _ = &mut shutdown => {
                    info!("Shutdown signal received, stopping simulator");
                    break;
                }
            }
        }

        Ok(())
    }
}

async fn serve_connection(stream: TcpStream, remote_addr: SocketAddr, dispatcher: Arc<Dispatcher>) {
    let io = TokioIo::new(stream);

    let service = service_fn(move |req: Request<Incoming>| {
        let dispatcher = Arc::clone(&dispatcher);
        async move { Ok::<_, Infallible>(dispatcher.handle(req).await) }
    });

    if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
        debug!(remote = %remote_addr, error = %e, "Connection closed with error");
    }
}

/// Waits for SIGTERM or SIGINT (Ctrl+C elsewhere).
async fn wait_for_os_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(term), Ok(int)) => (term, int),
                (Err(e), _) | (_, Err(e)) => {
                    error!(error = %e, "Failed to register signal handlers");
                    return std::future::pending().await;
                }
            };

        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM"),
            _ = sigint.recv() => info!("Received SIGINT"),
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to wait for Ctrl+C");
            return std::future::pending().await;
        }
        info!("Received Ctrl+C");
    }
}
