use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Sender};
use futures_util::StreamExt;
use params::BlendStrength;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, info, warn};

use crate::command::apply_message;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 8765;

/// Where the control channel listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlConfig {
    pub host: String,
    /// Port to bind; `0` lets the OS pick one.
    pub port: u16,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ControlConfig {
    pub fn url(&self) -> String {
        format!("ws://{}:{}", self.host, self.port)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error("failed to spawn control thread: {0}")]
    Spawn(#[source] io::Error),
    #[error("failed to start control runtime: {0}")]
    Runtime(#[source] io::Error),
    #[error("failed to bind control channel on {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },
    #[error("control thread exited before reporting readiness")]
    Startup,
    #[error("control thread panicked")]
    Panicked,
}

/// Running control listener.
///
/// Dropping the handle leaves the listener running until the process exits;
/// call [`ControlHandle::stop`] for an orderly shutdown.
pub struct ControlHandle {
    local_addr: SocketAddr,
    host: String,
    shutdown: Arc<Notify>,
    join_handle: Option<JoinHandle<()>>,
}

impl ControlHandle {
    /// Address the listener is actually bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// URL clients should connect to, using the configured host name.
    pub fn url(&self) -> String {
        format!("ws://{}:{}", self.host, self.local_addr.port())
    }

    /// Stops accepting connections, drops open ones, and joins the thread.
    pub fn stop(mut self) -> Result<(), ControlError> {
        self.shutdown.notify_one();
        if let Some(handle) = self.join_handle.take() {
            handle.join().map_err(|_| ControlError::Panicked)?;
        }
        debug!("control channel stopped");
        Ok(())
    }
}

/// Starts the control listener on a dedicated thread.
///
/// Blocks until the socket is bound so bind failures are reported to the
/// caller instead of disappearing inside the background thread.
pub fn spawn(config: &ControlConfig, store: BlendStrength) -> Result<ControlHandle, ControlError> {
    let (ready_tx, ready_rx) = bounded(1);
    let shutdown = Arc::new(Notify::new());
    let thread_shutdown = shutdown.clone();
    let thread_config = config.clone();

    let join_handle = thread::Builder::new()
        .name("shadeview-control".into())
        .spawn(move || run_control_thread(thread_config, store, thread_shutdown, ready_tx))
        .map_err(ControlError::Spawn)?;

    let local_addr = ready_rx.recv().map_err(|_| ControlError::Startup)??;

    Ok(ControlHandle {
        local_addr,
        host: config.host.clone(),
        shutdown,
        join_handle: Some(join_handle),
    })
}

fn run_control_thread(
    config: ControlConfig,
    store: BlendStrength,
    shutdown: Arc<Notify>,
    ready_tx: Sender<Result<SocketAddr, ControlError>>,
) {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            let _ = ready_tx.send(Err(ControlError::Runtime(err)));
            return;
        }
    };

    runtime.block_on(async move {
        let listener = match TcpListener::bind((config.host.as_str(), config.port)).await {
            Ok(listener) => listener,
            Err(source) => {
                let _ = ready_tx.send(Err(ControlError::Bind {
                    address: format!("{}:{}", config.host, config.port),
                    source,
                }));
                return;
            }
        };
        let local_addr = match listener.local_addr() {
            Ok(addr) => addr,
            Err(source) => {
                let _ = ready_tx.send(Err(ControlError::Bind {
                    address: format!("{}:{}", config.host, config.port),
                    source,
                }));
                return;
            }
        };

        info!(
            url = %format!("ws://{}:{}", config.host, local_addr.port()),
            "control channel listening"
        );
        let _ = ready_tx.send(Ok(local_addr));

        accept_loop(listener, store, shutdown).await;
    });
}

async fn accept_loop(listener: TcpListener, store: BlendStrength, shutdown: Arc<Notify>) {
    loop {
        tokio::select! {
            _ = shutdown.notified() => {
                debug!("control channel shutting down");
                break;
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    let store = store.clone();
                    tokio::spawn(async move {
                        if let Err(err) = serve_connection(stream, peer, store).await {
                            debug!(%peer, error = %err, "control connection closed with error");
                        }
                    });
                }
                Err(err) => {
                    warn!(error = %err, "failed to accept control connection");
                }
            }
        }
    }
}

async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    store: BlendStrength,
) -> Result<(), tungstenite::Error> {
    let mut socket = tokio_tungstenite::accept_async(stream).await?;
    debug!(%peer, "control client connected");

    while let Some(message) = socket.next().await {
        match message? {
            Message::Text(text) => {
                apply_message(&text, &store);
            }
            Message::Binary(bytes) => {
                debug!(%peer, len = bytes.len(), "ignoring binary control frame");
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    debug!(%peer, "control client disconnected");
    Ok(())
}
