//! Publisher - TCP publish endpoint
//!
//! Every connected subscriber receives each message published after it
//! joined, newline terminated. Publishing never waits for subscribers: a
//! subscriber more than `capacity` messages behind loses the oldest ones.
//! On shutdown subscribers get [`DRAIN_TIMEOUT`] to take their backlog;
//! any still blocked after that are dropped.

use bytes::Bytes;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, oneshot};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

/// Largest backlog a broadcast channel accepts
pub(crate) const MAX_CAPACITY: usize = usize::MAX >> 1;

/// How long subscribers may keep draining after shutdown
pub(crate) const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Bound publish endpoint with its accept task
pub(crate) struct Publisher {
    name: String,
    local_addr: SocketAddr,
    tx: Option<broadcast::Sender<Bytes>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    accept_task: Option<JoinHandle<()>>,
    subscribers: Arc<AtomicUsize>,
}

impl Publisher {
    /// Bind `host:port` and start accepting subscribers
    pub(crate) async fn bind(
        name: &str,
        host: &str,
        port: u16,
        capacity: usize,
    ) -> std::io::Result<Self> {
        if capacity == 0 || capacity > MAX_CAPACITY {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("channel capacity must be in 1..={MAX_CAPACITY}, got {capacity}"),
            ));
        }
        let listener = TcpListener::bind((host, port)).await?;
        let local_addr = listener.local_addr()?;

        let (tx, _) = broadcast::channel(capacity);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let subscribers = Arc::new(AtomicUsize::new(0));

        let accept_task = tokio::spawn(accept_loop(
            listener,
            tx.clone(),
            shutdown_rx,
            Arc::clone(&subscribers),
            name.to_string(),
        ));

        info!(sink = %name, addr = %local_addr, "Publisher bound");

        Ok(Self {
            name: name.to_string(),
            local_addr,
            tx: Some(tx),
            shutdown_tx: Some(shutdown_tx),
            accept_task: Some(accept_task),
            subscribers,
        })
    }

    pub(crate) fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub(crate) fn subscriber_count(&self) -> usize {
        self.subscribers.load(Ordering::Relaxed)
    }

    /// Publish one message. Returns the number of subscribers it was queued for.
    pub(crate) fn publish(&self, message: Bytes) -> usize {
        match self.tx.as_ref().map(|tx| tx.send(message)) {
            Some(Ok(receivers)) => receivers,
            // no subscribers: fire-and-forget
            Some(Err(_)) | None => 0,
        }
    }

    /// Stop accepting, let subscribers drain what was already published, then wait for them.
    ///
    /// Returns within [`DRAIN_TIMEOUT`] even when a subscriber stops reading.
    pub(crate) async fn shutdown(&mut self) {
        self.tx = None;
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            // the accept task may already be gone
            let _ = shutdown_tx.send(());
        }
        if let Some(task) = self.accept_task.take() {
            if let Err(e) = task.await {
                warn!(sink = %self.name, error = ?e, "Accept task ended abnormally");
            }
        }
        debug!(sink = %self.name, "Publisher shut down");
    }
}

impl Drop for Publisher {
    fn drop(&mut self) {
        if let Some(task) = self.accept_task.take() {
            task.abort();
        }
    }
}

async fn accept_loop(
    listener: TcpListener,
    tx: broadcast::Sender<Bytes>,
    mut shutdown_rx: oneshot::Receiver<()>,
    subscribers: Arc<AtomicUsize>,
    name: String,
) {
    let mut forwarders = JoinSet::new();

    loop {
        tokio::select! {
            _ = &mut shutdown_rx => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    let rx = tx.subscribe();
                    subscribers.fetch_add(1, Ordering::Relaxed);
                    debug!(sink = %name, %peer, "Subscriber connected");
                    forwarders.spawn(forward(
                        stream,
                        rx,
                        peer,
                        Arc::clone(&subscribers),
                        name.clone(),
                    ));
                }
                Err(e) => warn!(sink = %name, error = %e, "Accept failed"),
            },
            Some(_) = forwarders.join_next(), if !forwarders.is_empty() => {}
        }
    }

    // Once both senders are gone the forwarders drain their backlog and exit.
    drop(tx);
    drop(listener);
    let drained = tokio::time::timeout(DRAIN_TIMEOUT, async {
        while forwarders.join_next().await.is_some() {}
    })
    .await;

    if drained.is_err() {
        warn!(
            sink = %name,
            stalled = forwarders.len(),
            "Subscribers did not drain in time, disconnecting"
        );
        forwarders.abort_all();
        while forwarders.join_next().await.is_some() {}
        subscribers.store(0, Ordering::Relaxed);
    }
}

async fn forward(
    mut stream: TcpStream,
    mut rx: broadcast::Receiver<Bytes>,
    peer: SocketAddr,
    subscribers: Arc<AtomicUsize>,
    name: String,
) {
    loop {
        match rx.recv().await {
            Ok(message) => {
                if let Err(e) = stream.write_all(&message).await {
                    debug!(sink = %name, %peer, error = %e, "Subscriber disconnected");
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(sink = %name, %peer, skipped, "Subscriber lagging, messages dropped");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }

    if let Err(e) = stream.shutdown().await {
        debug!(sink = %name, %peer, error = %e, "Subscriber shutdown failed");
    }
    subscribers.fetch_sub(1, Ordering::Relaxed);
}
