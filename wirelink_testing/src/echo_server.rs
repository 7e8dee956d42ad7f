//! Framed echo peer for session round-trip tests.
//!
//! [`EchoServer`] accepts connections on a loopback port and writes every
//! varint-framed payload it receives straight back. Tests can count accepted
//! connections and reset all of them to exercise reconnect paths.

use std::{
    io,
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use futures::{SinkExt, StreamExt};
use tokio::{net::TcpStream, select, sync::watch, task::JoinHandle};
use tokio_util::{codec::Framed, sync::CancellationToken};
use wirelink::VarintFrameCodec;

use crate::net::{local_listener, reset_stream};

/// Echo server running on a background task.
///
/// Dropping the server stops the accept loop and every connection.
pub struct EchoServer {
    addr: SocketAddr,
    accepted: Arc<AtomicUsize>,
    reset: watch::Sender<u64>,
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

impl EchoServer {
    /// Bind a loopback port and start echoing frames up to
    /// `max_frame_length` bytes.
    ///
    /// # Errors
    ///
    /// Returns any IO error encountered while binding.
    pub async fn spawn(max_frame_length: usize) -> io::Result<Self> {
        let (listener, addr) = local_listener().await?;
        let accepted = Arc::new(AtomicUsize::new(0));
        let (reset, _) = watch::channel(0);
        let shutdown = CancellationToken::new();

        let task = {
            let accepted = Arc::clone(&accepted);
            let reset = reset.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                loop {
                    let stream = select! {
                        () = shutdown.cancelled() => break,
                        res = listener.accept() => match res {
                            Ok((stream, _)) => stream,
                            Err(_) => continue,
                        },
                    };
                    let reset = reset.subscribe();
                    accepted.fetch_add(1, Ordering::SeqCst);
                    tokio::spawn(echo(
                        stream,
                        max_frame_length,
                        reset,
                        shutdown.child_token(),
                    ));
                }
            })
        };

        Ok(Self {
            addr,
            accepted,
            reset,
            shutdown,
            task,
        })
    }

    /// Address the server listens on.
    #[must_use]
    pub fn addr(&self) -> SocketAddr { self.addr }

    /// Number of connections accepted so far.
    #[must_use]
    pub fn accepted(&self) -> usize { self.accepted.load(Ordering::SeqCst) }

    /// Abort every open connection with a TCP reset.
    pub fn reset_connections(&self) { self.reset.send_modify(|generation| *generation += 1); }
}

impl Drop for EchoServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
        self.task.abort();
    }
}

async fn echo(
    stream: TcpStream,
    max_frame_length: usize,
    mut reset: watch::Receiver<u64>,
    shutdown: CancellationToken,
) {
    let mut framed = Framed::new(stream, VarintFrameCodec::new(max_frame_length));
    loop {
        select! {
            () = shutdown.cancelled() => return,
            changed = reset.changed() => {
                if changed.is_ok() {
                    let _ = reset_stream(framed.into_inner());
                }
                return;
            }
            frame = framed.next() => match frame {
                Some(Ok(frame)) => {
                    if framed.send(frame).await.is_err() {
                        return;
                    }
                }
                _ => return,
            },
        }
    }
}
