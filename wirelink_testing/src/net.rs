//! Loopback sockets for integration tests.

use std::{
    io,
    net::{Ipv4Addr, SocketAddr, TcpListener as StdTcpListener},
    time::Duration,
};

use socket2::SockRef;
use tokio::net::{TcpListener, TcpStream};

/// Create a blocking TCP listener bound to a free local port.
///
/// # Errors
///
/// Returns any IO error encountered while binding to an ephemeral localhost
/// port.
pub fn unused_listener() -> io::Result<StdTcpListener> {
    let addr = SocketAddr::new(Ipv4Addr::LOCALHOST.into(), 0);
    StdTcpListener::bind(addr)
}

/// Bind a tokio listener to a free local port and return it with its address.
///
/// # Errors
///
/// Returns any IO error encountered while binding.
pub async fn local_listener() -> io::Result<(TcpListener, SocketAddr)> {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await?;
    let addr = listener.local_addr()?;
    Ok((listener, addr))
}

/// Abort `stream` so the peer observes a connection reset instead of an
/// orderly shutdown.
///
/// # Errors
///
/// Returns an IO error if the linger option cannot be set.
pub fn reset_stream(stream: TcpStream) -> io::Result<()> {
    SockRef::from(&stream).set_linger(Some(Duration::ZERO))?;
    drop(stream);
    Ok(())
}
