use std::net::SocketAddr;

use log::info;
use tokio::net::{
    TcpListener, TcpStream,
    tcp::{OwnedReadHalf, OwnedWriteHalf},
};

use crate::{Result, reducer::Link};

/// A link over a TCP connection.
pub type TcpLink = Link<OwnedReadHalf, OwnedWriteHalf>;

/// Binds the root's listening socket.
pub async fn listen(addr: SocketAddr) -> Result<TcpListener> {
    let listener = TcpListener::bind(addr).await?;
    info!("root listening at {}", listener.local_addr()?);
    Ok(listener)
}

/// Accepts exactly `count` connections, in whatever order the ranks connect.
///
/// # Arguments
/// * `listener` - The root's listening socket.
/// * `count` - The amount of non root ranks.
///
/// # Returns
/// One link per accepted connection.
pub async fn accept_peers(listener: &TcpListener, count: usize) -> Result<Vec<TcpLink>> {
    let mut peers = Vec::with_capacity(count);

    while peers.len() < count {
        let (stream, addr) = listener.accept().await?;
        stream.set_nodelay(true)?;
        info!("rank connected from {addr}");

        let (rx, tx) = stream.into_split();
        peers.push(comms::channel(rx, tx));
    }

    Ok(peers)
}

/// Connects to the root, there are no retries so the root must be listening.
pub async fn connect(root: SocketAddr) -> Result<TcpLink> {
    let stream = TcpStream::connect(root).await?;
    stream.set_nodelay(true)?;
    info!("connected to root at {root}");

    let (rx, tx) = stream.into_split();
    Ok(comms::channel(rx, tx))
}
