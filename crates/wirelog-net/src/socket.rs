//! UDP endpoints for the fabric's datagram transport.

use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};

/// Largest datagram either end will move as one frame.
pub const MAX_DATAGRAM: usize = 65_507;

/// Outbound socket connected to the collector endpoint.
pub(crate) fn connect_sender(peer: SocketAddr) -> io::Result<UdpSocket> {
    let local: SocketAddr = if peer.is_ipv4() {
        (Ipv4Addr::UNSPECIFIED, 0).into()
    } else {
        (Ipv6Addr::UNSPECIFIED, 0).into()
    };
    let socket = UdpSocket::bind(local)?;
    socket.connect(peer)?;
    Ok(socket)
}

/// Inbound non-blocking socket; no pending frame reads as empty.
pub(crate) fn bind_receiver(local: SocketAddr) -> io::Result<UdpSocket> {
    let socket = UdpSocket::bind(local)?;
    socket.set_nonblocking(true)?;
    Ok(socket)
}

/// Receive one datagram into the reusable buffer, which is re-sized to the
/// message length. `Ok(None)` when nothing is pending.
pub(crate) fn recv_frame(socket: &UdpSocket, buf: &mut Vec<u8>) -> io::Result<Option<usize>> {
    buf.resize(MAX_DATAGRAM, 0);
    match socket.recv(buf) {
        Ok(len) => {
            buf.truncate(len);
            Ok(Some(len))
        }
        Err(err) if err.kind() == io::ErrorKind::WouldBlock => Ok(None),
        Err(err) => Err(err),
    }
}
