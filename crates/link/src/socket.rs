use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use tokio::net::TcpListener;

/// Pending connections queued by the kernel. One peer is all a link accepts.
const BACKLOG: i32 = 1;

/// Binds a listening socket on every IPv4 interface.
///
/// Address reuse is enabled so a port released by a closed listener can be
/// bound again straight away.
pub(crate) fn bind_listener(port: u16) -> io::Result<TcpListener> {
    let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;

    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    socket.bind(&addr.into())?;
    socket.listen(BACKLOG)?;

    socket.set_nonblocking(true)?;
    TcpListener::from_std(socket.into())
}
