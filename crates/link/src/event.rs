use crate::errors::Error;
use std::net::SocketAddr;
use tokio::sync::mpsc;

/// Receiving end of a connection's notifications, in emission order.
pub type Events = mpsc::UnboundedReceiver<Event>;

/// Notifications emitted by a [`Connection`](crate::Connection).
///
/// Every connection emits exactly one `Closed`, always last.
#[derive(Debug)]
pub enum Event {
    /// A listener was created for the requested port.
    Listening { port: u16 },
    /// The listening socket is bound. Carries the actual address, which
    /// differs from the requested one when port 0 was asked for.
    Bound(SocketAddr),
    /// A dialer was created and is about to connect.
    Connecting { host: String, port: u16 },
    /// The stream is established; sends are now accepted.
    Connected { peer: SocketAddr },
    /// One line arrived from the peer, without its delimiter.
    MessageReceived(String),
    /// One line was written and flushed to the peer.
    MessageSent(String),
    /// The peer ended its stream.
    RemoteClosed,
    /// A failure that was not caused by a local close.
    Error(Error),
    /// All resources have been released.
    Closed,
}
