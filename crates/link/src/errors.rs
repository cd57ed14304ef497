use std::io;
use thiserror::Error;

/// Failures a [`Connection`](crate::Connection) can run into.
///
/// These never surface as return values of the control operations. The
/// background task converts them into a single [`Event::Error`](crate::Event)
/// followed by the transition to `Closed`.
#[derive(Debug, Error)]
pub enum Error {
    /// The listening socket could not be created or bound, typically because
    /// the port is already in use.
    #[error("unable to listen on port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: io::Error,
    },

    /// Dialing the remote side failed: refused, unreachable or the host name
    /// did not resolve.
    #[error("unable to connect to {host}:{port}: {source}")]
    Connect {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// The bound socket failed while waiting for the peer.
    #[error("accept failed: {0}")]
    Accept(#[source] io::Error),

    /// Read or write failure on an established stream.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}
