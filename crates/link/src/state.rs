use std::fmt;

/// Which side of the link a connection plays. Fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Binds a port and accepts exactly one inbound session.
    Listener,
    /// Opens one outbound session to a remote host.
    Dialer,
}

/// Lifecycle of a connection.
///
/// ```text
/// Listening  --accept--> Connected --eof/close/error--> Closed
/// Connecting --connect-> Connected
/// Listening | Connecting --close/error--> Closed
/// ```
///
/// `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Listening,
    Connecting,
    Connected,
    Closed,
}

impl State {
    pub fn is_closed(self) -> bool {
        self == State::Closed
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            State::Listening => "listening",
            State::Connecting => "connecting",
            State::Connected => "connected",
            State::Closed => "closed",
        };
        f.write_str(name)
    }
}
