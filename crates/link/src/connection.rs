use crate::errors::Error;
use crate::event::{Event, Events};
use crate::socket;
use crate::state::{Role, State};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{Mutex, mpsc, watch};
use tracing::{Instrument, debug, info, info_span, warn};

/// One end of a two-party, line-delimited text link.
///
/// A connection is created either as a listener, which accepts exactly one
/// inbound session, or as a dialer. Socket work happens on a background task
/// spawned by the constructor; the handle returned here only issues control
/// operations, and everything the task observes is reported through the
/// [`Events`] stream.
///
/// Handles are cheap to clone. Every clone controls the same link, and the
/// link is closed once the last clone is dropped.
#[derive(Clone)]
pub struct Connection {
    role: Role,
    port: u16,
    remote_host: Option<String>,
    handle: Arc<Handle>,
}

/// Owned by every clone of a [`Connection`] through one `Arc`.
struct Handle {
    shared: Arc<Shared>,
    /// Turns `true` once the background task has dropped every socket. The
    /// sender lives in the task, so this also resolves if the task is gone.
    released: watch::Receiver<bool>,
}

impl Drop for Handle {
    fn drop(&mut self) {
        debug!("last handle dropped, closing");
        self.shared.shutdown.send_replace(true);
    }
}

/// State shared between the handles and the background task.
struct Shared {
    /// The one lock every transition goes through.
    inner: Mutex<Inner>,
    /// Flipped to `true` once the link is closing. The background task and
    /// an in-flight send race their socket work against this, so a blocked
    /// accept, dial, read or write is abandoned and its socket dropped.
    shutdown: watch::Sender<bool>,
    events: mpsc::UnboundedSender<Event>,
}

struct Inner {
    state: State,
    writer: Option<BufWriter<OwnedWriteHalf>>,
}

enum Setup {
    Listen { port: u16 },
    Dial { host: String, port: u16 },
}

/// Why the background task stopped. Fed once into [`Shared::cleanup`].
enum Outcome {
    LocalClose,
    RemoteClose,
    Failed(Error),
}

impl Connection {
    /// Starts listening on `port` for a single peer.
    ///
    /// Must be called from within a tokio runtime. Port 0 binds an ephemeral
    /// port, reported by [`Event::Bound`].
    pub fn listen(port: u16) -> (Self, Events) {
        let span = info_span!("link", role = "listener", port);
        Self::start(
            Role::Listener,
            port,
            None,
            Event::Listening { port },
            Setup::Listen { port },
            span,
        )
    }

    /// Starts dialing `host:port`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn connect(host: impl Into<String>, port: u16) -> (Self, Events) {
        let host = host.into();
        let span = info_span!("link", role = "dialer", host = %host, port);
        Self::start(
            Role::Dialer,
            port,
            Some(host.clone()),
            Event::Connecting {
                host: host.clone(),
                port,
            },
            Setup::Dial { host, port },
            span,
        )
    }

    fn start(
        role: Role,
        port: u16,
        remote_host: Option<String>,
        announce: Event,
        setup: Setup,
        span: tracing::Span,
    ) -> (Self, Events) {
        let initial = match role {
            Role::Listener => State::Listening,
            Role::Dialer => State::Connecting,
        };

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (shutdown, _) = watch::channel(false);
        let (released_tx, released_rx) = watch::channel(false);
        let shared = Arc::new(Shared {
            inner: Mutex::new(Inner {
                state: initial,
                writer: None,
            }),
            shutdown,
            events: events_tx,
        });

        span.in_scope(|| info!(state = %initial, "starting"));
        shared.emit(announce);

        tokio::spawn(shared.clone().run(setup, released_tx).instrument(span));

        let connection = Connection {
            role,
            port,
            remote_host,
            handle: Arc::new(Handle {
                shared,
                released: released_rx,
            }),
        };

        (connection, events_rx)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// The port passed at construction: the one listened on, or dialed.
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn remote_host(&self) -> Option<&str> {
        self.remote_host.as_deref()
    }

    pub async fn state(&self) -> State {
        self.handle.shared.inner.lock().await.state
    }

    /// Sends `text` as one line.
    ///
    /// Does nothing unless the link is `Connected`. On success an
    /// [`Event::MessageSent`] carrying exactly `text` is emitted. A write
    /// failure is reported as [`Event::Error`] and closes the link. A write
    /// stalled by the peer gives way to a concurrent [`close`](Self::close).
    pub async fn send(&self, text: &str) {
        let shared = &self.handle.shared;
        let mut inner = shared.inner.lock().await;
        if inner.state != State::Connected {
            debug!(state = %inner.state, "not connected, dropping outbound message");
            return;
        }

        let Some(writer) = inner.writer.as_mut() else {
            return;
        };

        let written = tokio::select! {
            biased;
            _ = closed_locally(shared.shutdown.subscribe()) => None,
            result = write_line(writer, text) => Some(result),
        };

        match written {
            None => debug!("close requested, abandoning outbound message"),
            Some(Ok(())) => {
                debug!(len = text.len(), "message sent");
                shared.emit(Event::MessageSent(text.to_owned()));
            }
            Some(Err(e)) => {
                warn!(error = %e, "error sending message");
                shared.emit(Event::Error(Error::Io(e)));
                shared.close_locked(&mut inner);
            }
        }
    }

    /// Closes the link. Safe to call any number of times, from any task.
    ///
    /// Whatever the background task is blocked on (accept, dial or read) is
    /// abandoned. Returns once cleanup has run and every socket of the link
    /// is closed, so a listening port is free to bind again.
    pub async fn close(&self) {
        let shared = &self.handle.shared;
        // signalled ahead of the lock so an in-flight send lets go of it
        shared.shutdown.send_replace(true);
        {
            let mut inner = shared.inner.lock().await;
            shared.close_locked(&mut inner);
        }

        let mut released = self.handle.released.clone();
        // an error means the task is gone, and its sockets with it
        let _ = released.wait_for(|done| *done).await;
    }
}

impl Shared {
    fn emit(&self, event: Event) {
        // A dropped receiver only means nobody is watching anymore.
        let _ = self.events.send(event);
    }

    fn close_locked(&self, inner: &mut Inner) {
        if !inner.state.is_closed() {
            debug!(state = %inner.state, "closing");
        }

        inner.state = State::Closed;
        // dropping the write half sends FIN
        inner.writer = None;
        self.shutdown.send_replace(true);
    }

    async fn run(self: Arc<Self>, setup: Setup, released: watch::Sender<bool>) {
        let outcome = tokio::select! {
            biased;
            _ = closed_locally(self.shutdown.subscribe()) => Outcome::LocalClose,
            outcome = self.establish_and_receive(setup) => outcome,
        };

        self.cleanup(outcome).await;
        released.send_replace(true);
    }

    async fn establish_and_receive(&self, setup: Setup) -> Outcome {
        let stream = match establish(setup, self).await {
            Ok(stream) => stream,
            Err(e) => return Outcome::Failed(e),
        };

        let peer = match stream.peer_addr() {
            Ok(peer) => peer,
            Err(e) => return Outcome::Failed(Error::Io(e)),
        };

        let (reader, writer) = stream.into_split();
        if !self.connection_opened(writer, peer).await {
            return Outcome::LocalClose;
        }

        self.receive(reader).await
    }

    async fn connection_opened(&self, writer: OwnedWriteHalf, peer: SocketAddr) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.state.is_closed() {
            return false;
        }

        inner.state = State::Connected;
        inner.writer = Some(BufWriter::new(writer));

        info!(peer = %peer, "connection established");
        self.emit(Event::Connected { peer });
        true
    }

    async fn receive(&self, reader: OwnedReadHalf) -> Outcome {
        let mut reader = BufReader::new(reader);
        let mut raw = Vec::new();

        while self.inner.lock().await.state == State::Connected {
            raw.clear();
            match reader.read_until(b'\n', &mut raw).await {
                Ok(0) => return self.closed_from_other_side().await,
                Ok(_) => self.received(decode_line(&raw)).await,
                Err(e) => return Outcome::Failed(Error::Io(e)),
            }
        }

        Outcome::LocalClose
    }

    async fn received(&self, line: String) {
        let inner = self.inner.lock().await;
        if inner.state == State::Connected {
            debug!(len = line.len(), "message received");
            self.emit(Event::MessageReceived(line));
        } else {
            debug!(state = %inner.state, "discarding message received while closing");
        }
    }

    async fn closed_from_other_side(&self) -> Outcome {
        let mut inner = self.inner.lock().await;
        if inner.state != State::Connected {
            return Outcome::LocalClose;
        }

        info!("connection closed from other side");
        self.emit(Event::RemoteClosed);
        inner.state = State::Closed;
        Outcome::RemoteClose
    }

    /// Final teardown, run exactly once per connection.
    async fn cleanup(&self, outcome: Outcome) {
        let mut inner = self.inner.lock().await;

        match outcome {
            Outcome::Failed(e) if !inner.state.is_closed() => {
                warn!(error = %e, "connection failed");
                self.emit(Event::Error(e));
            }
            Outcome::Failed(e) => debug!(error = %e, "ignoring failure after close"),
            Outcome::RemoteClose => debug!("peer ended the stream"),
            Outcome::LocalClose => debug!("closed locally"),
        }

        inner.state = State::Closed;
        if let Some(mut writer) = inner.writer.take() {
            if let Err(e) = writer.shutdown().await {
                debug!(error = %e, "stream already closed");
            }
        }
        self.shutdown.send_replace(true);

        info!("connection closed");
        self.emit(Event::Closed);
    }
}

/// Opens the stream for either role. For a listener, the bound socket is
/// dropped as soon as one peer is accepted.
async fn establish(setup: Setup, shared: &Shared) -> Result<TcpStream, Error> {
    match setup {
        Setup::Listen { port } => {
            let listener =
                socket::bind_listener(port).map_err(|source| Error::Bind { port, source })?;

            let local = listener.local_addr()?;
            debug!(addr = %local, "listener bound");
            shared.emit(Event::Bound(local));

            let (stream, peer) = listener.accept().await.map_err(Error::Accept)?;
            debug!(peer = %peer, "accepted peer, no longer listening");
            Ok(stream)
        }
        Setup::Dial { host, port } => {
            let result = TcpStream::connect((host.as_str(), port)).await;
            result.map_err(|source| Error::Connect { host, port, source })
        }
    }
}

/// Strips the line delimiter (`\n` or `\r\n`) and decodes the rest. Bytes
/// that are not valid UTF-8 are replaced rather than failing the link.
fn decode_line(raw: &[u8]) -> String {
    let line = raw.strip_suffix(b"\n").unwrap_or(raw);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8_lossy(line).into_owned()
}

async fn write_line(writer: &mut BufWriter<OwnedWriteHalf>, text: &str) -> io::Result<()> {
    writer.write_all(text.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}

async fn closed_locally(mut shutdown: watch::Receiver<bool>) {
    // The sender lives in `Shared`, which outlives every caller.
    let _ = shutdown.wait_for(|closed| *closed).await;
}
