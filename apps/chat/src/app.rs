use crate::command::{Command, HELP};
use crate::transcript::Transcript;
use link::{Connection, Event, Events, State};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Values used when a command leaves out its arguments.
pub struct Defaults {
    pub host: String,
    pub port: u16,
    pub transcript: PathBuf,
}

/// Whether the input loop should keep going after a command.
#[derive(Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Terminal front end over at most one [`Connection`] at a time.
///
/// Events of whichever connection is current are forwarded into a single
/// channel so the input loop only ever waits on one receiver.
pub struct App {
    defaults: Defaults,
    connection: Option<Connection>,
    transcript: Transcript,
    forward: mpsc::UnboundedSender<Event>,
}

impl App {
    pub fn new(defaults: Defaults) -> (Self, Events) {
        let (forward, events) = mpsc::unbounded_channel();
        let app = App {
            defaults,
            connection: None,
            transcript: Transcript::new(),
            forward,
        };

        (app, events)
    }

    pub async fn handle(&mut self, command: Command) -> Flow {
        match command {
            Command::Listen(port) => {
                let port = port.unwrap_or(self.defaults.port);
                if self.ensure_idle().await {
                    let (connection, events) = Connection::listen(port);
                    self.attach(connection, events);
                }
            }
            Command::Connect { host, port } => {
                let host = host.unwrap_or_else(|| self.defaults.host.clone());
                let port = port.unwrap_or(self.defaults.port);
                if self.ensure_idle().await {
                    let (connection, events) = Connection::connect(host, port);
                    self.attach(connection, events);
                }
            }
            Command::Close => match &self.connection {
                Some(connection) => connection.close().await,
                None => note("not connected"),
            },
            Command::Clear => self.transcript.clear(),
            Command::Save(path) => {
                let path = path.unwrap_or_else(|| self.defaults.transcript.clone());
                match self.transcript.save(&path).await {
                    Ok(()) => note(&format!("transcript saved to {}", path.display())),
                    Err(e) => note(&format!("{e:#}")),
                }
            }
            Command::State => note(&self.state().await.map_or_else(
                || "no connection".to_owned(),
                |state| state.to_string(),
            )),
            Command::Help => println!("{HELP}"),
            Command::Quit => {
                self.shutdown().await;
                return Flow::Quit;
            }
            Command::Send(text) => {
                let connected = self.state().await == Some(State::Connected);
                match &self.connection {
                    Some(connection) if connected => connection.send(&text).await,
                    _ => note("not connected, message not sent"),
                }
            }
        }

        Flow::Continue
    }

    /// Records and prints one notification from the current connection.
    pub fn show(&mut self, event: &Event) {
        println!("{}", self.transcript.record(event));
    }

    pub async fn state(&self) -> Option<State> {
        match &self.connection {
            Some(connection) => Some(connection.state().await),
            None => None,
        }
    }

    pub async fn shutdown(&mut self) {
        if let Some(connection) = &self.connection {
            info!("closing connection before exit");
            connection.close().await;
        }
    }

    /// A new link may only start once the previous one is closed.
    async fn ensure_idle(&self) -> bool {
        match self.state().await {
            None | Some(State::Closed) => true,
            Some(state) => {
                note(&format!("already {state}, use /close first"));
                false
            }
        }
    }

    fn attach(&mut self, connection: Connection, mut events: Events) {
        let forward = self.forward.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                if forward.send(event).is_err() {
                    debug!("front end gone, dropping events");
                    break;
                }
            }
        });

        self.connection = Some(connection);
    }
}

/// Local feedback. Not part of the transcript.
fn note(text: &str) {
    println!("! {text}");
}
