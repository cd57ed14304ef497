use anyhow::{Result, anyhow, bail};
use std::path::PathBuf;

/// A line typed by the user, parsed.
#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    /// `/listen [port]`
    Listen(Option<u16>),
    /// `/connect [host] [port]`
    Connect {
        host: Option<String>,
        port: Option<u16>,
    },
    /// `/close`
    Close,
    /// `/clear`
    Clear,
    /// `/save [path]`
    Save(Option<PathBuf>),
    /// `/state`
    State,
    /// `/help`
    Help,
    /// `/quit`
    Quit,
    /// Anything that is not a command is a chat message.
    Send(String),
}

pub const HELP: &str = "\
commands:
  /listen [port]          wait for one peer to connect
  /connect [host] [port]  connect to a listening peer
  /close                  disconnect
  /clear                  clear the transcript
  /save [path]            save the transcript to a file
  /state                  show the connection state
  /quit                   disconnect and exit
any other line is sent to the peer; start it with // to send a leading /";

const NAMES: &[&str] = &[
    "listen",
    "connect",
    "close",
    "disconnect",
    "clear",
    "save",
    "state",
    "help",
    "quit",
    "exit",
];

/// Parses one input line. Blank lines yield `None`.
pub fn parse(line: &str) -> Result<Option<Command>> {
    if line.trim().is_empty() {
        return Ok(None);
    }

    if let Some(escaped) = line.strip_prefix("//") {
        return Ok(Some(Command::Send(format!("/{escaped}"))));
    }

    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Some(Command::Send(line.to_owned())));
    };

    let mut parts = rest.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let args: Vec<&str> = parts.collect();

    let command = match (name, args.as_slice()) {
        ("listen", []) => Command::Listen(None),
        ("listen", [port]) => Command::Listen(Some(parse_port(port)?)),
        ("connect", []) => Command::Connect {
            host: None,
            port: None,
        },
        ("connect", [host]) => Command::Connect {
            host: Some((*host).to_owned()),
            port: None,
        },
        ("connect", [host, port]) => Command::Connect {
            host: Some((*host).to_owned()),
            port: Some(parse_port(port)?),
        },
        ("close" | "disconnect", []) => Command::Close,
        ("clear", []) => Command::Clear,
        ("save", []) => Command::Save(None),
        ("save", [path]) => Command::Save(Some(PathBuf::from(*path))),
        ("state", []) => Command::State,
        ("help", []) => Command::Help,
        ("quit" | "exit", []) => Command::Quit,
        (name, _) if NAMES.contains(&name) => bail!("wrong arguments for /{name}, try /help"),
        _ => bail!("unknown command /{name}, try /help"),
    };

    Ok(Some(command))
}

/// Validates a port typed by the user. Range checking happens here, before
/// any connection is constructed.
pub fn parse_port(text: &str) -> Result<u16> {
    text.trim()
        .parse::<u16>()
        .map_err(|_| anyhow!("{text} is not a legal port number."))
}
