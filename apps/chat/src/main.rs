mod app;
mod command;
mod transcript;

use anyhow::{Context, Result};
use app::{App, Defaults, Flow};
use clap::Parser;
use command::Command;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

const DEFAULT_PORT: u16 = 1501;
const DEFAULT_HOST: &str = "localhost";

#[derive(Parser)]
#[command(name = "chat")]
#[command(about = "Two-user networked chat over a single TCP connection")]
struct Args {
    /// Listen for a peer on this port right away
    #[arg(long, value_name = "PORT", conflicts_with = "connect")]
    listen: Option<u16>,

    /// Connect to a listening peer on this host right away
    #[arg(long, value_name = "HOST")]
    connect: Option<String>,

    /// Port used by --connect and by commands that leave it out
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Host used by /connect when none is given
    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,

    /// Where /save writes the transcript when no path is given
    #[arg(long, default_value = "transcript.txt")]
    transcript: PathBuf,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    log::init_logging(args.log_json).context("failed to initialize logging")?;

    let (mut app, mut events) = App::new(Defaults {
        host: args.host,
        port: args.port,
        transcript: args.transcript,
    });

    println!("{}", command::HELP);

    if let Some(port) = args.listen {
        app.handle(Command::Listen(Some(port))).await;
    } else if let Some(host) = args.connect {
        app.handle(Command::Connect {
            host: Some(host),
            port: Some(args.port),
        })
        .await;
    }

    let mut input = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = input.next_line() => {
                let Some(line) = line.context("failed to read stdin")? else {
                    info!("stdin closed");
                    break;
                };

                match command::parse(&line) {
                    Ok(Some(command)) => {
                        if app.handle(command).await == Flow::Quit {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => println!("! {e}"),
                }
            }
            Some(event) = events.recv() => app.show(&event),
        }
    }

    app.shutdown().await;
    Ok(())
}
