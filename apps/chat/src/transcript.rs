use anyhow::{Context, Result};
use link::Event;
use std::path::Path;

/// Everything shown to the user during a session, kept so it can be saved.
#[derive(Debug, Default)]
pub struct Transcript {
    lines: Vec<String>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Renders `event`, appends it and returns the rendered text.
    pub fn record(&mut self, event: &Event) -> &str {
        self.lines.push(render(event));
        self.lines.last().map_or("", String::as_str)
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn text(&self) -> String {
        self.lines.iter().fold(String::new(), |mut text, line| {
            text.push_str(line);
            text.push('\n');
            text
        })
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        tokio::fs::write(path, self.text())
            .await
            .with_context(|| format!("failed to write transcript to {}", path.display()))
    }
}

/// Transcript wording for each notification.
pub fn render(event: &Event) -> String {
    match event {
        Event::Listening { port } => format!("\nLISTENING ON PORT {port}\n"),
        Event::Bound(addr) => format!("waiting for a peer on {addr}"),
        Event::Connecting { host, port } => format!("\nCONNECTING TO {host} ON PORT {port}\n"),
        Event::Connected { peer } => format!("CONNECTION ESTABLISHED WITH {peer}\n"),
        Event::MessageReceived(text) => format!("RECEIVE:  {text}"),
        Event::MessageSent(text) => format!("SEND:  {text}"),
        Event::RemoteClosed => "\nCONNECTION CLOSED FROM OTHER SIDE\n".to_owned(),
        Event::Error(e) => format!("\n\n ERROR:  {e}"),
        Event::Closed => "\n*** CONNECTION CLOSED ***\n".to_owned(),
    }
}
