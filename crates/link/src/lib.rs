mod connection;
mod errors;
mod event;
mod socket;
mod state;

pub use connection::Connection;
pub use errors::Error;
pub use event::{Event, Events};
pub use state::{Role, State};
