//! Core logic shared by the HTTP API, the client and the CLI.

mod error;
pub mod keychain;
pub mod runner;
pub mod sandbox;
pub mod secret;
pub mod session;

pub use error::{Error, Result};
pub use runner::{AgentRunner, ChatMessage, RemoteAgent, ReplayAgent, RunRequest};
pub use session::{SessionId, SessionRegistry};
