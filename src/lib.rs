//! agent-chat - chat with a deep agent over Server-Sent Events.
//!
//! The server runs an external agent, translates its event stream into the
//! wire protocol and streams it to clients. The client folds that stream
//! back into a transcript with derived task and todo views.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐   SSE    ┌─────────────┐  AgentEvent  ┌─────────────┐
//! │ ChatClient  │ ◄─────── │  HTTP API   │ ◄─────────── │ AgentRunner │
//! └──────┬──────┘          └──────┬──────┘              └─────────────┘
//!        │                        │
//!   Transcript              SessionRegistry ── Sandbox
//! ```

pub mod api;
pub mod build_info;
pub mod cli;
pub mod client;
pub mod config;
pub mod core;

pub use client::{ChatClient, ChatStatus, TurnOutcome};
pub use config::Config;
