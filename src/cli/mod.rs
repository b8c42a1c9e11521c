//! CLI command parsing and execution.

pub mod chat;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::Provider;

/// agent-chat - chat with a deep agent over Server-Sent Events.
#[derive(Parser)]
#[command(name = "agent-chat")]
#[command(about = "Chat server and client for streaming deep agent runs")]
#[command(version)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase logging verbosity.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API server.
    Serve {
        /// Host to bind to (defaults to `server.host`).
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to (defaults to `server.port`).
        #[arg(short, long)]
        port: Option<u16>,

        /// Upstream agent service URL.
        #[arg(long, env = "AGENT_CHAT_UPSTREAM", conflicts_with = "replay")]
        upstream: Option<String>,

        /// Replay a JSON-lines file of agent events instead of a live agent.
        #[arg(long, conflicts_with = "upstream")]
        replay: Option<PathBuf>,
    },

    /// Send one prompt and stream the reply.
    #[command(visible_alias = "c")]
    Chat {
        /// The prompt to send.
        prompt: String,

        #[command(flatten)]
        target: ServerArgs,

        /// Model provider.
        #[arg(long, value_enum)]
        provider: Option<Provider>,

        /// Model id (defaults to the provider's default).
        #[arg(short, long)]
        model: Option<String>,
    },

    /// List sandbox files, or print one.
    Files {
        /// File to print instead of listing.
        path: Option<String>,

        #[command(flatten)]
        target: ServerArgs,
    },

    /// Manage configuration.
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

/// Which server and session a client command talks to.
#[derive(Debug, Clone, clap::Args)]
pub struct ServerArgs {
    /// Server URL (defaults to the configured `server` address).
    #[arg(long)]
    pub server: Option<String>,

    /// Session id.
    #[arg(short, long, default_value = "default")]
    pub session: String,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the current configuration.
    Show,

    /// Show the configuration file path.
    Path,

    /// Store an API key in the system keychain.
    SetKey {
        #[arg(value_enum)]
        provider: KeyProvider,

        /// The key; read from stdin when omitted.
        key: Option<String>,
    },

    /// Remove an API key from the system keychain.
    DeleteKey {
        #[arg(value_enum)]
        provider: KeyProvider,
    },
}

/// Services the server holds keys for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KeyProvider {
    Anthropic,
    #[value(name = "openai")]
    OpenAi,
    Tavily,
}

impl KeyProvider {
    /// Keychain entry name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::OpenAi => "openai",
            Self::Tavily => "tavily",
        }
    }
}
