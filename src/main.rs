use std::io::Read as _;
use std::process::ExitCode;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use agent_chat::{
    Config,
    api::AppState,
    cli::{Cli, Commands, ConfigCommands, ServerArgs, chat},
    core::{keychain, runner},
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Serve {
            host,
            port,
            upstream,
            replay,
        } => {
            let mut config = Config::load()?;
            if upstream.is_some() || replay.is_some() {
                config.agent.upstream = upstream;
                config.agent.replay = replay;
            }
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);

            let runner = runner::from_config(&config.agent)?;
            let state = AppState::from_config(&config, runner);
            agent_chat::api::serve(&host, port, state).await?;
        }

        Commands::Chat {
            prompt,
            target,
            provider,
            model,
        } => {
            let (server, session) = resolve_target(target)?;
            let cancel = CancellationToken::new();
            abort_on_ctrl_c(cancel.clone());

            let options = chat::ChatOptions {
                server,
                session,
                provider,
                model,
            };
            chat::run(options, &prompt, cancel).await?;
        }

        Commands::Files { path, target } => {
            let (server, session) = resolve_target(target)?;
            chat::files(&server, session, path.as_deref()).await?;
        }

        Commands::Config { command } => match command {
            ConfigCommands::Show => {
                let config = Config::load()?;
                println!("{}", toml::to_string_pretty(&config)?);
            }
            ConfigCommands::Path => {
                let path = Config::config_path()?;
                println!("{}", path.display());
            }
            ConfigCommands::SetKey { provider, key } => {
                let key = match key {
                    Some(key) => key,
                    None => {
                        let mut buf = String::new();
                        std::io::stdin().read_to_string(&mut buf)?;
                        buf.trim().to_string()
                    }
                };
                keychain::store_api_key(provider.as_str(), &key)?;
                println!("Stored {} API key in system keychain", provider.as_str());
            }
            ConfigCommands::DeleteKey { provider } => {
                if keychain::delete_api_key(provider.as_str())? {
                    println!("Removed {} API key from system keychain", provider.as_str());
                } else {
                    println!("No {} API key stored", provider.as_str());
                }
            }
        },
    }

    Ok(())
}

/// Server URL and session for a client command.
fn resolve_target(
    target: ServerArgs,
) -> anyhow::Result<(String, agent_chat::core::SessionId)> {
    let server = match target.server {
        Some(server) => server,
        None => Config::load()?.server.url(),
    };
    let session = target.session.parse()?;
    Ok((server, session))
}

fn abort_on_ctrl_c(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupted, aborting turn");
            cancel.cancel();
        }
    });
}
