//! chainwatch - follow an account's balance across Polkadot-SDK chains.

mod command;
mod status;

use std::path::PathBuf;

use chainwatch_chain::RpcChainClient;
use chainwatch_core::config::{self, AppConfig, ConfigError};
use chainwatch_core::{Account, ChainInfo};
use chainwatch_session::{SessionError, SessionHandle, SessionSettings, SessionView};
use clap::Parser;
use color_eyre::Result;
use command::Command;
use tokio::io::AsyncBufReadExt;
use tokio::sync::watch;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Follow an account's balance across Polkadot-SDK chains.
#[derive(Parser, Debug)]
#[command(name = "chainwatch")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Chain to connect to, by registry name or endpoint
    #[arg(short, long, conflicts_with = "endpoint")]
    chain: Option<String>,

    /// Custom RPC endpoint URL, not required to be in the registry
    #[arg(long)]
    endpoint: Option<String>,

    /// Account address to track
    #[arg(short, long)]
    account: Option<String>,

    /// Print the known chains and exit
    #[arg(long)]
    list_chains: bool,

    /// Start locked; type 'unlock' to begin chain access
    #[arg(long)]
    locked: bool,

    /// Remember the chain and account for the next run
    #[arg(long)]
    save: bool,

    /// Config file path (defaults to the platform config directory)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    color_eyre::install()?;

    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("chainwatch=info".parse()?)
        .add_directive("chainwatch_chain=info".parse()?)
        .add_directive("chainwatch_core=info".parse()?)
        .add_directive("chainwatch_session=info".parse()?);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config_path = match args.config.clone() {
        Some(path) => path,
        None => config::get_config_path()?,
    };
    let mut app_config = load_app_config(&config_path);
    let registry = app_config.registry();

    if args.list_chains {
        for chain in registry.iter() {
            println!("{:<24} {:<6} {}", chain.name, chain.token_symbol, chain.endpoint);
        }
        return Ok(());
    }

    let settings = SessionSettings {
        connect_timeout: app_config.connect_timeout(),
        balance_timeout: app_config.balance_timeout(),
        poll_interval: app_config.poll_interval(),
        cache_capacity: app_config.cache_capacity(),
    };
    let client = RpcChainClient::new(settings.balance_timeout);
    let session = SessionHandle::spawn(client, registry, settings);
    let printer = tokio::spawn(print_views(session.subscribe()));

    // Without an unlock the requests below are recorded and replayed later.
    if !args.locked {
        session.unlock().await?;
    }

    if let Some(url) = &args.endpoint {
        report(session.select_chain(ChainInfo::new(url.clone(), url.clone())).await)?;
    } else if let Some(query) = args.chain.as_deref().or(app_config.last_chain.as_deref()) {
        report(session.select_by_name(query).await.map(|_| ()))?;
    }
    let account = args
        .account
        .as_deref()
        .map(Account::from)
        .or_else(|| app_config.last_account());
    if let Some(account) = account {
        report(session.track(account).await)?;
    }

    run_commands(&session).await?;

    let last_view = session.view();
    session.shutdown().await?;
    drop(session);
    let _ = printer.await;

    if args.save {
        remember(&mut app_config, &last_view);
        config::save_config_to(&app_config, &config_path)?;
        tracing::info!("Saved config to {}", config_path.display());
    }

    Ok(())
}

/// Load the config file, falling back to defaults. A corrupted file is
/// backed up before it gets overwritten.
fn load_app_config(path: &std::path::Path) -> AppConfig {
    match config::load_config_from(path) {
        Ok(config) => config,
        Err(ConfigError::Json(e)) => {
            tracing::warn!("Config file {} is corrupted: {}", path.display(), e);
            match config::backup_corrupted_config(path) {
                Ok(backup) => tracing::warn!("Backed up corrupted config to {}", backup.display()),
                Err(e) => tracing::warn!("Failed to back up corrupted config: {}", e),
            }
            AppConfig::default()
        }
        Err(e) => {
            tracing::warn!("Failed to load config: {}", e);
            AppConfig::default()
        }
    }
}

/// Store the chain and account the user ended up on.
fn remember(app_config: &mut AppConfig, view: &SessionView) {
    if let Some(chain) = &view.selected_chain {
        app_config.last_chain = Some(chain.endpoint.clone());
    }
    if let Some(account) = &view.account {
        app_config.last_account = Some(account.as_str().to_string());
    }
}

async fn run_commands(session: &SessionHandle) -> Result<()> {
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let command = match command::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                eprintln!("{}", e);
                continue;
            }
        };

        match command {
            Command::Chain(query) => report(session.select_by_name(&query).await.map(|_| ()))?,
            Command::Track(account) => report(session.track(account).await)?,
            Command::Lock => session.lock().await?,
            Command::Unlock => session.unlock().await?,
            Command::Chains => {
                for chain in session.chains().await? {
                    println!("  {}", chain);
                }
            }
            Command::Status => println!("{}", status::render(&session.view())),
            Command::Help => println!("{}", command::HELP),
            Command::Quit => break,
        }
    }

    Ok(())
}

/// Print request outcomes the user should know about. Only a closed session
/// is fatal.
fn report(result: Result<(), SessionError>) -> Result<()> {
    match result {
        Ok(()) => Ok(()),
        Err(e) if e.is_deferred() => {
            println!("Locked: request will run on unlock.");
            Ok(())
        }
        Err(SessionError::Request(e)) => {
            eprintln!("{}", e);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

async fn print_views(mut views: watch::Receiver<SessionView>) {
    println!("{}", status::render(&views.borrow_and_update()));
    while views.changed().await.is_ok() {
        let line = status::render(&views.borrow_and_update());
        println!("{}", line);
    }
}
