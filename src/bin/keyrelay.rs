//! keyrelay CLI
//!
//! - `keyrelay ask <PROMPT> [-p PROVIDER]... [-s SYSTEM]`: print one completion
//! - `keyrelay providers`: show key pools per provider

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use keyrelay::{DispatchRequest, DispatcherSettings, KeySource, ProviderDispatcher, ProviderId, SettingsLoader};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "keyrelay", version, about, long_about = None)]
struct Cli {
    /// Settings file (defaults to the standard search path)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a prompt and print the first successful completion
    Ask {
        /// Prompt text
        prompt: String,

        /// Provider to try, in order (repeatable). Defaults to the configured order.
        #[arg(short, long = "provider")]
        providers: Vec<String>,

        /// System / instruction message
        #[arg(short, long)]
        system: Option<String>,

        /// Also print which provider answered (to stderr)
        #[arg(long, default_value_t = false)]
        verbose: bool,
    },

    /// List providers and how many keys each has
    Providers,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("keyrelay=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_settings(path: Option<&PathBuf>) -> Result<DispatcherSettings> {
    let loader = match path {
        Some(p) => SettingsLoader::from_path(p)
            .with_context(|| format!("loading settings from {}", p.display()))?,
        None => SettingsLoader::new().context("loading settings")?,
    };
    Ok(loader.into_settings()?)
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let settings = load_settings(cli.settings.as_ref())?;
    let dispatcher = ProviderDispatcher::from_settings(settings, &KeySource::from_env())
        .context("initializing dispatcher")?;

    match cli.command {
        Commands::Ask {
            prompt,
            providers,
            system,
            verbose,
        } => {
            let mut request = DispatchRequest::new(prompt);
            if let Some(system) = system {
                request = request.with_system(system);
            }
            if !providers.is_empty() {
                let order = providers
                    .iter()
                    .map(|p| p.parse::<ProviderId>())
                    .collect::<keyrelay::Result<Vec<_>>>()?;
                request = request.with_providers(order);
            }

            let completion = dispatcher
                .dispatch_request(&request)
                .await
                .context("dispatch failed")?;

            if verbose {
                eprintln!(
                    "[{} after {} attempt(s)]",
                    completion.provider.display_name(),
                    completion.attempts
                );
            }
            println!("{}", completion.text);
        }

        Commands::Providers => {
            let order = dispatcher.default_order();
            for stats in dispatcher.stats() {
                let status = if stats.total_keys > 0 { "available" } else { "no keys" };
                let rank = order
                    .iter()
                    .position(|p| *p == stats.provider)
                    .map(|i| format!("#{}", i + 1))
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{:<12} {:<4} {:>2} key(s)  {}",
                    stats.provider, rank, stats.total_keys, status
                );
            }
        }
    }

    Ok(())
}
