//! This is a command-line tool that keeps a responder's map marker up to date via [libresponder]
use crate::{
    cli::*,
    commands::sync::LocationSource,
    config::{Config, config_file},
    output::rows::StatusRow,
};
use anyhow::{Result, anyhow};
use clap::Parser;
use libresponder::{
    identity::{FileIdentityStore, Identity, IdentityStore},
    location::LocationFix,
};
use tracing::debug;
use tracing_subscriber::filter::EnvFilter;

mod cli;
mod commands;
mod config;
mod output;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_env("RESPONDER_LOG"))
        .with_writer(std::io::stderr)
        .init();
    let args = Cli::parse();
    let config_path = match args.config {
        Some(path) => path,
        None => config_file()?,
    };
    let mut cfg = Config::load_or_default(&config_path).await?;
    if let Some(server) = args.server {
        cfg.server = server;
    }
    debug!(?cfg.server, ?cfg.identity, "loaded config");
    let store = FileIdentityStore::new(&cfg.identity);

    match args.command {
        Commands::Login { username, user_id } => {
            let username = username
                .or_else(|| inquire::Text::new("Username:").prompt().ok())
                .filter(|u| !u.trim().is_empty())
                .ok_or_else(|| anyhow!("No username specified"))?;
            let user_id = user_id
                .or_else(|| inquire::Text::new("User id:").prompt().ok())
                .filter(|u| !u.trim().is_empty())
                .ok_or_else(|| anyhow!("No user id specified"))?;
            Identity::new(username.trim(), user_id.trim())
                .save(&store)
                .await?;
            println!("Logged in as {}", username.trim());
            Ok(())
        }
        Commands::Logout => {
            store.clear().await?;
            println!("Logged out");
            Ok(())
        }
        Commands::Status => {
            let identity = Identity::load(&store).await?;
            let row = StatusRow::new(
                cfg.server.clone(),
                config_path.display().to_string(),
                cfg.identity.display().to_string(),
                identity.as_ref(),
            );
            println!("{}", output::details(row));
            if identity.is_none() {
                println!("Not logged in");
            }
            Ok(())
        }
        Commands::Configure {
            url,
            identity,
            interval,
            timeout,
        } => {
            if let Some(url) = url {
                cfg.server = url;
            }
            if let Some(identity) = identity {
                cfg.identity = identity;
            }
            if let Some(interval) = interval {
                cfg.interval_secs = interval;
            }
            if let Some(timeout) = timeout {
                cfg.timeout_secs = timeout;
            }
            // fail early rather than on the first sync
            libresponder::backend::HttpBackend::new(&cfg.server, cfg.timeout())?;
            cfg.save_to_file(&config_path).await?;
            println!("Saved configuration to '{}'", config_path.display());
            Ok(())
        }
        Commands::Markers { all, output } => {
            commands::markers::list(&cfg, &store, all, output).await
        }
        Commands::Sync {
            latitude,
            longitude,
            title,
            stdin,
        } => {
            let source = match (latitude, longitude, stdin) {
                (_, _, true) => LocationSource::Stdin,
                (Some(latitude), Some(longitude), false) => LocationSource::Fixed(
                    LocationFix::checked(latitude, longitude, title.unwrap_or_default())?,
                ),
                _ => return Err(anyhow!("No location specified")),
            };
            commands::sync::run(&cfg, store, source).await
        }
        Commands::Submit {
            service,
            name,
            message,
        } => commands::submit::handle_command(&cfg, service, name, message).await,
    }
}
