use std::sync::Arc;

use anyhow::bail;
use clap::Parser;
use inquire::error::InquireResult;
use tracing_subscriber::EnvFilter;

mod app;
mod auth;
mod cache;
mod cli;
mod config;
mod matcher;
mod metadata;
mod storage;
#[cfg(test)]
mod tests;
mod web;

use app::{AppFactory, VideoService};
use auth::AccessTokens;

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mlbv=info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let args = cli::Args::parse();
    init_logging();

    let base_path = AppFactory::get_base_path()?;
    let mut config = AppFactory::create_config(&base_path)?;

    match args.command {
        cli::Command::Daemon { listen } => {
            if let Some(listen) = listen {
                config.listen_addr = listen;
            }

            let service = Arc::new(AppFactory::create_service(&config)?);
            let tokens = AccessTokens::from_config(&config);
            web::start_daemon(service, tokens, &config.listen_addr)
        }

        cli::Command::Import { url } => {
            let service = AppFactory::create_service(&config)?;
            let record = service.import_by_url(&url)?;
            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(())
        }

        cli::Command::Validate { url } => {
            let validation = VideoService::check_url(&url);
            println!("{}", serde_json::to_string_pretty(&validation)?);
            if !validation.valid {
                std::process::exit(1);
            }
            Ok(())
        }

        cli::Command::ClearCache { slug, yes } => {
            let service = AppFactory::create_service(&config)?;

            if slug.is_none() && !yes {
                match inquire::prompt_confirmation("Remove every cached video?") {
                    InquireResult::Ok(true) => {}
                    InquireResult::Ok(false) => return Ok(()),
                    InquireResult::Err(err) => bail!("An error occurred: {}", err),
                }
            }

            let cleared = service.clear_cache(slug.as_deref())?;
            println!("{} cached videos removed", cleared);
            Ok(())
        }
    }
}
