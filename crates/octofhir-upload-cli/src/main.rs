mod auth;
mod cli;
mod commands;
mod config;
mod logging;
mod output;
mod prompt;

use anyhow::Result;
use clap::Parser;

use cli::{Cli, Commands};
use output::print_error;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let profile = &cli.profile;
    let cfg = config::load_profile(profile)?;

    let level = cli
        .log_level
        .as_deref()
        .or(cfg.log_level.as_deref())
        .unwrap_or(logging::DEFAULT_LOG_LEVEL);
    logging::init_tracing(level, cli.log_file.as_deref())?;

    match &cli.command {
        Commands::Upload(args) => {
            let server = config::resolve_server(&cli.server, &cfg, profile)?;
            commands::upload::upload(args, &server, &cfg, profile).await?;
        }
        Commands::RewriteId(args) => {
            commands::rewrite_id::rewrite_ids(args)?;
        }
        Commands::Config(args) => {
            commands::config::run(&args.command, profile)?;
        }
    }

    Ok(())
}
