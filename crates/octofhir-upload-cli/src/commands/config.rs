use anyhow::Result;
use colored::Colorize;

use crate::cli::ConfigCommands;
use crate::config;
use crate::output::print_success;

pub fn run(command: &ConfigCommands, profile: &str) -> Result<()> {
    match command {
        ConfigCommands::Show => {
            let cfg = config::load_profile(profile)?;
            println!("{}: {}", "Profile".cyan(), profile);
            let show = |value: Option<String>| value.unwrap_or_else(|| "(not set)".to_string());
            println!("{}: {}", "Server".cyan(), show(cfg.server));
            println!(
                "{}: {}",
                "Patch dir".cyan(),
                show(cfg.patch_dir.map(|p| p.display().to_string()))
            );
            println!("{}: {}", "Editor".cyan(), show(cfg.editor));
            println!(
                "{}: {}",
                "Max attempts".cyan(),
                show(cfg.max_attempts.map(|n| n.to_string()))
            );
            println!(
                "{}: {}",
                "Timeout".cyan(),
                show(cfg.timeout_secs.map(|n| format!("{n}s")))
            );
            println!("{}: {}", "Log level".cyan(), show(cfg.log_level));
        }
        ConfigCommands::Set(set_args) => {
            let mut cfg = config::load_profile(profile)?;
            cfg.set(&set_args.key, &set_args.value)?;
            config::save_profile(profile, &cfg)?;
            print_success(&format!("Set {} = {}", set_args.key, set_args.value));
        }
    }
    Ok(())
}
