//! Inspect the layered configuration

use std::fmt::Write as _;
use std::path::Path;

use anyhow::Result;
use clap::{Args, Subcommand};
use wapair_core::WapairConfig;

use super::hosts::describe_host;
use crate::config::ConfigLoader;

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the merged configuration with its resolved hosts
    Show,
    /// List the config layers and which of them are in effect
    Path,
}

pub fn run(args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommands::Show => {
            let config = ConfigLoader::load()?;
            print!("{}", render_config(&config)?);
        }
        ConfigCommands::Path => {
            let user = ConfigLoader::user_config_path();
            for line in describe_layers(user.as_deref(), &ConfigLoader::project_config_path()) {
                println!("{}", line);
            }
        }
    }
    Ok(())
}

/// Summary of the effective settings followed by the merged TOML
fn render_config(config: &WapairConfig) -> Result<String> {
    let mut out = String::new();

    writeln!(out, "# Gateway hosts")?;
    if config.gateway.hosts.is_empty() {
        writeln!(out, "#   (none, pass --host to connect)")?;
    }
    for (index, host) in config.gateway.hosts.iter().enumerate() {
        writeln!(out, "#   [{}] {}", index, describe_host(host))?;
    }
    writeln!(
        out,
        "# Polling every {} ms until '{}', giving up after {} failed polls",
        config.polling.interval().as_millis(),
        config.polling.success_token,
        config.polling.max_consecutive_errors.max(1),
    )?;
    match &config.record.endpoint {
        Some(endpoint) => writeln!(out, "# Recording authenticated sessions at {}", endpoint)?,
        None => writeln!(out, "# Recording disabled")?,
    }
    writeln!(out)?;
    out.push_str(&toml::to_string_pretty(config)?);

    Ok(out)
}

/// One line per layer in load order, then the layer that wins
fn describe_layers(user: Option<&Path>, project: &Path) -> Vec<String> {
    let user_found = user.is_some_and(Path::exists);
    let project_found = project.exists();

    let status = |found: bool| if found { "found" } else { "not found" };
    let user_line = match user {
        Some(path) => format!("user:    {} ({})", path.display(), status(user_found)),
        None => "user:    unavailable (no home directory)".to_string(),
    };
    let project_line = format!(
        "project: {} ({})",
        project.display(),
        status(project_found)
    );

    let effective = match (user_found, project_found) {
        (true, true) => "effective: project, overriding user where both set a value",
        (false, true) => "effective: project",
        (true, false) => "effective: user",
        (false, false) => "effective: built-in defaults",
    };

    vec![user_line, project_line, effective.to_string()]
}
