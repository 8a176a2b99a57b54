use anyhow::Result;
use aptl_core::{AptlConfig, Architecture, console};
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Command};

fn main() -> ExitCode {
    let args = Cli::parse();

    let result = apply_overrides(&args, AptlConfig::from_env()).and_then(|config| {
        init_tracing(config.verbose);
        run(args.command, &config)
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            console::error(&format!("{:#}", err));
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command, config: &AptlConfig) -> Result<()> {
    tracing::debug!(?config, "resolved configuration");

    match command {
        Command::Update(update_args) => commands::update::run(update_args, config),
        Command::Install(install_args) => commands::install::run(install_args, config),
        Command::Fetch(fetch_args) => commands::fetch::run(fetch_args, config),
        Command::Show(show_args) => commands::show::run(show_args, config),
        Command::Config(config_args) => commands::config::run(config_args, config),
    }
}

/// Layers the global command line options over the environment-derived
/// configuration.
fn apply_overrides(args: &Cli, mut config: AptlConfig) -> Result<AptlConfig> {
    if let Some(arch) = args.arch.as_deref() {
        let architecture = Architecture::parse(arch)
            .ok_or_else(|| anyhow::anyhow!("unsupported architecture {arch}"))?;
        config = config.with_architecture(architecture);
    }

    if let Some(cache) = args.cache.as_ref() {
        config = config.with_cache_dir(cache);
    }

    if args.verbose {
        config = config.with_verbose(true);
    }

    Ok(config)
}

fn default_directive(verbose: bool) -> &'static str {
    if verbose { "debug" } else { "info" }
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
