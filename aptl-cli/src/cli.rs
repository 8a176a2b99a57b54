use crate::commands;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "apt-local",
    about = "APT cache querying and searching for local databases",
    version,
    color = clap::ColorChoice::Auto
)]
pub struct Cli {
    /// Use ARCH instead of the host architecture
    #[arg(
        short = 'a',
        long = "arch",
        value_name = "ARCH",
        value_parser = ["amd64", "armhf"],
        global = true
    )]
    pub arch: Option<String>,

    /// Cache directory
    #[arg(short = 'c', long = "cache", value_name = "CACHE-DIR", global = true)]
    pub cache: Option<PathBuf>,

    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Update the APT database
    Update(commands::update::UpdateArgs),
    /// Return a list of packages to install
    Install(commands::install::InstallArgs),
    /// Fetch binary packages
    Fetch(commands::fetch::FetchArgs),
    /// Show package information
    Show(commands::show::ShowArgs),
    /// Show the resolved configuration
    Config(commands::config::ConfigArgs),
}
