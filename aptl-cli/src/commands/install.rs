use super::{parse_specifiers, read_specifiers};
use anyhow::Result;
use aptl_core::operations::{self, DefaultsPolicy, InstallOptions};
use aptl_core::{AptlConfig, console};
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct InstallArgs {
    pub packages: Vec<String>,
    /// Write the package list to FILE instead of stdout
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output: Option<PathBuf>,
    /// Read requested packages from FILE, one per line (repeatable)
    #[arg(short = 'f', long = "file", value_name = "FILE")]
    pub file: Vec<PathBuf>,
    /// Print the list as JSON
    #[arg(long)]
    pub json: bool,
    /// Do not select essential and required packages by default
    #[arg(long = "no-defaults")]
    pub no_defaults: bool,
    #[arg(long = "no-install-recommends")]
    pub no_install_recommends: bool,
}

pub fn run(args: InstallArgs, config: &AptlConfig) -> Result<()> {
    console::header("install", env!("CARGO_PKG_VERSION"));

    let mut requested = parse_specifiers(&args.packages);
    for path in args.file.iter() {
        requested.extend(read_specifiers(path)?);
    }

    let options = InstallOptions {
        requested,
        defaults: if args.no_defaults {
            DefaultsPolicy::none()
        } else {
            DefaultsPolicy::default()
        },
    };

    let config = if args.no_install_recommends {
        config.clone().with_install_recommends(false)
    } else {
        config.clone()
    };

    let selected = operations::install(&config, &options)?;

    match args.output {
        Some(path) => selected.write_to(&path, args.json)?,
        None if args.json => println!("{}", selected.to_json()?),
        None => print!("{}", selected),
    }

    Ok(())
}
