use super::{parse_specifiers, read_specifiers};
use anyhow::Result;
use aptl_core::{AptlConfig, console, operations};
use clap::Args;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Directory the .deb files are written to
    pub dest: PathBuf,
    #[arg(required = true)]
    pub packages: Vec<String>,
    /// Treat the first package argument as a file listing packages
    #[arg(short = 'f', long = "file")]
    pub file: bool,
}

pub fn run(args: FetchArgs, config: &AptlConfig) -> Result<()> {
    console::header("fetch", env!("CARGO_PKG_VERSION"));

    let specifiers = if args.file {
        read_specifiers(Path::new(&args.packages[0]))?
    } else {
        parse_specifiers(&args.packages)
    };

    let paths = operations::fetch(config, &specifiers, &args.dest)?;

    for path in paths.iter() {
        console::verbose(&format!("saved {}", path.display()));
    }

    Ok(())
}
