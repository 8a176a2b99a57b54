use anyhow::{Context, Result};
use aptl_core::{AptlConfig, console, operations};
use clap::Args;
use std::fs;
use std::io;

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Sourcelist to use instead of the system default (`-` reads stdin)
    pub sourcelist: String,
}

pub fn run(args: UpdateArgs, config: &AptlConfig) -> Result<()> {
    console::header("update", env!("CARGO_PKG_VERSION"));

    let text = if args.sourcelist == "-" {
        io::read_to_string(io::stdin()).context("failed to read sourcelist from stdin")?
    } else {
        fs::read_to_string(&args.sourcelist)
            .with_context(|| format!("failed to read sourcelist {}", args.sourcelist))?
    };

    let summary = operations::update(config, text.trim_end())?;

    if !summary.removed.is_empty() {
        console::verbose(&format!(
            "removed stale lists: {}",
            summary.removed.join(", ")
        ));
    }
    console::info(&format!("Fetched {} B", summary.bytes));

    Ok(())
}
