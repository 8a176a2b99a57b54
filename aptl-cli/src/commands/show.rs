use super::parse_specifiers;
use anyhow::Result;
use aptl_core::{AptlConfig, console, operations};
use clap::Args;

#[derive(Args, Debug)]
pub struct ShowArgs {
    #[arg(required = true)]
    pub packages: Vec<String>,
    /// Print records through TEMPLATE, e.g. '%(Package)s %(Version)s'
    #[arg(short = 'f', long = "format", value_name = "TEMPLATE")]
    pub format: Option<String>,
}

pub fn run(args: ShowArgs, config: &AptlConfig) -> Result<()> {
    console::header("show", env!("CARGO_PKG_VERSION"));

    let specifiers = parse_specifiers(&args.packages);
    let records = operations::show(config, &specifiers, args.format.as_deref())?;

    for record in records {
        if args.format.is_some() {
            println!("{}", record);
        } else {
            println!("{}\n", record);
        }
    }

    Ok(())
}
