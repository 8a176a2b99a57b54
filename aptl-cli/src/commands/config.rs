use anyhow::Result;
use aptl_core::{AptlConfig, console, sources};
use clap::Args;

#[derive(Args, Debug)]
pub struct ConfigArgs {}

pub fn run(_args: ConfigArgs, config: &AptlConfig) -> Result<()> {
    console::header("config", env!("CARGO_PKG_VERSION"));

    console::info("paths");
    console::info(&format!("  cache dir: {}", config.cache_dir.display()));
    console::info(&format!(
        "  sources.list: {}",
        config.sourcelist_path().display()
    ));
    console::info(&format!(
        "  sources.list.d: {}",
        config.sourceparts_dir().display()
    ));
    console::info(&format!("  lists dir: {}", config.lists_dir().display()));
    console::info(&format!("  status file: {}", config.status_path().display()));
    console::info(&format!(
        "  archives dir: {}",
        config.archives_dir().display()
    ));
    eprintln!();

    console::info("resolver");
    console::info(&format!("  architecture: {}", config.architecture));
    console::info(&format!(
        "  install recommends: {}",
        config.install_recommends
    ));
    eprintln!();

    console::info("network");
    console::info(&format!(
        "  connect timeout: {}s",
        config.connect_timeout_secs
    ));
    eprintln!();

    console::info("sources");
    match sources::read_sources(config) {
        Ok(entries) if entries.is_empty() => console::info("  none"),
        Ok(entries) => {
            for target in sources::targets_for(&entries, config.architecture) {
                console::info(&format!("  {}", target.url));
            }
        }
        Err(err) => console::warn(&err.to_string()),
    }
    eprintln!();

    console::info("logging");
    console::info(&format!("  verbose: {}", config.verbose));

    Ok(())
}
