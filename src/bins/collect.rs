use anyhow::Context;
use avatar_analyzer::*;
use clap::Parser;
use std::path::PathBuf;
use tracing::warn;

#[derive(Parser, Debug)]
#[command(author, version, about = "Download the images drawn over the charts", long_about = None)]
struct Args {
    /// TOML config file; defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Directory to save images into, overriding the config
    #[arg(short, long)]
    assets: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(assets) = args.assets {
        config.assets = assets;
    }

    let collected = collect(&config.overlays, &config.assets)
        .with_context(|| format!("collecting overlays into {}", config.assets.display()))?;
    println!(
        "{} downloaded, {} already present, {} failed",
        collected.downloaded.len(),
        collected.skipped.len(),
        collected.failed.len()
    );
    for name in &collected.failed {
        warn!(asset = %name, "charts will be drawn without this overlay");
    }
    Ok(())
}
