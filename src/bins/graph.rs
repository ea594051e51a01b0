use anyhow::Context;
use avatar_analyzer::*;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Draw the charts from a saved report", long_about = None)]
struct Args {
    /// TOML config file; defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Report JSON written by `analyze`, overriding the config
    #[arg(short, long)]
    report: Option<PathBuf>,
    /// Directory to draw charts into, overriding the config
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(report) = args.report {
        config.report = report;
    }
    if let Some(output) = args.output {
        config.graphs = output;
    }

    let report = Report::restore(&config.report)
        .with_context(|| format!("run `analyze` first to produce {}", config.report.display()))?;
    for path in render_all(&report, &config)? {
        println!("{}", path.display());
    }
    Ok(())
}
