use anyhow::Context;
use avatar_analyzer::*;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::{path::PathBuf, time::Duration};
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Analyze the Avatar transcript dataset", long_about = None)]
struct Args {
    /// Transcript CSV, overriding the config
    dataset: Option<PathBuf>,
    /// TOML config file; defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Encoding of the CSV file, overriding the config
    #[arg(short, long, value_enum)]
    encoding: Option<Encoding>,
    /// Where to write the report JSON, overriding the config
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(dataset) = args.dataset {
        config.dataset = dataset;
    }
    if let Some(encoding) = args.encoding {
        config.encoding = encoding;
    }
    if let Some(output) = args.output {
        config.report = output;
    }

    let mut dataset = Dataset::load(&config.dataset, config.encoding)
        .with_context(|| format!("loading {}", config.dataset.display()))?;
    let filled = dataset.fill_missing_ratings()?;
    info!(filled, "imputed missing ratings");

    let bar = ProgressBar::new(dataset.len() as u64);
    bar.set_prefix("Scoring sentiment");
    bar.set_style(ProgressStyle::with_template(
        " [{elapsed_precise}] {prefix:<22} {bar:30.cyan/red} {pos:>6}/{len:<6} [{per_sec:8}] {msg} {spinner}",
    )?);
    bar.set_message("Scoring lines...");
    bar.enable_steady_tick(Duration::from_millis(100));
    dataset.score_sentiment(&bar)?;
    bar.finish_and_clear();

    let report = Report::build(&dataset, filled, &config);
    println!("{}", report.summary(&config));

    report
        .save(&config.report)
        .with_context(|| format!("saving report to {}", config.report.display()))?;
    info!(report = %config.report.display(), "saved report");
    Ok(())
}
