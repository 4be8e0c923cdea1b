use anyhow::Context;
use clap::Parser;
use gcodesnap::{init_logging, Config, GcodeProcessor, BUILD_DATE, VERSION};
use std::path::PathBuf;

/// Plan stabilized timelapse snapshots for a G-code file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// G-code file to process
    gcode_file: PathBuf,

    /// Configuration file (.toml or .json); the user config is used when omitted
    config_file: Option<PathBuf>,

    /// Print the result as single line JSON
    #[arg(long)]
    compact: bool,
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    match path {
        Some(path) => Config::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => match Config::default_path() {
            Ok(path) => Config::load_or_default(&path)
                .with_context(|| format!("Failed to load config {}", path.display())),
            Err(_) => Ok(Config::default()),
        },
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = load_config(args.config_file.as_ref())?;

    init_logging(&config.logging)?;
    tracing::info!(version = VERSION, build_date = BUILD_DATE, "gcodesnap starting");

    let processor = GcodeProcessor::new(&config.tracker, &config.stabilization)?
        .with_progress_interval(config.processing.progress_interval());
    let result = processor.process_file(&args.gcode_file, |report| {
        tracing::info!(
            percent = format_args!("{:.1}", report.percent),
            remaining_secs = format_args!("{:.0}", report.seconds_remaining),
            lines = report.lines_processed,
            "processing"
        );
        true
    });

    for issue in &result.processing_issues {
        tracing::warn!("{}", issue);
    }
    for issue in &result.quality_issues {
        tracing::warn!("{}", issue);
    }

    let json = if args.compact {
        serde_json::to_string(&result)?
    } else {
        serde_json::to_string_pretty(&result)?
    };
    println!("{}", json);

    if !result.success {
        std::process::exit(1);
    }
    Ok(())
}
