// SPDX-License-Identifier: MIT OR Apache-2.0
//! `OrdoPlay` flow inspector.
//!
//! Loads a flow snapshot (`.json` or `.ron`) into a headless store, logs
//! every problem the store reports and prints a summary followed by the
//! normalized snapshot.
//!
//! ```text
//! ordoplay_flow_inspect <snapshot> [--options <file.ron>] [--pane <width>x<height>] [--ron]
//! ```

mod report;

use clap::Parser;
use ordoplay_flow::{Dimensions, FlowOptions};
use report::{inspect, load_options, read, InspectError, SnapshotFormat};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Debug, PartialEq, Parser)]
#[command(name = "ordoplay_flow_inspect")]
#[command(about = "Inspect an OrdoPlay flow snapshot")]
struct Args {
    /// Snapshot to load (`.json` or `.ron`)
    snapshot: PathBuf,

    /// RON file with store options
    #[arg(long)]
    options: Option<PathBuf>,

    /// Pane size as <width>x<height>; fits the view when given
    #[arg(long, value_parser = parse_pane)]
    pane: Option<Dimensions>,

    /// Print the normalized snapshot as RON instead of JSON
    #[arg(long)]
    ron: bool,
}

fn parse_pane(size: &str) -> Result<Dimensions, String> {
    let invalid = || format!("invalid pane size {size}, expected <width>x<height>");
    let (width, height) = size.split_once('x').ok_or_else(invalid)?;
    let width: f64 = width.parse().map_err(|_| invalid())?;
    let height: f64 = height.parse().map_err(|_| invalid())?;
    Ok(Dimensions::new(width, height))
}

fn run(args: Args) -> Result<(), InspectError> {
    let format = SnapshotFormat::from_path(&args.snapshot)?;
    let content = read(&args.snapshot)?;
    let options = match &args.options {
        Some(path) => load_options(path)?,
        None => FlowOptions::default(),
    };

    let inspection = inspect(&args.snapshot, &content, format, options, args.pane)?;
    let report = &inspection.report;
    for (code, message) in &report.errors {
        tracing::warn!(%code, "{message}");
    }
    tracing::info!(
        nodes = report.nodes,
        edges = report.edges,
        errors = report.errors.len(),
        "Inspected {}",
        args.snapshot.display()
    );

    let snapshot = if args.ron {
        inspection.store.to_ron()?
    } else {
        inspection.store.to_json()?
    };
    println!("{:#}", report.to_json());
    println!("{snapshot}");
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("ordoplay_flow=debug,ordoplay_flow_inspect=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    fn args(list: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("ordoplay_flow_inspect").chain(list.iter().copied()))
    }

    #[test]
    fn test_parse_args() {
        let parsed = args(&["flow.json", "--pane", "800x600", "--ron"]).unwrap();
        assert_eq!(
            parsed,
            Args {
                snapshot: PathBuf::from("flow.json"),
                options: None,
                pane: Some(Dimensions::new(800.0, 600.0)),
                ron: true,
            }
        );

        let parsed = args(&["--options", "opts.ron", "flow.ron"]).unwrap();
        assert_eq!(parsed.options, Some(PathBuf::from("opts.ron")));
        assert!(!parsed.ron);
    }

    #[test]
    fn test_parse_args_errors() {
        let kind = |list: &[&str]| args(list).map(|_| ()).map_err(|err: clap::Error| err.kind());
        assert_eq!(kind(&[]), Err(ErrorKind::MissingRequiredArgument));
        assert_eq!(kind(&["a.json", "b.json"]), Err(ErrorKind::UnknownArgument));
        assert_eq!(kind(&["a.json", "--pane", "wide"]), Err(ErrorKind::ValueValidation));
        assert_eq!(kind(&["a.json", "--verbose"]), Err(ErrorKind::UnknownArgument));
        assert_eq!(kind(&["--help"]), Err(ErrorKind::DisplayHelp));
        assert_eq!(kind(&["-h"]), Err(ErrorKind::DisplayHelp));
    }

    #[test]
    fn test_parse_pane() {
        assert_eq!(parse_pane("1280x720"), Ok(Dimensions::new(1280.0, 720.0)));
        assert!(parse_pane("1280").is_err());
        assert!(parse_pane("ax720").is_err());
    }
}
