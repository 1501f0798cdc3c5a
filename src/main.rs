mod app;
mod cache;
mod chart;
mod color;
mod config;
mod data;
mod error;
mod pipeline;
mod state;
mod ui;

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use eframe::egui;

use app::WowApp;
use config::Config;
use data::loader::{to_record_batch, DatasetCache};
use pipeline::{Gallery, Params, Pipeline};

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

#[derive(Debug, Parser)]
#[command(name = "rusty-wow", version, about = "Workout Wednesday 2018 chart recreations")]
struct Cli {
    /// Folder holding the dataset files [env: RUSTY_WOW_DATA_DIR]
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Evaluations kept in memory before the oldest is dropped
    #[arg(long, global = true)]
    memo_capacity: Option<usize>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Open the desktop viewer (default)
    Gui,
    /// List the available challenges and their parameters
    List,
    /// Write a challenge's chart specification as JSON
    Export {
        id: String,
        /// Output file; stdout when omitted
        #[arg(long, short)]
        out: Option<PathBuf>,
        /// Parameter override, `name=value`; repeatable
        #[arg(long = "param", short = 'p')]
        params: Vec<String>,
    },
    /// Print a challenge's derived table
    Table {
        id: String,
        #[arg(long = "param", short = 'p')]
        params: Vec<String>,
        /// Only print the first N rows
        #[arg(long)]
        limit: Option<usize>,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = Config::resolve(cli.data_dir, cli.memo_capacity);

    match cli.command.unwrap_or(Command::Gui) {
        Command::Gui => run_gui(config),
        Command::List => {
            list(&gallery(&config));
            Ok(())
        }
        Command::Export { id, out, params } => export(&config, &id, &params, out),
        Command::Table { id, params, limit } => print_table(&config, &id, &params, limit),
    }
}

fn gallery(config: &Config) -> Gallery {
    Gallery::new(DatasetCache::new(&config.data_dir), config.memo_capacity)
}

// ---------------------------------------------------------------------------
// Headless commands
// ---------------------------------------------------------------------------

/// Parse `name=value` overrides against the challenge's declared parameters.
fn parse_params(pipeline: &dyn Pipeline, raw: &[String]) -> anyhow::Result<Params> {
    let specs = pipeline.params();
    let mut params = Params::new();
    for pair in raw {
        let Some((name, value)) = pair.split_once('=') else {
            bail!("parameter '{pair}' is not of the form name=value");
        };
        let name = name.trim();
        match specs.iter().find(|s| s.name == name) {
            Some(spec) => params.set(name, spec.parse(value)?),
            None => log::warn!("{}: ignoring unknown parameter '{name}'", pipeline.id()),
        }
    }
    Ok(params)
}

fn list(gallery: &Gallery) {
    for pipeline in gallery.pipelines() {
        println!("{}  {}", pipeline.id(), pipeline.title());
        for spec in pipeline.params() {
            println!("    {:<14} {} (default {})", spec.name, spec.label, spec.default);
        }
    }
}

fn export(config: &Config, id: &str, raw: &[String], out: Option<PathBuf>) -> anyhow::Result<()> {
    let mut gallery = gallery(config);
    let params = parse_params(gallery.pipeline(id)?, raw)?;
    let evaluation = gallery.evaluate(id, &params)?;
    let json = evaluation.chart.to_json().context("serializing chart")?;
    match out {
        Some(path) => {
            std::fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
            log::info!("Wrote {id} chart to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn print_table(config: &Config, id: &str, raw: &[String], limit: Option<usize>) -> anyhow::Result<()> {
    let mut gallery = gallery(config);
    let params = parse_params(gallery.pipeline(id)?, raw)?;
    let evaluation = gallery.evaluate(id, &params)?;
    let head = limit.map(|n| evaluation.table.head(n));
    let batch = to_record_batch(head.as_ref().unwrap_or(&*evaluation.table))?;
    let pretty = arrow::util::pretty::pretty_format_batches(&[batch]).context("formatting table")?;
    println!("{id} ({})\n{pretty}", evaluation.params);
    Ok(())
}

// ---------------------------------------------------------------------------
// Desktop viewer
// ---------------------------------------------------------------------------

fn run_gui(config: Config) -> anyhow::Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 860.0])
            .with_min_inner_size([640.0, 420.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Rusty WOW – Workout Wednesday 2018",
        options,
        Box::new(move |_cc| Ok(Box::new(WowApp::new(&config)))),
    )
    .map_err(|e| anyhow!("viewer failed: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_are_parsed_by_kind() {
        let gallery = gallery(&Config::default());
        let pipeline = gallery.pipeline("2018w02").unwrap();
        let params = parse_params(pipeline, &["start_month=4".into(), "bogus=1".into()]).unwrap();
        assert_eq!(params.int("start_month").unwrap(), 4);
        assert!(params.get("bogus").is_none());

        assert!(parse_params(pipeline, &["start_month".into()]).is_err());
        assert!(parse_params(pipeline, &["start_month=13".into()]).is_err());
    }

    #[test]
    fn cli_defaults_to_the_viewer() {
        let cli = Cli::try_parse_from(["rusty-wow"]).unwrap();
        assert!(cli.command.is_none());
        let cli = Cli::try_parse_from(["rusty-wow", "export", "2018w05", "-p", "years=2016"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Export { ref id, .. }) if id == "2018w05"));
        let cli = Cli::try_parse_from(["rusty-wow", "table", "2018w01", "--limit", "5"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Table { limit: Some(5), .. })));
    }
}
