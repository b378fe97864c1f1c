//! CLI entry point: `analyze` runs C1-C4 over a config directory and
//! prints the topology/validator JSON; `simulate` additionally stands
//! up the C5 engine and drives the C6/C7 scenario scripts.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use log::info;

use netlab::config::load_dir;
use netlab::scenario::{bring_up_interfaces, day2};
use netlab::settings::Settings;
use netlab::sim::Engine;
use netlab::topology::{build, export};
use netlab::traffic::analyze_capacity;
use netlab::validate::validate;
use netlab::Result;

#[derive(Debug, Parser)]
#[clap(name = "netlab", about = "Network config parsing, validation, and simulation")]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Parse, build, validate, and analyze a directory of device configs.
    Analyze {
        /// Directory containing device config text files.
        #[clap(long = "configs", short = 'c')]
        configs: PathBuf,
    },
    /// Run `analyze`, then start the simulation engine and run Day-1
    /// bring-up followed by the Day-2 test report.
    Simulate {
        /// Directory containing device config text files.
        #[clap(long = "configs", short = 'c')]
        configs: PathBuf,
        /// Optional TOML settings file; falls back to defaults.
        #[clap(long = "settings", short = 's')]
        settings: Option<PathBuf>,
    },
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_timed();

    let cli = Cli::parse();
    match cli.command {
        Command::Analyze { configs } => run_analyze(&configs)?,
        Command::Simulate { configs, settings } => run_simulate(&configs, settings.as_deref())?,
    }
    Ok(())
}

fn run_analyze(configs: &std::path::Path) -> Result<()> {
    let records = load_dir(configs)?;
    info!("parsed {} device record(s) from {}", records.len(), configs.display());

    let topo = build(&records);
    info!("topology has {} node(s), {} edge(s)", topo.graph.node_count(), topo.graph.edge_count());

    let report = validate(&records, &topo);
    let capacity = analyze_capacity(&topo);
    let exported = export::export(&topo);

    println!("{}", serde_json::to_string_pretty(&exported)?);
    println!("{}", serde_json::to_string_pretty(&report)?);
    println!("{}", serde_json::to_string_pretty(&capacity)?);
    Ok(())
}

fn run_simulate(configs: &std::path::Path, settings_path: Option<&std::path::Path>) -> Result<()> {
    let mut records = load_dir(configs)?;
    let brought_up = bring_up_interfaces(&mut records);

    let topo = build(&records);
    let settings = match settings_path {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };

    let engine = Engine::new(records.clone(), topo, settings);
    engine.start()?;
    info!("engine started on control port {:?}", engine.control_plane_port());

    let day1_report = netlab::scenario::day1::run(&engine, &records, brought_up);
    println!("{}", serde_json::to_string_pretty(&day1_report)?);

    let topo_snapshot = engine.topology().lock().clone();
    let day2_report = day2::run(&records, &topo_snapshot);
    println!("{}", serde_json::to_string_pretty(&day2_report)?);

    engine.stop();
    Ok(())
}
