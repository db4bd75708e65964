//! Merit-order market simulator entry point.

use std::path::{Path, PathBuf};
use std::process;

use tracing_subscriber::EnvFilter;

use merit_sim::config::ScenarioConfig;
use merit_sim::equilibrium::ClampPolicy;
use merit_sim::io::export::{RunMetadata, export_csv, export_metadata};
use merit_sim::io::load_series;
use merit_sim::sim::{Engine, RunSummary};

/// Parsed CLI arguments.
struct CliArgs {
    scenario_path: Option<String>,
    preset: Option<String>,
    seed_override: Option<u64>,
    strict: bool,
    out: Option<String>,
    quiet: bool,
}

fn print_help() {
    eprintln!("merit-sim - synthetic hourly electricity market simulator");
    eprintln!();
    eprintln!("Usage: merit-sim [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --scenario <path>   Load scenario from TOML config file");
    eprintln!("  --preset <name>     Use a built-in preset ({})", ScenarioConfig::PRESETS.join(", "));
    eprintln!("  --seed <u64>        Override random seed");
    eprintln!("  --strict            Fail instead of clamping when an hour cannot clear");
    eprintln!("  --out <path>        Export hourly records to CSV (plus .meta.json)");
    eprintln!("  --quiet             Do not print hourly records");
    eprintln!("  --help              Show this help message");
    eprintln!();
    eprintln!("If no --scenario or --preset is given, the baseline preset is used.");
    eprintln!("Log verbosity follows RUST_LOG (default: info).");
}

fn value_of(args: &[String], i: usize, flag: &str, what: &str) -> String {
    match args.get(i) {
        Some(v) => v.clone(),
        None => {
            eprintln!("error: {flag} requires a {what} argument");
            process::exit(1);
        }
    }
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        scenario_path: None,
        preset: None,
        seed_override: None,
        strict: false,
        out: None,
        quiet: false,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            "--scenario" => {
                i += 1;
                cli.scenario_path = Some(value_of(&args, i, "--scenario", "path"));
            }
            "--preset" => {
                i += 1;
                cli.preset = Some(value_of(&args, i, "--preset", "name"));
            }
            "--seed" => {
                i += 1;
                let raw = value_of(&args, i, "--seed", "u64");
                if let Ok(s) = raw.parse::<u64>() {
                    cli.seed_override = Some(s);
                } else {
                    eprintln!("error: --seed value \"{raw}\" is not a valid u64");
                    process::exit(1);
                }
            }
            "--strict" => cli.strict = true,
            "--out" => {
                i += 1;
                cli.out = Some(value_of(&args, i, "--out", "path"));
            }
            "--quiet" | "-q" => cli.quiet = true,
            other => {
                eprintln!("error: unknown argument \"{other}\"");
                print_help();
                process::exit(1);
            }
        }
        i += 1;
    }

    cli
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = parse_args();
    init_tracing();

    // --scenario takes priority, then --preset, then baseline
    let (mut scenario, label, base_dir) = if let Some(ref path) = cli.scenario_path {
        let path = Path::new(path);
        match ScenarioConfig::from_toml_file(path) {
            Ok(cfg) => {
                let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
                (cfg, path.display().to_string(), dir)
            }
            Err(e) => {
                eprintln!("{e}");
                process::exit(1);
            }
        }
    } else {
        let name = cli.preset.as_deref().unwrap_or("baseline");
        match ScenarioConfig::from_preset(name) {
            Ok(cfg) => (cfg, name.to_string(), PathBuf::from(".")),
            Err(e) => {
                eprintln!("{e}");
                process::exit(1);
            }
        }
    };

    if let Some(seed) = cli.seed_override {
        scenario.simulation.seed = seed;
    }
    if cli.strict {
        scenario.market.clamp_policy = ClampPolicy::Strict;
    }

    let errors = scenario.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }

    let series = load_series(&scenario, &base_dir).unwrap_or_else(|e| {
        eprintln!("{e}");
        process::exit(1);
    });
    let mut engine = Engine::new(&scenario, series).unwrap_or_else(|e| {
        eprintln!("{e}");
        process::exit(1);
    });
    let records = engine.run().unwrap_or_else(|e| {
        eprintln!("error: {e}");
        process::exit(1);
    });

    if !cli.quiet {
        for r in &records {
            println!("{r}");
        }
        println!();
    }
    println!("{}", RunSummary::from_records(&records));

    if let Some(ref path) = cli.out {
        let path = Path::new(path);
        if let Err(e) = export_csv(&records, path) {
            eprintln!("error: failed to write CSV: {e}");
            process::exit(1);
        }
        let meta = RunMetadata::from_records(scenario.simulation.seed, scenario.simulation.start, &records)
            .with_scenario(label);
        match export_metadata(&meta, path) {
            Ok(meta_path) => eprintln!(
                "Records written to {} (metadata: {})",
                path.display(),
                meta_path.display()
            ),
            Err(e) => {
                eprintln!("error: failed to write metadata: {e}");
                process::exit(1);
            }
        }
    }
}
