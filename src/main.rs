//! Transient simulator entry point: CLI wiring and scenario execution.

use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing::info;

use transient_sim::config::ScenarioConfig;
use transient_sim::io::export::export_csv;
use transient_sim::logging;
use transient_sim::runner::run_scenario;

/// Grid transient simulator: transfer redistribution and timed disturbances.
#[derive(Debug, Parser)]
#[command(name = "transient-sim", version, about)]
struct Cli {
    /// Load scenario from TOML config file
    #[arg(long, value_name = "PATH", conflicts_with = "preset")]
    scenario: Option<PathBuf>,

    /// Use a built-in preset (two_area, load_step, islanding)
    #[arg(long, value_name = "NAME")]
    preset: Option<String>,

    /// Override the measurement noise seed
    #[arg(long)]
    seed: Option<u64>,

    /// Override the simulated end time (s)
    #[arg(long, value_name = "SECONDS")]
    end_time: Option<f64>,

    /// Export recorded channels to CSV
    #[arg(long, value_name = "PATH")]
    channels_out: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long)]
    verbose: bool,

    /// Start REST API server after simulation
    #[cfg(feature = "api")]
    #[arg(long)]
    serve: bool,

    /// API server port
    #[cfg(feature = "api")]
    #[arg(long, default_value_t = 3000)]
    port: u16,
}

fn load_scenario(cli: &Cli) -> (String, ScenarioConfig) {
    // --scenario takes priority, then --preset, then the two_area default
    let loaded = match (&cli.scenario, &cli.preset) {
        (Some(path), _) => ScenarioConfig::from_toml_file(path)
            .map(|cfg| (path.display().to_string(), cfg)),
        (None, Some(name)) => ScenarioConfig::from_preset(name).map(|cfg| (name.clone(), cfg)),
        (None, None) => Ok(("two_area".to_string(), ScenarioConfig::two_area())),
    };
    match loaded {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    }
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let (name, mut scenario) = load_scenario(&cli);
    if let Some(seed) = cli.seed {
        scenario.simulation.seed = seed;
    }
    if let Some(end_time) = cli.end_time {
        scenario.simulation.end_time_s = end_time;
    }

    info!(scenario = %name, "running scenario");
    let outcome = match run_scenario(&scenario) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    };

    for plan in &outcome.plans {
        println!("{plan}");
    }
    println!("{}\n", outcome.report);
    println!("{}", outcome.summary);

    if let Some(path) = &cli.channels_out {
        if let Err(e) = export_csv(&outcome.channels, path) {
            eprintln!("error: failed to write CSV: {e}");
            process::exit(1);
        }
        info!(path = %path.display(), "channels written");
    }

    #[cfg(feature = "api")]
    if cli.serve {
        use std::net::SocketAddr;
        use std::sync::Arc;

        let state = Arc::new(transient_sim::api::AppState {
            scenario: name,
            outcome,
        });
        let addr = SocketAddr::from(([0, 0, 0, 0], cli.port));
        let rt = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
            eprintln!("error: failed to create tokio runtime: {e}");
            process::exit(1);
        });
        if let Err(e) = rt.block_on(transient_sim::api::serve(state, addr)) {
            eprintln!("error: API server failed: {e}");
            process::exit(1);
        }
    }
}
