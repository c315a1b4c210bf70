use pdsolve::{ScenarioConfig, Scenario};
use pdsolve::{bench_tick, bench_collision_passes};

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

#[derive(Parser, Debug)]
struct Args {
    /// Scenario file under `scenarios/`
    #[arg(short, default_value = "ball_pit.yaml")]
    file_name: String,

    /// Override the number of ticks to run
    #[arg(long)]
    ticks: Option<u64>,

    /// Run the tick benchmarks instead of a scenario
    #[arg(long)]
    bench: bool,
}

// load here to keep main clean
fn load_scenario_from_yaml(file_name: &str) -> Result<ScenarioConfig> {
    let config_path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("scenarios").join(file_name);
    let file = File::open(&config_path)
        .with_context(|| format!("failed to open {}", config_path.display()))?;
    let reader = BufReader::new(file);
    let scenario_cfg: ScenarioConfig = serde_yaml::from_reader(reader)
        .with_context(|| format!("failed to parse {}", config_path.display()))?;

    Ok(scenario_cfg)
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if args.bench {
        bench_tick();
        bench_collision_passes();
        return Ok(());
    }

    let mut scenario_cfg = load_scenario_from_yaml(&args.file_name)?;
    if let Some(ticks) = args.ticks {
        scenario_cfg.run.ticks = ticks;
    }

    let mut scenario = Scenario::build_scenario(scenario_cfg)
        .with_context(|| format!("invalid scenario {}", args.file_name))?;

    info!("running {} for {} ticks", args.file_name, scenario.run.ticks);
    scenario.run();
    scenario.report();

    Ok(())
}
