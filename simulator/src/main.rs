use anyhow::Context;
use backend::bridge::Bridge;
use clap::Parser;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use workflow::config::ScenarioConfig;
use workflow::runner::Runner;

mod backend;
mod generator;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Backend double for the SeaX vessel feeds")]
struct Args {
    /// Run a fixed number of ticks without serving and emit a summary
    #[arg(long, default_value_t = false)]
    offline: bool,
    /// Load a scenario config from YAML
    #[arg(long)]
    scenario: Option<PathBuf>,
    #[arg(long, default_value_t = 40)]
    vessels: usize,
    #[arg(long, default_value_t = 0)]
    seed: u64,
    #[arg(long, default_value_t = 1)]
    user_id: u64,
    /// Tick count for --offline
    #[arg(long, default_value_t = 120)]
    ticks: u64,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let scenario = if let Some(path) = args.scenario {
        ScenarioConfig::load(path)?
    } else {
        ScenarioConfig::from_args(args.vessels, args.seed, args.user_id)
    };

    if args.offline {
        return run_offline(scenario, args.ticks);
    }

    let runtime = TokioBuilder::new_multi_thread()
        .enable_all()
        .build()
        .context("creating simulator runtime")?;
    runtime.block_on(serve(scenario))
}

fn run_offline(scenario: ScenarioConfig, ticks: u64) -> anyhow::Result<()> {
    let mut runner = Runner::new(scenario);
    let mut positions = 0;
    let mut violations = 0;
    let mut redelivered = 0;
    for _ in 0..ticks {
        let tick = runner.step();
        positions += tick.positions.len();
        violations += tick.violations.len();
        redelivered += tick.redelivered;
    }

    println!(
        "Offline run -> vessels {}, ticks {}, position records {}, violation events {} ({} redelivered)",
        runner.fleet_size(),
        runner.ticks(),
        positions,
        violations,
        redelivered
    );

    let report = format!(
        "seed={} vessels={} ticks={} positions={} violations={} redelivered={}\n",
        runner.config().fleet.seed,
        runner.fleet_size(),
        runner.ticks(),
        positions,
        violations,
        redelivered
    );
    let report_path = PathBuf::from("tools/data/offline_scenario.log");
    if let Some(parent) = report_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(report_path)?;
    file.write_all(report.as_bytes())?;
    Ok(())
}

async fn serve(scenario: ScenarioConfig) -> anyhow::Result<()> {
    let bridge = Bridge::new(scenario.violations_destination());
    let (addr, server) = bridge.bind(scenario.bind)?;
    tokio::spawn(server);
    bridge.publish_status(&format!(
        "Backend double on http://{} (ws://{}/ws), violations for user {}",
        addr, addr, scenario.user_id
    ));

    let mut ticker = tokio::time::interval(scenario.tick());
    let mut runner = Runner::new(scenario);
    bridge.publish_status("Ticking fleet (Ctrl+C to stop)...");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let tick = runner.step();
                bridge.publish(&runner, &tick)?;
                if runner.ticks() % 60 == 0 {
                    log::info!("tick {}: {} vessels", runner.ticks(), runner.fleet_size());
                }
            }
            result = signal::ctrl_c() => {
                result.context("awaiting Ctrl+C to exit")?;
                break;
            }
        }
    }

    bridge.publish_status("Shutting down.");
    Ok(())
}
