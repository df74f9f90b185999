use anyhow::Context;
use app::{App, Flow};
use clap::Parser;
use config::MonitorConfig;
use console::commands::ConsoleCommand;
use net::{HttpBackend, StompWsTransport};
use seaxcore::ais_interface::{PositionRecord, ViolationEvent};
use seaxcore::pipeline::FetchCoordinator;
use seaxcore::transport::ConnectionHandle;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use tokio::sync::mpsc;

mod app;
mod config;
mod console;
mod net;

#[derive(Parser)]
#[command(author, version, about = "Live vessel roster and violation monitor")]
struct Args {
    /// Load the monitor config from YAML
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, default_value = "http://127.0.0.1:8080")]
    api_url: String,
    #[arg(long, default_value = "ws://127.0.0.1:8080/ws")]
    ws_url: String,
    /// Subscribe to this user's violation notifications
    #[arg(long)]
    user_id: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = if let Some(path) = args.config {
        MonitorConfig::load(path)?
    } else {
        MonitorConfig::from_args(args.api_url, args.ws_url, args.user_id)
    };

    let runtime = TokioBuilder::new_multi_thread()
        .enable_all()
        .build()
        .context("creating monitor runtime")?;
    runtime.block_on(run(config))
}

async fn run(config: MonitorConfig) -> anyhow::Result<()> {
    let backend = Arc::new(HttpBackend::new(config.api_url.clone()));
    let transport = Arc::new(StompWsTransport::new(config.ws_url.clone()));

    let (position_tx, mut positions) = mpsc::unbounded_channel::<PositionRecord>();
    let mut position_feed = ConnectionHandle::connect(
        Arc::clone(&transport),
        Arc::clone(&backend),
        "ais-data",
        &config.connection,
        move |record: PositionRecord| {
            let _ = position_tx.send(record);
        },
    );

    let (violation_tx, mut violations) = mpsc::unbounded_channel::<ViolationEvent>();
    let mut violation_feed = config.violations_topic().map(|topic| {
        ConnectionHandle::connect(
            Arc::clone(&transport),
            Arc::clone(&backend),
            topic,
            &config.connection,
            move |event: ViolationEvent| {
                let _ = violation_tx.send(event);
            },
        )
    });
    if violation_feed.is_none() {
        log::info!("no user id configured, violation notifications disabled");
    }

    let (fetcher, mut outcomes) = FetchCoordinator::new(Arc::clone(&backend), &config.fetch);
    let mut app = App::new(fetcher, config.viewport.to_viewport());
    log::info!("initial viewport {:?}", app.viewport());
    app.start();

    let mut commands = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut report = tokio::time::interval(config.report_interval());
    report.tick().await;

    println!("[MAP] Monitor running, type `help` for commands (Ctrl+C to stop)...");
    loop {
        tokio::select! {
            Some(record) = positions.recv() => app.on_position(record),
            Some(event) = violations.recv() => app.on_violation(event),
            Some(outcome) = outcomes.recv() => app.on_fetch(outcome),
            line = commands.next_line(), if stdin_open => match line {
                Ok(Some(line)) if line.trim().is_empty() => {}
                Ok(Some(line)) => match line.parse::<ConsoleCommand>() {
                    Ok(command) => {
                        if app.on_command(command) == Flow::Quit {
                            break;
                        }
                    }
                    Err(err) => println!("[MAP] {}", err),
                },
                Ok(None) => stdin_open = false,
                Err(err) => {
                    log::warn!("console input closed: {}", err);
                    stdin_open = false;
                }
            },
            _ = report.tick() => {
                let line = app.report(
                    position_feed.state(),
                    violation_feed.as_ref().map(|feed| feed.state()),
                );
                println!("[MAP] {}", line);
            }
            result = signal::ctrl_c() => {
                result.context("awaiting Ctrl+C to exit")?;
                break;
            }
        }
    }

    app.shutdown();
    position_feed.disconnect().await;
    if let Some(feed) = violation_feed.as_mut() {
        feed.disconnect().await;
    }
    let counters = position_feed.metrics().snapshot();
    log::info!(
        "position feed: {} delivered, {} malformed, {} reconnects",
        counters.delivered,
        counters.malformed,
        counters.reconnects
    );
    Ok(())
}
