#![doc = include_str!("../README.md")]

mod config;
mod telemetry;

use clap::Parser;
use config::{CliArgs, CliConfig};
use telemetry::init_telemetry;
use tokio::signal;
use uuid_pool::{CancellationToken, Generator};

// Using mimalloc for lower allocator contention between worker tasks.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = CliConfig::try_from(args)?;

    init_telemetry()?;
    log_startup_info(&config);

    let generator = Generator::new(config.generator.clone())?;

    let interrupt = CancellationToken::new();
    let on_signal = {
        let interrupt = interrupt.clone();
        tokio::spawn(async move {
            if signal::ctrl_c().await.is_ok() {
                tracing::info!("Received Ctrl+C signal");
                interrupt.cancel();
            }
        })
    };

    let result = run(&generator, &config, &interrupt).await;
    on_signal.abort();

    let stats = generator.stats();
    tracing::info!(
        "Produced {} identifiers, {} entropy failures, {} health probes ({} failed), health {:?}",
        stats.ids_produced,
        stats.entropy_failures,
        stats.health_probes,
        stats.health_probe_failures,
        generator.health_status()
    );

    generator.shutdown().await?;
    tracing::info!("Generator shut down successfully");
    result
}

async fn run(
    generator: &Generator,
    config: &CliConfig,
    interrupt: &CancellationToken,
) -> anyhow::Result<()> {
    for _ in 0..config.count {
        let id = tokio::select! {
            biased;
            () = interrupt.cancelled() => return Ok(()),
            id = generator.generate_random_timeout(config.timeout) => id?,
        };
        println!("{id}");
    }

    for name in &config.names {
        println!("{}  {name}", generator.generate_deterministic(name));
    }

    Ok(())
}

fn log_startup_info(config: &CliConfig) {
    if cfg!(debug_assertions) {
        tracing::info!("Starting with full config: {:#?}", config);
    } else {
        tracing::info!(
            "Starting with {} workers and a buffer of {}",
            config.generator.workers,
            config.generator.buffer_capacity
        );
    }
}
