//! jaxOS Shell
//!
//! Single entry point, no flags. The worker context runs on its own thread;
//! the display owns the terminal on the main thread. Exit with an exit
//! keyword (`exit`, `quit`, `shutdown`) or Ctrl-C.

use anyhow::{Context, Result};
use jaxos::display;
use jaxos::input::{self, ShutdownFlag};
use jaxos::kernel::spawn_worker;
use jaxos::render;
use jaxos::{
    FileStore, InferenceClient, KernelContext, Navigator, OllamaClient, ShellConfig, SledStore,
    WebNavigator,
};
use log::LevelFilter;
use std::fs::OpenOptions;
use std::sync::Arc;

fn main() -> Result<()> {
    let config = ShellConfig::load().context("Failed to load configuration")?;

    // The terminal belongs to the display, so logs go to a file.
    init_logging(&config)?;
    std::panic::set_hook(Box::new(|info| {
        log::error!("panic: {info}");
    }));

    log::info!("═══════════════════════════════════════");
    log::info!("  jaxOS Shell v{}", env!("CARGO_PKG_VERSION"));
    log::info!("═══════════════════════════════════════");
    log::info!("Cortex: {} at {}", config.model, config.ollama_url);

    let store: Arc<dyn FileStore> = Arc::new(
        SledStore::open(&config.db_path).context("Failed to open file store")?,
    );
    let inference: Arc<dyn InferenceClient> = Arc::new(OllamaClient::new(&config)?);
    let navigator: Arc<dyn Navigator> = Arc::new(WebNavigator::new(&config, inference.clone())?);

    let (screen, mut bridge) = render::channel(config.render_queue_capacity);
    let (input_tx, input_rx) = input::queue();
    let shutdown = ShutdownFlag::new();

    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || {
            log::info!("Received shutdown signal...");
            shutdown.trigger();
        })
        .context("Failed to install Ctrl-C handler")?;
    }

    let ctx = KernelContext::new(config.clone(), store, inference, navigator, screen);
    let worker = spawn_worker(ctx, input_rx, shutdown.clone())?;

    let result = display::run(&mut bridge, &input_tx, &shutdown, &config);

    shutdown.trigger();
    drop(input_tx);
    drop(bridge);
    if worker.join().is_err() {
        log::error!("Worker thread panicked");
    }

    result.context("Display failed")?;
    log::info!("jaxOS stopped");
    Ok(())
}

fn init_logging(config: &ShellConfig) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_file)
        .with_context(|| format!("Failed to open log file {}", config.log_file.display()))?;

    env_logger::Builder::from_default_env()
        .filter_level(LevelFilter::Info)
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}
