//! exchange-server: accepts TCP connections and logs every NUL-delimited
//! message each client sends.
//!
//! Configuration via CLI arguments or TOML file. Runs until the process is
//! terminated.

use exchange_server::config::Config;
use exchange_server::Listener;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let addr = config.listen_addr()?;

    info!(
        addr = %addr,
        backlog = config.backlog,
        read_buffer = config.read_buffer,
        workers = ?config.workers,
        "Starting exchange server"
    );

    let mut builder = tokio::runtime::Builder::new_multi_thread();
    if let Some(workers) = config.workers {
        builder.worker_threads(workers);
    }
    let runtime = builder.enable_all().build()?;

    runtime.block_on(async move {
        let listener = Listener::bind(addr, config.backlog)?.with_read_buffer(config.read_buffer);
        info!(addr = %listener.local_addr()?, "Listening");
        listener.run().await;
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}
