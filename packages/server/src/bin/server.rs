//! calcbus server binary.
//!
//! Wires the in-memory bus, worker, dispatcher, and HTTP surface into one
//! process. With a real broker behind the [`MessageBus`] trait the worker
//! would live in its own deployment; the wiring here stays the same.

use std::sync::Arc;
use std::time::Duration;

use calcbus_core::MessageBus;
use calcbus_server::bus::InMemoryBus;
use calcbus_server::dispatcher::ResponseDispatcher;
use calcbus_server::network::{NetworkModule, ServerConfig};
use calcbus_server::worker::Worker;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "calcbus-server",
    about = "Synchronous calculator API over an asynchronous message bus"
)]
struct Cli {
    /// Bind address.
    #[arg(long, env = "CALCBUS_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on (0 = OS-assigned).
    #[arg(long, env = "CALCBUS_PORT", default_value_t = 8080)]
    port: u16,

    /// Seconds the gateway waits for each call's bus reply.
    #[arg(long, env = "CALCBUS_CALL_TIMEOUT_SECS", default_value_t = 10)]
    call_timeout_secs: u64,

    /// Log filter, e.g. "calcbus_server=debug,tower_http=info".
    #[arg(
        long,
        env = "CALCBUS_LOG",
        default_value = "calcbus_server=info,tower_http=info"
    )]
    log: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cli.log))
        .init();

    let config = ServerConfig {
        host: cli.host,
        port: cli.port,
        call_timeout: Duration::from_secs(cli.call_timeout_secs),
        ..ServerConfig::default()
    };

    let bus: Arc<dyn MessageBus> = Arc::new(InMemoryBus::new());

    let mut module = NetworkModule::new(config.clone(), Arc::clone(&bus));
    let shutdown_ctrl = module.shutdown_controller();

    let worker = Worker::new(
        Arc::clone(&bus),
        config.request_topic.clone(),
        config.reply_topic.clone(),
    );
    let worker_handle = tokio::spawn(worker.run(shutdown_ctrl.shutdown_receiver()));

    let dispatcher = ResponseDispatcher::new(
        Arc::clone(&bus),
        module.registry(),
        config.reply_topic.clone(),
    );
    let dispatcher_handle = tokio::spawn(dispatcher.run(shutdown_ctrl.shutdown_receiver()));

    let port = module.start().await?;
    info!(host = %config.host, port, "calcbus server starting");

    module
        .serve(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await?;

    worker_handle.await??;
    dispatcher_handle.await??;
    Ok(())
}
