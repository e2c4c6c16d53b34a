//! Echo server demo.
//!
//! ```text
//! ZRPC_ADDRESS=tcp://*:7341 RUST_LOG=debug cargo run --example echo_server
//! ```
//!
//! Serves `echo` (returns its params) and `add` (sums two integers) until
//! Ctrl-C or until `ZRPC_DIE_AFTER` requests have been answered.

use std::sync::Arc;

use zrpc_server::codec::Value;
use zrpc_server::transport::ZmqTransport;
use zrpc_server::{logging, HandlerError, ReadyNotifier, Registry, ServerBuilder, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging();

    let config = ServerConfig::from_env()?;

    let mut registry = Registry::new();
    registry
        .register("echo", |params: Vec<Value>| async move {
            Ok::<_, HandlerError>(params)
        })?
        .register("add", |(a, b): (i64, i64)| async move {
            a.checked_add(b)
                .ok_or_else(|| HandlerError::new("demo", "OverflowError", format!("{a} + {b}")))
        })?;

    let transport = Arc::new(ZmqTransport::new());
    let server = ServerBuilder::from_config(config).build(Arc::new(registry), transport);

    let (notifier, waiter) = ReadyNotifier::channel();
    let running = tokio::spawn(async move { server.run(notifier).await });

    let attached = waiter.wait().await?;
    tracing::info!("Serving on {} ({})", attached.endpoint, attached.role);

    running.await??;
    Ok(())
}
