//! # Nitro Node
//!
//! Demo service on the in-memory collaborators: a `Greeter` endpoint, an
//! event subscriber, and lifecycle hooks that log each phase.
//!
//! ## Startup Sequence
//!
//! 1. Initialize telemetry from the environment
//! 2. Load service configuration from the environment
//! 3. Build the Application and register handlers
//! 4. Run until Ctrl+C cancels the context, then stop

use std::sync::Arc;

use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tracing::{info, warn};

use nitro_app::{options, Application};
use nitro_rpc::{EventHandler, Routes, RpcError};
use nitro_telemetry::{init_telemetry, log_event, TelemetryConfig};
use nitro_types::Context;

#[derive(Debug, Serialize, Deserialize)]
struct HelloRequest {
    name: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct HelloResponse {
    msg: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Greeted {
    name: String,
}

/// Service configuration read from the environment.
#[derive(Debug)]
struct NodeConfig {
    name: String,
    address: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            name: "greeter".to_string(),
            address: ":0".to_string(),
        }
    }
}

/// Load configuration from environment.
fn load_config() -> NodeConfig {
    let mut config = NodeConfig::default();

    if let Ok(name) = std::env::var("NITRO_SERVER_NAME") {
        if name.is_empty() {
            warn!("NITRO_SERVER_NAME is empty, keeping {}", config.name);
        } else {
            config.name = name;
        }
    }
    if let Ok(address) = std::env::var("NITRO_SERVER_ADDRESS") {
        config.address = address;
    }

    config
}

fn greeter() -> Routes {
    Routes::new("Greeter").route("Greeter.Hello", |req: HelloRequest| async move {
        if req.name.is_empty() {
            return Err(RpcError::bad_request("name is required"));
        }
        Ok(HelloResponse {
            msg: format!("Hello {}", req.name),
        })
    })
}

/// One call and one publish against the running service.
async fn greet(app: &Application, service: &str) -> Result<()> {
    let reply: HelloResponse = app
        .execute(
            service,
            "Greeter.Hello",
            &HelloRequest {
                name: "nitro".to_string(),
            },
        )
        .await
        .context("Greeter.Hello failed")?;
    info!(msg = %reply.msg, "Greeter replied");

    app.broadcast(
        "greeted",
        &Greeted {
            name: "nitro".to_string(),
        },
    )
    .await
    .context("Failed to publish greeted")?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_telemetry(TelemetryConfig::for_service("nitro-node"))
        .context("Failed to initialize telemetry")?;

    let config = load_config();
    info!(name = %config.name, address = %config.address, "Loaded configuration");

    let (ctx, cancel) = Context::with_cancel();
    let ready = Arc::new(Notify::new());
    let started = Arc::clone(&ready);

    let app = Arc::new(Application::new(vec![
        options::name(config.name.clone()),
        options::address(config.address),
        options::context(ctx),
        options::before_start(|| {
            log_event!(info, "app", "Starting services");
            Ok(())
        }),
        options::after_start(move || {
            log_event!(info, "app", "Services up");
            started.notify_one();
            Ok(())
        }),
        options::before_stop(|| {
            log_event!(info, "app", "Draining");
            Ok(())
        }),
        options::after_stop(|| {
            log_event!(info, "app", "Shutdown complete");
            Ok(())
        }),
    ]));

    app.register(greeter())
        .await
        .context("Failed to register Greeter")?;
    app.subscribe(
        "greeted",
        EventHandler::new(|event: Greeted| async move {
            log_event!(info, "subscriber", "Greeted event", name = %event.name);
            Ok::<(), RpcError>(())
        }),
    )
    .await
    .context("Failed to subscribe to greeted")?;

    let demo = Arc::clone(&app);
    let service = config.name.clone();
    tokio::spawn(async move {
        ready.notified().await;
        if let Err(e) = greet(&demo, &service).await {
            warn!(error = %e, "Demo exchange failed");
        }
    });

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received"),
            Err(e) => warn!(error = %e, "Failed to listen for Ctrl+C, stopping"),
        }
        cancel.cancel();
    });

    info!("Node is running. Press Ctrl+C to stop.");
    app.run().await.context("Application failed")?;
    Ok(())
}
