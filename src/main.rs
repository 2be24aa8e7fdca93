//! Entry point for the Vehicle Cost Engine binary.
//!
//! Running this binary starts an HTTP server exposing the comparison
//! engine.  The directory containing policy JSON files may be specified
//! via the `VEHICLE_COST_POLICY_DIR` environment variable; if unset the
//! server looks for a `policies` folder relative to the current working
//! directory.  Log verbosity follows `RUST_LOG` (default `info`).

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use vehicle_cost_engine::{api, config::ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .init();

    let config = ServerConfig::from_env();
    tracing::info!(
        policy_dir = %config.policy_dir.display(),
        default_policy = %config.default_policy,
        "starting vehicle cost engine"
    );
    api::serve(&config).await
}
