// src/main.rs
//
// Exporter binary:
//
// - environment configuration (fatal if incomplete)
// - blocking HTTP clients for the node GraphQL API and the faucet
// - Prometheus scrape endpoint on 0.0.0.0:APP_PORT

use std::sync::Arc;

use tracing::{debug, error, info};

use fuel_exporter::{DefaultCollector, ExporterConfig, HttpUpstream, logging, metrics};

fn main() {
    logging::init();
    info!("starting fuel-exporter v{}", env!("CARGO_PKG_VERSION"));

    if let Err(err) = run() {
        error!("fatal error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let cfg = ExporterConfig::from_env()
        .map_err(|e| format!("please set the required environment variables: {e}"))?;

    debug!(
        network = cfg.network.as_str(),
        app_port = cfg.app_port,
        graphql_url = %cfg.graphql_url,
        balance_owner = cfg.faucet.as_ref().map(|f| f.balance_owner.as_str()),
        balance_asset_id = cfg.faucet.as_ref().map(|f| f.balance_asset_id.as_str()),
        faucet_url = cfg.faucet.as_ref().map(|f| f.faucet_url.as_str()),
        "loaded configuration"
    );

    // The blocking client owns its own runtime thread; build it (and drop
    // it, below) outside of tokio.
    let upstream =
        HttpUpstream::new().map_err(|e| format!("failed to build HTTP client: {e}"))?;
    let collector: Arc<DefaultCollector> = Arc::new(DefaultCollector::new(&cfg, upstream));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to start tokio runtime: {e}"))?;

    let served = runtime.block_on({
        let collector = collector.clone();
        let addr = cfg.listen_addr();
        async move {
            let listener = metrics::bind(addr).await.map_err(|e| e.to_string())?;
            info!(
                network = collector.network().as_str(),
                "metrics exporter listening on http://{addr}/metrics"
            );

            metrics::serve(listener, collector, shutdown_signal()).await;
            Ok::<(), String>(())
        }
    });

    drop(runtime);
    served
}

/// Waits for Ctrl-C and returns, used for graceful shutdown.
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}
