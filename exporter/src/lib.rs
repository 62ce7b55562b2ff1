//! Fuel exporter library crate.
//!
//! Exposes a Fuel node's chain heights and, off mainnet, the testnet
//! faucet's health as Prometheus metrics. Values are fetched fresh on every
//! scrape:
//!
//! - environment configuration (`config`),
//! - upstream GraphQL / faucet clients (`upstream`),
//! - per-scrape metric collection (`collector`),
//! - text exposition and the HTTP scrape endpoint (`metrics`),
//! - tracing setup for the binary (`logging`).

pub mod collector;
pub mod config;
pub mod logging;
pub mod metrics;
pub mod upstream;

pub use collector::{FuelCollector, MetricKind, MetricSample};
pub use config::{ConfigError, ExporterConfig, FaucetConfig, Network};
pub use metrics::{ExportError, ScrapeError, ServerError, render_samples, serve};
pub use upstream::{ChainHeader, HttpUpstream, Upstream, UpstreamError};

/// Collector wired to the real HTTP upstreams.
pub type DefaultCollector = FuelCollector<HttpUpstream>;
