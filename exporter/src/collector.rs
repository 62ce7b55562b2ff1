//! Scrape-time metric collection.
//!
//! [`FuelCollector::collect`] is run once per scrape. It fetches fresh
//! values from the upstream services and turns them into [`MetricSample`]s:
//!
//! - `chain{metric="block_height"}` and `chain{metric="block_da_height"}`
//!   (counters), always;
//! - `faucet{metric="balance_amount"}` and `faucet{metric="dispense_amount"}`
//!   (gauges), unless the network is `mainnet`.
//!
//! Nothing is cached between scrapes. If any fetch fails the whole
//! collection fails, so the scraper sees the error instead of partial data.

use tracing::info;
use url::Url;

use crate::config::{ExporterConfig, FaucetConfig, Network};
use crate::upstream::{Upstream, UpstreamError};

/// Label name carried by every sample; its value names the sub-metric.
pub const METRIC_LABEL: &str = "metric";

pub const CHAIN_FAMILY: &str = "chain";
pub const CHAIN_HELP: &str = "Metrics for Chain info";
pub const FAUCET_FAMILY: &str = "faucet";
pub const FAUCET_HELP: &str = "Metrics for Faucet health";

/// Prometheus metric type of a sample. Purely descriptive: values are
/// reported as fetched, monotonicity is the upstream's business.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Gauge,
}

/// One labelled value, built fresh on every scrape.
#[derive(Clone, Debug, PartialEq)]
pub struct MetricSample {
    /// Metric family name.
    pub name: &'static str,
    pub help: &'static str,
    pub kind: MetricKind,
    /// Values for [`METRIC_LABEL`], in order.
    pub label_values: Vec<String>,
    pub value: f64,
}

impl MetricSample {
    fn new(
        name: &'static str,
        help: &'static str,
        kind: MetricKind,
        label: &str,
        value: u64,
    ) -> Self {
        Self {
            name,
            help,
            kind,
            label_values: vec![label.to_string()],
            // Balances above 2^53 lose precision here, as in any f64 sample.
            value: value as f64,
        }
    }

    fn chain(label: &str, value: u64) -> Self {
        Self::new(CHAIN_FAMILY, CHAIN_HELP, MetricKind::Counter, label, value)
    }

    fn faucet(label: &str, value: u64) -> Self {
        Self::new(FAUCET_FAMILY, FAUCET_HELP, MetricKind::Gauge, label, value)
    }
}

/// Collects chain and faucet metrics from an [`Upstream`].
///
/// Holds only immutable configuration, so one instance can serve any
/// number of concurrent scrapes.
pub struct FuelCollector<U> {
    network: Network,
    graphql_url: Url,
    faucet: Option<FaucetConfig>,
    upstream: U,
}

impl<U> FuelCollector<U> {
    pub fn new(cfg: &ExporterConfig, upstream: U) -> Self {
        Self {
            network: cfg.network.clone(),
            graphql_url: cfg.graphql_url.clone(),
            faucet: cfg.faucet.clone(),
            upstream,
        }
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    /// Faucet settings, if faucet metrics apply to this network.
    fn faucet(&self) -> Option<&FaucetConfig> {
        if self.network.is_mainnet() {
            return None;
        }
        self.faucet.as_ref()
    }
}

impl<U> FuelCollector<U>
where
    U: Upstream,
{
    /// Fetches and returns the samples for one scrape.
    pub fn collect(&self) -> Result<Vec<MetricSample>, UpstreamError> {
        let mut samples = Vec::with_capacity(4);

        info!("collecting chain data");
        let header = self.upstream.fetch_chain_header(&self.graphql_url)?;
        info!(
            block_height = header.height,
            block_da_height = header.da_height,
            "fetched latest block header"
        );

        samples.push(MetricSample::chain("block_height", header.height));
        samples.push(MetricSample::chain("block_da_height", header.da_height));

        if let Some(faucet) = self.faucet() {
            info!(network = self.network.as_str(), "collecting faucet data");

            let balance = self.upstream.fetch_balance(
                &self.graphql_url,
                &faucet.balance_owner,
                &faucet.balance_asset_id,
            )?;
            info!(balance_amount = balance, "fetched faucet balance");

            let dispense = self.upstream.fetch_dispense_amount(&faucet.faucet_url)?;
            info!(dispense_amount = dispense, "fetched dispense amount");

            samples.push(MetricSample::faucet("balance_amount", balance));
            samples.push(MetricSample::faucet("dispense_amount", dispense));
        }

        Ok(samples)
    }
}
