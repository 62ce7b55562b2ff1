//! Clients for the services the exporter reads from.
//!
//! The [`Upstream`] trait is what the collector talks to. [`HttpUpstream`]
//! is the production implementation: it queries the node's GraphQL API and
//! the faucet's REST endpoint over blocking HTTP.

pub mod http;

pub use http::HttpUpstream;

use thiserror::Error;
use url::Url;

/// Heights of the latest block, as reported by the node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChainHeader {
    pub height: u64,
    /// Data-availability height.
    pub da_height: u64,
}

/// Errors that can occur while contacting an upstream service.
///
/// Any of these fails the scrape that triggered the fetch.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The request could not be sent or the body could not be read.
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The service answered with a non-success status.
    #[error("{url} returned HTTP status {status}")]
    Status { url: String, status: u16 },

    /// The body is not JSON or does not have the expected shape.
    #[error("malformed response from {url}: {reason}")]
    Decode { url: String, reason: String },

    /// The GraphQL response carries an `errors` array.
    #[error("GraphQL query to {url} failed: {messages}")]
    GraphQl { url: String, messages: String },
}

/// Source of the values exposed on every scrape.
///
/// Implementations are synchronous and stateless between calls; the
/// exporter runs them on a blocking thread.
pub trait Upstream: Send + Sync {
    /// Height and DA height of the latest block.
    fn fetch_chain_header(&self, endpoint: &Url) -> Result<ChainHeader, UpstreamError>;

    /// Balance of `owner` in `asset_id`.
    fn fetch_balance(
        &self,
        endpoint: &Url,
        owner: &str,
        asset_id: &str,
    ) -> Result<u64, UpstreamError>;

    /// Amount the faucet hands out per request.
    fn fetch_dispense_amount(&self, endpoint: &Url) -> Result<u64, UpstreamError>;
}
