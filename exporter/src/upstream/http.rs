//! Blocking HTTP client for the node GraphQL API and the faucet.
//!
//! Two kinds of requests are made:
//!
//! ```text
//! POST <GRAPHQL_URL>
//! {"query": "query ChainInfo { chain { latestBlock { header { height daHeight } } } }"}
//!
//! -> {"data": {"chain": {"latestBlock": {"header": {"height": "100", "daHeight": "42"}}}}}
//!
//! GET <FAUCET_URL>
//!
//! -> {"amount": 7, ...}
//! ```
//!
//! The node serialises `U32`/`U64` scalars as strings, so numeric fields
//! accept either a JSON integer or a string holding one.

use reqwest::blocking::{Client, Response};
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use super::{ChainHeader, Upstream, UpstreamError};

const CHAIN_INFO_QUERY: &str =
    "query ChainInfo { chain { latestBlock { header { height daHeight } } } }";

const BALANCE_QUERY: &str = "query Balance($owner: Address!, $assetId: AssetId!) { \
     balance(owner: $owner, assetId: $assetId) { amount } }";

/// HTTP-backed [`Upstream`].
///
/// Thread-safe and cheap to share. Requests use the transport defaults: no
/// retries, the default `reqwest` timeout.
#[derive(Clone, Debug)]
pub struct HttpUpstream {
    client: Client,
}

impl HttpUpstream {
    /// Builds the underlying blocking client.
    ///
    /// Must not be called from inside an async context.
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = Client::builder().build()?;
        Ok(Self { client })
    }

    fn query<V, T>(
        &self,
        endpoint: &Url,
        request: &GraphQlRequest<'_, V>,
    ) -> Result<T, UpstreamError>
    where
        V: Serialize,
        T: DeserializeOwned,
    {
        debug!(
            url = %endpoint,
            body = %serde_json::to_string(request).unwrap_or_default(),
            "sending GraphQL request"
        );

        let resp = self
            .client
            .post(endpoint.clone())
            .json(request)
            .send()
            .map_err(|source| transport(endpoint, source))?;

        let body = read_body(endpoint, resp)?;
        decode_graphql(endpoint, &body)
    }
}

impl Upstream for HttpUpstream {
    fn fetch_chain_header(&self, endpoint: &Url) -> Result<ChainHeader, UpstreamError> {
        let request = GraphQlRequest::<()> {
            query: CHAIN_INFO_QUERY,
            variables: None,
        };
        let data: ChainInfoData = self.query(endpoint, &request)?;
        let header = data.chain.latest_block.header;

        Ok(ChainHeader {
            height: header.height,
            da_height: header.da_height,
        })
    }

    fn fetch_balance(
        &self,
        endpoint: &Url,
        owner: &str,
        asset_id: &str,
    ) -> Result<u64, UpstreamError> {
        let request = GraphQlRequest {
            query: BALANCE_QUERY,
            variables: Some(BalanceVariables { owner, asset_id }),
        };
        let data: BalanceData = self.query(endpoint, &request)?;
        Ok(data.balance.amount)
    }

    fn fetch_dispense_amount(&self, endpoint: &Url) -> Result<u64, UpstreamError> {
        debug!(url = %endpoint, "requesting faucet dispense info");

        let resp = self
            .client
            .get(endpoint.clone())
            .send()
            .map_err(|source| transport(endpoint, source))?;

        let body = read_body(endpoint, resp)?;
        let info: DispenseInfo = decode_json(endpoint, &body)?;
        Ok(info.amount)
    }
}

/// GraphQL request envelope.
#[derive(Debug, Serialize)]
struct GraphQlRequest<'a, V> {
    query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    variables: Option<V>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BalanceVariables<'a> {
    owner: &'a str,
    asset_id: &'a str,
}

/// GraphQL response envelope.
#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Option<Vec<GraphQlErrorEntry>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlErrorEntry {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ChainInfoData {
    chain: ChainInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChainInfo {
    latest_block: LatestBlock,
}

#[derive(Debug, Deserialize)]
struct LatestBlock {
    header: HeaderFields,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HeaderFields {
    #[serde(deserialize_with = "de_u64")]
    height: u64,
    #[serde(deserialize_with = "de_u64")]
    da_height: u64,
}

#[derive(Debug, Deserialize)]
struct BalanceData {
    balance: BalanceFields,
}

#[derive(Debug, Deserialize)]
struct BalanceFields {
    #[serde(deserialize_with = "de_u64")]
    amount: u64,
}

/// Faucet `GET` response. Fields other than `amount` are ignored.
#[derive(Debug, Deserialize)]
struct DispenseInfo {
    #[serde(deserialize_with = "de_u64")]
    amount: u64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum U64Repr {
    Number(u64),
    Text(String),
}

fn de_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match U64Repr::deserialize(deserializer)? {
        U64Repr::Number(n) => Ok(n),
        U64Repr::Text(s) => s
            .parse()
            .map_err(|e| de::Error::custom(format!("invalid unsigned integer {s:?}: {e}"))),
    }
}

fn transport(url: &Url, source: reqwest::Error) -> UpstreamError {
    UpstreamError::Transport {
        url: url.to_string(),
        source,
    }
}

/// Reads the body as text and rejects non-2xx statuses.
fn read_body(url: &Url, resp: Response) -> Result<String, UpstreamError> {
    let status = resp.status();
    let body = resp.text().map_err(|source| transport(url, source))?;
    debug!(url = %url, status = status.as_u16(), body = %body, "upstream response");

    if !status.is_success() {
        return Err(UpstreamError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    Ok(body)
}

fn decode_json<T: DeserializeOwned>(url: &Url, body: &str) -> Result<T, UpstreamError> {
    serde_json::from_str(body).map_err(|e| UpstreamError::Decode {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

/// Decodes a GraphQL envelope, surfacing `errors` before looking at `data`.
fn decode_graphql<T: DeserializeOwned>(url: &Url, body: &str) -> Result<T, UpstreamError> {
    let response: GraphQlResponse<T> = decode_json(url, body)?;

    if let Some(errors) = response.errors.filter(|errors| !errors.is_empty()) {
        let messages = errors
            .into_iter()
            .map(|e| e.message)
            .collect::<Vec<_>>()
            .join("; ");
        return Err(UpstreamError::GraphQl {
            url: url.to_string(),
            messages,
        });
    }

    response.data.ok_or_else(|| UpstreamError::Decode {
        url: url.to_string(),
        reason: "response has no `data` field".to_string(),
    })
}
