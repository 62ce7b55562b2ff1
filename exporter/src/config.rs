//! Top-level configuration for the exporter.
//!
//! Everything is read once from the process environment at startup and is
//! immutable afterwards:
//!
//! - `NETWORK`, `APP_PORT`, `GRAPHQL_URL` are always required,
//! - `BALANCE_OWNER`, `BALANCE_ASSET_ID`, `FAUCET_URL` are required unless
//!   the network is `mainnet` (and ignored when it is).
//!
//! `LOGLEVEL` is read separately by [`crate::logging`], before this module
//! runs, so configuration errors can be logged.

use std::net::{Ipv4Addr, SocketAddr};

use serde::Deserialize;
use thiserror::Error;
use url::Url;

/// Network identifier for which the faucet metrics are skipped.
pub const MAINNET: &str = "mainnet";

/// Errors raised while loading the configuration. All of them are fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable is unset or cannot be parsed into its field type.
    #[error("failed to load configuration from environment: {0}")]
    Env(#[from] envy::Error),

    /// A variable that is only required off-mainnet is unset.
    #[error("missing required environment variable {var} (required when NETWORK is not \"mainnet\")")]
    Missing { var: &'static str },

    /// A URL variable does not parse.
    #[error("invalid URL in {var}: {source}")]
    InvalidUrl {
        var: &'static str,
        #[source]
        source: url::ParseError,
    },
}

/// Chain network the exporter is pointed at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Network(String);

impl Network {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// `true` only for the literal identifier `"mainnet"`.
    pub fn is_mainnet(&self) -> bool {
        self.0 == MAINNET
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Faucet-related settings, only present off-mainnet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FaucetConfig {
    /// Address whose balance is reported as `faucet{metric="balance_amount"}`.
    pub balance_owner: String,
    /// Asset id the balance is queried for.
    pub balance_asset_id: String,
    /// Faucet endpoint answering `GET` with `{"amount": ...}`.
    pub faucet_url: Url,
}

/// Validated exporter configuration.
#[derive(Clone, Debug)]
pub struct ExporterConfig {
    pub network: Network,
    /// Port the scrape endpoint listens on.
    pub app_port: u16,
    /// Node GraphQL endpoint.
    pub graphql_url: Url,
    /// `None` on mainnet.
    pub faucet: Option<FaucetConfig>,
}

/// Raw view of the environment, as deserialized by `envy`.
#[derive(Debug, Deserialize)]
struct RawEnv {
    network: String,
    app_port: u16,
    graphql_url: String,
    balance_owner: Option<String>,
    balance_asset_id: Option<String>,
    faucet_url: Option<String>,
}

impl ExporterConfig {
    /// Loads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw = envy::from_env::<RawEnv>()?;
        Self::from_raw(raw)
    }

    /// Loads the configuration from explicit `(KEY, value)` pairs.
    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let raw = envy::from_iter::<_, RawEnv>(vars)?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawEnv) -> Result<Self, ConfigError> {
        let network = Network::new(raw.network);
        let graphql_url = parse_url("GRAPHQL_URL", &raw.graphql_url)?;

        let faucet = if network.is_mainnet() {
            None
        } else {
            let balance_owner = require("BALANCE_OWNER", raw.balance_owner)?;
            let balance_asset_id = require("BALANCE_ASSET_ID", raw.balance_asset_id)?;
            let faucet_url = require("FAUCET_URL", raw.faucet_url)?;
            Some(FaucetConfig {
                balance_owner,
                balance_asset_id,
                faucet_url: parse_url("FAUCET_URL", &faucet_url)?,
            })
        };

        Ok(Self {
            network,
            app_port: raw.app_port,
            graphql_url,
            faucet,
        })
    }

    /// Address the scrape endpoint binds to (all interfaces).
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.app_port))
    }
}

fn require(var: &'static str, value: Option<String>) -> Result<String, ConfigError> {
    value.ok_or(ConfigError::Missing { var })
}

fn parse_url(var: &'static str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|source| ConfigError::InvalidUrl { var, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    const TESTNET: &[(&str, &str)] = &[
        ("NETWORK", "testnet"),
        ("APP_PORT", "8000"),
        ("GRAPHQL_URL", "http://127.0.0.1:4000/v1/graphql"),
        ("BALANCE_OWNER", "0xowner"),
        ("BALANCE_ASSET_ID", "0xasset"),
        ("FAUCET_URL", "http://127.0.0.1:3000/dispense"),
    ];

    #[test]
    fn testnet_config_loads_faucet_settings() {
        let cfg = ExporterConfig::from_vars(vars(TESTNET)).expect("config should load");

        assert_eq!(cfg.network.as_str(), "testnet");
        assert!(!cfg.network.is_mainnet());
        assert_eq!(cfg.app_port, 8000);
        assert_eq!(cfg.graphql_url.path(), "/v1/graphql");

        let faucet = cfg.faucet.expect("faucet config off mainnet");
        assert_eq!(faucet.balance_owner, "0xowner");
        assert_eq!(faucet.balance_asset_id, "0xasset");
        assert_eq!(faucet.faucet_url.path(), "/dispense");
    }

    #[test]
    fn mainnet_ignores_faucet_settings() {
        let cfg = ExporterConfig::from_vars(vars(&[
            ("NETWORK", "mainnet"),
            ("APP_PORT", "8000"),
            ("GRAPHQL_URL", "http://127.0.0.1:4000/v1/graphql"),
            ("FAUCET_URL", "not a url"),
        ]))
        .expect("mainnet needs no faucet settings");

        assert!(cfg.network.is_mainnet());
        assert!(cfg.faucet.is_none());
    }

    #[test]
    fn missing_graphql_url_is_rejected() {
        let pairs: Vec<_> = TESTNET
            .iter()
            .copied()
            .filter(|(k, _)| *k != "GRAPHQL_URL")
            .collect();
        let err = ExporterConfig::from_vars(vars(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Env(_)), "got {err:?}");
    }

    #[test]
    fn missing_faucet_url_off_mainnet_is_rejected() {
        let pairs: Vec<_> = TESTNET
            .iter()
            .copied()
            .filter(|(k, _)| *k != "FAUCET_URL")
            .collect();
        let err = ExporterConfig::from_vars(vars(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Missing { var: "FAUCET_URL" }));
    }

    #[test]
    fn network_match_is_case_sensitive() {
        let mut pairs = TESTNET.to_vec();
        pairs[0] = ("NETWORK", "Mainnet");
        let cfg = ExporterConfig::from_vars(vars(&pairs)).expect("config should load");
        assert!(cfg.faucet.is_some());
    }

    #[test]
    fn bad_port_and_bad_url_are_rejected() {
        let mut pairs = TESTNET.to_vec();
        pairs[1] = ("APP_PORT", "eighty");
        assert!(matches!(
            ExporterConfig::from_vars(vars(&pairs)),
            Err(ConfigError::Env(_))
        ));

        let mut pairs = TESTNET.to_vec();
        pairs[2] = ("GRAPHQL_URL", "localhost without scheme");
        assert!(matches!(
            ExporterConfig::from_vars(vars(&pairs)),
            Err(ConfigError::InvalidUrl { var: "GRAPHQL_URL", .. })
        ));
    }

    #[test]
    fn listen_addr_binds_all_interfaces() {
        let cfg = ExporterConfig::from_vars(vars(TESTNET)).expect("config should load");
        assert_eq!(cfg.listen_addr().to_string(), "0.0.0.0:8000");
    }
}
