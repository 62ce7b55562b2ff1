//! Mock node GraphQL API and faucet, served by axum on an ephemeral port.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::Value;
use tokio::runtime::Runtime;

use fuel_exporter::ExporterConfig;

pub const CHAIN_BODY: &str =
    r#"{"data":{"chain":{"latestBlock":{"header":{"height":100,"daHeight":42}}}}}"#;
pub const BALANCE_BODY: &str = r#"{"data":{"balance":{"amount":"5000"}}}"#;
pub const FAUCET_BODY: &str = r#"{"amount": 7}"#;

pub struct MockState {
    pub chain_body: String,
    pub balance_body: String,
    pub faucet_body: String,
    pub faucet_status: StatusCode,
    pub chain_requests: AtomicUsize,
    pub balance_requests: AtomicUsize,
    pub faucet_requests: AtomicUsize,
    pub last_variables: Mutex<Option<Value>>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            chain_body: CHAIN_BODY.to_string(),
            balance_body: BALANCE_BODY.to_string(),
            faucet_body: FAUCET_BODY.to_string(),
            faucet_status: StatusCode::OK,
            chain_requests: AtomicUsize::new(0),
            balance_requests: AtomicUsize::new(0),
            faucet_requests: AtomicUsize::new(0),
            last_variables: Mutex::new(None),
        }
    }
}

impl MockState {
    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

pub struct MockUpstreams {
    pub addr: SocketAddr,
    pub state: Arc<MockState>,
}

impl MockUpstreams {
    pub fn graphql_url(&self) -> String {
        format!("http://{}/v1/graphql", self.addr)
    }

    pub fn faucet_url(&self) -> String {
        format!("http://{}/dispense", self.addr)
    }

    /// Exporter configuration pointing at these mocks.
    pub fn config(&self, network: &str) -> ExporterConfig {
        let vars = [
            ("NETWORK", network.to_string()),
            ("APP_PORT", "0".to_string()),
            ("GRAPHQL_URL", self.graphql_url()),
            ("BALANCE_OWNER", "0xowner".to_string()),
            ("BALANCE_ASSET_ID", "0xasset".to_string()),
            ("FAUCET_URL", self.faucet_url()),
        ];
        ExporterConfig::from_vars(vars.into_iter().map(|(k, v)| (k.to_string(), v)))
            .expect("mock config should load")
    }
}

async fn graphql(State(state): State<Arc<MockState>>, Json(req): Json<Value>) -> Response {
    let body = match req.get("variables") {
        Some(variables) => {
            state.balance_requests.fetch_add(1, Ordering::SeqCst);
            *state.last_variables.lock().expect("lock") = Some(variables.clone());
            state.balance_body.clone()
        }
        None => {
            state.chain_requests.fetch_add(1, Ordering::SeqCst);
            state.chain_body.clone()
        }
    };
    ([(header::CONTENT_TYPE, "application/json")], body).into_response()
}

async fn faucet(State(state): State<Arc<MockState>>) -> Response {
    state.faucet_requests.fetch_add(1, Ordering::SeqCst);
    (
        state.faucet_status,
        [(header::CONTENT_TYPE, "application/json")],
        state.faucet_body.clone(),
    )
        .into_response()
}

/// Starts the mocks on `rt` and returns their address.
pub fn start(rt: &Runtime, state: MockState) -> MockUpstreams {
    let state = Arc::new(state);
    let app = Router::new()
        .route("/v1/graphql", post(graphql))
        .route("/dispense", get(faucet))
        .with_state(state.clone());

    let listener = rt
        .block_on(tokio::net::TcpListener::bind("127.0.0.1:0"))
        .expect("bind mock upstream");
    let addr = listener.local_addr().expect("mock address");

    rt.spawn(async move {
        axum::serve(listener, app).await.expect("mock upstream server");
    });

    MockUpstreams { addr, state }
}
