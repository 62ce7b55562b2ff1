//! Prometheus text exposition and the HTTP scrape endpoint.
//!
//! Each scrape renders a fresh [`Registry`]: samples from
//! [`FuelCollector::collect`] are grouped into `CounterVec`/`GaugeVec`
//! families and encoded with [`TextEncoder`]. The server is a plain
//! `hyper` HTTP/1 loop.

use std::{convert::Infallible, future::Future, net::SocketAddr, sync::Arc};

use bytes::Bytes;
use http_body_util::Full;
use hyper::{
    Method, Request, Response, StatusCode,
    body::Incoming,
    header::{self, HeaderValue},
    server::conn::http1,
    service::service_fn,
};
use hyper_util::rt::TokioIo;
use prometheus::{CounterVec, Encoder, GaugeVec, Opts, Registry, TextEncoder};
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::collector::{FuelCollector, METRIC_LABEL, MetricKind, MetricSample};
use crate::upstream::{Upstream, UpstreamError};

const TEXT_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Errors turning samples into exposition text.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),

    #[error("metric family {family} mixes counter and gauge samples")]
    MixedKinds { family: &'static str },

    #[error("encoded metrics are not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Why a scrape produced no metrics.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("collector task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Fatal HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

enum FamilyVec {
    Counter(CounterVec),
    Gauge(GaugeVec),
}

/// Encodes `samples` into the Prometheus text format.
///
/// Samples sharing a name form one family; its help text and kind come
/// from the first sample seen.
pub fn render_samples(samples: &[MetricSample]) -> Result<String, ExportError> {
    let registry = Registry::new();
    let mut families: Vec<(&'static str, FamilyVec)> = Vec::new();

    for sample in samples {
        let idx = match families.iter().position(|(name, _)| *name == sample.name) {
            Some(idx) => idx,
            None => {
                let opts = Opts::new(sample.name, sample.help);
                let family = match sample.kind {
                    MetricKind::Counter => {
                        let vec = CounterVec::new(opts, &[METRIC_LABEL])?;
                        registry.register(Box::new(vec.clone()))?;
                        FamilyVec::Counter(vec)
                    }
                    MetricKind::Gauge => {
                        let vec = GaugeVec::new(opts, &[METRIC_LABEL])?;
                        registry.register(Box::new(vec.clone()))?;
                        FamilyVec::Gauge(vec)
                    }
                };
                families.push((sample.name, family));
                families.len() - 1
            }
        };

        let labels: Vec<&str> = sample.label_values.iter().map(String::as_str).collect();
        match (&families[idx].1, sample.kind) {
            // Fresh registry per scrape: the counter starts at zero.
            (FamilyVec::Counter(vec), MetricKind::Counter) => vec
                .get_metric_with_label_values(labels.as_slice())?
                .inc_by(sample.value),
            (FamilyVec::Gauge(vec), MetricKind::Gauge) => vec
                .get_metric_with_label_values(labels.as_slice())?
                .set(sample.value),
            _ => return Err(ExportError::MixedKinds {
                family: sample.name,
            }),
        }
    }

    let mut buffer = Vec::new();
    TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Binds the scrape listener.
pub async fn bind(addr: SocketAddr) -> Result<TcpListener, ServerError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })
}

/// Serves scrapes on `listener` until `shutdown` resolves.
///
/// `GET /metrics` (and `GET /`) runs a full collection on the blocking
/// pool and answers 200 with the exposition text, or 500 with the error if
/// any upstream fetch failed. Other paths return 404.
pub async fn serve<U, F>(listener: TcpListener, collector: Arc<FuelCollector<U>>, shutdown: F)
where
    U: Upstream + 'static,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        let accepted = tokio::select! {
            _ = &mut shutdown => {
                info!("metrics server shutting down");
                return;
            }
            accepted = listener.accept() => accepted,
        };

        let (stream, peer) = match accepted {
            Ok(conn) => conn,
            Err(e) => {
                warn!("failed to accept scrape connection: {e}");
                continue;
            }
        };

        let io = TokioIo::new(stream);
        let collector = collector.clone();

        tokio::spawn(async move {
            let svc = service_fn(move |req| {
                let collector = collector.clone();
                handle_request(req, collector)
            });

            if let Err(err) = http1::Builder::new().serve_connection(io, svc).await {
                debug!(%peer, "scrape connection error: {err}");
            }
        });
    }
}

async fn handle_request<U>(
    req: Request<Incoming>,
    collector: Arc<FuelCollector<U>>,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    U: Upstream + 'static,
{
    let response = match (req.method(), req.uri().path()) {
        (&Method::GET, "/metrics" | "/") => match scrape(collector).await {
            Ok(body) => text_response(StatusCode::OK, body),
            Err(e) => {
                error!("scrape failed: {e}");
                text_response(StatusCode::INTERNAL_SERVER_ERROR, format!("{e}\n"))
            }
        },
        (_, "/metrics" | "/") => {
            text_response(StatusCode::METHOD_NOT_ALLOWED, "method not allowed\n".into())
        }
        _ => text_response(StatusCode::NOT_FOUND, "not found\n".into()),
    };
    Ok(response)
}

/// Runs one collection on the blocking pool; the upstream client is
/// synchronous.
async fn scrape<U>(collector: Arc<FuelCollector<U>>) -> Result<String, ScrapeError>
where
    U: Upstream + 'static,
{
    let body = tokio::task::spawn_blocking(move || -> Result<String, ScrapeError> {
        let samples = collector.collect()?;
        Ok(render_samples(&samples)?)
    })
    .await??;
    Ok(body)
}

fn text_response(status: StatusCode, body: String) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(TEXT_CONTENT_TYPE),
    );
    response
}
