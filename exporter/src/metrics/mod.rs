//! Exposition layer: renders collected samples in the Prometheus text
//! format and serves them over HTTP.
//!
//! Typical usage in the binary:
//!
//! ```ignore
//! use std::sync::Arc;
//! use fuel_exporter::metrics;
//!
//! let collector = Arc::new(FuelCollector::new(&cfg, HttpUpstream::new()?));
//! let listener = metrics::bind(cfg.listen_addr()).await?;
//! metrics::serve(listener, collector, shutdown_signal()).await;
//! ```

pub mod prometheus;

pub use self::prometheus::{
    ExportError, ScrapeError, ServerError, bind, render_samples, serve,
};
