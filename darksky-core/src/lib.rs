//! Core library for the `darksky` CLI.
//!
//! This crate defines:
//! - The forecast client and its pluggable HTTP transport
//! - The decoded forecast model
//! - Configuration & credentials handling
//!
//! It is used by `darksky-cli`, but can also be reused by other binaries or services.

pub mod client;
pub mod config;
pub mod error;
pub mod model;
pub mod transport;

pub use client::{ClientConfig, DEFAULT_BASE_DOMAIN, FetchHandle, ForecastApi, ForecastClient};
pub use config::Config;
pub use error::FetchError;
pub use model::{Alert, DailyDataPoint, DataBlock, Forecast, ForecastRequest};
pub use transport::{HttpTransport, ReqwestTransport, TransportError, TransportResponse};
