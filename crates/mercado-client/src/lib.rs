//! Async client for the Dados de Mercado REST API.
//!
//! Every request is serialized through a fixed-interval [`RateGate`] and
//! authenticated with a bearer token. Failures are classified into
//! [`StatusCategory`] values for diagnostics only; nothing is retried.

mod client;
mod limiter;

pub mod error;
pub mod status;

pub use client::{ClientConfig, DEFAULT_BASE_URL, MarketDataClient};
pub use error::{FetchError, Result};
pub use limiter::RateGate;
pub use status::StatusCategory;
