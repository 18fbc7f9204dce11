//! Error type for `mercado-client`.
//!
//! A [`FetchError`] is scoped to one request. Callers decide whether it is
//! fatal.

use thiserror::Error;

use crate::status::StatusCategory;

#[derive(Debug, Error)]
pub enum FetchError {
  #[error("{0}")]
  Status(StatusCategory),

  #[error("request timed out: {0}")]
  Timeout(#[source] reqwest::Error),

  #[error("connection error, check the network: {0}")]
  Transport(#[source] reqwest::Error),

  #[error("could not decode the JSON response: {0}")]
  Decode(String),

  #[error("unexpected payload: {0}")]
  Payload(#[from] mercado_core::Error),

  #[error("invalid client configuration: {0}")]
  Config(String),
}

impl FetchError {
  pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
    if err.is_timeout() {
      Self::Timeout(err)
    } else if err.is_decode() {
      Self::Decode(err.to_string())
    } else if let Some(status) = err.status() {
      Self::Status(status.into())
    } else {
      Self::Transport(err)
    }
  }
}

pub type Result<T, E = FetchError> = std::result::Result<T, E>;
