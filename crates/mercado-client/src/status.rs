//! Diagnostic classification of HTTP status codes.
//!
//! The classification only feeds log messages. No caller branches on it.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCategory {
  Success,
  BadRequest,
  Unauthorized,
  Forbidden,
  NotFound,
  RateLimited,
  Unknown(u16),
}

impl StatusCategory {
  pub fn from_code(code: u16) -> Self {
    match code {
      200 => Self::Success,
      400 => Self::BadRequest,
      401 => Self::Unauthorized,
      403 => Self::Forbidden,
      404 => Self::NotFound,
      429 => Self::RateLimited,
      other => Self::Unknown(other),
    }
  }

  /// Human-readable explanation for logs.
  pub fn message(&self) -> String {
    match self {
      Self::Success => "200 OK: request succeeded".into(),
      Self::BadRequest => {
        "400 Bad Request: a parameter is invalid or missing".into()
      }
      Self::Unauthorized => "401 Unauthorized: invalid token".into(),
      Self::Forbidden => {
        "403 Forbidden: the token has no access to this resource".into()
      }
      Self::NotFound => {
        "404 Not Found: the requested resource does not exist".into()
      }
      Self::RateLimited => {
        "429 Too Many Requests: too many requests in a short time".into()
      }
      Self::Unknown(code) => format!("unknown error: HTTP {code}"),
    }
  }
}

impl From<reqwest::StatusCode> for StatusCategory {
  fn from(status: reqwest::StatusCode) -> Self { Self::from_code(status.as_u16()) }
}

impl fmt::Display for StatusCategory {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.message())
  }
}
