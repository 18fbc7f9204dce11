//! Fixed-interval request gate.

use std::{num::NonZeroU32, time::Duration};

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};

/// Lets one request through per `interval`, with no burst.
///
/// A zero interval disables pacing.
pub struct RateGate {
  limiter: Option<DefaultDirectRateLimiter>,
}

impl RateGate {
  pub fn fixed_interval(interval: Duration) -> Self {
    let limiter = Quota::with_period(interval)
      .map(|q| RateLimiter::direct(q.allow_burst(NonZeroU32::MIN)));
    Self { limiter }
  }

  /// Wait until the next request may be sent.
  pub async fn wait(&self) {
    if let Some(limiter) = &self.limiter {
      limiter.until_ready().await;
    }
  }
}
