// Copyright 2018-2026 the Deno authors. MIT license.

use crate::reactor::Reactor;
use crate::reactor::SleepFuture;
use std::time::Duration;

/// Default reactor implementation backed by tokio.
#[derive(Debug, Default)]
pub struct TokioReactor;

impl Reactor for TokioReactor {
  fn sleep(&self, duration: Duration) -> SleepFuture {
    // `tokio::time::sleep` computes its deadline eagerly.
    let sleep = tokio::time::sleep(duration);
    Box::pin(async move {
      sleep.await;
      Ok(())
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tokio::time::Instant;

  #[tokio::test(start_paused = true)]
  async fn sleeps_for_the_requested_duration() {
    let start = Instant::now();
    let sleep = TokioReactor.sleep(Duration::from_millis(25));
    sleep.await.unwrap();
    assert!(start.elapsed() >= Duration::from_millis(25));
  }

  #[tokio::test(start_paused = true)]
  async fn deadline_is_fixed_at_creation() {
    let start = Instant::now();
    let sleep = TokioReactor.sleep(Duration::from_millis(10));
    tokio::time::advance(Duration::from_millis(10)).await;
    sleep.await.unwrap();
    // Had the deadline been taken at first poll this would be ~20ms.
    assert!(start.elapsed() < Duration::from_millis(20));
  }
}
