// Copyright 2018-2026 the Deno authors. MIT license.

use std::time::Duration;
use std::time::Instant;

/// Coarsened timestamps, in the spirit of reduced time precision:
/// https://developer.mozilla.org/en-US/docs/Web/API/DOMHighResTimeStamp#Reduced_time_precision
const REDUCED_PRECISION_NANOS: u32 = 2_000_000;

/// The time origin of one scheduler.
#[derive(Clone, Copy, Debug)]
pub struct Clock {
  origin: Instant,
  allow_hrtime: bool,
}

impl Clock {
  pub fn new(allow_hrtime: bool) -> Self {
    Self {
      origin: Instant::now(),
      allow_hrtime,
    }
  }

  /// Milliseconds since the origin.
  pub fn now(&self) -> f64 {
    millis(self.origin.elapsed(), self.allow_hrtime)
  }
}

fn millis(elapsed: Duration, allow_hrtime: bool) -> f64 {
  let mut nanos = elapsed.subsec_nanos();
  if !allow_hrtime {
    nanos -= nanos % REDUCED_PRECISION_NANOS;
  }
  elapsed.as_secs() as f64 * 1_000.0 + nanos as f64 / 1_000_000.0
}
