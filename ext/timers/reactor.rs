// Copyright 2018-2026 the Deno authors. MIT license.

//! Reactor abstraction for the sleep primitive behind web timers.
//!
//! The [`Scheduler`](crate::Scheduler) never touches a clock directly: every
//! wait goes through [`Reactor::sleep`]. The default implementation
//! ([`TokioReactor`](crate::TokioReactor)) delegates to tokio. Completions of
//! different sleeps carry no ordering guarantee relative to each other.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use deno_error::JsErrorBox;

/// An outstanding sleep. Resolves with `Ok(())` once the duration has elapsed
/// or with an error if the underlying primitive failed.
pub type SleepFuture = Pin<Box<dyn Future<Output = Result<(), JsErrorBox>>>>;

/// The only seam between the timer scheduler and the underlying async
/// runtime.
pub trait Reactor: 'static {
  /// Begin a sleep of `duration`. The deadline is fixed when this is called,
  /// not when the returned future is first polled.
  fn sleep(&self, duration: Duration) -> SleepFuture;
}

/// The default reactor type.
pub type DefaultReactor = crate::reactor_tokio::TokioReactor;
