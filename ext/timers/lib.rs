// Copyright 2018-2026 the Deno authors. MIT license.

#![deny(clippy::print_stderr)]
#![deny(clippy::print_stdout)]
#![deny(clippy::unused_async)]
#![deny(clippy::unnecessary_wraps)]

//! This module helps deno implement timers.
//!
//! [`Scheduler`] implements `setTimeout`, `setInterval`, `clearTimeout`,
//! `clearInterval` and timer ref/unref following the HTML "timer
//! initialization steps" and "run steps after a timeout". Waits are handed to
//! a [`Reactor`], whose sleeps may complete in any order; the scheduler still
//! fires timers in the order the HTML algorithm requires. Fired timers are
//! queued as macrotasks and run one at a time via
//! [`Scheduler::drain_one_task`].

mod cancel;
mod clock;
mod error;
mod ledger;
mod liveness;
pub mod reactor;
mod reactor_tokio;
mod registry;
pub mod resolver;
mod scheduler;
mod stats;
mod task_queue;
#[cfg(test)]
mod testing;

pub use crate::cancel::CancelFuture;
pub use crate::cancel::CancelHandle;
pub use crate::cancel::Cancelable;
pub use crate::cancel::Canceled;
pub use crate::clock::Clock;
pub use crate::error::ExceptionReporter;
pub use crate::error::LogExceptionReporter;
pub use crate::error::TimerError;
pub use crate::ledger::WaitHandle;
pub use crate::ledger::WaitId;
pub use crate::ledger::WaitLedger;
pub use crate::liveness::Liveness;
pub use crate::liveness::UnrefedWaits;
pub use crate::reactor::DefaultReactor;
pub use crate::reactor::Reactor;
pub use crate::reactor::SleepFuture;
pub use crate::reactor_tokio::TokioReactor;
pub use crate::registry::TimerId;
pub use crate::registry::TimerRecord;
pub use crate::registry::TimerRegistry;
pub use crate::scheduler::Callback;
pub use crate::scheduler::MAX_TIMER_NESTING_LEVEL;
pub use crate::scheduler::MIN_NESTED_TIMER_DELAY;
pub use crate::scheduler::Scheduler;
pub use crate::scheduler::SchedulerOptions;
pub use crate::scheduler::SourceEvaluator;
pub use crate::scheduler::TimerFn;
pub use crate::stats::TimerStats;
pub use crate::task_queue::TaskQueue;
pub use crate::task_queue::TimerTask;
