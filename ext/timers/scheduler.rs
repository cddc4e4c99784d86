// Copyright 2018-2026 the Deno authors. MIT license.

//! `setTimeout`/`setInterval` on top of an unordered sleep primitive.
//!
//! All state lives in one [`Scheduler`] owned by the event loop. Every public
//! operation runs to completion without yielding, and callbacks only ever see
//! the scheduler through those operations, so no locking is needed. The
//! scheduler is `!Send` and `!Sync`; a second event loop gets its own
//! scheduler.

use std::cell::Cell;
use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::future::poll_fn;
use std::pin::Pin;
use std::rc::Rc;
use std::task::Context;
use std::task::Poll;
use std::time::Duration;

use deno_error::JsErrorBox;
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use serde_json::Value;

use crate::cancel::CancelFuture;
use crate::cancel::CancelHandle;
use crate::cancel::Canceled;
use crate::clock::Clock;
use crate::error::ExceptionReporter;
use crate::error::LogExceptionReporter;
use crate::error::TimerError;
use crate::ledger::WaitHandle;
use crate::ledger::WaitLedger;
use crate::liveness::Liveness;
use crate::liveness::UnrefedWaits;
use crate::reactor::DefaultReactor;
use crate::reactor::Reactor;
use crate::registry::TimerId;
use crate::registry::TimerRegistry;
use crate::resolver;
use crate::stats::TimerStats;
use crate::task_queue::TaskQueue;
use crate::task_queue::TimerTask;

/// Timers nested deeper than this are subject to [`MIN_NESTED_TIMER_DELAY`].
pub const MAX_TIMER_NESTING_LEVEL: u32 = 5;
/// Minimum delay, in milliseconds, of a deeply nested timer.
pub const MIN_NESTED_TIMER_DELAY: u64 = 4;

pub type TimerFn = dyn Fn(&Scheduler, &[Value]) -> Result<(), JsErrorBox>;

/// The handler of a timer.
#[derive(Clone)]
pub enum Callback {
  /// Called with the timer's arguments. An error is reported as an uncaught
  /// exception and does not stop the scheduler.
  Function(Rc<TimerFn>),
  /// Handed to the [`SourceEvaluator`]. An evaluation error propagates out of
  /// [`Scheduler::drain_one_task`].
  SourceText(Rc<str>),
}

impl Callback {
  pub fn function(
    f: impl Fn(&Scheduler, &[Value]) -> Result<(), JsErrorBox> + 'static,
  ) -> Self {
    Self::Function(Rc::new(f))
  }
}

impl From<&str> for Callback {
  fn from(source: &str) -> Self {
    Self::SourceText(source.into())
  }
}

impl From<String> for Callback {
  fn from(source: String) -> Self {
    Self::SourceText(source.into())
  }
}

impl fmt::Debug for Callback {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Function(_) => f.write_str("Function"),
      Self::SourceText(source) => {
        f.debug_tuple("SourceText").field(source).finish()
      }
    }
  }
}

/// Evaluates string timer handlers.
pub trait SourceEvaluator {
  fn eval(&self, scheduler: &Scheduler, source: &str)
  -> Result<(), JsErrorBox>;
}

#[derive(Default)]
pub struct SchedulerOptions {
  /// Backend for waits. Defaults to [`TokioReactor`](crate::TokioReactor).
  pub reactor: Option<Rc<dyn Reactor>>,
  /// Defaults to [`UnrefedWaits`].
  pub liveness: Option<Rc<dyn Liveness>>,
  /// Defaults to [`LogExceptionReporter`].
  pub exception_reporter: Option<Rc<dyn ExceptionReporter>>,
  /// Without one, string handlers are rejected when the timer is set.
  pub source_evaluator: Option<Rc<dyn SourceEvaluator>>,
  /// Report [`Scheduler::now`] at full precision instead of rounding to 2ms.
  pub allow_hrtime: bool,
}

/// What a timer task does once it reaches the front of the queue.
#[derive(Debug)]
pub(crate) struct TimerAction {
  timer_id: TimerId,
  callback: Callback,
  args: Rc<[Value]>,
  /// The (clamped) delay, reused when an interval is re-armed.
  delay_millis: u64,
  repeat: bool,
}

impl TimerAction {
  pub(crate) fn new(
    timer_id: TimerId,
    callback: Callback,
    args: Rc<[Value]>,
    delay_millis: u64,
    repeat: bool,
  ) -> Self {
    Self {
      timer_id,
      callback,
      args,
      delay_millis,
      repeat,
    }
  }

  pub(crate) fn timer_id(&self) -> TimerId {
    self.timer_id
  }
}

type WaitOutcome = Result<Result<(), JsErrorBox>, Canceled>;
type PendingWait = Pin<Box<dyn Future<Output = (WaitHandle, WaitOutcome)>>>;

pub struct Scheduler {
  reactor: Rc<dyn Reactor>,
  liveness: Rc<dyn Liveness>,
  exception_reporter: Rc<dyn ExceptionReporter>,
  source_evaluator: Option<Rc<dyn SourceEvaluator>>,
  clock: Clock,
  registry: RefCell<TimerRegistry>,
  ledger: RefCell<WaitLedger<TimerTask>>,
  tasks: RefCell<TaskQueue>,
  pending_waits: RefCell<FuturesUnordered<PendingWait>>,
  /// Only non-zero while a timer task is running.
  nesting_level: Cell<u32>,
}

impl Default for Scheduler {
  fn default() -> Self {
    Self::new(Default::default())
  }
}

impl Drop for Scheduler {
  fn drop(&mut self) {
    self.shutdown()
  }
}

impl Scheduler {
  pub fn new(options: SchedulerOptions) -> Self {
    Self {
      reactor: options
        .reactor
        .unwrap_or_else(|| Rc::new(DefaultReactor::default())),
      liveness: options
        .liveness
        .unwrap_or_else(|| Rc::new(UnrefedWaits::default())),
      exception_reporter: options
        .exception_reporter
        .unwrap_or_else(|| Rc::new(LogExceptionReporter)),
      source_evaluator: options.source_evaluator,
      clock: Clock::new(options.allow_hrtime),
      registry: Default::default(),
      ledger: Default::default(),
      tasks: Default::default(),
      pending_waits: Default::default(),
      nesting_level: Cell::new(0),
    }
  }

  pub fn set_timeout(
    &self,
    callback: impl Into<Callback>,
    delay: f64,
    args: Vec<Value>,
  ) -> Result<TimerId, TimerError> {
    self.schedule(callback.into(), delay, args, false)
  }

  pub fn set_interval(
    &self,
    callback: impl Into<Callback>,
    delay: f64,
    args: Vec<Value>,
  ) -> Result<TimerId, TimerError> {
    self.schedule(callback.into(), delay, args, true)
  }

  /// Cancel a timer. Unknown and already cleared ids are ignored.
  pub fn clear_timeout(&self, id: TimerId) {
    let Some(record) = self.registry.borrow_mut().remove(id) else {
      return;
    };
    log::trace!("clearing timer {id}");
    record.cancel_handle.cancel();
    if let Some(wait) = record.pending_wait {
      self.discard_wait(wait);
    }
  }

  pub fn clear_interval(&self, id: TimerId) {
    self.clear_timeout(id)
  }

  pub fn ref_timer(&self, id: TimerId) {
    self.set_referenced(id, true)
  }

  pub fn unref_timer(&self, id: TimerId) {
    self.set_referenced(id, false)
  }

  /// Run the oldest ready timer task, if any. Returns whether a task ran.
  ///
  /// Errors from function callbacks go to the exception reporter. Only a
  /// failing string handler is returned as an error, after the timer's
  /// bookkeeping has been updated.
  pub fn drain_one_task(&self) -> Result<bool, TimerError> {
    let Some(task) = self.tasks.borrow_mut().drain_one() else {
      return Ok(false);
    };
    let TimerTask {
      action,
      nesting_level,
    } = task;
    let _nesting = NestingGuard::enter(&self.nesting_level, nesting_level);
    self.run_action(action)?;
    Ok(true)
  }

  /// Poll all outstanding waits and feed each completion to the resolver, one
  /// at a time. Ready with the number of completions, or pending if none.
  pub fn poll_timers(&self, cx: &mut Context) -> Poll<usize> {
    let mut completed = vec![];
    {
      let mut pending_waits = self.pending_waits.borrow_mut();
      while let Poll::Ready(Some(completion)) =
        pending_waits.poll_next_unpin(cx)
      {
        completed.push(completion);
      }
    }
    if completed.is_empty() {
      return Poll::Pending;
    }
    let count = completed.len();
    for (wait, outcome) in completed {
      self.on_wait_complete(wait, outcome);
    }
    Poll::Ready(count)
  }

  /// Drive timers until nothing referenced is left: one task per turn, then
  /// any completed waits.
  pub fn poll_event_loop(
    &self,
    cx: &mut Context,
  ) -> Poll<Result<(), TimerError>> {
    loop {
      let polled = self.poll_timers(cx);
      if self.drain_one_task()? || polled.is_ready() {
        continue;
      }
      if self.has_pending_refed_timers() {
        return Poll::Pending;
      }
      return Poll::Ready(Ok(()));
    }
  }

  pub async fn run_event_loop(&self) -> Result<(), TimerError> {
    poll_fn(|cx| self.poll_event_loop(cx)).await
  }

  /// Milliseconds since this scheduler was created, rounded down to 2ms
  /// unless `allow_hrtime` was set.
  pub fn now(&self) -> f64 {
    self.clock.now()
  }

  /// The nesting level of the running timer task, or 0 outside of one.
  pub fn nesting_level(&self) -> u32 {
    self.nesting_level.get()
  }

  pub fn has_pending_timers(&self) -> bool {
    !self.registry.borrow().is_empty()
  }

  pub fn has_pending_refed_timers(&self) -> bool {
    self.registry.borrow().has_pending_refed()
  }

  pub fn has_pending_tasks(&self) -> bool {
    !self.tasks.borrow().is_empty()
  }

  /// Number of live timers.
  pub fn len(&self) -> usize {
    self.registry.borrow().len()
  }

  pub fn is_empty(&self) -> bool {
    self.registry.borrow().is_empty()
  }

  pub fn stats(&self) -> TimerStats {
    let registry = self.registry.borrow();
    let mut stats = TimerStats::default();
    for record in registry.iter() {
      stats.push(record.id, record.repeat);
    }
    stats
  }

  /// Cancel every timer and drop all outstanding waits and queued tasks.
  pub fn shutdown(&self) {
    let records = self.registry.borrow_mut().drain().collect::<Vec<_>>();
    for record in records {
      record.cancel_handle.cancel();
      if let Some(wait) = record.pending_wait {
        self.liveness.wait_settled(wait.id());
      }
    }
    self.ledger.borrow_mut().clear();
    self.tasks.borrow_mut().clear();
    self.pending_waits.borrow_mut().clear();
  }

  fn schedule(
    &self,
    callback: Callback,
    delay: f64,
    args: Vec<Value>,
    repeat: bool,
  ) -> Result<TimerId, TimerError> {
    let timeout = convert_delay(delay)?;
    if matches!(callback, Callback::SourceText(_))
      && self.source_evaluator.is_none()
    {
      return Err(TimerError::SourceTextUnsupported);
    }
    Ok(self.initialize_timer(callback, timeout, args.into(), repeat, None))
  }

  /// The HTML "timer initialization steps". `prev_id` is only passed when an
  /// interval is re-armed.
  fn initialize_timer(
    &self,
    callback: Callback,
    timeout: u64,
    args: Rc<[Value]>,
    repeat: bool,
    prev_id: Option<TimerId>,
  ) -> TimerId {
    let (id, cancel_handle, referenced) = match prev_id {
      Some(id) => {
        let registry = self.registry.borrow();
        let Some(record) = registry.lookup(id) else {
          return id;
        };
        (id, record.cancel_handle.clone(), record.referenced)
      }
      None => {
        let cancel_handle = CancelHandle::new_rc();
        let id = self
          .registry
          .borrow_mut()
          .allocate(cancel_handle.clone(), repeat);
        (id, cancel_handle, true)
      }
    };

    // Past nesting level 5, delays below 4ms are raised to 4ms.
    let nesting_level = self.nesting_level.get();
    let mut timeout = timeout;
    if nesting_level > MAX_TIMER_NESTING_LEVEL
      && timeout < MIN_NESTED_TIMER_DELAY
    {
      timeout = MIN_NESTED_TIMER_DELAY;
    }

    let task = TimerTask {
      action: TimerAction::new(id, callback, args, timeout, repeat),
      nesting_level: nesting_level.saturating_add(1),
    };
    let wait = self.run_after_timeout(task, timeout, cancel_handle, referenced);
    if let Some(record) = self.registry.borrow_mut().lookup_mut(id) {
      record.pending_wait = Some(wait);
    }
    log::trace!(
      "timer {id} scheduled: delay={timeout}ms repeat={repeat} wait={}",
      wait.id()
    );
    id
  }

  fn run_after_timeout(
    &self,
    task: TimerTask,
    millis: u64,
    cancel_handle: Rc<CancelHandle>,
    referenced: bool,
  ) -> WaitHandle {
    let wait = self.ledger.borrow_mut().append(millis, task);
    let sleep = self
      .reactor
      .sleep(Duration::from_millis(millis))
      .or_cancel(cancel_handle);
    self
      .pending_waits
      .borrow_mut()
      .push(Box::pin(async move { (wait, sleep.await) }));
    if !referenced {
      self.liveness.set_referenced(wait.id(), false);
    }
    wait
  }

  fn on_wait_complete(&self, wait: WaitHandle, outcome: WaitOutcome) {
    match outcome {
      Ok(Ok(())) => {
        let mut fired = vec![];
        resolver::resolve(&mut self.ledger.borrow_mut(), wait, |wait, task| {
          fired.push((wait, task))
        });
        if fired.is_empty() && !self.ledger.borrow().contains(wait) {
          log::debug!("ignoring completion of discarded wait {}", wait.id());
        }
        self.enqueue_fired(fired);
      }
      Err(Canceled) => {
        // `clear_timeout` already discarded the wait; this is for waits that
        // were canceled through some other path.
        self.discard_wait(wait);
      }
      Ok(Err(err)) => {
        let timer_id = self
          .ledger
          .borrow()
          .get(wait)
          .map(|task| task.action.timer_id());
        log::warn!("timer wait {} failed: {err}", wait.id());
        if let Some(timer_id) = timer_id {
          let removed = {
            let mut registry = self.registry.borrow_mut();
            let owns_wait = registry
              .lookup(timer_id)
              .is_some_and(|record| record.pending_wait == Some(wait));
            if owns_wait {
              registry.remove(timer_id)
            } else {
              None
            }
          };
          if let Some(record) = removed {
            record.cancel_handle.cancel();
          }
        }
        self.discard_wait(wait);
      }
    }
  }

  /// Remove a wait that will never fire, then release anything it was
  /// holding back.
  fn discard_wait(&self, wait: WaitHandle) {
    if self.ledger.borrow_mut().remove(wait).is_none() {
      return;
    }
    self.liveness.wait_settled(wait.id());
    let mut fired = vec![];
    resolver::release(&mut self.ledger.borrow_mut(), |wait, task| {
      fired.push((wait, task))
    });
    self.enqueue_fired(fired);
  }

  fn enqueue_fired(&self, fired: Vec<(WaitHandle, TimerTask)>) {
    for (wait, task) in fired {
      let timer_id = task.action.timer_id();
      if let Some(record) = self
        .registry
        .borrow_mut()
        .lookup_mut(timer_id)
        .filter(|record| record.pending_wait == Some(wait))
      {
        record.pending_wait = None;
      }
      self.liveness.wait_settled(wait.id());
      log::trace!("timer {timer_id} ready");
      self.tasks.borrow_mut().enqueue(task);
    }
  }

  fn run_action(&self, action: TimerAction) -> Result<(), TimerError> {
    let TimerAction {
      timer_id,
      callback,
      args,
      delay_millis,
      repeat,
    } = action;

    // The timer may have been cleared after its wait resolved but before
    // this task got to run.
    if !self.registry.borrow().contains(timer_id) {
      return Ok(());
    }

    let result = match &callback {
      Callback::Function(f) => {
        if let Err(err) = f(self, &args) {
          self.exception_reporter.report(err);
        }
        Ok(())
      }
      Callback::SourceText(source) => match &self.source_evaluator {
        Some(evaluator) => {
          evaluator.eval(self, source).map_err(TimerError::Eval)
        }
        None => Err(TimerError::SourceTextUnsupported),
      },
    };

    if repeat && result.is_ok() {
      // The handler may have cleared its own interval.
      if self.registry.borrow().contains(timer_id) {
        self.initialize_timer(
          callback,
          delay_millis,
          args,
          true,
          Some(timer_id),
        );
      }
    } else {
      let removed = self.registry.borrow_mut().remove(timer_id);
      if let Some(record) = removed {
        record.cancel_handle.cancel();
      }
    }
    result
  }

  fn set_referenced(&self, id: TimerId, referenced: bool) {
    let wait = {
      let mut registry = self.registry.borrow_mut();
      if !registry.set_referenced(id, referenced) {
        return;
      }
      registry.lookup(id).and_then(|record| record.pending_wait)
    };
    log::debug!("timer {id} referenced={referenced}");
    if let Some(wait) = wait {
      self.liveness.set_referenced(wait.id(), referenced);
    }
  }
}

/// Resets the nesting level once the running task is done, even if it
/// unwinds.
struct NestingGuard<'a> {
  level: &'a Cell<u32>,
}

impl<'a> NestingGuard<'a> {
  fn enter(level: &'a Cell<u32>, value: u32) -> Self {
    level.set(value);
    Self { level }
  }
}

impl Drop for NestingGuard<'_> {
  fn drop(&mut self) {
    self.level.set(0);
  }
}

/// Converts a delay the way WebIDL converts to `long`, then clamps negative
/// values to zero.
fn convert_delay(delay: f64) -> Result<u64, TimerError> {
  if delay.is_nan() {
    return Err(TimerError::InvalidDelay);
  }
  if !delay.is_finite() {
    return Ok(0);
  }
  const TWO_32: f64 = 4_294_967_296.0;
  const TWO_31: f64 = 2_147_483_648.0;
  let modulo = delay.trunc().rem_euclid(TWO_32);
  let long = if modulo >= TWO_31 {
    modulo - TWO_32
  } else {
    modulo
  };
  Ok(long.max(0.0) as u64)
}
