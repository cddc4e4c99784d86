// Copyright 2018-2026 the Deno authors. MIT license.

//! Deterministic collaborators for unit tests.

use crate::error::ExceptionReporter;
use crate::ledger::WaitId;
use crate::liveness::Liveness;
use crate::reactor::Reactor;
use crate::reactor::SleepFuture;
use deno_error::JsErrorBox;
use deno_error::JsErrorClass;
use std::cell::RefCell;
use std::future::poll_fn;
use std::rc::Rc;
use std::task::Poll;
use std::task::Waker;
use std::time::Duration;

#[derive(Default)]
struct ManualSleep {
  outcome: Option<Result<(), JsErrorBox>>,
  waker: Option<Waker>,
}

/// A reactor whose sleeps only complete when the test says so, in whatever
/// order the test chooses.
#[derive(Default)]
pub struct ManualReactor {
  sleeps: RefCell<Vec<(u64, Rc<RefCell<ManualSleep>>)>>,
}

impl ManualReactor {
  /// Number of sleeps begun so far.
  pub fn len(&self) -> usize {
    self.sleeps.borrow().len()
  }

  pub fn delay_of(&self, index: usize) -> u64 {
    self.sleeps.borrow()[index].0
  }

  pub fn complete(&self, index: usize) {
    self.settle(index, Ok(()))
  }

  pub fn fail(&self, index: usize, message: &'static str) {
    self.settle(index, Err(JsErrorBox::generic(message)))
  }

  /// Whether every sleep future has been dropped by its owner.
  pub fn all_dropped(&self) -> bool {
    self
      .sleeps
      .borrow()
      .iter()
      .all(|(_, sleep)| Rc::strong_count(sleep) == 1)
  }

  fn settle(&self, index: usize, outcome: Result<(), JsErrorBox>) {
    let sleep = self.sleeps.borrow()[index].1.clone();
    let waker = {
      let mut sleep = sleep.borrow_mut();
      sleep.outcome = Some(outcome);
      sleep.waker.take()
    };
    if let Some(waker) = waker {
      waker.wake();
    }
  }
}

impl Reactor for ManualReactor {
  fn sleep(&self, duration: Duration) -> SleepFuture {
    let sleep = Rc::new(RefCell::new(ManualSleep::default()));
    self
      .sleeps
      .borrow_mut()
      .push((duration.as_millis() as u64, sleep.clone()));
    Box::pin(poll_fn(move |cx| {
      let mut sleep = sleep.borrow_mut();
      match sleep.outcome.take() {
        Some(outcome) => Poll::Ready(outcome),
        None => {
          sleep.waker = Some(cx.waker().clone());
          Poll::Pending
        }
      }
    }))
  }
}

#[derive(Default)]
pub struct RecordingLiveness {
  calls: RefCell<Vec<(WaitId, bool)>>,
  settled: RefCell<Vec<WaitId>>,
}

impl RecordingLiveness {
  pub fn calls(&self) -> Vec<(WaitId, bool)> {
    self.calls.borrow().clone()
  }

  pub fn settled(&self) -> Vec<WaitId> {
    self.settled.borrow().clone()
  }
}

impl Liveness for RecordingLiveness {
  fn set_referenced(&self, wait: WaitId, referenced: bool) {
    self.calls.borrow_mut().push((wait, referenced));
  }

  fn wait_settled(&self, wait: WaitId) {
    self.settled.borrow_mut().push(wait);
  }
}

#[derive(Default)]
pub struct RecordingReporter {
  errors: RefCell<Vec<JsErrorBox>>,
}

impl RecordingReporter {
  pub fn messages(&self) -> Vec<String> {
    self
      .errors
      .borrow()
      .iter()
      .map(|err| err.get_message().into_owned())
      .collect()
  }
}

impl ExceptionReporter for RecordingReporter {
  fn report(&self, error: JsErrorBox) {
    self.errors.borrow_mut().push(error);
  }
}
