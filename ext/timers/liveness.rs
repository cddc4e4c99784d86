// Copyright 2018-2026 the Deno authors. MIT license.

use crate::ledger::WaitId;
use std::cell::RefCell;
use std::collections::BTreeSet;

/// Decides whether outstanding waits keep the host process alive.
///
/// Every wait starts out referenced. The scheduler only calls
/// [`Liveness::set_referenced`] when a timer's flag actually changes, or when
/// a wait is begun on behalf of a timer that is already unreferenced.
pub trait Liveness {
  fn set_referenced(&self, wait: WaitId, referenced: bool);

  /// The wait fired, was canceled or failed; it no longer exists.
  fn wait_settled(&self, _wait: WaitId) {}
}

/// Tracks the set of unreferenced outstanding waits.
#[derive(Debug, Default)]
pub struct UnrefedWaits {
  unrefed: RefCell<BTreeSet<WaitId>>,
}

impl UnrefedWaits {
  pub fn is_unrefed(&self, wait: WaitId) -> bool {
    self.unrefed.borrow().contains(&wait)
  }

  pub fn len(&self) -> usize {
    self.unrefed.borrow().len()
  }

  pub fn is_empty(&self) -> bool {
    self.unrefed.borrow().is_empty()
  }
}

impl Liveness for UnrefedWaits {
  fn set_referenced(&self, wait: WaitId, referenced: bool) {
    let mut unrefed = self.unrefed.borrow_mut();
    if referenced {
      unrefed.remove(&wait);
    } else {
      unrefed.insert(wait);
    }
  }

  fn wait_settled(&self, wait: WaitId) {
    self.unrefed.borrow_mut().remove(&wait);
  }
}
