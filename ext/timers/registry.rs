// Copyright 2018-2026 the Deno authors. MIT license.

use crate::cancel::CancelHandle;
use crate::ledger::WaitHandle;
use std::collections::BTreeMap;
use std::collections::btree_map::IntoValues;
use std::fmt;
use std::rc::Rc;

/// The integer returned by `setTimeout`/`setInterval`. Starts at 1 and only
/// ever increases; an interval keeps its id across firings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u64);

impl TimerId {
  pub fn as_u64(self) -> u64 {
    self.0
  }
}

impl From<TimerId> for u64 {
  fn from(id: TimerId) -> Self {
    id.0
  }
}

impl fmt::Display for TimerId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

#[derive(Debug)]
pub struct TimerRecord {
  pub id: TimerId,
  pub cancel_handle: Rc<CancelHandle>,
  pub referenced: bool,
  pub repeat: bool,
  /// The wait currently outstanding for this timer, if any.
  pub pending_wait: Option<WaitHandle>,
}

/// Active timers by id. An id is present exactly as long as its timer is
/// live: not cleared and, for a timeout, not yet run.
#[derive(Debug)]
pub struct TimerRegistry {
  timers: BTreeMap<TimerId, TimerRecord>,
  next_id: u64,
}

impl Default for TimerRegistry {
  fn default() -> Self {
    Self {
      timers: BTreeMap::new(),
      next_id: 1,
    }
  }
}

impl TimerRegistry {
  pub fn new() -> Self {
    Default::default()
  }

  /// Register a new timer. Timers start out referenced.
  pub fn allocate(
    &mut self,
    cancel_handle: Rc<CancelHandle>,
    repeat: bool,
  ) -> TimerId {
    let id = TimerId(self.next_id);
    self.next_id += 1;
    self.timers.insert(
      id,
      TimerRecord {
        id,
        cancel_handle,
        referenced: true,
        repeat,
        pending_wait: None,
      },
    );
    id
  }

  pub fn lookup(&self, id: TimerId) -> Option<&TimerRecord> {
    self.timers.get(&id)
  }

  pub fn lookup_mut(&mut self, id: TimerId) -> Option<&mut TimerRecord> {
    self.timers.get_mut(&id)
  }

  pub fn contains(&self, id: TimerId) -> bool {
    self.timers.contains_key(&id)
  }

  pub fn remove(&mut self, id: TimerId) -> Option<TimerRecord> {
    self.timers.remove(&id)
  }

  /// Returns `true` only if the flag actually changed.
  pub fn set_referenced(&mut self, id: TimerId, referenced: bool) -> bool {
    match self.timers.get_mut(&id) {
      Some(record) if record.referenced != referenced => {
        record.referenced = referenced;
        true
      }
      _ => false,
    }
  }

  pub fn len(&self) -> usize {
    self.timers.len()
  }

  pub fn is_empty(&self) -> bool {
    self.timers.is_empty()
  }

  /// Whether any referenced timer has a wait outstanding.
  pub fn has_pending_refed(&self) -> bool {
    self
      .timers
      .values()
      .any(|record| record.referenced && record.pending_wait.is_some())
  }

  pub fn iter(&self) -> impl Iterator<Item = &TimerRecord> {
    self.timers.values()
  }

  pub fn drain(&mut self) -> IntoValues<TimerId, TimerRecord> {
    std::mem::take(&mut self.timers).into_values()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn allocate_hands_out_increasing_ids() {
    let mut registry = TimerRegistry::new();
    let a = registry.allocate(CancelHandle::new_rc(), false);
    let b = registry.allocate(CancelHandle::new_rc(), true);
    assert_eq!(a.as_u64(), 1);
    assert_eq!(b.as_u64(), 2);
    registry.remove(a);
    let c = registry.allocate(CancelHandle::new_rc(), false);
    assert_eq!(c.as_u64(), 3);
    assert!(registry.lookup(b).unwrap().repeat);
    assert!(registry.lookup(c).unwrap().referenced);
  }

  #[test]
  fn remove_is_idempotent() {
    let mut registry = TimerRegistry::new();
    let id = registry.allocate(CancelHandle::new_rc(), false);
    assert!(registry.remove(id).is_some());
    assert!(registry.remove(id).is_none());
    assert!(registry.lookup(id).is_none());
    assert!(registry.is_empty());
  }

  #[test]
  fn set_referenced_reports_only_changes() {
    let mut registry = TimerRegistry::new();
    let id = registry.allocate(CancelHandle::new_rc(), false);
    assert!(!registry.set_referenced(id, true));
    assert!(registry.set_referenced(id, false));
    assert!(!registry.set_referenced(id, false));
    assert!(registry.set_referenced(id, true));
    registry.remove(id);
    assert!(!registry.set_referenced(id, false));
  }

  #[test]
  fn pending_refed_requires_an_outstanding_wait() {
    let mut registry = TimerRegistry::new();
    let id = registry.allocate(CancelHandle::new_rc(), false);
    assert!(!registry.has_pending_refed());

    let mut ledger = crate::ledger::WaitLedger::new();
    let wait = ledger.append(1, ());
    registry.lookup_mut(id).unwrap().pending_wait = Some(wait);
    assert!(registry.has_pending_refed());
    registry.set_referenced(id, false);
    assert!(!registry.has_pending_refed());
  }
}
