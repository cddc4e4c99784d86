// Copyright 2018-2026 the Deno authors. MIT license.

use crate::registry::TimerId;
use bit_set::BitSet;

/// A snapshot of the live timers of one scheduler.
#[derive(Debug, Default)]
pub struct TimerStats {
  pub(crate) timers: Vec<TimerId>,
  /// `repeats` is a bitset that reports whether a given index in the ID array
  /// is an interval (true) or a timer (false).
  pub(crate) repeats: BitSet,
}

impl TimerStats {
  pub(crate) fn push(&mut self, id: TimerId, repeats: bool) {
    if repeats {
      self.repeats.insert(self.timers.len());
    }
    self.timers.push(id);
  }

  pub fn len(&self) -> usize {
    self.timers.len()
  }

  pub fn is_empty(&self) -> bool {
    self.timers.is_empty()
  }

  /// Live timer ids in ascending order, each paired with whether it repeats.
  pub fn iter(&self) -> impl Iterator<Item = (TimerId, bool)> + '_ {
    self
      .timers
      .iter()
      .enumerate()
      .map(|(index, id)| (*id, self.repeats.contains(index)))
  }

  pub fn interval_count(&self) -> usize {
    self.repeats.len()
  }
}
