// Copyright 2018-2026 the Deno authors. MIT license.

use crate::scheduler::TimerAction;
use std::collections::VecDeque;

/// A fired timer waiting for its macrotask turn.
#[derive(Debug)]
pub struct TimerTask {
  pub(crate) action: TimerAction,
  /// The timer nesting level in effect while `action` runs.
  pub(crate) nesting_level: u32,
}

impl TimerTask {
  pub fn nesting_level(&self) -> u32 {
    self.nesting_level
  }
}

/// Ready timer tasks, oldest first. Ordering is decided before tasks get
/// here; the queue never reorders.
#[derive(Debug, Default)]
pub struct TaskQueue {
  tasks: VecDeque<TimerTask>,
}

impl TaskQueue {
  pub fn enqueue(&mut self, task: TimerTask) {
    self.tasks.push_back(task);
  }

  pub fn drain_one(&mut self) -> Option<TimerTask> {
    self.tasks.pop_front()
  }

  pub fn len(&self) -> usize {
    self.tasks.len()
  }

  pub fn is_empty(&self) -> bool {
    self.tasks.is_empty()
  }

  pub fn clear(&mut self) {
    self.tasks.clear();
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::registry::TimerId;
  use crate::scheduler::Callback;

  fn task(id: TimerId, nesting_level: u32) -> TimerTask {
    TimerTask {
      action: TimerAction::new(
        id,
        Callback::function(|_, _| Ok(())),
        Vec::<serde_json::Value>::new().into(),
        0,
        false,
      ),
      nesting_level,
    }
  }

  #[test]
  fn drains_in_fifo_order() {
    let mut registry = crate::registry::TimerRegistry::new();
    let ids = (0..3)
      .map(|_| registry.allocate(crate::CancelHandle::new_rc(), false))
      .collect::<Vec<_>>();

    let mut queue = TaskQueue::default();
    assert!(queue.drain_one().is_none());
    for (level, id) in ids.iter().enumerate() {
      queue.enqueue(task(*id, level as u32));
    }
    assert_eq!(queue.len(), 3);

    let drained = std::iter::from_fn(|| queue.drain_one())
      .map(|task| (task.action.timer_id(), task.nesting_level()))
      .collect::<Vec<_>>();
    assert_eq!(drained, vec![(ids[0], 0), (ids[1], 1), (ids[2], 2)]);
    assert!(queue.is_empty());
  }
}
