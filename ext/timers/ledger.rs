// Copyright 2018-2026 the Deno authors. MIT license.

//! In-flight waits, kept in the order they were begun.
//!
//! The ledger is a doubly linked list threaded through a [`Slab`]: nodes are
//! addressed by slot index and carry `prev`/`next` indices instead of
//! pointers. Appending and removing are O(1). Nothing is sorted by delay;
//! that ordering work belongs to the [resolver](crate::resolver).

use slab::Slab;
use std::fmt;

/// Identifies one wait for its whole lifetime. Never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WaitId(u64);

impl WaitId {
  pub fn as_u64(self) -> u64 {
    self.0
  }
}

impl fmt::Display for WaitId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Locates a wait in the ledger. Slab slots are recycled, so a handle also
/// carries the [`WaitId`] to reject lookups that outlived their node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WaitHandle {
  slot: usize,
  id: WaitId,
}

impl WaitHandle {
  pub fn id(&self) -> WaitId {
    self.id
  }
}

#[derive(Debug)]
pub(crate) struct WaitNode<T> {
  id: WaitId,
  pub(crate) delay_millis: u64,
  pub(crate) resolved: bool,
  on_ready: T,
  prev: Option<usize>,
  pub(crate) next: Option<usize>,
}

#[derive(Debug)]
pub struct WaitLedger<T> {
  nodes: Slab<WaitNode<T>>,
  head: Option<usize>,
  tail: Option<usize>,
  next_id: u64,
}

impl<T> Default for WaitLedger<T> {
  fn default() -> Self {
    Self {
      nodes: Slab::new(),
      head: None,
      tail: None,
      next_id: 1,
    }
  }
}

impl<T> WaitLedger<T> {
  pub fn new() -> Self {
    Default::default()
  }

  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  /// Link a new, unresolved wait at the tail.
  pub fn append(&mut self, delay_millis: u64, on_ready: T) -> WaitHandle {
    let id = WaitId(self.next_id);
    self.next_id += 1;
    let prev = self.tail;
    let slot = self.nodes.insert(WaitNode {
      id,
      delay_millis,
      resolved: false,
      on_ready,
      prev,
      next: None,
    });
    match prev {
      Some(prev) => self.nodes[prev].next = Some(slot),
      None => self.head = Some(slot),
    }
    self.tail = Some(slot);
    WaitHandle { slot, id }
  }

  pub fn contains(&self, handle: WaitHandle) -> bool {
    self.node(handle).is_some()
  }

  pub fn get(&self, handle: WaitHandle) -> Option<&T> {
    self.node(handle).map(|node| &node.on_ready)
  }

  /// Unlink a wait, returning its payload. `None` if the handle is stale.
  pub fn remove(&mut self, handle: WaitHandle) -> Option<T> {
    self.node(handle)?;
    Some(self.remove_slot(handle.slot).1)
  }

  pub fn clear(&mut self) {
    self.nodes.clear();
    self.head = None;
    self.tail = None;
  }

  /// Iterates `(delay_millis, resolved)` from head to tail.
  pub fn iter(&self) -> impl Iterator<Item = (u64, bool)> + '_ {
    let mut cursor = self.head;
    std::iter::from_fn(move || {
      let node = &self.nodes[cursor?];
      cursor = node.next;
      Some((node.delay_millis, node.resolved))
    })
  }

  pub(crate) fn mark_resolved(&mut self, handle: WaitHandle) -> bool {
    match self.nodes.get_mut(handle.slot) {
      Some(node) if node.id == handle.id => {
        node.resolved = true;
        true
      }
      _ => false,
    }
  }

  pub(crate) fn head_slot(&self) -> Option<usize> {
    self.head
  }

  pub(crate) fn node_at(&self, slot: usize) -> &WaitNode<T> {
    &self.nodes[slot]
  }

  pub(crate) fn remove_slot(&mut self, slot: usize) -> (WaitHandle, T) {
    let node = self.nodes.remove(slot);
    match node.prev {
      Some(prev) => self.nodes[prev].next = node.next,
      None => self.head = node.next,
    }
    match node.next {
      Some(next) => self.nodes[next].prev = node.prev,
      None => self.tail = node.prev,
    }
    (WaitHandle { slot, id: node.id }, node.on_ready)
  }

  fn node(&self, handle: WaitHandle) -> Option<&WaitNode<T>> {
    self
      .nodes
      .get(handle.slot)
      .filter(|node| node.id == handle.id)
  }
}
