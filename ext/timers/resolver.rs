// Copyright 2018-2026 the Deno authors. MIT license.

//! Decides which waits may fire after a sleep completes.
//!
//! Sleeps are not guaranteed to complete in the order of their deadlines, but
//! the HTML "run steps after a timeout" algorithm requires that a timer wait
//! for any timer that was started before it with an equal or smaller delay.
//! Whenever one wait resolves we walk the ledger (which is in the order in
//! which waits were begun) and fire every wait that both:
//!   a) has resolved, and
//!   b) has a delay lower than the lowest unresolved delay found so far.

use crate::ledger::WaitHandle;
use crate::ledger::WaitLedger;

/// Mark `resolved` as complete and fire every wait that is now unblocked, in
/// ledger order. A stale handle (its wait was already removed, e.g. by
/// cancellation) is a no-op. Returns the number of waits fired.
pub fn resolve<T>(
  ledger: &mut WaitLedger<T>,
  resolved: WaitHandle,
  fire: impl FnMut(WaitHandle, T),
) -> usize {
  if !ledger.mark_resolved(resolved) {
    return 0;
  }
  release(ledger, fire)
}

/// Fire every resolved wait that is not blocked by an earlier unresolved wait
/// with an equal or smaller delay. Used directly after a wait is removed
/// without resolving, since that can unblock waits behind it.
pub fn release<T>(
  ledger: &mut WaitLedger<T>,
  mut fire: impl FnMut(WaitHandle, T),
) -> usize {
  let mut fired = 0;
  let mut lowest_unresolved_delay: Option<u64> = None;
  let mut cursor = ledger.head_slot();
  while let Some(slot) = cursor {
    let node = ledger.node_at(slot);
    cursor = node.next;
    if lowest_unresolved_delay.is_some_and(|lowest| node.delay_millis >= lowest)
    {
      continue;
    }
    if node.resolved {
      let (handle, on_ready) = ledger.remove_slot(slot);
      fire(handle, on_ready);
      fired += 1;
    } else {
      lowest_unresolved_delay = Some(node.delay_millis);
    }
  }
  fired
}
