//! PUBACK tracking for acknowledged publishes.
//!
//! rumqttc assigns packet ids inside its event loop and reports them as
//! `Outgoing::Publish(pkid)` in the order requests were queued. Every
//! publish is therefore recorded in a FIFO when it is handed to the client,
//! bound to its packet id when the event loop reports it, and resolved when
//! the matching PUBACK arrives.
//!
//! After a reconnect the event loop re-sends unacknowledged publishes with
//! their original packet id; those are recognised because the id is still
//! in flight and do not consume a queue slot.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use rumqttc::QoS;
use tokio::sync::oneshot;

type Waiter = Option<oneshot::Sender<()>>;

enum Slot {
    /// QoS 0, no acknowledgement will follow.
    Untracked,
    /// QoS 1 or 2, optionally with a caller waiting for the PUBACK.
    Tracked(Waiter),
}

#[derive(Default)]
struct State {
    queued: VecDeque<Slot>,
    in_flight: HashMap<u16, Waiter>,
}

#[derive(Default)]
pub(crate) struct AckTracker {
    state: Mutex<State>,
}

impl AckTracker {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a publish about to be handed to the client.
    ///
    /// Returns a receiver resolving on PUBACK when `wait` is set and the
    /// QoS is acknowledged.
    pub(crate) fn enqueue(&self, qos: QoS, wait: bool) -> Option<oneshot::Receiver<()>> {
        let mut state = self.state();
        if qos == QoS::AtMostOnce {
            state.queued.push_back(Slot::Untracked);
            return None;
        }
        if wait {
            let (tx, rx) = oneshot::channel();
            state.queued.push_back(Slot::Tracked(Some(tx)));
            Some(rx)
        } else {
            state.queued.push_back(Slot::Tracked(None));
            None
        }
    }

    /// Undo the last [`enqueue`](Self::enqueue) when the client refused the request.
    pub(crate) fn cancel_last(&self) {
        self.state().queued.pop_back();
    }

    /// The event loop wrote a publish with `pkid`.
    pub(crate) fn on_outgoing_publish(&self, pkid: u16) {
        let mut state = self.state();
        if pkid != 0 && state.in_flight.contains_key(&pkid) {
            tracing::trace!(pkid, "publish re-sent after reconnect");
            return;
        }
        match state.queued.pop_front() {
            Some(Slot::Tracked(waiter)) => {
                state.in_flight.insert(pkid, waiter);
            }
            Some(Slot::Untracked) => {}
            None => tracing::debug!(pkid, "outgoing publish without queued request"),
        }
    }

    /// The broker acknowledged `pkid`.
    pub(crate) fn on_puback(&self, pkid: u16) {
        let waiter = self.state().in_flight.remove(&pkid);
        match waiter {
            Some(Some(tx)) => {
                // the caller may have timed out already
                let _ = tx.send(());
            }
            Some(None) => {}
            None => tracing::debug!(pkid, "PUBACK for unknown packet id"),
        }
    }

    /// Publishes handed to the client and not yet acknowledged.
    pub(crate) fn pending(&self) -> usize {
        let state = self.state();
        state
            .queued
            .iter()
            .filter(|slot| matches!(slot, Slot::Tracked(_)))
            .count()
            + state.in_flight.len()
    }
}
