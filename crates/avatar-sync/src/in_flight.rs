//! Per-resolver set of avatar ids currently being fetched

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Avatar id -> handles waiting on its fetch (initiator first)
#[derive(Default)]
pub(crate) struct InFlight {
    waiting: Mutex<HashMap<String, Vec<String>>>,
}

/// Outcome of trying to start a fetch
pub(crate) enum Claim {
    /// The caller owns the fetch for this id
    Owner(InFlightClaim),
    /// Another fetch for this id is running; the caller was added as a waiter
    Joined,
}

impl InFlight {
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<String>>> {
        self.waiting.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Check-and-insert as one step under the lock; never suspends
    pub(crate) fn claim(self: &Arc<Self>, avatar_id: &str, handle: &str) -> Claim {
        let mut waiting = self.lock();
        if let Some(handles) = waiting.get_mut(avatar_id) {
            if !handles.iter().any(|h| h == handle) {
                handles.push(handle.to_string());
            }
            return Claim::Joined;
        }

        waiting.insert(avatar_id.to_string(), vec![handle.to_string()]);
        Claim::Owner(InFlightClaim {
            in_flight: Arc::clone(self),
            avatar_id: avatar_id.to_string(),
            released: false,
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    fn take(&self, avatar_id: &str) -> Vec<String> {
        self.lock().remove(avatar_id).unwrap_or_default()
    }
}

/// Ownership of one in-flight fetch
///
/// Dropping the claim without releasing it (a fetch task that panicked)
/// still clears the entry, so the id stays retryable.
pub(crate) struct InFlightClaim {
    in_flight: Arc<InFlight>,
    avatar_id: String,
    released: bool,
}

impl InFlightClaim {
    pub(crate) fn avatar_id(&self) -> &str {
        &self.avatar_id
    }

    /// Clear the entry and return every handle that waited on it
    pub(crate) fn release(mut self) -> Vec<String> {
        self.released = true;
        self.in_flight.take(&self.avatar_id)
    }
}

impl Drop for InFlightClaim {
    fn drop(&mut self) {
        if !self.released {
            self.in_flight.take(&self.avatar_id);
        }
    }
}
