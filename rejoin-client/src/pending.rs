//! Registry of in-flight request ids awaiting responses.
//!
//! Each reserved id owns a oneshot slot that resolves exactly once: with the
//! matching response, or with `ClientClosed` when the registry is drained at
//! teardown. A waiter that times out simply stops listening; the slot stays
//! behind and a late response finds a dead receiver and is dropped.

use rejoin_core::{Error, Id, Response, Result};
use std::collections::HashMap;
use tokio::sync::{oneshot, Mutex};

pub(crate) struct PendingRequests {
    slots: Mutex<HashMap<Id, oneshot::Sender<Result<Response>>>>,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Reserve a slot for `id` and return the receiver that will resolve it.
    pub async fn reserve(&self, id: Id) -> Result<oneshot::Receiver<Result<Response>>> {
        let mut slots = self.slots.lock().await;
        if slots.contains_key(&id) {
            return Err(Error::DuplicateRequest(id));
        }
        let (tx, rx) = oneshot::channel();
        slots.insert(id, tx);
        Ok(rx)
    }

    /// Fulfill the slot matching `response.id`. A response nobody reserved
    /// for is dropped.
    pub async fn complete(&self, response: Response) {
        let Some(id) = response.id.clone() else {
            tracing::debug!("dropping response without id");
            return;
        };
        match self.slots.lock().await.remove(&id) {
            // send fails when the waiter already timed out; the response is
            // dropped either way
            Some(tx) => {
                let _ = tx.send(Ok(response));
            }
            None => tracing::debug!(id = %id, "dropping response with no pending request"),
        }
    }

    /// Drop the slot for `id` without resolving it. Used when the send that
    /// reserved it never made it onto the wire.
    pub async fn discard(&self, id: &Id) {
        self.slots.lock().await.remove(id);
    }

    /// Resolve every outstanding slot with `ClientClosed` and clear the map.
    /// Idempotent; the registry stays usable for later reservations.
    pub async fn close_all(&self) {
        let mut slots = self.slots.lock().await;
        for (_, tx) in slots.drain() {
            let _ = tx.send(Err(Error::ClientClosed));
        }
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.slots.lock().await.len()
    }
}
