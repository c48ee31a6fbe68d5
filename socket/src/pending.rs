use crate::error::SocketError;
use arcade_protocol::ResponseEnvelope;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use tokio::sync::oneshot;
use tracing::warn;

pub type CallResult = Result<Value, SocketError>;

/// Correlation table of one connection.
///
/// Ids come from a counter that only ever grows, so an id is never reused
/// for the lifetime of the table, even across reconnects.
#[derive(Default)]
pub struct PendingCalls {
    next_id: AtomicU64,
    calls: Mutex<HashMap<u64, oneshot::Sender<CallResult>>>,
}

impl PendingCalls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates an id and returns the receiver its outcome is delivered to.
    pub fn register(&self) -> (u64, oneshot::Receiver<CallResult>) {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.lock().insert(id, tx);
        (id, rx)
    }

    /// Routes a response to its caller. Returns `false` for an unknown id.
    pub fn resolve(&self, response: ResponseEnvelope) -> bool {
        let id = response.id;
        let Some(tx) = self.lock().remove(&id) else {
            warn!(id, "dropping response for a request that is not pending");
            return false;
        };
        let outcome = response.into_result().map_err(SocketError::Remote);
        // The caller may have stopped waiting.
        let _ = tx.send(outcome);
        true
    }

    /// Fails a single call, e.g. when its frame could not be written.
    pub fn reject(&self, id: u64, err: SocketError) -> bool {
        match self.lock().remove(&id) {
            Some(tx) => {
                let _ = tx.send(Err(err));
                true
            }
            None => false,
        }
    }

    /// Fails every outstanding call and returns how many there were.
    pub fn fail_all(&self, err: SocketError) -> usize {
        let drained: Vec<_> = self.lock().drain().collect();
        let count = drained.len();
        for (_, tx) in drained {
            let _ = tx.send(Err(err.clone()));
        }
        count
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<u64, oneshot::Sender<CallResult>>> {
        match self.calls.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
