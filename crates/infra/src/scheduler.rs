//! Timer-map call scheduler.
//!
//! One scheduler instance owns a map of call id to armed tokio task. Arming
//! an id replaces (aborts) any prior timer for that id, so the same call is
//! never double-armed. After a dispatch attempt, a `RetryAt` follow-up
//! re-arms inside the same task.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use dialout_calls::{CallPatch, CallStatus};
use dialout_core::CallId;

use crate::dispatcher::{CallDispatcher, DispatchFollowUp};
use crate::store::CallStore;

struct Timer {
    generation: u64,
    handle: JoinHandle<()>,
}

struct Inner {
    timers: Mutex<HashMap<CallId, Timer>>,
    next_generation: Mutex<u64>,
    dispatcher: CallDispatcher,
    store: Arc<dyn CallStore>,
}

/// Arms and fires dispatch timers. Cheap to clone; all clones share the map.
#[derive(Clone)]
pub struct CallScheduler {
    inner: Arc<Inner>,
}

impl CallScheduler {
    pub fn new(dispatcher: CallDispatcher, store: Arc<dyn CallStore>) -> Self {
        Self {
            inner: Arc::new(Inner {
                timers: Mutex::new(HashMap::new()),
                next_generation: Mutex::new(0),
                dispatcher,
                store,
            }),
        }
    }

    /// Arm (or re-arm) the timer for `call_id` at `at`. A due-now or past
    /// instant fires immediately. Any previously armed timer for the same id
    /// is aborted first.
    pub fn schedule(&self, call_id: CallId, at: DateTime<Utc>) {
        let generation = {
            let mut next = self.inner.next_generation.lock().unwrap();
            *next += 1;
            *next
        };

        // Hold the map lock across the spawn so a due-now task cannot run
        // its cleanup before its own entry is inserted.
        let mut timers = self.inner.timers.lock().unwrap();
        let handle = tokio::spawn(run_timer(self.inner.clone(), call_id, at, generation));
        if let Some(previous) = timers.insert(call_id, Timer { generation, handle }) {
            previous.handle.abort();
        }
        debug!(call_id = %call_id, fire_at = %at, "timer armed");
    }

    /// Disarm any timer for `call_id`. Record status handling is the
    /// caller's job.
    pub fn cancel(&self, call_id: CallId) {
        let mut timers = self.inner.timers.lock().unwrap();
        if let Some(timer) = timers.remove(&call_id) {
            timer.handle.abort();
            debug!(call_id = %call_id, "timer disarmed");
        }
    }

    /// Number of currently armed timers.
    pub fn armed(&self) -> usize {
        self.inner.timers.lock().unwrap().len()
    }

    /// Re-arm every `pending` record at its `scheduled_at`; past-due records
    /// fire immediately. Called once at startup. Calls left in `calling` are
    /// picked up later by [`CallScheduler::reconcile_stuck`].
    pub fn reload_pending(&self) -> usize {
        let pending = match self.inner.store.list_pending() {
            Ok(pending) => pending,
            Err(e) => {
                warn!(error = %e, "failed to reload pending calls");
                return 0;
            }
        };

        let count = pending.len();
        for call in pending {
            self.schedule(call.id, call.scheduled_at);
        }
        if count > 0 {
            info!(count, "re-armed pending calls");
        }
        count
    }

    /// Reconcile calls whose bridge callback never arrived.
    ///
    /// A call still `calling` with no attempt newer than `older_than` is
    /// given back to the dispatcher for another attempt, or failed once its
    /// attempts are spent. Runs periodically from the service wiring.
    pub fn reconcile_stuck(&self, older_than: chrono::Duration) -> usize {
        let cutoff = Utc::now() - older_than;
        let stuck = match self.inner.store.list_stuck(cutoff) {
            Ok(stuck) => stuck,
            Err(e) => {
                warn!(error = %e, "failed to scan for stuck calls");
                return 0;
            }
        };

        let mut handled = 0;
        for call in stuck {
            if call.attempts < call.max_attempts {
                let patch = CallPatch::new()
                    .expect_status(&[CallStatus::Calling])
                    .status(CallStatus::Pending)
                    .retry_reason("no callback received");
                match self.inner.store.update(call.id, patch) {
                    Ok(_) => {
                        warn!(
                            call_id = %call.id,
                            attempts = call.attempts,
                            "stuck call re-armed"
                        );
                        self.schedule(call.id, Utc::now());
                        handled += 1;
                    }
                    Err(e) => {
                        debug!(call_id = %call.id, error = %e, "stuck call moved during sweep");
                    }
                }
            } else {
                let patch = CallPatch::new()
                    .expect_status(&[CallStatus::Calling])
                    .status(CallStatus::Failed)
                    .error_message("no callback received and attempts exhausted");
                match self.inner.store.update(call.id, patch) {
                    Ok(_) => {
                        warn!(call_id = %call.id, "stuck call failed after exhausting attempts");
                        handled += 1;
                    }
                    Err(e) => {
                        debug!(call_id = %call.id, error = %e, "stuck call moved during sweep");
                    }
                }
            }
        }
        handled
    }
}

async fn run_timer(inner: Arc<Inner>, call_id: CallId, at: DateTime<Utc>, generation: u64) {
    let mut fire_at = at;
    loop {
        let delay = (fire_at - Utc::now()).to_std().unwrap_or_default();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        match inner.dispatcher.execute_outbound_call(call_id).await {
            DispatchFollowUp::RetryAt(next) => fire_at = next,
            DispatchFollowUp::Done => break,
        }
    }

    // Reclaim our own entry, unless a newer timer already replaced it.
    let mut timers = inner.timers.lock().unwrap();
    if timers.get(&call_id).is_some_and(|t| t.generation == generation) {
        timers.remove(&call_id);
    }
}
