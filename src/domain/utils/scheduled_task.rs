use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
struct Pending {
    generation: u64,
    token: CancellationToken,
}

#[derive(Debug, Default)]
struct Slot {
    next_generation: u64,
    pending: Option<Pending>,
}

/// Cancellable single-shot timer with at most one outstanding run.
///
/// The job runs on the blocking pool of the given runtime once the delay has
/// elapsed. The slot is cleared right before the job starts, so the job itself
/// may schedule the next run.
#[derive(Debug, Clone)]
pub struct ScheduledTask {
    name: String,
    handle: Handle,
    slot: Arc<Mutex<Slot>>,
}

impl ScheduledTask {
    pub fn new(name: impl Into<String>, handle: Handle) -> Self {
        Self { name: name.into(), handle, slot: Arc::new(Mutex::new(Slot::default())) }
    }

    /// Schedules `job` after `delay` unless a run is already outstanding.
    ///
    /// # Returns
    /// Returns true if the job was scheduled, false if an earlier run is still pending.
    pub fn schedule<F>(&self, delay: Duration, job: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        let mut guard = self.slot.lock().expect("Mutex poisoned");
        if guard.pending.is_some() {
            log::debug!("Task {} already scheduled.", self.name);
            return false;
        }
        self.arm(&mut guard, delay, job);
        true
    }

    /// Cancels any outstanding run and schedules `job` after `delay`.
    pub fn reschedule<F>(&self, delay: Duration, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut guard = self.slot.lock().expect("Mutex poisoned");
        if let Some(pending) = guard.pending.take() {
            pending.token.cancel();
        }
        self.arm(&mut guard, delay, job);
    }

    /// # Returns
    /// Returns true if a pending run was cancelled.
    pub fn cancel(&self) -> bool {
        let mut guard = self.slot.lock().expect("Mutex poisoned");
        match guard.pending.take() {
            Some(pending) => {
                pending.token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.slot.lock().expect("Mutex poisoned").pending.is_some()
    }

    fn arm<F>(&self, slot: &mut Slot, delay: Duration, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        slot.next_generation += 1;
        let generation = slot.next_generation;
        let token = CancellationToken::new();
        slot.pending = Some(Pending { generation, token: token.clone() });

        let shared = self.slot.clone();
        let name = self.name.clone();
        self.handle.spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    log::debug!("Task {} cancelled.", name);
                }
                _ = tokio::time::sleep(delay) => {
                    if let Ok(mut guard) = shared.lock() {
                        if guard.pending.as_ref().is_some_and(|p| p.generation == generation) {
                            guard.pending = None;
                        }
                    }
                    if let Err(e) = tokio::task::spawn_blocking(job).await {
                        log::error!("Task {} failed: {}", name, e);
                    }
                }
            }
        });
    }
}
