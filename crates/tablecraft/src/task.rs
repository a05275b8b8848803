//! # Task Slots — One Pending Load per Slot
//!
//! The configurator has three things that load in the background: the
//! surface texture, the base asset, and the top asset. Each lives in its own
//! [`TaskSlot`]. A slot holds at most one *current* task; starting a new one
//! cancels the previous one and bumps the slot's generation counter.
//!
//! ```text
//!   spawn(A) ──► gen 1 ─────────────┐ (canceled, result discarded)
//!   spawn(B) ──► gen 2 ───────┐      │
//!                             ▼      ▼
//!   poll()  ◄── mpsc ◄── (2, Ready) (1, Ready)
//!                 │
//!                 └─► only gen 2 is committed
//! ```
//!
//! ## Last Request Wins
//!
//! Worker threads may finish in any order. Every completion carries the
//! generation it was spawned with, and [`TaskSlot::poll`] drops any
//! completion whose generation is no longer current. That comparison runs on
//! the caller's thread, right before the caller commits the value, so a stale
//! completion can never overwrite a newer selection.
//!
//! ## Cooperative Cancellation
//!
//! Superseded workers are not killed. They receive a [`CancelToken`] and are
//! expected to check it between chunks of work (reads, conversions, decodes).
//! Dropping the slot cancels whatever is in flight.
//!
//! ## Comparison
//!
//! - **JS/React**: an `isMounted`/`cancelled` flag captured by an effect
//!   closure and flipped in the cleanup function.
//! - **tokio**: `JoinHandle::abort` plus a `watch` channel for the latest
//!   request. Here plain threads and `mpsc` are enough.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

/// Shared cancellation flag handed to a background job.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_canceled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// How a background job ended.
#[derive(Debug)]
pub enum TaskOutcome<T, E> {
    Ready(T),
    Failed(E),
    Canceled,
}

struct ActiveTask {
    generation: u64,
    token: CancelToken,
}

type Completion<T, E> = (u64, TaskOutcome<T, E>);

/// A single logical slot for background work. See the module docs.
pub struct TaskSlot<T, E> {
    label: &'static str,
    generation: u64,
    active: Option<ActiveTask>,
    tx: mpsc::Sender<Completion<T, E>>,
    rx: mpsc::Receiver<Completion<T, E>>,
}

impl<T: Send + 'static, E: Send + 'static> TaskSlot<T, E> {
    pub fn new(label: &'static str) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            label,
            generation: 0,
            active: None,
            tx,
            rx,
        }
    }

    /// Start `job` on a worker thread, superseding any in-flight job.
    ///
    /// Returns the new generation, or the OS error if the thread couldn't be
    /// created (the slot is left idle in that case).
    pub fn spawn<F>(&mut self, job: F) -> std::io::Result<u64>
    where
        F: FnOnce(&CancelToken) -> Result<T, E> + Send + 'static,
    {
        self.cancel();
        self.generation += 1;
        let generation = self.generation;
        let token = CancelToken::new();
        let worker_token = token.clone();
        let tx = self.tx.clone();

        thread::Builder::new()
            .name(format!("tablecraft-{}", self.label))
            .spawn(move || {
                let outcome = if worker_token.is_canceled() {
                    TaskOutcome::Canceled
                } else {
                    match job(&worker_token) {
                        _ if worker_token.is_canceled() => TaskOutcome::Canceled,
                        Ok(value) => TaskOutcome::Ready(value),
                        Err(e) => TaskOutcome::Failed(e),
                    }
                };
                // Receiver gone means the slot was dropped; nothing to report to.
                let _ = tx.send((generation, outcome));
            })?;

        self.active = Some(ActiveTask { generation, token });
        Ok(generation)
    }

    /// Cancel the in-flight job, if any. Its completion will be discarded.
    pub fn cancel(&mut self) {
        if let Some(active) = self.active.take() {
            log::debug!("{}: canceling generation {}", self.label, active.generation);
            active.token.cancel();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.active.is_some()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Drain finished jobs and return the outcome of the current one, if it
    /// has finished. Completions from superseded generations are dropped.
    pub fn poll(&mut self) -> Option<TaskOutcome<T, E>> {
        let mut latest = None;
        while let Ok(completion) = self.rx.try_recv() {
            if let Some(outcome) = self.accept(completion) {
                latest = Some(outcome);
            }
        }
        latest
    }

    /// Block until the current job finishes or `timeout` elapses.
    ///
    /// Used by headless callers; the viewer only ever calls [`poll`](Self::poll).
    pub fn wait(&mut self, timeout: Duration) -> Option<TaskOutcome<T, E>> {
        let deadline = Instant::now() + timeout;
        while self.active.is_some() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return None;
            }
            match self.rx.recv_timeout(remaining) {
                Ok(completion) => {
                    if let Some(outcome) = self.accept(completion) {
                        return Some(outcome);
                    }
                }
                Err(_) => return None,
            }
        }
        None
    }

    fn accept(&mut self, (generation, outcome): Completion<T, E>) -> Option<TaskOutcome<T, E>> {
        let current = self.active.as_ref().map(|a| a.generation);
        if current != Some(generation) {
            log::debug!("{}: discarding stale result from generation {generation}", self.label);
            return None;
        }
        self.active = None;
        Some(outcome)
    }
}

impl<T, E> Drop for TaskSlot<T, E> {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            active.token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WAIT: Duration = Duration::from_secs(5);

    #[test]
    fn ready_result_is_returned_once() {
        let mut slot: TaskSlot<u32, String> = TaskSlot::new("test");
        slot.spawn(|_| Ok(7)).unwrap();
        match slot.wait(WAIT) {
            Some(TaskOutcome::Ready(v)) => assert_eq!(v, 7),
            other => panic!("expected Ready(7), got {other:?}"),
        }
        assert!(!slot.is_pending());
        assert!(slot.poll().is_none(), "outcome is consumed");
    }

    #[test]
    fn failure_is_reported() {
        let mut slot: TaskSlot<u32, String> = TaskSlot::new("test");
        slot.spawn(|_| Err("nope".to_string())).unwrap();
        assert!(matches!(slot.wait(WAIT), Some(TaskOutcome::Failed(e)) if e == "nope"));
    }

    #[test]
    fn superseded_job_never_commits_even_if_it_finishes_last() {
        let (release_first, first_gate) = mpsc::channel::<()>();
        let mut slot: TaskSlot<u32, String> = TaskSlot::new("test");

        slot.spawn(move |_| {
            let _ = first_gate.recv();
            Ok(1)
        })
        .unwrap();
        slot.spawn(|_| Ok(5)).unwrap();

        match slot.wait(WAIT) {
            Some(TaskOutcome::Ready(v)) => assert_eq!(v, 5, "newest request wins"),
            other => panic!("expected Ready(5), got {other:?}"),
        }

        // Let the stale job finish afterwards; it must be discarded.
        release_first.send(()).unwrap();
        thread::sleep(Duration::from_millis(50));
        assert!(slot.poll().is_none(), "stale completion must be dropped");
    }

    #[test]
    fn superseded_job_sees_cancellation() {
        let (seen_tx, seen_rx) = mpsc::channel::<bool>();
        let (go_tx, go_rx) = mpsc::channel::<()>();
        let mut slot: TaskSlot<u32, String> = TaskSlot::new("test");

        slot.spawn(move |token| {
            let _ = go_rx.recv();
            let _ = seen_tx.send(token.is_canceled());
            Ok(1)
        })
        .unwrap();
        slot.cancel();
        go_tx.send(()).unwrap();
        assert!(seen_rx.recv_timeout(WAIT).unwrap(), "worker observes the cancel");
        assert!(!slot.is_pending());
    }

    #[test]
    fn generation_increments_per_spawn() {
        let mut slot: TaskSlot<(), ()> = TaskSlot::new("test");
        let a = slot.spawn(|_| Ok(())).unwrap();
        let b = slot.spawn(|_| Ok(())).unwrap();
        assert_eq!(b, a + 1);
        assert_eq!(slot.generation(), b);
    }
}
