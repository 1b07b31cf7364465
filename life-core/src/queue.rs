//! A bounded-concurrency FIFO work queue with drain-barrier waits and
//! cooperative cancellation.
//!
//! Directly grounded on `work_queue.c`/`work_queue.h`: one mutex, two
//! condition variables (`work_available`, `queue_empty`), `active` /
//! `target` / `waiting` counters, a `destroy` flag, and an outside-waiter
//! count shared by `wait`/`stop`/`destroy`. Built on `parking_lot::{Mutex,
//! Condvar}`, the concurrency primitives the teacher reaches for whenever
//! it needs exactly this mutex+condvar shape (see `coredb::htable::Cvar`).

use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::{debug, trace};
use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::error::QueueError;

/// A task's single entry point. Called exactly once by exactly one worker:
/// with `true` if it is actually being executed, or `false` if the queue is
/// being torn down and the task is only being reclaimed (it must free any
/// owned resources and return without doing work).
pub type Task = Box<dyn FnOnce(bool) + Send>;

struct State {
    entries: VecDeque<Task>,
    active: usize,
    target: usize,
    waiting: usize,
    destroy: bool,
    /// outsiders blocked in the drain primitive (wait/stop/destroy)
    waiters: usize,
}

struct Shared {
    state: Mutex<State>,
    work_available: Condvar,
    queue_empty: Condvar,
}

/// A pool of worker threads processing a single FIFO of tasks.
pub struct WorkQueue {
    shared: Arc<Shared>,
    threads: Mutex<Vec<JoinHandle<()>>>,
}

impl Default for WorkQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkQueue {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    entries: VecDeque::new(),
                    active: 0,
                    target: 0,
                    waiting: 0,
                    destroy: false,
                    waiters: 0,
                }),
                work_available: Condvar::new(),
                queue_empty: Condvar::new(),
            }),
            threads: Mutex::new(Vec::new()),
        }
    }

    /// Spawn up to `workers` worker threads, one-shot. A no-op (returning 0)
    /// if threads are already running or the queue is being destroyed.
    /// Returns the number of threads actually started.
    pub fn start(&self, workers: usize) -> Result<usize, QueueError> {
        let mut state = self.shared.state.lock();
        let mut threads = self.threads.lock();
        if state.destroy || !threads.is_empty() {
            return Ok(threads.len());
        }
        for _ in 0..workers {
            let shared = Arc::clone(&self.shared);
            threads.push(thread::spawn(move || worker_loop(shared)));
        }
        state.target = workers;
        debug!("work queue: started {workers} workers");
        if threads.is_empty() {
            Err(QueueError::StartFailed)
        } else {
            Ok(threads.len())
        }
    }

    /// Append a task to the tail of the queue and wake a worker.
    pub fn add(&self, task: Task) {
        let mut state = self.shared.state.lock();
        state.entries.push_back(task);
        self.shared.work_available.notify_one();
    }

    /// No worker thread has ever been started, so `queue_empty` can never
    /// be signaled; the drain primitive would block forever. `start`
    /// having run zero workers is the only case this guards.
    fn has_workers(&self) -> bool {
        !self.threads.lock().is_empty()
    }

    /// Block until the queue is empty and no worker is active. Workers are
    /// left running; the queue is ready for new tasks once this returns.
    pub fn wait(&self) {
        if !self.has_workers() {
            return;
        }
        let state = self.shared.state.lock();
        drain(&self.shared, state);
    }

    /// Stop dispatching new work (`target = 0`) and wait for in-flight
    /// tasks to finish. Workers block on `work_available` but do not exit.
    pub fn stop(&self) {
        let mut state = self.shared.state.lock();
        state.target = 0;
        if !self.has_workers() {
            return;
        }
        drain(&self.shared, state);
    }

    /// Tear the queue down: stop dispatching, cancel pending tasks (each
    /// receives its reclaim call), join every worker thread.
    pub fn destroy(&self) {
        let mut state = self.shared.state.lock();
        state.target = 0;
        state.destroy = true;
        if self.has_workers() {
            drain(&self.shared, state);
        } else {
            // nothing was ever dispatched; reclaim whatever is still queued ourselves.
            let remaining = std::mem::take(&mut state.entries);
            drop(state);
            for task in remaining {
                task(false);
            }
        }

        let mut threads = self.threads.lock();
        for handle in threads.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for WorkQueue {
    fn drop(&mut self) {
        if !self.shared.state.lock().destroy {
            self.destroy();
        }
    }
}

/// The drain primitive shared by `wait`/`stop`/`destroy`: nudge a worker
/// awake unconditionally, then wait for `entries` to empty out and `active`
/// to hit zero. Two things matter here:
///
/// - The nudge happens every call, even if the queue already looks drained:
///   `destroy` needs a worker parked in `work_available.wait()` to wake up
///   and notice the `destroy` flag at all, regardless of queue state, or it
///   (and the chain of wakeups the other workers rely on to exit) never
///   starts and `WorkQueue::destroy`'s final `join()` hangs forever.
/// - The wait loops on the predicate instead of a single unconditional
///   `.wait()` call, so a queue that finishes between the nudge and the
///   first park doesn't leave us waiting on a signal nobody will send again.
///
/// The caller holds the lock on entry; this releases it before returning.
fn drain(shared: &Arc<Shared>, mut state: MutexGuard<'_, State>) {
    state.waiters += 1;
    shared.work_available.notify_one();
    while !(state.entries.is_empty() && state.active == 0) {
        shared.queue_empty.wait(&mut state);
    }
    state.waiters -= 1;
    trace!("work queue: drain barrier returned");
}

fn worker_loop(shared: Arc<Shared>) {
    let mut state = shared.state.lock();
    loop {
        if state.destroy {
            break;
        }
        let has_work = !state.entries.is_empty();
        let under_target = state.active < state.target;
        if has_work && under_target {
            let task = state.entries.pop_front().expect("checked non-empty above");
            state.active += 1;
            MutexGuard::unlocked(&mut state, || {
                task(true);
            });
            state.active -= 1;
            if state.destroy {
                break;
            }
            if state.entries.is_empty() && state.active == 0 {
                shared.queue_empty.notify_all();
            }
        } else {
            if state.destroy {
                break;
            }
            state.waiting += 1;
            shared.work_available.wait(&mut state);
            state.waiting -= 1;
        }
    }

    if state.active == 0 && state.waiting == 0 {
        let remaining = std::mem::take(&mut state.entries);
        MutexGuard::unlocked(&mut state, || {
            for task in remaining {
                task(false);
            }
        });
        shared.queue_empty.notify_all();
    } else {
        shared.work_available.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn single_task_drain_stress() {
        for i in 0..500 {
            let q = WorkQueue::new();
            q.start(4).unwrap();
            let ran = Arc::new(AtomicUsize::new(0));
            let r = Arc::clone(&ran);
            q.add(Box::new(move |run| {
                if run {
                    r.fetch_add(1, Ordering::SeqCst);
                }
            }));
            q.wait();
            assert_eq!(ran.load(Ordering::SeqCst), 1, "iteration {i}");
            q.destroy();
        }
    }

    #[test]
    fn runs_every_task_exactly_once() {
        let q = WorkQueue::new();
        q.start(4).unwrap();
        let ran = Arc::new(AtomicUsize::new(0));
        for _ in 0..100 {
            let ran = Arc::clone(&ran);
            q.add(Box::new(move |run| {
                if run {
                    ran.fetch_add(1, Ordering::SeqCst);
                }
            }));
        }
        q.wait();
        assert_eq!(ran.load(Ordering::SeqCst), 100);
        q.destroy();
    }

    #[test]
    fn destroy_reclaims_pending_tasks() {
        let q = WorkQueue::new();
        // Single worker, large batch: plenty will still be pending when we destroy.
        q.start(1).unwrap();
        let reclaimed = Arc::new(AtomicUsize::new(0));
        let executed = Arc::new(AtomicUsize::new(0));
        for _ in 0..1000 {
            let reclaimed = Arc::clone(&reclaimed);
            let executed = Arc::clone(&executed);
            q.add(Box::new(move |run| {
                if run {
                    executed.fetch_add(1, Ordering::SeqCst);
                } else {
                    reclaimed.fetch_add(1, Ordering::SeqCst);
                }
            }));
        }
        q.destroy();
        assert_eq!(
            executed.load(Ordering::SeqCst) + reclaimed.load(Ordering::SeqCst),
            1000
        );
    }

    #[test]
    fn wait_is_a_reusable_barrier() {
        let q = WorkQueue::new();
        q.start(2).unwrap();
        let total = Arc::new(AtomicUsize::new(0));
        for round in 0..3 {
            for _ in 0..10 {
                let total = Arc::clone(&total);
                q.add(Box::new(move |_| {
                    total.fetch_add(1, Ordering::SeqCst);
                }));
            }
            q.wait();
            assert_eq!(total.load(Ordering::SeqCst), (round + 1) * 10);
        }
        q.destroy();
    }

    #[test]
    fn start_is_one_shot() {
        let q = WorkQueue::new();
        assert_eq!(q.start(4).unwrap(), 4);
        assert_eq!(q.start(4).unwrap(), 4);
        q.destroy();
    }
}
