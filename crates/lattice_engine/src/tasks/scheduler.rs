//! Persistent worker-thread pool

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::tasks::MtQueue;

/// A unit of background work.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

enum WorkerMessage {
    Run(Task),
    Shutdown,
}

/// Pool of persistent worker threads fed by an [`MtQueue`].
///
/// Tasks are fire-and-forget: the scheduler never learns whether a task
/// succeeded, and there is no cancellation or priority. A task that
/// panics takes its worker thread down with it.
pub struct TaskScheduler {
    queue: MtQueue<WorkerMessage>,
    workers: Vec<Worker>,
    /// Tasks submitted but not yet finished executing (queued + running).
    pending: Arc<AtomicUsize>,
    /// Workers currently inside a task body.
    busy: Arc<AtomicUsize>,
    running: Arc<AtomicBool>,
}

struct Worker {
    id: usize,
    thread: JoinHandle<()>,
}

impl TaskScheduler {
    /// Create a scheduler with no workers; call [`run`](Self::run) to
    /// start them.
    #[must_use]
    pub fn new() -> Self {
        Self {
            queue: MtQueue::new(),
            workers: Vec::new(),
            pending: Arc::new(AtomicUsize::new(0)),
            busy: Arc::new(AtomicUsize::new(0)),
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Spawn `count` persistent workers.
    pub fn run(&mut self, count: usize) {
        for id in self.workers.len()..self.workers.len() + count {
            let queue = self.queue.clone();
            let pending = Arc::clone(&self.pending);
            let busy = Arc::clone(&self.busy);
            let running = Arc::clone(&self.running);

            let thread = thread::spawn(move || loop {
                match queue.pop() {
                    WorkerMessage::Run(task) => {
                        if running.load(Ordering::Acquire) {
                            busy.fetch_add(1, Ordering::AcqRel);
                            task();
                            busy.fetch_sub(1, Ordering::AcqRel);
                        }
                        pending.fetch_sub(1, Ordering::AcqRel);
                    }
                    WorkerMessage::Shutdown => break,
                }
            });

            self.workers.push(Worker { id, thread });
        }
        log::info!("task scheduler running {} workers", self.workers.len());
    }

    /// Enqueue a task and wake one worker.
    pub fn submit<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.pending.fetch_add(1, Ordering::AcqRel);
        self.queue.push(WorkerMessage::Run(Box::new(task)));
    }

    /// Number of spawned workers.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Racy snapshot of workers currently executing a task.
    #[must_use]
    pub fn busy_workers(&self) -> usize {
        self.busy.load(Ordering::Acquire)
    }

    /// Block until the queued-task count and the busy-worker count are
    /// simultaneously zero.
    ///
    /// Implemented as a short-sleep poll loop over a single counter
    /// that covers both queued and in-flight tasks.
    pub fn wait_while_busy(&self) {
        while self.pending.load(Ordering::Acquire) > 0 {
            thread::sleep(Duration::from_micros(500));
        }
    }

    /// Signal termination and join all workers.
    ///
    /// Workers finish the task they are currently executing; tasks that
    /// are still queued are discarded.
    pub fn stop(&mut self) {
        if self.workers.is_empty() {
            return;
        }
        self.running.store(false, Ordering::Release);
        for _ in 0..self.workers.len() {
            self.queue.push(WorkerMessage::Shutdown);
        }
        for worker in self.workers.drain(..) {
            if worker.thread.join().is_err() {
                log::error!("worker {} panicked", worker.id);
            }
        }
        log::info!("task scheduler stopped");
    }
}

impl Drop for TaskScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

impl Default for TaskScheduler {
    fn default() -> Self {
        Self::new()
    }
}
