// src/crawl/queue.rs
// =============================================================================
// The bounded task queue shared by every worker.
//
// How it works:
// - A bounded tokio mpsc channel holds pending tasks (FIFO)
// - Many workers can pull from it: the receiver sits behind a tokio Mutex,
//   so exactly one waiting worker gets each task
// - An "unfinished" counter goes up on every enqueue and down on every
//   mark_done(). When it reaches zero the crawl is drained: nothing is
//   waiting and nothing is being worked on
//
// The capacity of the channel is the crawl concurrency. That bounds both the
// number of pending tasks and how fast a wide page can flood the crawl.
//
// Rust concepts:
// - Atomics: a lock-free counter shared between tasks
// - tokio::sync::Notify: wake up whoever is waiting in drain()
// - tokio::select!: wait for "a task arrived" OR "the queue was closed"
// =============================================================================

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::{mpsc, Mutex, Notify};

use super::task::Task;
use crate::error::QueueError;

/// Why a non-blocking enqueue didn't go through. The task is handed back.
#[derive(Debug)]
pub enum TryEnqueueError {
    Full(Task),
    Closed(Task),
}

pub struct TaskQueue {
    sender: mpsc::Sender<Task>,
    receiver: Mutex<mpsc::Receiver<Task>>,
    capacity: usize,
    unfinished: AtomicUsize,
    drained: Notify,
    closed: AtomicBool,
    closed_notify: Notify,
}

impl TaskQueue {
    /// Creates a queue that holds at most `capacity` pending tasks.
    ///
    /// A capacity of 0 is bumped to 1 (tokio channels need room for one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, receiver) = mpsc::channel(capacity);

        Self {
            sender,
            receiver: Mutex::new(receiver),
            capacity,
            unfinished: AtomicUsize::new(0),
            drained: Notify::new(),
            closed: AtomicBool::new(false),
            closed_notify: Notify::new(),
        }
    }

    /// Adds a task, waiting while the queue is full.
    pub async fn enqueue(&self, task: Task) -> Result<(), QueueError> {
        if self.is_closed() {
            return Err(QueueError::QueueClosed);
        }

        // Count it before it becomes visible, so a fast worker can't finish
        // it and drive the counter to zero in between
        self.unfinished.fetch_add(1, Ordering::SeqCst);

        let closed = self.closed_notify.notified();
        tokio::pin!(closed);
        closed.as_mut().enable();

        let sent = if self.is_closed() {
            false
        } else {
            tokio::select! {
                result = self.sender.send(task) => result.is_ok(),
                _ = closed => false,
            }
        };

        if !sent {
            self.finish_one();
            return Err(QueueError::QueueClosed);
        }
        Ok(())
    }

    /// Adds a task only if there is room right now.
    pub fn try_enqueue(&self, task: Task) -> Result<(), TryEnqueueError> {
        self.try_send(task, true)
    }

    /// Counts a task a worker is holding on to outside the queue.
    ///
    /// The worker must later either call `mark_done()` for it or hand it to
    /// `try_enqueue_deferred()`.
    pub fn track_deferred(&self) {
        self.unfinished.fetch_add(1, Ordering::SeqCst);
    }

    /// Moves a task counted by `track_deferred()` into the queue.
    pub fn try_enqueue_deferred(&self, task: Task) -> Result<(), TryEnqueueError> {
        self.try_send(task, false)
    }

    fn try_send(&self, task: Task, count_it: bool) -> Result<(), TryEnqueueError> {
        if self.is_closed() {
            return Err(TryEnqueueError::Closed(task));
        }
        if count_it {
            self.unfinished.fetch_add(1, Ordering::SeqCst);
        }

        match self.sender.try_send(task) {
            Ok(()) => Ok(()),
            Err(error) => {
                if count_it {
                    self.finish_one();
                }
                match error {
                    mpsc::error::TrySendError::Full(task) => Err(TryEnqueueError::Full(task)),
                    mpsc::error::TrySendError::Closed(task) => Err(TryEnqueueError::Closed(task)),
                }
            }
        }
    }

    /// Waits for the next task. Returns None once the queue is closed.
    pub async fn dequeue(&self) -> Option<Task> {
        let mut receiver = self.receiver.lock().await;

        let closed = self.closed_notify.notified();
        tokio::pin!(closed);
        closed.as_mut().enable();

        if self.is_closed() {
            return None;
        }

        tokio::select! {
            task = receiver.recv() => task,
            _ = closed => None,
        }
    }

    /// Marks one dequeued (or deferred) task as fully handled.
    pub fn mark_done(&self) -> Result<(), QueueError> {
        let previous = self
            .unfinished
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .map_err(|_| QueueError::TooManyDone)?;

        if previous == 1 {
            self.drained.notify_waiters();
        }
        Ok(())
    }

    fn finish_one(&self) {
        // Only called to undo our own increment, so it can't underflow
        if self.unfinished.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.drained.notify_waiters();
        }
    }

    /// Waits until every enqueued task has been marked done.
    pub async fn drain(&self) {
        loop {
            // Register before checking, so a notify between the check and
            // the await is not lost
            let notified = self.drained.notified();
            if self.unfinished() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Rejects further enqueues and wakes every blocked dequeue/enqueue.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.closed_notify.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Tasks enqueued (or deferred) and not yet marked done
    pub fn unfinished(&self) -> usize {
        self.unfinished.load(Ordering::SeqCst)
    }

    /// Tasks sitting in the channel right now
    pub fn len(&self) -> usize {
        self.capacity - self.sender.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
