use crate::error::{Result, ScanError};
use std::collections::{HashMap, VecDeque};
use tokio::sync::{watch, Mutex, Notify};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};
use url::Url;

pub type MessageId = u64;

/// A single page to fetch and parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub url: Url,
}

impl Job {
    pub fn new(url: Url) -> Self {
        Self { url }
    }
}

/// Queue envelope around a [`Job`].
///
/// Ids are handed out in enqueue order and never reused. `attempts` counts how
/// many times the message has been sent back with [`WorkQueue::error`].
#[derive(Debug, Clone)]
pub struct Message {
    pub id: MessageId,
    pub job: Job,
    pub attempts: u32,
}

#[derive(Default)]
struct QueueState {
    next_id: MessageId,
    pending: VecDeque<Message>,
    leased: HashMap<MessageId, Message>,
}

impl QueueState {
    fn is_idle(&self) -> bool {
        self.pending.is_empty() && self.leased.is_empty()
    }
}

/// FIFO work queue with lease/ack semantics and drain detection.
///
/// A message is either pending or leased. Leased messages must come back
/// through [`delete`](Self::delete) or [`error`](Self::error). The first time
/// both sets are empty after a delete, the queue latches its drained flag,
/// which releases every [`wait`](Self::wait) caller and makes
/// [`next`](Self::next) return `None`.
pub struct WorkQueue {
    state: Mutex<QueueState>,
    available: Notify,
    drained: watch::Sender<bool>,
    cancel: CancellationToken,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self::with_cancellation(CancellationToken::new())
    }

    pub fn with_cancellation(cancel: CancellationToken) -> Self {
        let (drained, _) = watch::channel(false);
        Self {
            state: Mutex::new(QueueState::default()),
            available: Notify::new(),
            drained,
            cancel,
        }
    }

    /// Enqueue a job at the tail. The queue is unbounded, so this never drops work.
    pub async fn add(&self, job: Job) -> MessageId {
        let id = {
            let mut state = self.state.lock().await;
            let id = state.next_id;
            state.next_id += 1;
            trace!("Queued message {} for {}", id, job.url);
            state.pending.push_back(Message {
                id,
                job,
                attempts: 0,
            });
            id
        };
        self.available.notify_one();
        id
    }

    /// Lease the oldest pending message.
    ///
    /// Suspends until a message is available. Returns `None` once the queue
    /// has drained or the cancellation token fires.
    pub async fn next(&self) -> Option<Message> {
        loop {
            if self.cancel.is_cancelled() {
                return None;
            }

            let notified = self.available.notified();
            tokio::pin!(notified);
            // Register before looking at the state so a notify between the
            // check and the await is not lost.
            notified.as_mut().enable();

            {
                let mut state = self.state.lock().await;
                if let Some(message) = state.pending.pop_front() {
                    state.leased.insert(message.id, message.clone());
                    return Some(message);
                }
            }

            if self.is_drained() {
                return None;
            }

            tokio::select! {
                _ = &mut notified => {}
                _ = self.cancel.cancelled() => return None,
            }
        }
    }

    /// Acknowledge a leased message.
    pub async fn delete(&self, message: Message) -> Result<()> {
        let drained = {
            let mut state = self.state.lock().await;
            if state.leased.remove(&message.id).is_none() {
                return Err(ScanError::UnknownLease(message.id));
            }
            state.is_idle()
        };

        if drained {
            debug!("Queue drained after message {}", message.id);
            self.drained.send_replace(true);
            self.available.notify_waiters();
        }
        Ok(())
    }

    /// Return a leased message to the tail of the queue for another attempt.
    pub async fn error(&self, message: Message) -> Result<()> {
        {
            let mut state = self.state.lock().await;
            let mut message = state
                .leased
                .remove(&message.id)
                .ok_or(ScanError::UnknownLease(message.id))?;
            message.attempts += 1;
            trace!("Requeued message {} (attempt {})", message.id, message.attempts);
            state.pending.push_back(message);
        }
        self.available.notify_one();
        Ok(())
    }

    /// Suspend until the queue has drained. Returns immediately if it already has.
    pub async fn wait(&self) {
        let mut rx = self.drained.subscribe();
        // The sender lives as long as `self`, so this only returns once drained.
        let _ = rx.wait_for(|drained| *drained).await;
    }

    pub fn is_drained(&self) -> bool {
        *self.drained.borrow()
    }

    pub async fn pending_len(&self) -> usize {
        self.state.lock().await.pending.len()
    }

    pub async fn leased_len(&self) -> usize {
        self.state.lock().await.leased.len()
    }
}

impl Default for WorkQueue {
    fn default() -> Self {
        Self::new()
    }
}
