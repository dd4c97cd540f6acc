//! Ordered result delivery.
//!
//! A single-producer, single-consumer FIFO of one-shot cells. The producer
//! enqueues a cell for each input before its work starts; workers fill cells
//! whenever they finish; the consumer dequeues cells in enqueue order and
//! blocks only on the cell currently at the head. This preserves input-order
//! delivery while the work itself completes out of order, without a global
//! sort.
//!
//! Enqueue and dequeue may run concurrently with each other, but neither is
//! reentrant against itself. Dropping the sender closes the queue: already
//! enqueued cells drain first, then `dequeue` returns `None`.

use tokio::sync::{mpsc, oneshot};

pub struct OrderedSender<T> {
    slots: mpsc::UnboundedSender<oneshot::Receiver<T>>,
}

pub struct OrderedReceiver<T> {
    slots: mpsc::UnboundedReceiver<oneshot::Receiver<T>>,
}

/// Create the two halves of an ordered queue.
pub fn ordered<T>() -> (OrderedSender<T>, OrderedReceiver<T>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (OrderedSender { slots: tx }, OrderedReceiver { slots: rx })
}

impl<T> OrderedSender<T> {
    /// Reserve the next output slot. The returned sender fills it; enqueue
    /// fails only after the consumer has gone away.
    pub fn enqueue(&self) -> Result<oneshot::Sender<T>, QueueClosed> {
        let (tx, rx) = oneshot::channel();
        self.slots.send(rx).map_err(|_| QueueClosed)?;
        Ok(tx)
    }
}

impl<T> OrderedReceiver<T> {
    /// Await the value at the head of the queue. Slots whose producer was
    /// dropped without sending are skipped. Returns `None` once the queue is
    /// closed and drained.
    pub async fn dequeue(&mut self) -> Option<T> {
        loop {
            let slot = self.slots.recv().await?;
            if let Ok(value) = slot.await {
                return Some(value);
            }
        }
    }
}

/// The consumer side of the queue has been dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueClosed;
