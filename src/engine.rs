//! Engine façade: feed input specifications, receive results in input order.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, Semaphore};
use tracing::debug;

use crate::error::EngineError;
use crate::node::{File, Node};
use crate::queue;
use crate::walk::{Sched, Walker};

/// The checksum engine.
///
/// Inputs appear in the output in the exact order supplied, while the work
/// itself overlaps freely under a CPU-permit semaphore sized to the hardware
/// parallelism by default. `no_dirs` rejects directories with a distinguished
/// error, for callers that only want simple per-file digests.
pub struct Sum {
    sem: Arc<Semaphore>,
    no_dirs: bool,
}

impl Sum {
    pub fn new(no_dirs: bool) -> Sum {
        Sum {
            sem: Arc::new(Semaphore::new(num_cpus::get())),
            no_dirs,
        }
    }

    /// Use a caller-provided semaphore instead of the hardware-sized default.
    pub fn with_semaphore(no_dirs: bool, sem: Arc<Semaphore>) -> Sum {
        Sum { sem, no_dirs }
    }

    /// Walk each input from the stream, invoking `f` per result in input
    /// order. If `f` returns an error, iteration stops and the error is
    /// returned; in-flight walks run to completion in the background.
    pub async fn each_stream<F>(
        &self,
        mut inputs: mpsc::Receiver<File>,
        mut f: F,
    ) -> Result<(), EngineError>
    where
        F: FnMut(Node) -> Result<(), EngineError>,
    {
        let (slots, mut results) = queue::ordered();
        let walker = Arc::new(Walker {
            sem: Arc::clone(&self.sem),
            no_dirs: self.no_dirs,
        });

        let producer = tokio::spawn(async move {
            while let Some(file) = inputs.recv().await {
                let slot = match slots.enqueue() {
                    Ok(slot) => slot,
                    Err(_) => break,
                };
                let (sched_tx, sched_rx) = oneshot::channel();
                let walker = Arc::clone(&walker);
                debug!(path = %file.path.display(), "input scheduled");
                tokio::spawn(async move {
                    let node = walker.walk(file, false, Sched::new(sched_tx)).await;
                    let _ = slot.send(node);
                });
                // Advance to the next input as soon as this one has scheduled
                // all of its descendant work, not when it has finished.
                let _ = sched_rx.await;
            }
        });

        let mut result = Ok(());
        while let Some(node) = results.dequeue().await {
            if let Err(e) = f(node) {
                result = Err(e);
                break;
            }
        }
        drop(results);
        let _ = producer.await;
        result
    }

    /// [`Sum::each_stream`] over a slice of inputs.
    pub async fn each_list<F>(&self, files: Vec<File>, f: F) -> Result<(), EngineError>
    where
        F: FnMut(Node) -> Result<(), EngineError>,
    {
        let (tx, rx) = mpsc::channel(1);
        let feeder = tokio::spawn(async move {
            for file in files {
                if tx.send(file).await.is_err() {
                    return;
                }
            }
        });
        let result = self.each_stream(rx, f).await;
        let _ = feeder.await;
        result
    }

    /// Gather successful nodes, stopping at the first error.
    pub async fn collect(&self, files: Vec<File>) -> Result<Vec<Node>, EngineError> {
        let mut nodes = Vec::new();
        self.each_list(files, |mut node| {
            if let Some(err) = node.err.take() {
                return Err(err);
            }
            nodes.push(node);
            Ok(())
        })
        .await?;
        Ok(nodes)
    }
}

impl Default for Sum {
    fn default() -> Sum {
        Sum::new(false)
    }
}
