//! The single-worker FIFO queue in front of the [`ActionProcessor`].
//!
//! Producers push jobs into an unbounded channel; one worker task takes
//! them in arrival order and runs each to completion before taking the
//! next. Two narrated actions therefore never overlap, at the cost of a
//! slow completion delaying everyone behind it.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use lifegame_types::PlayerId;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::action::{ActionProcessor, PROCESSING_ERROR};
use crate::error::RunnerError;
use crate::llm::Completion;

/// One queued action.
#[derive(Debug)]
pub struct ActionJob {
    /// Who is acting.
    pub player_id: PlayerId,
    /// Display name to register the player with, if new.
    pub display_name: Option<String>,
    /// Handle to register the player with, if new.
    pub handle: Option<String>,
    /// What the player wrote.
    pub text: String,
    reply: oneshot::Sender<String>,
}

/// Receipt for a submitted job.
#[derive(Debug)]
pub struct QueueTicket {
    /// 1-based position at submission time, counting the job in flight.
    pub position: usize,
    /// Resolves to the message to show the player.
    pub reply: oneshot::Receiver<String>,
}

/// Handle for submitting actions to the worker.
#[derive(Debug, Clone)]
pub struct ActionQueue {
    tx: mpsc::UnboundedSender<ActionJob>,
    depth: Arc<AtomicUsize>,
}

impl ActionQueue {
    /// Start the worker. It stops once every `ActionQueue` clone is dropped.
    pub fn spawn<C>(processor: Arc<ActionProcessor<C>>) -> (Self, JoinHandle<()>)
    where
        C: Completion + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let depth = Arc::new(AtomicUsize::new(0));
        let handle = tokio::spawn(run_worker(processor, rx, Arc::clone(&depth)));
        (Self { tx, depth }, handle)
    }

    /// Enqueue an action for `player_id`.
    pub fn submit(
        &self,
        player_id: PlayerId,
        display_name: Option<String>,
        handle: Option<String>,
        text: String,
    ) -> Result<QueueTicket, RunnerError> {
        let (reply, rx) = oneshot::channel();
        let job = ActionJob {
            player_id,
            display_name,
            handle,
            text,
            reply,
        };
        let ahead = self.depth.fetch_add(1, Ordering::SeqCst);
        if self.tx.send(job).is_err() {
            release(&self.depth);
            return Err(RunnerError::QueueClosed);
        }
        let position = ahead.saturating_add(1);
        debug!(player_id = %player_id, position, "action queued");
        Ok(QueueTicket { position, reply: rx })
    }

    /// Jobs waiting or in flight.
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }
}

fn release(depth: &AtomicUsize) {
    let _ = depth.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |d| Some(d.saturating_sub(1)));
}

async fn run_worker<C>(
    processor: Arc<ActionProcessor<C>>,
    mut rx: mpsc::UnboundedReceiver<ActionJob>,
    depth: Arc<AtomicUsize>,
) where
    C: Completion + 'static,
{
    info!("action queue worker started");
    while let Some(job) = rx.recv().await {
        let ActionJob {
            player_id,
            display_name,
            handle,
            text,
            reply,
        } = job;
        debug!(player_id = %player_id, "action dequeued");

        let worker_processor = Arc::clone(&processor);
        let task = tokio::spawn(async move {
            worker_processor
                .process(player_id, display_name.as_deref(), handle.as_deref(), &text)
                .await
        });
        let message = match task.await {
            Ok(message) => message,
            Err(e) => {
                error!(player_id = %player_id, error = %e, "action job aborted");
                format!("{PROCESSING_ERROR}: internal failure")
            }
        };

        release(&depth);
        if reply.send(message).is_err() {
            debug!(player_id = %player_id, "requester went away before the reply");
        }
    }
    info!("action queue worker stopped");
}
