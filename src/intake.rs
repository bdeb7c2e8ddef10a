//! Intake queue: every photo goes through one worker, one at a time.
//!
//! Concurrent hardware decodes are what knock mobile-class decoders over,
//! so serialization is structural here: submissions are [`ProcessingTicket`]s
//! pushed onto an unbounded FIFO channel, and a single spawned task pops and
//! renders them in order. Submitting never waits; only the returned
//! [`PendingImage`] does.
//!
//! ```text
//! submit ─▶ [ticket][ticket][ticket] ─▶ worker ─▶ select_config ─▶ Renderer
//!                                          └──── reply (oneshot) ◀──┘
//! ```
//!
//! A failed ticket is answered with its error and the worker moves on.
//! There is no cancellation: a dequeued ticket runs to completion.
//!
//! The one-at-a-time guarantee holds per queue. Two queues sharing a
//! [`DegradationState`] share the degraded mode but not the worker, so their
//! renders can overlap. Run one queue per process.
//!
//! [`OrderedBatch`] feeds a long list of files through a queue while keeping
//! only a few inputs in memory at once.

use crate::imaging::{
    DegradationState, EncodedImage, ImageBackend, ImageInput, RenderError, RenderProbe,
    RenderSettings, Renderer, select_config,
};
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

#[derive(Error, Debug)]
pub enum IntakeError {
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("Intake worker stopped before answering")]
    WorkerStopped,
}

impl IntakeError {
    /// True when every tier and the emergency attempt failed.
    pub fn is_processing_failure(&self) -> bool {
        matches!(self, Self::Render(RenderError::ImageProcessingFailed { .. }))
    }
}

type Reply = Result<EncodedImage, IntakeError>;

/// One queued request.
struct ProcessingTicket {
    id: u64,
    input: ImageInput,
    reply: oneshot::Sender<Reply>,
}

/// Result of a submission, resolved when the worker reaches it.
pub struct PendingImage {
    receiver: oneshot::Receiver<Reply>,
}

impl Future for PendingImage {
    type Output = Reply;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(IntakeError::WorkerStopped)))
    }
}

pub struct IntakeQueue {
    sender: mpsc::UnboundedSender<ProcessingTicket>,
    worker: JoinHandle<()>,
    state: Arc<DegradationState>,
    probe: Arc<RenderProbe>,
    next_id: std::sync::atomic::AtomicU64,
}

impl IntakeQueue {
    /// Start a queue with a fresh degradation state.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(backend: Arc<dyn ImageBackend>, settings: RenderSettings) -> Self {
        Self::with_state(backend, settings, Arc::new(DegradationState::new()))
    }

    /// Start a queue sharing an existing degradation state.
    ///
    /// Only the degraded mode is shared. This queue still has its own worker,
    /// so renders are serialized against this queue alone.
    pub fn with_state(
        backend: Arc<dyn ImageBackend>,
        settings: RenderSettings,
        state: Arc<DegradationState>,
    ) -> Self {
        let renderer = Renderer::new(backend, Arc::clone(&state), settings);
        let probe = Arc::clone(renderer.probe());
        let (sender, receiver) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_worker(renderer, receiver));

        Self {
            sender,
            worker,
            state,
            probe,
            next_id: std::sync::atomic::AtomicU64::new(1),
        }
    }

    /// Enqueue `input` without waiting for it to be processed.
    pub fn submit(&self, input: ImageInput) -> PendingImage {
        let (reply, receiver) = oneshot::channel();
        let id = self
            .next_id
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        log::debug!("Ticket {id} queued ({} bytes)", input.len());

        // A closed channel drops the ticket, and with it the reply sender,
        // so the pending image resolves to WorkerStopped.
        let _ = self.sender.send(ProcessingTicket { id, input, reply });
        PendingImage { receiver }
    }

    /// Process one photo: enqueue it and wait for its turn and result.
    pub async fn process_image(&self, input: ImageInput) -> Result<EncodedImage, IntakeError> {
        self.submit(input).await
    }

    pub fn degradation(&self) -> &DegradationState {
        &self.state
    }

    pub fn probe(&self) -> &RenderProbe {
        &self.probe
    }

    /// Stop accepting work and wait until every queued ticket is answered.
    pub async fn shutdown(self) {
        drop(self.sender);
        if let Err(err) = self.worker.await {
            log::error!("Intake worker ended abnormally: {err}");
        }
    }
}

/// In-order submission with a bounded number of outstanding inputs.
///
/// At most `capacity` inputs are queued or rendering at once. Callers read
/// the next input from disk only after [`make_room`] returns, so memory is
/// bounded by the window rather than by the batch.
///
/// [`make_room`]: OrderedBatch::make_room
pub struct OrderedBatch<'q, T> {
    queue: &'q IntakeQueue,
    capacity: usize,
    in_flight: VecDeque<(T, PendingImage)>,
}

impl<'q, T> OrderedBatch<'q, T> {
    /// `capacity` is clamped to at least 1.
    pub fn new(queue: &'q IntakeQueue, capacity: usize) -> Self {
        Self {
            queue,
            capacity: capacity.max(1),
            in_flight: VecDeque::new(),
        }
    }

    /// Wait for the oldest result if the batch is full.
    pub async fn make_room(&mut self) -> Option<(T, Reply)> {
        if self.in_flight.len() < self.capacity {
            return None;
        }
        self.next().await
    }

    /// Submit `input`, tagged so its result can be matched up later.
    pub fn push(&mut self, tag: T, input: ImageInput) {
        let pending = self.queue.submit(input);
        self.in_flight.push_back((tag, pending));
    }

    /// Oldest outstanding result, or `None` once drained.
    pub async fn next(&mut self) -> Option<(T, Reply)> {
        let (tag, pending) = self.in_flight.pop_front()?;
        Some((tag, pending.await))
    }

    pub fn len(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_empty(&self) -> bool {
        self.in_flight.is_empty()
    }
}

async fn run_worker(renderer: Renderer, mut receiver: mpsc::UnboundedReceiver<ProcessingTicket>) {
    while let Some(ProcessingTicket { id, input, reply }) = receiver.recv().await {
        let config = select_config(input.len(), renderer.degradation().is_unstable());
        log::debug!(
            "Ticket {id}: {} strategy, tiers {:?}, quality {}",
            config.label,
            config.tiers,
            config.quality.value()
        );

        let result = renderer.render(&input, &config).await.map_err(IntakeError::from);
        if let Err(err) = &result {
            log::error!("Ticket {id} failed: {err}");
        }
        if reply.send(result).is_err() {
            log::debug!("Ticket {id} finished after its caller went away");
        }
    }
    log::debug!("Intake queue closed");
}
