//! Background analysis worker.
//!
//! Frames go through a depth-1 latest-wins [`Slot`]: a frame submitted while
//! another is being analyzed replaces any frame still waiting. Control
//! messages travel on an unbounded channel and are handled before pending
//! frames. Each run snapshots the current parameters, so a run sees either the
//! old or the new values, never a mix.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use common::{Buffer2, Slot};
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::config::Parameters;
use crate::error::ConfigError;
use crate::pipeline::{transition, Analysis, Analyzer, Stage};

#[derive(Debug)]
pub enum WorkerMessage {
    Exit,
    Parameters(Parameters),
}

/// One analyzed frame.
#[derive(Debug, Clone)]
pub struct Report {
    /// Sequence number returned by [`Worker::submit`].
    pub frame_id: u64,
    /// Parameters the run used.
    pub parameters: Arc<Parameters>,
    pub analysis: Arc<Analysis>,
}

pub type ReportCallback = Arc<dyn Fn(Report) + Send + Sync>;

#[derive(Debug)]
struct PendingFrame {
    id: u64,
    frame: Buffer2<f64>,
}

#[derive(Debug, Default)]
struct Counters {
    submitted: AtomicU64,
    dropped: AtomicU64,
}

pub struct Worker {
    thread_handle: Option<JoinHandle<()>>,
    tx: UnboundedSender<WorkerMessage>,
    slot: Arc<Slot<PendingFrame>>,
    notify: Arc<Notify>,
    counters: Arc<Counters>,
}

impl Worker {
    /// Starts the worker on the current tokio runtime.
    pub fn new<Callback>(params: Parameters, callback: Callback) -> Result<Self, ConfigError>
    where
        Callback: Fn(Report) + Send + Sync + 'static,
    {
        params.validate()?;
        let callback: ReportCallback = Arc::new(callback);
        let slot = Arc::new(Slot::new());
        let notify = Arc::new(Notify::new());
        let (tx, rx) = unbounded_channel::<WorkerMessage>();

        let thread_handle = tokio::spawn({
            let slot = Arc::clone(&slot);
            let notify = Arc::clone(&notify);
            async move {
                worker_loop(rx, slot, notify, Arc::new(params), callback).await;
            }
        });

        Ok(Self {
            thread_handle: Some(thread_handle),
            tx,
            slot,
            notify,
            counters: Arc::new(Counters::default()),
        })
    }

    /// Queues a frame, replacing any frame that has not started yet. Returns
    /// the frame's sequence number.
    pub fn submit(&self, frame: Buffer2<f64>) -> u64 {
        let id = self.counters.submitted.fetch_add(1, Ordering::Relaxed) + 1;
        if self.slot.send(PendingFrame { id, frame }) {
            self.counters.dropped.fetch_add(1, Ordering::Relaxed);
            debug!(frame_id = id, "replaced a pending frame");
        }
        self.notify.notify_one();
        id
    }

    /// Validates and installs new parameters for subsequent runs.
    pub fn update_parameters(&self, params: Parameters) -> Result<(), ConfigError> {
        params.validate()?;
        self.send(WorkerMessage::Parameters(params));
        Ok(())
    }

    /// Frames replaced in the slot before they were analyzed.
    pub fn dropped_frames(&self) -> u64 {
        self.counters.dropped.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stops the worker after the run in progress, if any, and waits for it.
    pub async fn exit(&mut self) {
        self.send(WorkerMessage::Exit);
        if let Some(handle) = self.thread_handle.take() {
            if let Err(err) = handle.await {
                error!("Worker task failed to join: {err}");
            }
        }
    }

    /// Asks the worker to stop without waiting for it. Usable outside an async
    /// context.
    pub fn stop(&mut self) {
        self.send(WorkerMessage::Exit);
        self.thread_handle.take();
    }

    fn send(&self, msg: WorkerMessage) {
        if self.tx.send(msg).is_err() {
            error!("Worker is not running; message dropped");
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        if self.thread_handle.is_some() {
            error!("Worker dropped while the task is still running; call Worker::exit() first");
        }
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("running", &self.is_running())
            .field("dropped_frames", &self.dropped_frames())
            .finish()
    }
}

async fn worker_loop(
    mut rx: UnboundedReceiver<WorkerMessage>,
    slot: Arc<Slot<PendingFrame>>,
    notify: Arc<Notify>,
    mut params: Arc<Parameters>,
    callback: ReportCallback,
) {
    'worker: loop {
        tokio::select! {
            biased;

            msg = rx.recv() => {
                let Some(msg) = msg else { break };
                let mut msgs = vec![msg];
                loop {
                    match rx.try_recv() {
                        Ok(msg) => msgs.push(msg),
                        Err(TryRecvError::Empty) => break,
                        Err(TryRecvError::Disconnected) => break 'worker,
                    }
                }
                for msg in msgs {
                    match msg {
                        WorkerMessage::Exit => break 'worker,
                        WorkerMessage::Parameters(new_params) => {
                            debug!(params = %new_params, "parameters updated");
                            params = Arc::new(new_params);
                        }
                    }
                }
            }

            _ = notify.notified() => {
                let Some(pending) = slot.take() else { continue };
                run_frame(pending, Arc::clone(&params), Arc::clone(&callback)).await;
                transition(Stage::Done, Stage::Idle);
            }
        }
    }
    debug!("worker loop finished");
}

async fn run_frame(pending: Arc<PendingFrame>, params: Arc<Parameters>, callback: ReportCallback) {
    let frame_id = pending.id;
    let result = tokio::task::spawn_blocking(move || {
        let analyzer = match Analyzer::from_shared(Arc::clone(&params)) {
            Ok(analyzer) => analyzer,
            Err(err) => {
                error!("Rejected parameters reached the worker: {err}");
                return;
            }
        };
        let analysis = analyzer.analyze(&pending.frame);
        callback(Report {
            frame_id,
            parameters: params,
            analysis: Arc::new(analysis),
        });
    })
    .await;

    if let Err(err) = result {
        error!(frame_id, "Analysis task failed: {err}");
    }
}

#[cfg(test)]
mod tests;
