//! Progress state published by the transfer worker.

use ferry_core::{Action, TransferError, TransferResult};
use ferry_ops::StepObserver;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::Phase;

/// Snapshot of a running transfer.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferProgress {
    /// Steps fully completed so far.
    pub completed_steps: usize,
    /// Fraction of the current step already processed. Stays below 1 except
    /// between a step's last tick and its completion, when it is folded into
    /// `completed_steps` and reset to 0.
    pub partial: f64,
    /// Number of counted steps in the plan.
    pub steps_count: usize,
    /// Localized description of what the worker is doing.
    pub status: String,
}

impl TransferProgress {
    pub(crate) fn new(steps_count: usize, status: String) -> Self {
        Self {
            completed_steps: 0,
            partial: 0.0,
            steps_count,
            status,
        }
    }

    /// Reported progress, in `[0, steps_count]`.
    pub fn value(&self) -> f64 {
        (self.completed_steps as f64 + self.partial).min(self.steps_count as f64)
    }

    /// Progress normalized to `[0, 1]`, or `None` when the plan has no
    /// counted steps and progress is indeterminate.
    pub fn fraction(&self) -> Option<f64> {
        if self.steps_count == 0 {
            return None;
        }
        Some((self.value() / self.steps_count as f64).clamp(0.0, 1.0))
    }
}

/// Fine-grained notifications emitted while a plan runs.
#[derive(Debug, Clone, PartialEq)]
pub enum TransferEvent {
    /// A step resolved its paths and is about to run.
    StepStarted {
        phase: Phase,
        index: usize,
        action: Action,
        total_size: u64,
    },
    /// Reported progress changed.
    Progress(f64),
    /// A step ran to completion.
    StepFinished {
        phase: Phase,
        index: usize,
        action: Action,
    },
}

/// Single writer of the progress state.
#[derive(Debug)]
pub(crate) struct ProgressPublisher {
    state: watch::Sender<TransferProgress>,
    events: Option<mpsc::UnboundedSender<TransferEvent>>,
    bytes_processed: u64,
}

impl ProgressPublisher {
    pub fn new(
        state: watch::Sender<TransferProgress>,
        events: Option<mpsc::UnboundedSender<TransferEvent>>,
    ) -> Self {
        Self {
            state,
            events,
            bytes_processed: 0,
        }
    }

    pub fn set_status(&self, status: String) {
        self.state.send_modify(|p| p.status = status);
    }

    pub fn begin_step(&self, phase: Phase, index: usize, action: Action, total_size: u64) {
        self.state.send_modify(|p| p.partial = 0.0);
        self.emit(TransferEvent::StepStarted {
            phase,
            index,
            action,
            total_size,
        });
    }

    /// Record `bytes` processed out of a step of `total_size` bytes.
    pub fn advance(&mut self, bytes: u64, total_size: u64) {
        self.bytes_processed += bytes;
        if total_size == 0 || bytes == 0 {
            return;
        }

        let delta = bytes as f64 / total_size as f64;
        self.state
            .send_modify(|p| p.partial = (p.partial + delta).min(1.0));
        self.emit_progress();
    }

    pub fn finish_step(&self, phase: Phase, index: usize, action: Action) {
        self.emit(TransferEvent::StepFinished {
            phase,
            index,
            action,
        });
        if action.is_immediate() {
            return;
        }

        self.state.send_modify(|p| {
            p.completed_steps = (p.completed_steps + 1).min(p.steps_count);
            p.partial = 0.0;
        });
        self.emit_progress();
    }

    /// Move to the start of the cleanup phase, whatever the main phase did.
    pub fn finish_main_phase(&self, main_steps_count: usize) {
        self.state.send_modify(|p| {
            p.completed_steps = main_steps_count.min(p.steps_count);
            p.partial = 0.0;
        });
        self.emit_progress();
    }

    pub fn completed_steps(&self) -> usize {
        self.state.borrow().completed_steps
    }

    pub fn bytes_processed(&self) -> u64 {
        self.bytes_processed
    }

    fn emit_progress(&self) {
        let value = self.state.borrow().value();
        self.emit(TransferEvent::Progress(value));
    }

    fn emit(&self, event: TransferEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }
}

/// Bridges one running step to the publisher and the cancellation token.
pub(crate) struct StepTracker<'a> {
    pub publisher: &'a mut ProgressPublisher,
    pub cancel: &'a CancellationToken,
    pub cancellable: bool,
    pub total_size: u64,
}

impl StepObserver for StepTracker<'_> {
    fn checkpoint(&mut self) -> TransferResult<()> {
        if self.cancellable && self.cancel.is_cancelled() {
            return Err(TransferError::Cancelled);
        }
        Ok(())
    }

    fn advance(&mut self, bytes: u64) {
        self.publisher.advance(bytes, self.total_size);
    }
}
