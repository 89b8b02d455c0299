//! The transfer engine and the handle to a running transfer.

use std::sync::Arc;
use std::time::Instant;

use ferry_core::{
    format_size, summarize_names, MessageSource, TransferConfig, TransferError, TransferResult,
    PREPARING_KEY,
};
use ferry_ops::execute_action;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::plan::ResolvedStep;
use crate::progress::{ProgressPublisher, StepTracker};
use crate::sink::dispatch;
use crate::{
    CompletionSink, Phase, TaskSpec, TransferEvent, TransferOutcome, TransferPlan,
    TransferProgress, TransferSummary,
};

/// Runs transfer plans on background workers.
#[derive(Clone)]
pub struct TransferEngine {
    config: TransferConfig,
    messages: Arc<dyn MessageSource>,
}

impl TransferEngine {
    /// Create an engine with default configuration.
    pub fn new(messages: impl MessageSource + 'static) -> Self {
        Self {
            config: TransferConfig::default(),
            messages: Arc::new(messages),
        }
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: TransferConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &TransferConfig {
        &self.config
    }

    /// Start running `plan`. The outcome goes to `sink` once both phases end.
    ///
    /// If a provider or action panics, the worker task panics with it and
    /// `sink` is dropped without being called; [`TransferHandle::wait`]
    /// reports the panic as [`TransferError::Worker`].
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self, plan: TransferPlan, sink: impl CompletionSink) -> TransferHandle {
        self.spawn(plan, Box::new(sink), CancellationToken::new(), None)
    }

    /// Like [`start`](Self::start), cancelled through a caller-owned token.
    pub fn start_cancellable(
        &self,
        plan: TransferPlan,
        sink: impl CompletionSink,
        cancel: CancellationToken,
    ) -> TransferHandle {
        self.spawn(plan, Box::new(sink), cancel, None)
    }

    /// Like [`start`](Self::start), also streaming [`TransferEvent`]s.
    pub fn start_with_events(
        &self,
        plan: TransferPlan,
        sink: impl CompletionSink,
    ) -> (TransferHandle, mpsc::UnboundedReceiver<TransferEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = self.spawn(plan, Box::new(sink), CancellationToken::new(), Some(tx));
        (handle, rx)
    }

    /// Run `plan` to completion and return its outcome.
    ///
    /// A panic in the worker resumes on the caller's task.
    pub async fn run(&self, plan: TransferPlan) -> TransferOutcome {
        let (tx, rx) = oneshot::channel();
        let handle = self.start(plan, tx);

        match rx.await {
            Ok(outcome) => outcome,
            Err(_) => match handle.join.await {
                Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
                Err(e) => TransferOutcome::Failure(TransferError::Worker {
                    message: e.to_string(),
                }),
                Ok(()) => TransferOutcome::Failure(TransferError::Worker {
                    message: "worker ended without an outcome".to_string(),
                }),
            },
        }
    }

    fn spawn(
        &self,
        plan: TransferPlan,
        sink: Box<dyn CompletionSink>,
        cancel: CancellationToken,
        events: Option<mpsc::UnboundedSender<TransferEvent>>,
    ) -> TransferHandle {
        let steps_count = plan.steps_count();
        let preparing = self.messages.format(PREPARING_KEY, &[]);
        let (state_tx, state_rx) = watch::channel(TransferProgress::new(steps_count, preparing));

        let worker = Worker {
            plan,
            runner: StepRunner {
                config: self.config.clone(),
                messages: self.messages.clone(),
                cancel: cancel.clone(),
                publisher: ProgressPublisher::new(state_tx, events),
            },
        };

        let join = tokio::spawn(async move {
            let outcome = worker.run().await;
            dispatch(sink, outcome);
        });

        TransferHandle {
            cancel,
            state: state_rx,
            steps_count,
            join,
        }
    }
}

/// Handle to a running transfer.
#[derive(Debug)]
pub struct TransferHandle {
    cancel: CancellationToken,
    state: watch::Receiver<TransferProgress>,
    steps_count: usize,
    join: JoinHandle<()>,
}

impl TransferHandle {
    /// Request cancellation. The worker notices at its next checkpoint.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether cancellation has been requested.
    pub fn is_cancel_requested(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Token that cancels this transfer.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Number of counted steps in the plan.
    pub fn steps_count(&self) -> usize {
        self.steps_count
    }

    /// Reported progress, in `[0, steps_count]`.
    pub fn progress(&self) -> f64 {
        self.state.borrow().value()
    }

    /// Current localized status message.
    pub fn status_message(&self) -> String {
        self.state.borrow().status.clone()
    }

    /// Current progress state.
    pub fn snapshot(&self) -> TransferProgress {
        self.state.borrow().clone()
    }

    /// A receiver notified whenever the progress state changes.
    pub fn subscribe(&self) -> watch::Receiver<TransferProgress> {
        self.state.clone()
    }

    /// Whether the worker has finished and dispatched its outcome.
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the worker to finish.
    pub async fn wait(self) -> TransferResult<()> {
        self.join.await.map_err(|e| TransferError::Worker {
            message: e.to_string(),
        })
    }
}

struct Worker {
    plan: TransferPlan,
    runner: StepRunner,
}

impl Worker {
    async fn run(self) -> TransferOutcome {
        let started = Instant::now();
        let cancel = self.runner.cancel.clone();
        let delay = self.runner.config.start_delay;

        tracing::info!(
            steps = self.plan.steps_count(),
            main = self.plan.main_steps().len(),
            cleanup = self.plan.cleanup_steps().len(),
            "transfer started"
        );

        if !delay.is_zero() {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancel.cancelled() => {}
            }
        }

        let report = match tokio::task::spawn_blocking(move || self.execute()).await {
            Ok(report) => report,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => RunReport {
                main: Ok(()),
                cleanup: Err(TransferError::Worker {
                    message: e.to_string(),
                }),
                steps_completed: 0,
                bytes_processed: 0,
            },
        };

        let summary = TransferSummary {
            steps_completed: report.steps_completed,
            bytes_processed: report.bytes_processed,
            elapsed: started.elapsed(),
        };
        let outcome = select_outcome(report.main, report.cleanup, cancel.is_cancelled(), summary);

        match &outcome {
            TransferOutcome::Success(summary) => tracing::info!(
                steps = summary.steps_completed,
                bytes = summary.bytes_processed,
                "transfer succeeded"
            ),
            TransferOutcome::Cancelled => tracing::info!("transfer cancelled"),
            TransferOutcome::Failure(error) => tracing::info!(%error, "transfer failed"),
        }
        outcome
    }

    /// Runs on the blocking pool: main phase, then cleanup phase.
    fn execute(mut self) -> RunReport {
        let preparing = self.runner.messages.format(PREPARING_KEY, &[]);
        self.runner.publisher.set_status(preparing);

        let main = self.runner.run_phase(Phase::Main, self.plan.main_steps());
        if let Err(error) = &main {
            tracing::debug!(%error, "main phase aborted");
        }

        self.runner
            .publisher
            .finish_main_phase(self.plan.main_steps_count());

        let cleanup = self
            .runner
            .run_phase(Phase::Cleanup, self.plan.cleanup_steps());

        RunReport {
            main,
            cleanup,
            steps_completed: self.runner.publisher.completed_steps(),
            bytes_processed: self.runner.publisher.bytes_processed(),
        }
    }
}

struct RunReport {
    main: TransferResult<()>,
    cleanup: TransferResult<()>,
    steps_completed: usize,
    bytes_processed: u64,
}

struct StepRunner {
    config: TransferConfig,
    messages: Arc<dyn MessageSource>,
    cancel: CancellationToken,
    publisher: ProgressPublisher,
}

impl StepRunner {
    /// Run steps in order, stopping at the first error.
    fn run_phase(&mut self, phase: Phase, steps: &[TaskSpec]) -> TransferResult<()> {
        for (index, spec) in steps.iter().enumerate() {
            self.run_step(phase, index, spec)?;
        }
        Ok(())
    }

    fn run_step(&mut self, phase: Phase, index: usize, spec: &TaskSpec) -> TransferResult<()> {
        self.publisher
            .set_status(self.messages.format(PREPARING_KEY, &[]));

        let step = spec.resolve();
        self.publisher.set_status(self.status_message(&step));

        tracing::debug!(
            %phase,
            index,
            action = %step.action,
            sources = step.sources.len(),
            total_size = step.total_size,
            "step started"
        );
        self.publisher
            .begin_step(phase, index, step.action, step.total_size);

        let mut tracker = StepTracker {
            publisher: &mut self.publisher,
            cancel: &self.cancel,
            cancellable: phase == Phase::Main || self.config.cancel_cleanup,
            total_size: step.total_size,
        };
        execute_action(
            step.action,
            &step.sources,
            step.target.as_deref(),
            &mut tracker,
        )?;

        self.publisher.finish_step(phase, index, step.action);
        tracing::debug!(%phase, index, action = %step.action, "step finished");
        Ok(())
    }

    fn status_message(&self, step: &ResolvedStep) -> String {
        let sources = summarize_names(&step.sources, self.config.summary_max_chars);
        let size = format_size(step.total_size, self.config.size_format);
        let target = step
            .target
            .as_deref()
            .and_then(|t| t.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        self.messages
            .format(&step.action.message_key(), &[&sources, &size, &target])
    }
}

/// Pick the single outcome of a run.
///
/// Cancellation wins over everything. Otherwise a cleanup failure replaces a
/// main-phase failure, and a run without failures succeeds.
fn select_outcome(
    main: TransferResult<()>,
    cleanup: TransferResult<()>,
    cancelled: bool,
    summary: TransferSummary,
) -> TransferOutcome {
    let main_failure = main.err().filter(|e| !e.is_cancelled());
    let cleanup_failure = cleanup.err().filter(|e| !e.is_cancelled());

    let failure = match (main_failure, cleanup_failure) {
        (Some(masked), Some(cleanup)) => {
            tracing::warn!(%masked, %cleanup, "cleanup failure replaces main phase failure");
            Some(cleanup)
        }
        (main, cleanup) => cleanup.or(main),
    };

    if cancelled {
        TransferOutcome::Cancelled
    } else if let Some(error) = failure {
        TransferOutcome::Failure(error)
    } else {
        TransferOutcome::Success(summary)
    }
}
