//! Completion outcomes and the sinks that receive them.

use std::time::Duration;

use ferry_core::TransferError;
use tokio::sync::oneshot;

/// Values reported with a successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferSummary {
    /// Counted steps completed across both phases.
    pub steps_completed: usize,
    /// Bytes fully processed by progress-reporting steps.
    pub bytes_processed: u64,
    /// Wall time of the run, start delay included.
    pub elapsed: Duration,
}

/// How a run ended.
#[derive(Debug)]
pub enum TransferOutcome {
    /// Every step ran without error.
    Success(TransferSummary),
    /// Cancellation was requested before the run finished.
    Cancelled,
    /// A step failed. When both phases failed, this is the cleanup failure.
    Failure(TransferError),
}

impl TransferOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    /// The failure cause, if any.
    pub fn error(&self) -> Option<&TransferError> {
        match self {
            Self::Failure(error) => Some(error),
            _ => None,
        }
    }
}

/// Receiver of the single outcome of a run.
///
/// Methods take the sink by value, so it is notified at most once. The
/// engine calls it from its own task; sinks that must react elsewhere should
/// forward the outcome, as the [`oneshot::Sender`] implementation does.
pub trait CompletionSink: Send + 'static {
    /// The run succeeded.
    fn success(self: Box<Self>, summary: TransferSummary);

    /// The run failed with `error`.
    fn failure(self: Box<Self>, error: TransferError) {
        let _ = error;
    }

    /// The run was cancelled.
    fn cancelled(self: Box<Self>) {}
}

/// Deliver `outcome` to `sink`.
pub(crate) fn dispatch(sink: Box<dyn CompletionSink>, outcome: TransferOutcome) {
    match outcome {
        TransferOutcome::Success(summary) => sink.success(summary),
        TransferOutcome::Cancelled => sink.cancelled(),
        TransferOutcome::Failure(error) => sink.failure(error),
    }
}

/// Calls a closure when the run ends, however it ended.
pub struct FinishedSink<F>(pub F);

impl<F> CompletionSink for FinishedSink<F>
where
    F: FnOnce() + Send + 'static,
{
    fn success(self: Box<Self>, _summary: TransferSummary) {
        let Self(finished) = *self;
        finished()
    }

    fn failure(self: Box<Self>, _error: TransferError) {
        let Self(finished) = *self;
        finished()
    }

    fn cancelled(self: Box<Self>) {
        let Self(finished) = *self;
        finished()
    }
}

/// Hands the outcome to a closure.
pub struct OutcomeSink<F>(pub F);

impl<F> CompletionSink for OutcomeSink<F>
where
    F: FnOnce(TransferOutcome) + Send + 'static,
{
    fn success(self: Box<Self>, summary: TransferSummary) {
        let Self(receive) = *self;
        receive(TransferOutcome::Success(summary))
    }

    fn failure(self: Box<Self>, error: TransferError) {
        let Self(receive) = *self;
        receive(TransferOutcome::Failure(error))
    }

    fn cancelled(self: Box<Self>) {
        let Self(receive) = *self;
        receive(TransferOutcome::Cancelled)
    }
}

impl CompletionSink for oneshot::Sender<TransferOutcome> {
    fn success(self: Box<Self>, summary: TransferSummary) {
        let _ = (*self).send(TransferOutcome::Success(summary));
    }

    fn failure(self: Box<Self>, error: TransferError) {
        let _ = (*self).send(TransferOutcome::Failure(error));
    }

    fn cancelled(self: Box<Self>) {
        let _ = (*self).send(TransferOutcome::Cancelled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_finished_sink_fires_on_any_outcome() {
        let calls = Arc::new(Mutex::new(0));

        for outcome in [
            TransferOutcome::Cancelled,
            TransferOutcome::Failure(TransferError::Cancelled),
        ] {
            let calls = calls.clone();
            dispatch(
                Box::new(FinishedSink(move || *calls.lock().unwrap() += 1)),
                outcome,
            );
        }
        assert_eq!(*calls.lock().unwrap(), 2);
    }

    #[test]
    fn test_oneshot_sink_forwards_outcome() {
        let (tx, mut rx) = oneshot::channel();
        dispatch(Box::new(tx), TransferOutcome::Cancelled);
        assert!(rx.try_recv().unwrap().is_cancelled());
    }
}
