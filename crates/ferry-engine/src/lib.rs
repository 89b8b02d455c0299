//! Transfer task engine for ferry.
//!
//! A [`TransferPlan`] holds two ordered lists of steps. The engine runs the
//! main list on a background worker, then always runs the cleanup list, and
//! finally hands exactly one [`TransferOutcome`] to the caller's
//! [`CompletionSink`]. Progress and status are published through a
//! [`tokio::sync::watch`] channel held by the [`TransferHandle`].

mod executor;
mod plan;
mod progress;
mod sink;

pub use executor::{TransferEngine, TransferHandle};
pub use plan::{Phase, PlanBuilder, SourcesProvider, TargetProvider, TaskSpec, TransferPlan};
pub use progress::{TransferEvent, TransferProgress};
pub use sink::{CompletionSink, FinishedSink, OutcomeSink, TransferOutcome, TransferSummary};

pub use ferry_core::{Action, MessageSource, Messages, TransferConfig, TransferError};
pub use tokio_util::sync::CancellationToken;
