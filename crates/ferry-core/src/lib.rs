//! Core types and traits for ferry.
//!
//! This crate provides the vocabulary shared by the operations and engine
//! crates: the set of transfer actions, the error type, engine configuration
//! and the localized message source used to build status text.

mod action;
mod config;
mod error;
mod format;
mod messages;

pub use action::Action;
pub use config::{SizeFormat, TransferConfig, TransferConfigBuilder};
pub use error::{TransferError, TransferResult};
pub use format::{format_size, summarize_names};
pub use messages::{MessageSource, Messages, PREPARING_KEY};
