//! Transfer engine configuration.

use std::time::Duration;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Unit system used when formatting sizes in status messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeFormat {
    /// Powers of 1024 (KiB, MiB, ...).
    #[default]
    Binary,
    /// Powers of 1000 (kB, MB, ...).
    Decimal,
}

/// Configuration for running transfer plans.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct TransferConfig {
    /// Pause before the first step runs.
    #[builder(default)]
    #[serde(default)]
    pub start_delay: Duration,

    /// Maximum characters of the source summary shown in status messages.
    #[builder(default = "20")]
    #[serde(default = "default_summary_max_chars")]
    pub summary_max_chars: usize,

    /// Whether cleanup steps observe cancellation at their checkpoints.
    #[builder(default = "false")]
    #[serde(default)]
    pub cancel_cleanup: bool,

    /// Unit system for formatted sizes.
    #[builder(default)]
    #[serde(default)]
    pub size_format: SizeFormat,
}

fn default_summary_max_chars() -> usize {
    20
}

impl TransferConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.summary_max_chars == Some(0) {
            return Err("Source summary length must be greater than zero".to_string());
        }
        Ok(())
    }
}

impl TransferConfig {
    /// Create a new transfer config builder.
    pub fn builder() -> TransferConfigBuilder {
        TransferConfigBuilder::default()
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            start_delay: Duration::ZERO,
            summary_max_chars: default_summary_max_chars(),
            cancel_cleanup: false,
            size_format: SizeFormat::Binary,
        }
    }
}
