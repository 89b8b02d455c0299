//! Transfer action types.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoStaticStr};

/// A filesystem operation performed by one step of a transfer plan.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Action {
    /// Recursively copy sources into the target directory.
    Copy,
    /// Recursively move sources into the target directory.
    Move,
    /// Write all sources into a single zip archive at the target path.
    Archive,
    /// Extract every source archive into the target directory.
    Unarchive,
    /// Create every source path as a directory, parents included.
    MakeDirectory,
    /// Delete every source path, recursively for directories.
    Remove,
}

impl Action {
    /// Immediate actions are not counted as steps and never report progress.
    pub const fn is_immediate(self) -> bool {
        matches!(self, Self::MakeDirectory | Self::Remove)
    }

    /// Whether the action needs a target path to run.
    pub const fn needs_target(self) -> bool {
        !self.is_immediate()
    }

    /// Key of the localized status message describing this action.
    pub fn message_key(self) -> String {
        let name: &'static str = self.into();
        format!("transfer.{name}")
    }
}
