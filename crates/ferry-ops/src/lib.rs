//! Filesystem actions for ferry.
//!
//! Every function here is synchronous and runs to completion on the calling
//! thread. Long-running actions report through a [`StepObserver`], which is
//! asked for permission at each cancellation checkpoint and told how many
//! bytes have been fully processed.

mod archive;
mod copy;
mod create;
mod dispatch;
mod remove;
mod size;
mod tree;

pub use archive::{create_archive, extract_archives};
pub use copy::{copy_paths, move_paths};
pub use create::make_directories;
pub use dispatch::{execute_action, NoopObserver, StepObserver};
pub use remove::remove_paths;
pub use size::{path_size, total_size};
