//! Action dispatch.

use std::path::{Path, PathBuf};

use ferry_core::{Action, TransferError, TransferResult};

use crate::{
    copy_paths, create_archive, extract_archives, make_directories, move_paths, remove_paths,
};

/// Receives checkpoints and progress from a running action.
pub trait StepObserver {
    /// Cancellation checkpoint. Returning an error stops the action.
    fn checkpoint(&mut self) -> TransferResult<()>;

    /// Record that `bytes` more bytes have been fully processed.
    fn advance(&mut self, bytes: u64);
}

/// Observer that never cancels and ignores progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl StepObserver for NoopObserver {
    fn checkpoint(&mut self) -> TransferResult<()> {
        Ok(())
    }

    fn advance(&mut self, _bytes: u64) {}
}

/// Run one resolved action against the filesystem.
pub fn execute_action(
    action: Action,
    sources: &[PathBuf],
    target: Option<&Path>,
    observer: &mut dyn StepObserver,
) -> TransferResult<()> {
    match action {
        Action::Copy => copy_paths(sources, require_target(action, target)?, observer),
        Action::Move => move_paths(sources, require_target(action, target)?, observer),
        Action::Archive => create_archive(sources, require_target(action, target)?, observer),
        Action::Unarchive => extract_archives(sources, require_target(action, target)?, observer),
        Action::MakeDirectory => make_directories(sources),
        Action::Remove => remove_paths(sources),
    }
}

fn require_target(action: Action, target: Option<&Path>) -> TransferResult<&Path> {
    target.ok_or_else(|| TransferError::invalid_plan(format!("{action} requires a target")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_target_is_rejected() {
        let result = execute_action(Action::Copy, &[], None, &mut NoopObserver);
        assert!(matches!(result, Err(TransferError::InvalidPlan { .. })));
    }

    #[test]
    fn test_immediate_actions_ignore_target() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("a/b");

        execute_action(Action::MakeDirectory, &[dir.clone()], None, &mut NoopObserver).unwrap();
        assert!(dir.is_dir());

        execute_action(Action::Remove, &[dir.clone()], None, &mut NoopObserver).unwrap();
        assert!(!dir.exists());
    }
}
