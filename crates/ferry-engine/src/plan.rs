//! Transfer plans and the builder that assembles them.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use ferry_core::{Action, TransferError, TransferResult};
use ferry_ops::total_size;
use strum::Display;

/// Deferred resolution of a step's source paths.
pub type SourcesProvider = Arc<dyn Fn() -> Vec<PathBuf> + Send + Sync>;

/// Deferred resolution of a step's target path.
pub type TargetProvider = Arc<dyn Fn() -> PathBuf + Send + Sync>;

/// Which list of a plan a step belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Phase {
    Main,
    Cleanup,
}

/// One step of a plan: an action and the providers for its paths.
///
/// Providers run only when the step starts, so a step can depend on files
/// produced by the steps before it.
#[derive(Clone)]
pub struct TaskSpec {
    action: Action,
    sources: SourcesProvider,
    target: Option<TargetProvider>,
    total_size: Option<u64>,
}

impl TaskSpec {
    /// A step with literal sources and target.
    pub fn new(
        action: Action,
        sources: impl IntoIterator<Item = impl Into<PathBuf>>,
        target: impl Into<PathBuf>,
    ) -> Self {
        let sources = literal(sources);
        Self::lazy_sources(action, move || sources.clone(), target)
    }

    /// A step without a target, for [`Action::MakeDirectory`] and
    /// [`Action::Remove`].
    pub fn untargeted(action: Action, sources: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        let sources = literal(sources);
        Self {
            action,
            sources: Arc::new(move || sources.clone()),
            target: None,
            total_size: None,
        }
    }

    /// A step whose sources are resolved when it starts.
    pub fn lazy_sources(
        action: Action,
        sources: impl Fn() -> Vec<PathBuf> + Send + Sync + 'static,
        target: impl Into<PathBuf>,
    ) -> Self {
        let target = target.into();
        Self::lazy(action, sources, move || target.clone())
    }

    /// A step whose sources and target are both resolved when it starts.
    pub fn lazy(
        action: Action,
        sources: impl Fn() -> Vec<PathBuf> + Send + Sync + 'static,
        target: impl Fn() -> PathBuf + Send + Sync + 'static,
    ) -> Self {
        Self {
            action,
            sources: Arc::new(sources),
            target: Some(Arc::new(target)),
            total_size: None,
        }
    }

    /// Use a known size instead of measuring the sources when the step starts.
    pub fn with_total_size(mut self, bytes: u64) -> Self {
        self.total_size = Some(bytes);
        self
    }

    /// The action performed by this step.
    pub fn action(&self) -> Action {
        self.action
    }

    /// The precomputed size, if one was given.
    pub fn total_size(&self) -> Option<u64> {
        self.total_size
    }

    /// Whether this step counts toward the plan's steps.
    pub fn is_counted(&self) -> bool {
        !self.action.is_immediate()
    }

    /// Invoke the providers and measure the sources if needed.
    pub(crate) fn resolve(&self) -> ResolvedStep {
        let sources = (self.sources)();
        let target = self.target.as_ref().map(|target| target());
        let total_size = self.total_size.unwrap_or_else(|| total_size(&sources));

        ResolvedStep {
            action: self.action,
            sources,
            target,
            total_size,
        }
    }
}

impl fmt::Debug for TaskSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskSpec")
            .field("action", &self.action)
            .field("has_target", &self.target.is_some())
            .field("total_size", &self.total_size)
            .finish_non_exhaustive()
    }
}

fn literal(sources: impl IntoIterator<Item = impl Into<PathBuf>>) -> Vec<PathBuf> {
    sources.into_iter().map(Into::into).collect()
}

/// A step with its providers invoked.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedStep {
    pub action: Action,
    pub sources: Vec<PathBuf>,
    pub target: Option<PathBuf>,
    pub total_size: u64,
}

/// An immutable pair of ordered step lists.
#[derive(Debug, Clone)]
pub struct TransferPlan {
    main: Vec<TaskSpec>,
    cleanup: Vec<TaskSpec>,
    main_steps_count: usize,
    steps_count: usize,
}

impl TransferPlan {
    /// Create a new plan builder.
    pub fn builder() -> PlanBuilder {
        PlanBuilder::default()
    }

    /// Steps that run first and stop at the first failure or cancellation.
    pub fn main_steps(&self) -> &[TaskSpec] {
        &self.main
    }

    /// Steps that always run after the main steps.
    pub fn cleanup_steps(&self) -> &[TaskSpec] {
        &self.cleanup
    }

    /// Number of non-immediate steps across both lists.
    pub fn steps_count(&self) -> usize {
        self.steps_count
    }

    /// Number of non-immediate steps in the main list.
    pub fn main_steps_count(&self) -> usize {
        self.main_steps_count
    }

    /// Steps of the given phase.
    pub fn steps(&self, phase: Phase) -> &[TaskSpec] {
        match phase {
            Phase::Main => &self.main,
            Phase::Cleanup => &self.cleanup,
        }
    }
}

/// Accumulates main and cleanup steps, then freezes them into a plan.
#[derive(Debug, Default)]
pub struct PlanBuilder {
    main: Vec<TaskSpec>,
    cleanup: Vec<TaskSpec>,
}

impl PlanBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a main step.
    pub fn add_main(mut self, spec: TaskSpec) -> Self {
        self.main.push(spec);
        self
    }

    /// Append a cleanup step.
    pub fn add_cleanup(mut self, spec: TaskSpec) -> Self {
        self.cleanup.push(spec);
        self
    }

    /// Append a main step with literal paths.
    pub fn main(
        self,
        action: Action,
        sources: impl IntoIterator<Item = impl Into<PathBuf>>,
        target: impl Into<PathBuf>,
    ) -> Self {
        self.add_main(TaskSpec::new(action, sources, target))
    }

    /// Append a cleanup step with literal paths.
    pub fn cleanup(
        self,
        action: Action,
        sources: impl IntoIterator<Item = impl Into<PathBuf>>,
        target: impl Into<PathBuf>,
    ) -> Self {
        self.add_cleanup(TaskSpec::new(action, sources, target))
    }

    /// Append a main step with deferred paths.
    pub fn main_lazy(
        self,
        action: Action,
        sources: impl Fn() -> Vec<PathBuf> + Send + Sync + 'static,
        target: impl Fn() -> PathBuf + Send + Sync + 'static,
    ) -> Self {
        self.add_main(TaskSpec::lazy(action, sources, target))
    }

    /// Append a cleanup step with deferred paths.
    pub fn cleanup_lazy(
        self,
        action: Action,
        sources: impl Fn() -> Vec<PathBuf> + Send + Sync + 'static,
        target: impl Fn() -> PathBuf + Send + Sync + 'static,
    ) -> Self {
        self.add_cleanup(TaskSpec::lazy(action, sources, target))
    }

    /// Freeze the steps into a plan.
    ///
    /// Only the plan's shape is checked here; the filesystem is not touched
    /// until the plan runs.
    pub fn build(self) -> TransferResult<TransferPlan> {
        if self.main.is_empty() && self.cleanup.is_empty() {
            return Err(TransferError::invalid_plan("plan has no steps"));
        }

        for spec in self.main.iter().chain(&self.cleanup) {
            if spec.action.needs_target() && spec.target.is_none() {
                return Err(TransferError::invalid_plan(format!(
                    "{} step requires a target",
                    spec.action
                )));
            }
        }

        let main_steps_count = self.main.iter().filter(|s| s.is_counted()).count();
        let steps_count =
            main_steps_count + self.cleanup.iter().filter(|s| s.is_counted()).count();

        Ok(TransferPlan {
            main: self.main,
            cleanup: self.cleanup,
            main_steps_count,
            steps_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_steps_count_ignores_immediate() {
        let plan = PlanBuilder::new()
            .main(Action::Copy, ["/a"], "/b")
            .add_main(TaskSpec::untargeted(Action::MakeDirectory, ["/c"]))
            .main(Action::Archive, ["/b"], "/b.zip")
            .cleanup(Action::Move, ["/d"], "/e")
            .add_cleanup(TaskSpec::untargeted(Action::Remove, ["/b"]))
            .build()
            .unwrap();

        assert_eq!(plan.steps_count(), 3);
        assert_eq!(plan.main_steps_count(), 2);
        assert_eq!(plan.main_steps().len(), 3);
        assert_eq!(plan.cleanup_steps().len(), 2);
    }

    #[test]
    fn test_empty_plan_is_rejected() {
        let result = PlanBuilder::new().build();
        assert!(matches!(result, Err(TransferError::InvalidPlan { .. })));
    }

    #[test]
    fn test_untargeted_copy_is_rejected() {
        let result = PlanBuilder::new()
            .add_main(TaskSpec::untargeted(Action::Copy, ["/a"]))
            .build();
        assert!(matches!(result, Err(TransferError::InvalidPlan { .. })));
    }

    #[test]
    fn test_providers_are_deferred() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let plan = PlanBuilder::new()
            .main_lazy(
                Action::Copy,
                move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                    vec![PathBuf::from("/missing")]
                },
                || PathBuf::from("/target"),
            )
            .build()
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let step = plan.main_steps()[0].resolve();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(step.target, Some(PathBuf::from("/target")));
        assert_eq!(step.total_size, 0);
    }

    #[test]
    fn test_explicit_size_skips_measurement() {
        let spec = TaskSpec::new(Action::Copy, ["/missing"], "/t").with_total_size(42);
        assert_eq!(spec.resolve().total_size, 42);
    }
}
