//! The error type that crosses the `Runnable` contract.

/// Result alias used throughout strand.
pub type Result<T, E = RunError> = std::result::Result<T, E>;

/// Boxed error from a collaborator or user function.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure of a unit, a composition, or the agent loop.
///
/// Composite units wrap the failure of an inner unit with the position it
/// occurred at (`Step`, `Branch`, `BatchItem`), so the full chain reads like
/// a path into the pipeline. Use [`RunError::root_cause`] to see past the
/// wrapping.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    // Construction
    /// Adjacent stages of a dynamic pipeline disagree on a type.
    #[error("type mismatch at step {step} ({name}): expected {expected}, found {found}")]
    TypeMismatch {
        /// Zero-based position of the offending stage.
        step: usize,
        /// Name of the offending stage.
        name: String,
        /// Type the stage accepts.
        expected: &'static str,
        /// Type the previous stage produces.
        found: &'static str,
    },
    /// No route accepted the input.
    #[error("no branch condition matched in {name} and no default branch provided")]
    NoBranchMatched {
        /// Name of the branch unit.
        name: String,
    },

    // Invocation, annotated with position
    /// A sequence stage failed.
    #[error("step {index} ({name}): {source}")]
    Step {
        /// Zero-based stage index.
        index: usize,
        /// Stage name.
        name: String,
        /// Underlying failure.
        #[source]
        source: Box<RunError>,
    },
    /// A named entry failed.
    #[error("parallel branch {key:?}: {source}")]
    Branch {
        /// Name the failing entry was registered under.
        key: String,
        /// Underlying failure.
        #[source]
        source: Box<RunError>,
    },
    /// One element of a batch failed.
    #[error("batch item {index}: {source}")]
    BatchItem {
        /// Index of the failing input.
        index: usize,
        /// Underlying failure.
        #[source]
        source: Box<RunError>,
    },

    // Control
    /// The caller cancelled the call.
    #[error("cancelled")]
    Cancelled,
    /// Nesting went deeper than the recursion limit.
    #[error("recursion limit of {limit} exceeded")]
    RecursionLimit {
        /// Configured nesting limit.
        limit: usize,
    },
    /// The agent loop ran out of iterations.
    #[error("agent stopped after reaching the iteration limit of {limit}")]
    IterationLimitExceeded {
        /// Configured iteration budget.
        limit: usize,
    },

    // Agent planning
    /// The planner failed.
    #[error("planning failed: {0}")]
    Planning(#[source] Box<RunError>),
    /// The planner returned something the loop cannot act on.
    #[error("invalid plan: {0}")]
    InvalidPlan(String),
    /// Model text did not match the expected format.
    #[error("could not parse model output: {0}")]
    OutputParse(String),

    // Collaborators
    /// A tool failed.
    #[error("tool {name}: {message}")]
    Tool {
        /// Tool name.
        name: String,
        /// Failure description.
        message: String,
    },
    /// The model failed.
    #[error("model error: {0}")]
    Model(String),
    /// The retriever failed.
    #[error("retriever error: {0}")]
    Retriever(String),
    /// Memory failed to load or save.
    #[error("memory error: {0}")]
    Memory(String),
    /// JSON conversion failed.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    /// An invariant inside strand was broken.
    #[error("internal error: {0}")]
    Internal(String),
    /// Any other failure.
    #[error(transparent)]
    Other(BoxError),
}

impl RunError {
    /// Wrap an arbitrary error.
    pub fn other(err: impl Into<BoxError>) -> Self {
        Self::Other(err.into())
    }

    /// Annotate with a sequence stage position.
    pub fn at_step(self, index: usize, name: impl Into<String>) -> Self {
        Self::Step {
            index,
            name: name.into(),
            source: Box::new(self),
        }
    }

    /// Annotate with a parallel entry key.
    pub fn in_branch(self, key: impl Into<String>) -> Self {
        Self::Branch {
            key: key.into(),
            source: Box::new(self),
        }
    }

    /// Annotate with a batch input index.
    pub fn at_batch_item(self, index: usize) -> Self {
        Self::BatchItem {
            index,
            source: Box::new(self),
        }
    }

    /// Follow positional wrappers down to the originating failure.
    pub fn root_cause(&self) -> &RunError {
        match self {
            Self::Step { source, .. }
            | Self::Branch { source, .. }
            | Self::BatchItem { source, .. }
            | Self::Planning(source) => source.root_cause(),
            other => other,
        }
    }

    /// True if the failure originated from cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self.root_cause(), Self::Cancelled)
    }

    /// True if the agent loop ran out of iterations, as opposed to failing.
    pub fn is_iteration_limit(&self) -> bool {
        matches!(self.root_cause(), Self::IterationLimitExceeded { .. })
    }

    /// Short classification string for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TypeMismatch { .. } => "type_mismatch",
            Self::NoBranchMatched { .. } => "no_branch_matched",
            Self::Step { .. } => "step",
            Self::Branch { .. } => "branch",
            Self::BatchItem { .. } => "batch_item",
            Self::Cancelled => "cancelled",
            Self::RecursionLimit { .. } => "recursion_limit",
            Self::IterationLimitExceeded { .. } => "iteration_limit_exceeded",
            Self::Planning(_) => "planning",
            Self::InvalidPlan(_) => "invalid_plan",
            Self::OutputParse(_) => "output_parse",
            Self::Tool { .. } => "tool",
            Self::Model(_) => "model",
            Self::Retriever(_) => "retriever",
            Self::Memory(_) => "memory",
            Self::Json(_) => "json",
            Self::Internal(_) => "internal",
            Self::Other(_) => "other",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn step_wrapping_display() {
        let err = RunError::Model("boom".into()).at_step(1, "model");
        assert_eq!(err.to_string(), "step 1 (model): model error: boom");
    }

    #[test]
    fn branch_wrapping_display() {
        let err = RunError::Internal("x".into()).in_branch("summary");
        assert_eq!(err.to_string(), "parallel branch \"summary\": internal error: x");
    }

    #[test]
    fn root_cause_unwraps_nesting() {
        let err = RunError::Cancelled
            .at_step(2, "inner")
            .in_branch("a")
            .at_batch_item(0);
        assert_matches!(err.root_cause(), RunError::Cancelled);
        assert!(err.is_cancelled());
        assert_eq!(err.kind(), "batch_item");
    }

    #[test]
    fn iteration_limit_distinct_from_planning() {
        let limit = RunError::IterationLimitExceeded { limit: 3 };
        assert!(limit.is_iteration_limit());
        let planning = RunError::Planning(Box::new(RunError::OutputParse("bad".into())));
        assert!(!planning.is_iteration_limit());
        assert_eq!(planning.root_cause().kind(), "output_parse");
    }

    #[test]
    fn source_chain_is_walkable() {
        use std::error::Error as _;
        let err = RunError::Model("down".into()).at_step(0, "m");
        let source = err.source().map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("model error: down"));
    }

    #[test]
    fn other_wraps_foreign_errors() {
        let io = std::io::Error::other("disk");
        let err = RunError::other(io);
        assert_eq!(err.kind(), "other");
        assert_eq!(err.to_string(), "disk");
    }

    #[test]
    fn kind_strings() {
        assert_eq!(RunError::Cancelled.kind(), "cancelled");
        assert_eq!(
            RunError::NoBranchMatched { name: "b".into() }.kind(),
            "no_branch_matched"
        );
        assert_eq!(
            RunError::TypeMismatch {
                step: 1,
                name: "s".into(),
                expected: "i32",
                found: "String"
            }
            .kind(),
            "type_mismatch"
        );
    }
}
