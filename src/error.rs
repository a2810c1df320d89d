//! Error types for the planning pipeline.
//!
//! These are propagated through [`anyhow::Result`], so callers which need to react to a
//! particular kind of failure can use [`anyhow::Error::downcast_ref`].
use crate::id::IDLike;
use crate::units::Tonnes;

/// The kinds of failure which can be reported by the planner.
///
/// IDs are held as plain strings so that the error is `Send + Sync`.
#[derive(Debug, Clone, PartialEq, derive_more::Display)]
pub enum PlanningError {
    /// An input value is out of range or refers to something which doesn't exist
    #[display("Invalid value for {field}: {reason}")]
    InputValidation {
        /// The field (or record) which is invalid
        field: String,
        /// Why it was rejected
        reason: String,
    },
    /// A sailing time needed by a voyage pattern is absent from the table
    #[display("No sailing time available from {from} to {to}")]
    MissingDistanceData {
        /// Port the leg departs from
        from: String,
        /// Port the leg arrives at
        to: String,
    },
    /// The solver proved that no assignment satisfies every constraint
    #[display("No voyage assignment satisfies all constraints (estimated capacity gap: {capacity_gap} t)")]
    ModelInfeasible {
        /// Estimated shortfall from the gap diagnostic
        capacity_gap: Tonnes,
    },
    /// The solver reached its time limit without finding any assignment
    #[display("No solution was found within the time limit of {time_limit_secs} s")]
    SolverTimeout {
        /// The time limit which was reached
        time_limit_secs: f64,
    },
    /// A solution returned by the solver violates one of the model's invariants
    #[display("Solution violates a model invariant: {_0}")]
    InvariantViolation(String),
}

impl std::error::Error for PlanningError {}

impl PlanningError {
    /// Create an [`PlanningError::InputValidation`] error
    pub fn invalid<F: ToString, R: ToString>(field: F, reason: R) -> Self {
        Self::InputValidation {
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create an [`PlanningError::InputValidation`] error for a field of a record with an ID
    pub fn invalid_field<ID: IDLike>(id: &ID, field: &str, reason: &str) -> Self {
        Self::invalid(format!("{field} of {id}"), reason)
    }
}
