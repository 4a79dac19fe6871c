//! Error types for kernel linear solves.
//!
//! Every failure is local to one solve call: nothing is retained between
//! calls, so callers may simply retry (for instance with a different
//! Nyström landmark sample or with preconditioning disabled).

use thiserror::Error;

/// Errors that can occur while building operators, preconditioners or
/// running a solve.
#[derive(Debug, Error)]
pub enum SolverError {
    /// A parameter or input is outside its valid domain.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Array dimensions do not agree.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch {
        /// Expected length or extent
        expected: usize,
        /// Actual length or extent provided
        got: usize,
    },

    /// The iteration cap was reached before the residual fell below tolerance.
    #[error("solver did not converge after {iterations} iterations (residual norm: {residual:.3e})")]
    DidNotConverge {
        /// Number of iterations performed
        iterations: usize,
        /// Residual 2-norm at the last iteration
        residual: f64,
    },

    /// Breakdown of the iteration or of a dense factorisation.
    #[error("numerical instability: {0}")]
    NumericalInstability(String),

    /// Configuration could not be read, parsed or written.
    #[error("configuration error: {0}")]
    Config(String),
}

/// A specialized `Result` type for solver operations.
pub type Result<T> = std::result::Result<T, SolverError>;

impl SolverError {
    /// Returns `true` for `InvalidArgument` and `DimensionMismatch`.
    pub fn is_argument_error(&self) -> bool {
        matches!(
            self,
            SolverError::InvalidArgument(_) | SolverError::DimensionMismatch { .. }
        )
    }

    /// Returns `true` if the iteration cap was hit.
    pub fn is_convergence_error(&self) -> bool {
        matches!(self, SolverError::DidNotConverge { .. })
    }

    /// Returns `true` if the solve broke down numerically.
    pub fn is_numerical_error(&self) -> bool {
        matches!(self, SolverError::NumericalInstability(_))
    }

    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        SolverError::InvalidArgument(reason.into())
    }
}
