//! Core traits for kernel linear algebra
//!
//! This module defines the abstractions shared by every solver in the crate:
//! - [`RealScalar`]: element type of a solve (`f32` or `f64`)
//! - [`LinearOperator`]: matrix-like objects that can perform matrix-vector products
//! - [`Preconditioner`]: approximate inverses applied to residuals

use crate::error::{Result, SolverError};
use ndarray::{Array1, Array2, LinalgScalar, ScalarOperand};
use num_traits::{Float, FromPrimitive, NumAssign, ToPrimitive};
use std::fmt::{Debug, Display};
use std::iter::Sum;

/// Floating-point element type used consistently across one solve.
///
/// The precision is picked once, when the caller chooses `T`; no solver
/// code branches on it afterwards.
pub trait RealScalar:
    Float
    + NumAssign
    + FromPrimitive
    + ToPrimitive
    + LinalgScalar
    + ScalarOperand
    + Sum
    + Send
    + Sync
    + Debug
    + Display
    + 'static
{
    /// Default stopping tolerance `eps` for this precision
    const DEFAULT_TOLERANCE: f64;

    /// Convert from `f64`, rounding if the precision is lower
    fn from_f64_lossy(value: f64) -> Self;

    /// Widen to `f64`
    fn to_f64_lossy(self) -> f64;
}

impl RealScalar for f64 {
    const DEFAULT_TOLERANCE: f64 = 1e-6;

    #[inline]
    fn from_f64_lossy(value: f64) -> Self {
        value
    }

    #[inline]
    fn to_f64_lossy(self) -> f64 {
        self
    }
}

impl RealScalar for f32 {
    // eps is compared squared, 1e-12 is below what f32 residuals can reach
    const DEFAULT_TOLERANCE: f64 = 1e-4;

    #[inline]
    fn from_f64_lossy(value: f64) -> Self {
        value as f32
    }

    #[inline]
    fn to_f64_lossy(self) -> f64 {
        self as f64
    }
}

/// Trait for linear operators that can perform matrix-vector products.
///
/// Solvers only ever see an operator through this trait, so dense matrices,
/// closures and matrix-free kernel operators are interchangeable. CG assumes
/// the operator is symmetric positive definite; this is never checked beyond
/// breakdown detection inside the iteration.
pub trait LinearOperator<T: RealScalar>: Send + Sync {
    /// Number of rows in the operator
    fn num_rows(&self) -> usize;

    /// Number of columns in the operator
    fn num_cols(&self) -> usize;

    /// Apply the operator: y = A * x
    fn apply(&self, x: &Array1<T>) -> Result<Array1<T>>;

    /// Check if the operator is square
    fn is_square(&self) -> bool {
        self.num_rows() == self.num_cols()
    }
}

impl<T: RealScalar, A: LinearOperator<T> + ?Sized> LinearOperator<T> for &A {
    fn num_rows(&self) -> usize {
        (**self).num_rows()
    }

    fn num_cols(&self) -> usize {
        (**self).num_cols()
    }

    fn apply(&self, x: &Array1<T>) -> Result<Array1<T>> {
        (**self).apply(x)
    }
}

impl<T: RealScalar> LinearOperator<T> for Array2<T> {
    fn num_rows(&self) -> usize {
        self.nrows()
    }

    fn num_cols(&self) -> usize {
        self.ncols()
    }

    fn apply(&self, x: &Array1<T>) -> Result<Array1<T>> {
        if x.len() != self.ncols() {
            return Err(SolverError::DimensionMismatch {
                expected: self.ncols(),
                got: x.len(),
            });
        }
        Ok(self.dot(x))
    }
}

/// Trait for preconditioners used in iterative solvers.
///
/// A preconditioner approximates A^(-1). For PCG it must itself be a
/// symmetric positive definite linear map; its quality only affects the
/// iteration count, not the fixed point.
pub trait Preconditioner<T: RealScalar>: Send + Sync {
    /// Apply the preconditioner: z = M^(-1) * r
    fn apply(&self, r: &Array1<T>) -> Result<Array1<T>>;
}

/// Identity preconditioner (no preconditioning)
#[derive(Clone, Debug, Default)]
pub struct IdentityPreconditioner;

impl<T: RealScalar> Preconditioner<T> for IdentityPreconditioner {
    fn apply(&self, r: &Array1<T>) -> Result<Array1<T>> {
        Ok(r.clone())
    }
}
