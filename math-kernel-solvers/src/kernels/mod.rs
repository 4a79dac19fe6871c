//! Kernel evaluators
//!
//! A kernel evaluator computes `K(x, y)` between two point sets, either as a
//! dense matrix or fused with a value matrix `b` as the reduction
//! `(K(x, y) · b)_i = Σ_j k(x_i, y_j) · b_j`. The solvers only ever use the
//! fused form on the full point set; the dense form is reserved for the
//! small landmark blocks of the Nyström preconditioner.
//!
//! # Available Kernels
//!
//! - [`GaussianKernel`]: `k(x, y) = exp(-|x - y|² / σ²)`
//! - [`GaussianCrossKernel`]: the matching Nyström cross-kernel
//!
//! [`KernelSpec`] is a serialisable descriptor that resolves into a kernel
//! evaluator and its cross-kernel.

mod gaussian;

pub use gaussian::{GaussianCrossKernel, GaussianKernel};

use crate::error::{Result, SolverError};
use crate::traits::RealScalar;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

/// Kernel function between point sets of equal feature dimension.
pub trait KernelEvaluator<T: RealScalar>: Send + Sync {
    /// Dense kernel matrix `K(x, y)` of shape `x.nrows() × y.nrows()`
    fn matrix(&self, x: ArrayView2<'_, T>, y: ArrayView2<'_, T>) -> Result<Array2<T>>;

    /// Fused product `K(x, y) · b` of shape `x.nrows() × b.ncols()`
    ///
    /// `b` must have one row per point of `y`.
    fn apply(
        &self,
        x: ArrayView2<'_, T>,
        y: ArrayView2<'_, T>,
        b: ArrayView2<'_, T>,
    ) -> Result<Array2<T>>;
}

/// Cross-kernel used to correct the Nyström landmark system.
///
/// For paired rows `u_i`, `v_i` it reduces over the full point set:
/// `out_i = Σ_k k(u_i, x_k) · k(v_i, x_k)`.
pub trait CrossKernelEvaluator<T: RealScalar>: Send + Sync {
    /// Evaluate the paired reduction; `u` and `v` must have the same shape
    fn cross(
        &self,
        u: ArrayView2<'_, T>,
        v: ArrayView2<'_, T>,
        x: ArrayView2<'_, T>,
    ) -> Result<Array1<T>>;
}

/// Squared Euclidean distance between two rows
#[inline]
pub(crate) fn sq_dist<T: RealScalar>(a: ArrayView1<'_, T>, b: ArrayView1<'_, T>) -> T {
    let mut sum = T::zero();
    for (&ai, &bi) in a.iter().zip(b.iter()) {
        let d = ai - bi;
        sum += d * d;
    }
    sum
}

pub(crate) fn check_feature_dims<T>(x: &ArrayView2<'_, T>, y: &ArrayView2<'_, T>) -> Result<()> {
    if x.ncols() != y.ncols() {
        return Err(SolverError::DimensionMismatch {
            expected: x.ncols(),
            got: y.ncols(),
        });
    }
    Ok(())
}

/// Tagged kernel descriptor, resolved into concrete evaluators.
///
/// ```json
/// { "type": "gaussian", "dim": 2, "value_dim": 1, "bandwidth": 1.0 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum KernelSpec {
    /// Gaussian kernel `exp(-|x - y|² / σ²)`
    Gaussian {
        /// Feature dimension D of the points
        dim: usize,
        /// Value dimension Dv of the right-hand side
        value_dim: usize,
        /// Bandwidth σ
        bandwidth: f64,
    },
}

/// A kernel evaluator together with its Nyström cross-kernel
pub struct ResolvedKernel<T: RealScalar> {
    /// Kernel used by the linear operator and the preconditioner
    pub kernel: Box<dyn KernelEvaluator<T>>,
    /// Cross-kernel for the Nyström landmark system
    pub cross: Box<dyn CrossKernelEvaluator<T>>,
}

impl KernelSpec {
    /// Gaussian descriptor
    pub fn gaussian(dim: usize, value_dim: usize, bandwidth: f64) -> Self {
        KernelSpec::Gaussian {
            dim,
            value_dim,
            bandwidth,
        }
    }

    /// Feature dimension expected of the points
    pub fn dim(&self) -> usize {
        match self {
            KernelSpec::Gaussian { dim, .. } => *dim,
        }
    }

    /// Value dimension expected of the right-hand side
    pub fn value_dim(&self) -> usize {
        match self {
            KernelSpec::Gaussian { value_dim, .. } => *value_dim,
        }
    }

    /// Check the descriptor against the shapes of a concrete problem
    pub fn validate(&self, point_dim: usize, value_dim: usize) -> Result<()> {
        if self.dim() != point_dim {
            return Err(SolverError::DimensionMismatch {
                expected: self.dim(),
                got: point_dim,
            });
        }
        if self.value_dim() != value_dim {
            return Err(SolverError::DimensionMismatch {
                expected: self.value_dim(),
                got: value_dim,
            });
        }
        Ok(())
    }

    /// Build the concrete evaluators for element type `T`
    pub fn resolve<T: RealScalar>(&self) -> Result<ResolvedKernel<T>> {
        match self {
            KernelSpec::Gaussian { bandwidth, .. } => {
                let sigma = T::from_f64_lossy(*bandwidth);
                Ok(ResolvedKernel {
                    kernel: Box::new(GaussianKernel::new(sigma)?),
                    cross: Box::new(GaussianCrossKernel::new(sigma)?),
                })
            }
        }
    }
}
