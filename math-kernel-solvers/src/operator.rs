//! Linear operators built from kernels and closures
//!
//! [`KernelLinOp`] is the regularised kernel operator `a ↦ K(x, x)·a + λ·a`
//! solved by kernel ridge regression. Coefficient vectors hold an `N × Dv`
//! value matrix flattened row-major, so a multi-column right-hand side is
//! solved jointly under the Frobenius inner product.

use crate::error::{Result, SolverError};
use crate::kernels::KernelEvaluator;
use crate::traits::{LinearOperator, RealScalar};
use ndarray::{Array1, ArrayView2};

/// Regularised kernel operator `K(x, x)·a + λ·a`
pub struct KernelLinOp<'a, T: RealScalar, K: KernelEvaluator<T> + ?Sized> {
    kernel: &'a K,
    points: ArrayView2<'a, T>,
    ridge: T,
    value_dim: usize,
}

impl<'a, T: RealScalar, K: KernelEvaluator<T> + ?Sized> KernelLinOp<'a, T, K> {
    /// Wrap a kernel evaluator over `points` (N×D) with ridge `λ ≥ 0`.
    ///
    /// `value_dim` is the number of columns Dv of the right-hand side.
    pub fn new(kernel: &'a K, points: ArrayView2<'a, T>, ridge: T, value_dim: usize) -> Result<Self> {
        if !(ridge.is_finite() && ridge >= T::zero()) {
            return Err(SolverError::invalid(format!(
                "ridge must be finite and non-negative, got {ridge}"
            )));
        }
        if value_dim == 0 {
            return Err(SolverError::invalid("value dimension must be at least 1"));
        }
        Ok(Self {
            kernel,
            points,
            ridge,
            value_dim,
        })
    }

    /// Ridge regularisation λ
    pub fn ridge(&self) -> T {
        self.ridge
    }

    /// Number of points N
    pub fn num_points(&self) -> usize {
        self.points.nrows()
    }

    /// Value dimension Dv
    pub fn value_dim(&self) -> usize {
        self.value_dim
    }

    /// The point set the kernel is evaluated on
    pub fn points(&self) -> ArrayView2<'a, T> {
        self.points
    }

    /// The wrapped kernel evaluator
    pub fn kernel(&self) -> &'a K {
        self.kernel
    }
}

impl<T: RealScalar, K: KernelEvaluator<T> + ?Sized> LinearOperator<T> for KernelLinOp<'_, T, K> {
    fn num_rows(&self) -> usize {
        self.points.nrows() * self.value_dim
    }

    fn num_cols(&self) -> usize {
        self.num_rows()
    }

    fn apply(&self, a: &Array1<T>) -> Result<Array1<T>> {
        let n = self.points.nrows();
        if a.len() != n * self.value_dim {
            return Err(SolverError::DimensionMismatch {
                expected: n * self.value_dim,
                got: a.len(),
            });
        }
        let values = a
            .view()
            .into_shape_with_order((n, self.value_dim))
            .map_err(|e| SolverError::invalid(format!("coefficient layout: {e}")))?;

        let kernel_part = self.kernel.apply(self.points, self.points, values)?;

        Ok(kernel_part
            .iter()
            .zip(a.iter())
            .map(|(&k, &ai)| k + self.ridge * ai)
            .collect())
    }
}

/// Closure-backed square operator of a declared dimension
pub struct FnOperator<F> {
    dim: usize,
    f: F,
}

impl<F> FnOperator<F> {
    /// Wrap `f` as an operator on vectors of length `dim`
    pub fn new(dim: usize, f: F) -> Self {
        Self { dim, f }
    }
}

impl<T, F> LinearOperator<T> for FnOperator<F>
where
    T: RealScalar,
    F: Fn(&Array1<T>) -> Result<Array1<T>> + Send + Sync,
{
    fn num_rows(&self) -> usize {
        self.dim
    }

    fn num_cols(&self) -> usize {
        self.dim
    }

    fn apply(&self, x: &Array1<T>) -> Result<Array1<T>> {
        if x.len() != self.dim {
            return Err(SolverError::DimensionMismatch {
                expected: self.dim,
                got: x.len(),
            });
        }
        let y = (self.f)(x)?;
        if y.len() != self.dim {
            return Err(SolverError::DimensionMismatch {
                expected: self.dim,
                got: y.len(),
            });
        }
        Ok(y)
    }
}
