//! Gaussian kernel and its Nyström cross-kernel

use super::{CrossKernelEvaluator, KernelEvaluator, check_feature_dims, sq_dist};
use crate::error::{Result, SolverError};
use crate::parallel::parallel_rows;
use crate::traits::RealScalar;
use ndarray::{Array1, Array2, ArrayView2};

fn inverse_sq_bandwidth<T: RealScalar>(bandwidth: T) -> Result<T> {
    if !(bandwidth.is_finite() && bandwidth > T::zero()) {
        return Err(SolverError::invalid(format!(
            "kernel bandwidth must be positive and finite, got {bandwidth}"
        )));
    }
    Ok(T::one() / (bandwidth * bandwidth))
}

fn into_matrix<T>(rows: usize, cols: usize, data: Vec<T>) -> Result<Array2<T>> {
    Array2::from_shape_vec((rows, cols), data)
        .map_err(|e| SolverError::invalid(format!("kernel output shape: {e}")))
}

/// Gaussian kernel `k(x, y) = exp(-|x - y|² / σ²)`
#[derive(Debug, Clone, Copy)]
pub struct GaussianKernel<T: RealScalar> {
    bandwidth: T,
    oos2: T,
}

impl<T: RealScalar> GaussianKernel<T> {
    /// Create a Gaussian kernel with bandwidth σ > 0
    pub fn new(bandwidth: T) -> Result<Self> {
        Ok(Self {
            bandwidth,
            oos2: inverse_sq_bandwidth(bandwidth)?,
        })
    }

    /// Bandwidth σ
    pub fn bandwidth(&self) -> T {
        self.bandwidth
    }

    #[inline]
    fn eval(&self, sqdist: T) -> T {
        (-self.oos2 * sqdist).exp()
    }
}

impl<T: RealScalar> KernelEvaluator<T> for GaussianKernel<T> {
    fn matrix(&self, x: ArrayView2<'_, T>, y: ArrayView2<'_, T>) -> Result<Array2<T>> {
        check_feature_dims(&x, &y)?;
        let (m, n) = (x.nrows(), y.nrows());

        let data = parallel_rows(m, n, |i| {
            let xi = x.row(i);
            y.rows()
                .into_iter()
                .map(|yj| self.eval(sq_dist(xi, yj)))
                .collect::<Vec<T>>()
        });
        into_matrix(m, n, data)
    }

    fn apply(
        &self,
        x: ArrayView2<'_, T>,
        y: ArrayView2<'_, T>,
        b: ArrayView2<'_, T>,
    ) -> Result<Array2<T>> {
        check_feature_dims(&x, &y)?;
        if b.nrows() != y.nrows() {
            return Err(SolverError::DimensionMismatch {
                expected: y.nrows(),
                got: b.nrows(),
            });
        }
        let (m, dv) = (x.nrows(), b.ncols());

        let data = parallel_rows(m, dv, |i| {
            let xi = x.row(i);
            let mut acc = vec![T::zero(); dv];
            for (yj, bj) in y.rows().into_iter().zip(b.rows()) {
                let w = self.eval(sq_dist(xi, yj));
                for (a, &v) in acc.iter_mut().zip(bj.iter()) {
                    *a += w * v;
                }
            }
            acc
        });
        into_matrix(m, dv, data)
    }
}

/// Cross-kernel `Σ_k exp(-(|u_i - x_k|² + |v_i - x_k|²) / σ²)`
///
/// Equals `(K(u, x) · K(x, v))_ii` for the Gaussian kernel of the same σ.
#[derive(Debug, Clone, Copy)]
pub struct GaussianCrossKernel<T: RealScalar> {
    oos2: T,
}

impl<T: RealScalar> GaussianCrossKernel<T> {
    /// Create the cross-kernel matching a Gaussian kernel of bandwidth σ
    pub fn new(bandwidth: T) -> Result<Self> {
        Ok(Self {
            oos2: inverse_sq_bandwidth(bandwidth)?,
        })
    }
}

impl<T: RealScalar> CrossKernelEvaluator<T> for GaussianCrossKernel<T> {
    fn cross(
        &self,
        u: ArrayView2<'_, T>,
        v: ArrayView2<'_, T>,
        x: ArrayView2<'_, T>,
    ) -> Result<Array1<T>> {
        check_feature_dims(&u, &x)?;
        check_feature_dims(&v, &x)?;
        if u.nrows() != v.nrows() {
            return Err(SolverError::DimensionMismatch {
                expected: u.nrows(),
                got: v.nrows(),
            });
        }

        let data = parallel_rows(u.nrows(), 1, |i| {
            let (ui, vi) = (u.row(i), v.row(i));
            let sum = x
                .rows()
                .into_iter()
                .map(|xk| (-self.oos2 * (sq_dist(ui, xk) + sq_dist(vi, xk))).exp())
                .sum::<T>();
            vec![sum]
        });
        Ok(Array1::from_vec(data))
    }
}
