//! Nyström inverse preconditioner
//!
//! Approximates `(K(x, x) + λI)^(-1)` from `m = floor(sqrt(N))` landmark
//! points `u` drawn without replacement from `x`:
//!
//! ```text
//! M          = K(u, u) + [Σ_k K(u_i, x_k) K(u_j, x_k)]_ij        (m × m)
//! M^(-1) r  ≈ (r - K(x, u) · M^(-1) · K(u, x) · r) / λ
//! ```
//!
//! `M` is LU-factorised once at build time; every application costs two
//! fused kernel products against the landmarks plus an `m × m` solve.

use crate::direct::{LuFactorization, lu_factorize};
use crate::error::{Result, SolverError};
use crate::kernels::{CrossKernelEvaluator, KernelEvaluator};
use crate::traits::{Preconditioner, RealScalar};
use ndarray::{Array1, Array2, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Instant;

/// Smallest point count for which the landmark system is meaningful
pub const MIN_POINTS: usize = 4;

/// Nyström preconditioner options
#[derive(Debug, Clone, Default)]
pub struct NystromConfig {
    /// Seed for landmark sampling (`None` draws from the thread RNG)
    pub seed: Option<u64>,
    /// Scale the landmark self-kernel by λ, i.e. `M = λ·K(u, u) + K(u, x)K(x, u)`
    ///
    /// This is the exact Woodbury inverse of the rank-m Nyström
    /// approximation; the default keeps the unscaled `K(u, u)`.
    pub ridge_scaled_landmarks: bool,
}

/// Number of landmarks used for `n` points: `floor(sqrt(n))`
pub fn landmark_count(n: usize) -> usize {
    n.isqrt()
}

/// Draw `count` distinct indices uniformly from `0..pool_size`
pub fn sample_landmarks<R: Rng + ?Sized>(pool_size: usize, count: usize, rng: &mut R) -> Vec<usize> {
    debug_assert!(count <= pool_size);
    rand::seq::index::sample(rng, pool_size, count).into_vec()
}

/// Low-rank inverse preconditioner for a regularised kernel operator
pub struct NystromPreconditioner<'a, T: RealScalar, K: KernelEvaluator<T> + ?Sized> {
    kernel: &'a K,
    points: ArrayView2<'a, T>,
    landmarks: Array2<T>,
    indices: Vec<usize>,
    factorization: LuFactorization<T>,
    ridge: T,
    value_dim: usize,
}

impl<'a, T: RealScalar, K: KernelEvaluator<T> + ?Sized> NystromPreconditioner<'a, T, K> {
    /// Sample landmarks and factorise the landmark system.
    ///
    /// Requires at least [`MIN_POINTS`] points and `λ > 0`. A singular
    /// landmark system is reported as `NumericalInstability`; drawing a new
    /// sample (another seed) or solving without preconditioning are the
    /// usual ways out.
    pub fn build<C: CrossKernelEvaluator<T> + ?Sized>(
        kernel: &'a K,
        cross: &C,
        points: ArrayView2<'a, T>,
        value_dim: usize,
        ridge: T,
        config: &NystromConfig,
    ) -> Result<Self> {
        let n = points.nrows();
        if n < MIN_POINTS {
            return Err(SolverError::invalid(format!(
                "Nyström preconditioning needs at least {MIN_POINTS} points, got {n}"
            )));
        }
        if !(ridge.is_finite() && ridge > T::zero()) {
            return Err(SolverError::invalid(format!(
                "Nyström preconditioning needs a positive ridge, got {ridge}"
            )));
        }
        if value_dim == 0 {
            return Err(SolverError::invalid("value dimension must be at least 1"));
        }

        let start = Instant::now();

        let m = landmark_count(n);
        let mut rng: StdRng = match config.seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => {
                let mut thread_rng = rand::rng();
                StdRng::from_rng(&mut thread_rng)
            }
        };
        let indices = sample_landmarks(n, m, &mut rng);
        let landmarks = points.select(Axis(0), &indices);

        let mut system = kernel.matrix(landmarks.view(), landmarks.view())?;
        if config.ridge_scaled_landmarks {
            system.mapv_inplace(|v| v * ridge);
        }
        system += &landmark_correction(cross, &landmarks, points)?;

        let factorization = lu_factorize(&system)?;

        log::debug!(
            "Nyström preconditioner: {} landmarks out of {} points, init {:.5} s",
            m,
            n,
            start.elapsed().as_secs_f64()
        );

        Ok(Self {
            kernel,
            points,
            landmarks,
            indices,
            factorization,
            ridge,
            value_dim,
        })
    }

    /// Indices of the sampled landmark points
    pub fn landmark_indices(&self) -> &[usize] {
        &self.indices
    }

    /// Landmark points `u` (m × D)
    pub fn landmarks(&self) -> &Array2<T> {
        &self.landmarks
    }

    /// Number of landmarks m
    pub fn rank(&self) -> usize {
        self.indices.len()
    }
}

/// `[Σ_k K(u_j, x_k) K(u_i, x_k)]_ij`, evaluated as one paired reduction
/// over the m² landmark pairs and reshaped to m × m.
fn landmark_correction<T, C>(
    cross: &C,
    landmarks: &Array2<T>,
    points: ArrayView2<'_, T>,
) -> Result<Array2<T>>
where
    T: RealScalar,
    C: CrossKernelEvaluator<T> + ?Sized,
{
    let (m, d) = landmarks.dim();
    // row i*m + j pairs u_j with u_i
    let tiled = Array2::from_shape_fn((m * m, d), |(row, c)| landmarks[[row % m, c]]);
    let repeated = Array2::from_shape_fn((m * m, d), |(row, c)| landmarks[[row / m, c]]);

    let values = cross.cross(tiled.view(), repeated.view(), points)?;
    if values.len() != m * m {
        return Err(SolverError::DimensionMismatch {
            expected: m * m,
            got: values.len(),
        });
    }
    values
        .into_shape_with_order((m, m))
        .map_err(|e| SolverError::invalid(format!("landmark system layout: {e}")))
}

impl<T: RealScalar, K: KernelEvaluator<T> + ?Sized> Preconditioner<T>
    for NystromPreconditioner<'_, T, K>
{
    fn apply(&self, r: &Array1<T>) -> Result<Array1<T>> {
        let n = self.points.nrows();
        if r.len() != n * self.value_dim {
            return Err(SolverError::DimensionMismatch {
                expected: n * self.value_dim,
                got: r.len(),
            });
        }
        let residual = r
            .view()
            .into_shape_with_order((n, self.value_dim))
            .map_err(|e| SolverError::invalid(format!("residual layout: {e}")))?;

        let projected = self
            .kernel
            .apply(self.landmarks.view(), self.points, residual)?;
        let coefficients = self.factorization.solve_columns(&projected)?;
        let correction = self
            .kernel
            .apply(self.points, self.landmarks.view(), coefficients.view())?;

        let ridge = self.ridge;
        Ok(r.iter()
            .zip(correction.iter())
            .map(|(&ri, &ci)| (ri - ci) / ridge)
            .collect())
    }
}
