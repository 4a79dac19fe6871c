//! Kernel ridge solve entry point
//!
//! Solves `(K(x, x) + λI) a = b` for an `N × Dv` right-hand side, with CG or
//! with Nyström-preconditioned CG.

use crate::error::{Result, SolverError};
use crate::iterative::{CgConfig, cg, pcg};
use crate::kernels::{CrossKernelEvaluator, KernelEvaluator, KernelSpec};
use crate::operator::KernelLinOp;
use crate::parallel::is_parallel_available;
use crate::preconditioners::{NystromConfig, NystromPreconditioner};
use crate::traits::RealScalar;
use ndarray::{Array1, Array2, ArrayView2};
use std::time::Instant;

/// Options of a kernel ridge solve
#[derive(Debug, Clone)]
pub struct KernelSolveOptions {
    /// Ridge regularisation λ ≥ 0 (must be > 0 with preconditioning)
    pub ridge: f64,
    /// Absolute residual tolerance `eps` (`None` uses the precision's default)
    pub tolerance: Option<f64>,
    /// Iteration cap
    pub max_iterations: usize,
    /// Use the Nyström preconditioner
    pub use_preconditioner: bool,
    /// Seed for Nyström landmark sampling
    pub seed: Option<u64>,
    /// Log progress every N iterations (0 = no output)
    pub log_interval: usize,
    /// Use `λ·K(u, u)` in the Nyström landmark system
    pub ridge_scaled_landmarks: bool,
}

impl Default for KernelSolveOptions {
    fn default() -> Self {
        Self {
            ridge: 0.0,
            tolerance: None,
            max_iterations: 1000,
            use_preconditioner: false,
            seed: None,
            log_interval: 0,
            ridge_scaled_landmarks: false,
        }
    }
}

impl KernelSolveOptions {
    /// Iteration settings in element type `T`
    pub fn cg_config<T: RealScalar>(&self) -> CgConfig<T> {
        CgConfig {
            max_iterations: self.max_iterations,
            tolerance: T::from_f64_lossy(self.tolerance.unwrap_or(T::DEFAULT_TOLERANCE)),
            log_interval: self.log_interval,
        }
    }

    /// Nyström settings
    pub fn nystrom_config(&self) -> NystromConfig {
        NystromConfig {
            seed: self.seed,
            ridge_scaled_landmarks: self.ridge_scaled_landmarks,
        }
    }
}

/// Result of a converged kernel ridge solve
#[derive(Debug, Clone)]
pub struct KernelSolution<T: RealScalar> {
    /// Coefficients `a` (N × Dv)
    pub coefficients: Array2<T>,
    /// Number of operator applications
    pub iterations: usize,
    /// Final squared residual norm
    pub residual_norm_sqr: T,
    /// Whether the Nyström preconditioner was used
    pub preconditioned: bool,
}

/// Solve `(K(x, x) + λI) a = b` for the kernel described by `spec`
///
/// `x` is N×D and `b` is N×Dv; both are checked against the descriptor.
pub fn kernel_linear_solve<T: RealScalar>(
    spec: &KernelSpec,
    x: ArrayView2<'_, T>,
    b: ArrayView2<'_, T>,
    options: &KernelSolveOptions,
) -> Result<KernelSolution<T>> {
    spec.validate(x.ncols(), b.ncols())?;
    let resolved = spec.resolve::<T>()?;
    kernel_linear_solve_with(
        resolved.kernel.as_ref(),
        Some(resolved.cross.as_ref()),
        x,
        b,
        options,
    )
}

/// Solve `(K(x, x) + λI) a = b` with ready-made evaluators
///
/// `cross` is only needed when `options.use_preconditioner` is set.
pub fn kernel_linear_solve_with<T, K>(
    kernel: &K,
    cross: Option<&dyn CrossKernelEvaluator<T>>,
    x: ArrayView2<'_, T>,
    b: ArrayView2<'_, T>,
    options: &KernelSolveOptions,
) -> Result<KernelSolution<T>>
where
    T: RealScalar,
    K: KernelEvaluator<T> + ?Sized,
{
    let (n, dv) = b.dim();
    if x.nrows() != n {
        return Err(SolverError::DimensionMismatch {
            expected: x.nrows(),
            got: n,
        });
    }
    if n == 0 {
        return Err(SolverError::invalid("cannot solve on an empty point set"));
    }

    log::debug!(
        "Kernel solve: N = {}, D = {}, Dv = {}, parallel kernels: {}",
        n,
        x.ncols(),
        dv,
        is_parallel_available()
    );

    let start = Instant::now();
    let ridge = T::from_f64_lossy(options.ridge);
    let operator = KernelLinOp::new(kernel, x.view(), ridge, dv)?;
    let rhs: Array1<T> = b.iter().copied().collect();
    let config = options.cg_config::<T>();

    let solution = if options.use_preconditioner {
        let cross = cross.ok_or_else(|| {
            SolverError::invalid("Nyström preconditioning needs a cross-kernel evaluator")
        })?;
        let preconditioner = NystromPreconditioner::build(
            kernel,
            cross,
            x.view(),
            dv,
            ridge,
            &options.nystrom_config(),
        )?;
        pcg(&operator, &rhs, &preconditioner, &config)?
    } else {
        cg(&operator, &rhs, &config)?
    };
    let solution = solution.into_result()?;

    log::info!(
        "Kernel solve: N = {}, Dv = {}, {} iterations{}, {:.3} s",
        n,
        dv,
        solution.iterations,
        if options.use_preconditioner { " (Nyström)" } else { "" },
        start.elapsed().as_secs_f64()
    );

    let coefficients = solution
        .x
        .into_shape_with_order((n, dv))
        .map_err(|e| SolverError::invalid(format!("coefficient layout: {e}")))?;

    Ok(KernelSolution {
        coefficients,
        iterations: solution.iterations,
        residual_norm_sqr: solution.residual_norm_sqr,
        preconditioned: options.use_preconditioner,
    })
}
