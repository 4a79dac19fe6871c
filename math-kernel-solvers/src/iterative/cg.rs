//! CG (Conjugate Gradient) solver
//!
//! The Conjugate Gradient method for symmetric positive definite systems.
//! The stopping rule is absolute: iterate until `||r||² < eps²`, so `eps`
//! has to be chosen relative to the magnitude of `b`.

use crate::blas_helpers::{axpy, dot, norm_sqr, xpby};
use crate::error::{Result, SolverError};
use crate::traits::{LinearOperator, RealScalar};
use ndarray::Array1;

/// CG solver configuration
#[derive(Debug, Clone)]
pub struct CgConfig<R> {
    /// Maximum number of iterations before giving up
    pub max_iterations: usize,
    /// Absolute residual tolerance `eps`, compared as `||r||² < eps²`
    pub tolerance: R,
    /// Log progress every N iterations (0 = no output)
    pub log_interval: usize,
}

impl<R: RealScalar> Default for CgConfig<R> {
    fn default() -> Self {
        Self::with_tolerance(R::from_f64_lossy(R::DEFAULT_TOLERANCE))
    }
}

impl<R: RealScalar> CgConfig<R> {
    /// Config with the given tolerance and the precision's other defaults
    pub fn with_tolerance(tolerance: R) -> Self {
        Self {
            max_iterations: 1000,
            tolerance,
            log_interval: 0,
        }
    }

    /// Replace the iteration cap
    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub(crate) fn tolerance_sqr(&self) -> R {
        self.tolerance * self.tolerance
    }

    pub(crate) fn should_log(&self, iteration: usize) -> bool {
        self.log_interval > 0 && iteration % self.log_interval == 0
    }
}

/// Why an iteration stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// `||r||² < eps²` was reached
    Converged,
    /// The iteration cap was hit first
    MaxIterationsReached,
    /// Non-positive or non-finite curvature: the operator (or preconditioner)
    /// is not SPD on the explored subspace
    NumericalInstability,
}

/// CG / PCG solver result
#[derive(Debug, Clone)]
pub struct CgSolution<T: RealScalar> {
    /// Solution vector
    pub x: Array1<T>,
    /// Number of operator applications performed
    pub iterations: usize,
    /// Final squared residual norm `||r||²`
    pub residual_norm_sqr: T,
    /// Reason the iteration stopped
    pub termination: Termination,
}

impl<T: RealScalar> CgSolution<T> {
    /// Whether the tolerance was reached
    pub fn converged(&self) -> bool {
        self.termination == Termination::Converged
    }

    /// Final residual norm `||r||`
    pub fn residual_norm(&self) -> T {
        self.residual_norm_sqr.sqrt()
    }

    /// Turn a non-converged run into the matching error
    pub fn into_result(self) -> Result<Self> {
        match self.termination {
            Termination::Converged => Ok(self),
            Termination::MaxIterationsReached => Err(SolverError::DidNotConverge {
                iterations: self.iterations,
                residual: self.residual_norm().to_f64_lossy(),
            }),
            Termination::NumericalInstability => Err(SolverError::NumericalInstability(format!(
                "curvature breakdown after {} iterations (residual norm {:.3e})",
                self.iterations,
                self.residual_norm().to_f64_lossy()
            ))),
        }
    }

    pub(crate) fn zero(n: usize) -> Self {
        Self {
            x: Array1::zeros(n),
            iterations: 0,
            residual_norm_sqr: T::zero(),
            termination: Termination::Converged,
        }
    }
}

/// `p·Ap` must be strictly positive and finite for an SPD operator
#[inline]
pub(crate) fn is_valid_curvature<T: RealScalar>(value: T) -> bool {
    value.is_finite() && value > T::zero()
}

pub(crate) fn check_system<T, A>(operator: &A, b: &Array1<T>) -> Result<()>
where
    T: RealScalar,
    A: LinearOperator<T> + ?Sized,
{
    if !operator.is_square() {
        return Err(SolverError::invalid(format!(
            "CG needs a square operator, got {}x{}",
            operator.num_rows(),
            operator.num_cols()
        )));
    }
    if b.len() != operator.num_cols() {
        return Err(SolverError::DimensionMismatch {
            expected: operator.num_cols(),
            got: b.len(),
        });
    }
    Ok(())
}

/// Solve Ax = b using the Conjugate Gradient method
///
/// Starts from x = 0. The first step is always taken, even when `||b||`
/// is already below tolerance; an exactly zero `b` returns x = 0 without
/// touching the operator.
///
/// Operator errors are propagated. Stagnation and breakdown are reported
/// through [`CgSolution::termination`]; use [`CgSolution::into_result`] to
/// turn them into errors.
///
/// Note: This method is only correct for symmetric positive definite operators.
pub fn cg<T, A>(operator: &A, b: &Array1<T>, config: &CgConfig<T>) -> Result<CgSolution<T>>
where
    T: RealScalar,
    A: LinearOperator<T> + ?Sized,
{
    check_system(operator, b)?;

    let n = b.len();
    let mut nr2 = norm_sqr(b);
    if nr2 == T::zero() {
        log::debug!("CG: zero right-hand side, returning zero solution");
        return Ok(CgSolution::zero(n));
    }

    let eps2 = config.tolerance_sqr();
    let mut x = Array1::zeros(n);
    let mut r = b.clone();
    let mut p = r.clone();

    for iter in 0..config.max_iterations {
        let mp = operator.apply(&p)?;

        let curvature = dot(&p, &mp);
        if !is_valid_curvature(curvature) {
            log::warn!(
                "CG breakdown at iteration {}: p·Ap = {:.3e}",
                iter + 1,
                curvature.to_f64_lossy()
            );
            return Ok(CgSolution {
                x,
                iterations: iter + 1,
                residual_norm_sqr: nr2,
                termination: Termination::NumericalInstability,
            });
        }

        let alpha = nr2 / curvature;
        axpy(alpha, &p, &mut x);
        axpy(-alpha, &mp, &mut r);

        let nr2_new = norm_sqr(&r);

        if config.should_log(iter + 1) {
            log::info!(
                "CG iteration {}: residual norm = {:.6e}",
                iter + 1,
                nr2_new.sqrt().to_f64_lossy()
            );
        }

        if nr2_new < eps2 {
            log::debug!("CG converged: numiters = {}", iter + 1);
            return Ok(CgSolution {
                x,
                iterations: iter + 1,
                residual_norm_sqr: nr2_new,
                termination: Termination::Converged,
            });
        }

        xpby(&r, nr2_new / nr2, &mut p);
        nr2 = nr2_new;
    }

    log::warn!(
        "CG did not converge after {} iterations (residual norm {:.3e})",
        config.max_iterations,
        nr2.sqrt().to_f64_lossy()
    );
    Ok(CgSolution {
        x,
        iterations: config.max_iterations,
        residual_norm_sqr: nr2,
        termination: Termination::MaxIterationsReached,
    })
}
