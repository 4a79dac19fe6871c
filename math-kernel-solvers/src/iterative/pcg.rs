//! Preconditioned Conjugate Gradient solver
//!
//! Same recurrence as [`cg`](super::cg) with directions built from
//! `z = M^(-1) r`; the tracked scalar is `r·z`. The stopping test stays on
//! the unpreconditioned `||r||² < eps²`, so CG and PCG stop at the same
//! accuracy and only differ in how many steps they need.

use super::cg::{CgConfig, CgSolution, Termination, check_system, is_valid_curvature};
use crate::blas_helpers::{axpy, dot, norm_sqr, xpby};
use crate::error::{Result, SolverError};
use crate::traits::{LinearOperator, Preconditioner, RealScalar};
use ndarray::Array1;

fn apply_preconditioner<T, P>(preconditioner: &P, r: &Array1<T>) -> Result<Array1<T>>
where
    T: RealScalar,
    P: Preconditioner<T> + ?Sized,
{
    let z = preconditioner.apply(r)?;
    if z.len() != r.len() {
        return Err(SolverError::DimensionMismatch {
            expected: r.len(),
            got: z.len(),
        });
    }
    Ok(z)
}

/// Solve Ax = b using the Preconditioned Conjugate Gradient method
///
/// `preconditioner` applies an approximation of A^(-1); it must be a
/// symmetric positive definite linear map for the recurrence to hold.
/// With [`IdentityPreconditioner`](crate::IdentityPreconditioner) this is
/// plain CG.
pub fn pcg<T, A, P>(
    operator: &A,
    b: &Array1<T>,
    preconditioner: &P,
    config: &CgConfig<T>,
) -> Result<CgSolution<T>>
where
    T: RealScalar,
    A: LinearOperator<T> + ?Sized,
    P: Preconditioner<T> + ?Sized,
{
    check_system(operator, b)?;

    let n = b.len();
    let mut nr2 = norm_sqr(b);
    if nr2 == T::zero() {
        log::debug!("PCG: zero right-hand side, returning zero solution");
        return Ok(CgSolution::zero(n));
    }

    let eps2 = config.tolerance_sqr();
    let mut x = Array1::zeros(n);
    let mut r = b.clone();
    let mut z = apply_preconditioner(preconditioner, &r)?;
    let mut p = z.clone();
    let mut rz = dot(&r, &z);

    for iter in 0..config.max_iterations {
        if !is_valid_curvature(rz) {
            log::warn!(
                "PCG breakdown at iteration {}: r·z = {:.3e}",
                iter + 1,
                rz.to_f64_lossy()
            );
            return Ok(CgSolution {
                x,
                iterations: iter,
                residual_norm_sqr: nr2,
                termination: Termination::NumericalInstability,
            });
        }

        let ap = operator.apply(&p)?;
        let curvature = dot(&p, &ap);
        if !is_valid_curvature(curvature) {
            log::warn!(
                "PCG breakdown at iteration {}: p·Ap = {:.3e}",
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

        let alpha = rz / curvature;
        axpy(alpha, &p, &mut x);
        axpy(-alpha, &ap, &mut r);

        nr2 = norm_sqr(&r);

        if config.should_log(iter + 1) {
            log::info!(
                "PCG iteration {}: residual norm = {:.6e}",
                iter + 1,
                nr2.sqrt().to_f64_lossy()
            );
        }

        if nr2 < eps2 {
            log::debug!("PCG converged: numiters = {}", iter + 1);
            return Ok(CgSolution {
                x,
                iterations: iter + 1,
                residual_norm_sqr: nr2,
                termination: Termination::Converged,
            });
        }

        z = apply_preconditioner(preconditioner, &r)?;
        let rz_new = dot(&r, &z);
        xpby(&z, rz_new / rz, &mut p);
        rz = rz_new;
    }

    log::warn!(
        "PCG did not converge after {} iterations (residual norm {:.3e})",
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
