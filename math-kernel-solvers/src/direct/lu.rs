//! LU decomposition solver
//!
//! LU factorization with partial pivoting for the small dense systems that
//! appear when building low-rank preconditioners. Factorise once, then solve
//! for as many right-hand sides as needed.

use crate::error::SolverError;
use crate::traits::RealScalar;
use ndarray::{Array1, Array2};
use thiserror::Error;

/// Errors that can occur during LU factorization
#[derive(Error, Debug)]
pub enum LuError {
    #[error("Matrix is singular or nearly singular")]
    SingularMatrix,
    #[error("Matrix dimensions mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

impl From<LuError> for SolverError {
    fn from(err: LuError) -> Self {
        match err {
            LuError::SingularMatrix => {
                SolverError::NumericalInstability("singular dense system in LU solve".into())
            }
            LuError::DimensionMismatch { expected, got } => {
                SolverError::DimensionMismatch { expected, got }
            }
        }
    }
}

/// Pivots smaller than this, relative to the largest entry, count as zero.
const RELATIVE_PIVOT_TOLERANCE: f64 = 1e-13;

/// LU factorization result
///
/// Stores L and U factors along with pivot information
#[derive(Debug, Clone)]
pub struct LuFactorization<T: RealScalar> {
    /// Combined L and U matrices (L is unit lower triangular, stored below diagonal)
    pub lu: Array2<T>,
    /// Row permutation: row `i` of PA is row `pivots[i]` of A
    pub pivots: Vec<usize>,
    /// Matrix dimension
    pub n: usize,
}

impl<T: RealScalar> LuFactorization<T> {
    /// Solve Ax = b using the pre-computed LU factorization
    pub fn solve(&self, b: &Array1<T>) -> Result<Array1<T>, LuError> {
        if b.len() != self.n {
            return Err(LuError::DimensionMismatch {
                expected: self.n,
                got: b.len(),
            });
        }

        let mut x: Array1<T> = self.pivots.iter().map(|&p| b[p]).collect();

        // Forward substitution: Ly = Pb
        for i in 0..self.n {
            for j in 0..i {
                let l_ij = self.lu[[i, j]];
                let xj = x[j];
                x[i] -= l_ij * xj;
            }
        }

        // Backward substitution: Ux = y
        for i in (0..self.n).rev() {
            for j in (i + 1)..self.n {
                let u_ij = self.lu[[i, j]];
                let xj = x[j];
                x[i] -= u_ij * xj;
            }
            x[i] /= self.lu[[i, i]];
        }

        Ok(x)
    }

    /// Solve AX = B for every column of B
    pub fn solve_columns(&self, b: &Array2<T>) -> Result<Array2<T>, LuError> {
        if b.nrows() != self.n {
            return Err(LuError::DimensionMismatch {
                expected: self.n,
                got: b.nrows(),
            });
        }

        let mut x = Array2::zeros(b.raw_dim());
        for (col_in, mut col_out) in b.columns().into_iter().zip(x.columns_mut()) {
            let solved = self.solve(&col_in.to_owned())?;
            col_out.assign(&solved);
        }
        Ok(x)
    }
}

/// Compute LU factorization with partial pivoting
pub fn lu_factorize<T: RealScalar>(a: &Array2<T>) -> Result<LuFactorization<T>, LuError> {
    let n = a.nrows();
    if n != a.ncols() {
        return Err(LuError::DimensionMismatch {
            expected: n,
            got: a.ncols(),
        });
    }

    let scale = a.iter().fold(T::zero(), |acc, v| acc.max(v.abs()));
    let threshold = scale * T::from_f64_lossy(RELATIVE_PIVOT_TOLERANCE);

    let mut lu = a.clone();
    let mut pivots: Vec<usize> = (0..n).collect();

    for k in 0..n {
        // Find pivot
        let mut max_val = lu[[k, k]].abs();
        let mut max_row = k;

        for i in (k + 1)..n {
            let val = lu[[i, k]].abs();
            if val > max_val {
                max_val = val;
                max_row = i;
            }
        }

        // Check for singularity
        if max_val.is_nan() || max_val <= threshold {
            return Err(LuError::SingularMatrix);
        }

        // Swap rows if needed
        if max_row != k {
            for j in 0..n {
                lu.swap([k, j], [max_row, j]);
            }
            pivots.swap(k, max_row);
        }

        // Compute multipliers and eliminate
        let pivot = lu[[k, k]];
        for i in (k + 1)..n {
            let mult = lu[[i, k]] / pivot;
            lu[[i, k]] = mult; // Store multiplier in L part

            for j in (k + 1)..n {
                let update = mult * lu[[k, j]];
                lu[[i, j]] -= update;
            }
        }
    }

    Ok(LuFactorization { lu, pivots, n })
}

/// Solve Ax = b using LU decomposition
///
/// This is a convenience function that combines factorization and solve.
pub fn lu_solve<T: RealScalar>(a: &Array2<T>, b: &Array1<T>) -> Result<Array1<T>, LuError> {
    let factorization = lu_factorize(a)?;
    factorization.solve(b)
}
