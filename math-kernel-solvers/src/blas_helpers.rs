//! Vector kernels used by the Krylov solvers
//!
//! Plain loops over contiguous `ndarray` storage; the expensive part of a
//! kernel solve is the operator application, not these updates.

use crate::traits::RealScalar;
use ndarray::Array1;

/// Compute inner product (x, y) = Σ x_i * y_i
#[inline]
pub fn dot<T: RealScalar>(x: &Array1<T>, y: &Array1<T>) -> T {
    debug_assert_eq!(x.len(), y.len(), "vector lengths must match for dot");
    let mut sum = T::zero();
    for (&xi, &yi) in x.iter().zip(y.iter()) {
        sum += xi * yi;
    }
    sum
}

/// Compute vector norm squared: ||x||_2^2 = Σ x_i^2
#[inline]
pub fn norm_sqr<T: RealScalar>(x: &Array1<T>) -> T {
    dot(x, x)
}

/// Compute axpy: y = α * x + y
#[inline]
pub fn axpy<T: RealScalar>(alpha: T, x: &Array1<T>, y: &mut Array1<T>) {
    for (&xi, yi) in x.iter().zip(y.iter_mut()) {
        *yi += alpha * xi;
    }
}

/// Update a search direction in place: p = r + β * p
#[inline]
pub fn xpby<T: RealScalar>(r: &Array1<T>, beta: T, p: &mut Array1<T>) {
    p.zip_mut_with(r, |pi, &ri| *pi = ri + beta * *pi);
}
