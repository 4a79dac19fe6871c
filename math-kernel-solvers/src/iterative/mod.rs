//! Iterative solvers for symmetric positive definite systems
//!
//! - [`cg`]: Conjugate Gradient
//! - [`pcg`]: Preconditioned Conjugate Gradient
//!
//! Both share [`CgConfig`] and report a [`CgSolution`] carrying the
//! [`Termination`] reason instead of looping until convergence.

mod cg;
mod pcg;

pub use cg::{CgConfig, CgSolution, Termination, cg};
pub use pcg::pcg;
