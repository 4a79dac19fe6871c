//! Direct solvers for linear systems
//!
//! This module provides direct (non-iterative) solvers:
//! - [`lu_solve`]: LU decomposition with partial pivoting
//! - [`LuFactorization::solve_columns`]: multiple right-hand sides against one factorization

mod lu;

pub use lu::{LuError, LuFactorization, lu_factorize, lu_solve};
