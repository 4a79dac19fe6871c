//! Conjugate-gradient solvers for kernel ridge systems
//!
//! This crate solves `(K(x, x) + λI) a = b` for a positive definite kernel
//! `K`, without ever forming the N×N kernel matrix: the operator is applied
//! through fused kernel-times-matrix products.
//!
//! # Features
//!
//! - **Iterative Solvers**: CG and PCG with an absolute residual test
//! - **Preconditioners**: Nyström landmark inverse, identity
//! - **Kernels**: Gaussian kernel and its Nyström cross-kernel
//! - **Autodiff**: reverse-mode node whose backward pass is the adjoint solve
//! - **Configuration**: JSON solver configuration
//! - **Generic Scalar Types**: f64, f32
//!
//! # Example
//!
//! ```ignore
//! use math_kernel_solvers::{KernelSolveOptions, KernelSpec, kernel_linear_solve};
//!
//! let spec = KernelSpec::gaussian(2, 1, 1.0);
//! let options = KernelSolveOptions {
//!     ridge: 0.1,
//!     use_preconditioner: true,
//!     ..Default::default()
//! };
//! let solution = kernel_linear_solve(&spec, x.view(), b.view(), &options)?;
//! ```

pub mod autodiff;
pub mod blas_helpers;
pub mod config;
pub mod direct;
pub mod error;
pub mod iterative;
pub mod kernels;
pub mod operator;
pub mod parallel;
pub mod preconditioners;
pub mod solve;
pub mod traits;

// Re-export main types
pub use error::{Result, SolverError};
pub use operator::{FnOperator, KernelLinOp};
pub use traits::{LinearOperator, Preconditioner, RealScalar};

// Re-export kernels
pub use kernels::{
    CrossKernelEvaluator, GaussianCrossKernel, GaussianKernel, KernelEvaluator, KernelSpec,
    ResolvedKernel,
};

// Re-export iterative solvers
pub use iterative::{CgConfig, CgSolution, Termination, cg, pcg};

// Re-export direct solvers
pub use direct::{LuFactorization, lu_solve};

// Re-export preconditioners
pub use preconditioners::{IdentityPreconditioner, NystromConfig, NystromPreconditioner};

pub use autodiff::{InverseSolveNode, ReverseNode};
pub use config::{PreconditionerConfig, SolverConfig};
pub use solve::{KernelSolution, KernelSolveOptions, kernel_linear_solve, kernel_linear_solve_with};
