//! Preconditioners for the iterative solvers
//!
//! - [`IdentityPreconditioner`]: no preconditioning
//! - [`NystromPreconditioner`]: low-rank landmark approximation of
//!   `(K(x, x) + λI)^(-1)`

mod nystrom;

pub use crate::traits::IdentityPreconditioner;
pub use nystrom::{
    MIN_POINTS, NystromConfig, NystromPreconditioner, landmark_count, sample_landmarks,
};
