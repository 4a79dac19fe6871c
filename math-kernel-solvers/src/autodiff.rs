//! Differentiable inverse solve
//!
//! [`InverseSolveNode`] wraps `a = A^(-1) b` as a reverse-mode node for an
//! enclosing autodiff system. For a symmetric operator the vector-Jacobian
//! product of the solve is another solve: `∂L/∂b = A^(-1) ∂L/∂a`. The
//! backward pass reuses the operator, preconditioner and tolerances of the
//! forward pass.

use crate::blas_helpers::dot;
use crate::error::{Result, SolverError};
use crate::iterative::{CgConfig, cg, pcg};
use crate::traits::{IdentityPreconditioner, LinearOperator, Preconditioner, RealScalar};
use ndarray::Array1;

/// A node of a reverse-mode computation graph
pub trait ReverseNode<T: RealScalar> {
    /// Evaluate the node and keep what the backward pass needs
    fn forward(&mut self, input: &Array1<T>) -> Result<Array1<T>>;

    /// Map the output gradient to the input gradient
    fn backward(&self, grad_output: &Array1<T>) -> Result<Array1<T>>;
}

/// `b ↦ A^(-1) b` for a symmetric positive definite operator `A`
pub struct InverseSolveNode<'a, T, A, P = IdentityPreconditioner>
where
    T: RealScalar,
    A: LinearOperator<T> + ?Sized,
    P: Preconditioner<T> + ?Sized,
{
    operator: &'a A,
    preconditioner: Option<&'a P>,
    config: CgConfig<T>,
    solution: Option<Array1<T>>,
}

impl<'a, T, A> InverseSolveNode<'a, T, A>
where
    T: RealScalar,
    A: LinearOperator<T> + ?Sized,
{
    /// Node solving with plain CG
    pub fn new(operator: &'a A, config: CgConfig<T>) -> Self {
        Self {
            operator,
            preconditioner: None,
            config,
            solution: None,
        }
    }
}

impl<'a, T, A, P> InverseSolveNode<'a, T, A, P>
where
    T: RealScalar,
    A: LinearOperator<T> + ?Sized,
    P: Preconditioner<T> + ?Sized,
{
    /// Node solving with PCG in both directions
    pub fn with_preconditioner(operator: &'a A, preconditioner: &'a P, config: CgConfig<T>) -> Self {
        Self {
            operator,
            preconditioner: Some(preconditioner),
            config,
            solution: None,
        }
    }

    /// Solution saved by the last forward pass
    pub fn saved_solution(&self) -> Option<&Array1<T>> {
        self.solution.as_ref()
    }

    /// `∂L/∂λ` for an operator of the form `K + λI`
    ///
    /// With `a = (K + λI)^(-1) b` we have `∂a/∂λ = -(K + λI)^(-1) a`, so
    /// `∂L/∂λ = -(A^(-1) g)·a` for the output gradient `g`.
    pub fn ridge_gradient(&self, grad_output: &Array1<T>) -> Result<T> {
        let grad_input = self.backward(grad_output)?;
        let a = self.saved()?;
        Ok(-dot(&grad_input, a))
    }

    fn saved(&self) -> Result<&Array1<T>> {
        self.solution
            .as_ref()
            .ok_or_else(|| SolverError::invalid("backward called before forward"))
    }

    fn solve(&self, rhs: &Array1<T>) -> Result<Array1<T>> {
        let solution = match self.preconditioner {
            Some(p) => pcg(self.operator, rhs, p, &self.config)?,
            None => cg(self.operator, rhs, &self.config)?,
        };
        Ok(solution.into_result()?.x)
    }
}

impl<T, A, P> ReverseNode<T> for InverseSolveNode<'_, T, A, P>
where
    T: RealScalar,
    A: LinearOperator<T> + ?Sized,
    P: Preconditioner<T> + ?Sized,
{
    fn forward(&mut self, input: &Array1<T>) -> Result<Array1<T>> {
        let a = self.solve(input)?;
        self.solution = Some(a.clone());
        Ok(a)
    }

    fn backward(&self, grad_output: &Array1<T>) -> Result<Array1<T>> {
        self.saved()?;
        self.solve(grad_output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernels::GaussianKernel;
    use crate::operator::KernelLinOp;
    use approx::assert_relative_eq;
    use ndarray::{Array2, array};

    fn spd_matrix() -> Array2<f64> {
        array![[4.0, 1.0, 0.2], [1.0, 3.0, 0.5], [0.2, 0.5, 2.0]]
    }

    // L(b) = w · A^(-1) b
    fn loss(a: &Array2<f64>, b: &Array1<f64>, w: &Array1<f64>) -> f64 {
        let mut node = InverseSolveNode::new(a, CgConfig::with_tolerance(1e-13));
        dot(w, &node.forward(b).unwrap())
    }

    #[test]
    fn test_backward_matches_finite_differences() {
        let a = spd_matrix();
        let b = array![1.0, -0.5, 2.0];
        let w = array![0.3, 1.0, -0.7];

        let mut node = InverseSolveNode::new(&a, CgConfig::with_tolerance(1e-13));
        node.forward(&b).unwrap();
        let grad = node.backward(&w).unwrap();

        let h = 1e-6;
        for i in 0..3 {
            let mut plus = b.clone();
            let mut minus = b.clone();
            plus[i] += h;
            minus[i] -= h;
            let fd = (loss(&a, &plus, &w) - loss(&a, &minus, &w)) / (2.0 * h);
            assert_relative_eq!(grad[i], fd, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_backward_is_solve_not_apply() {
        let a = array![[2.0, 0.0], [0.0, 4.0]];
        let mut node = InverseSolveNode::new(&a, CgConfig::with_tolerance(1e-12));
        node.forward(&array![1.0, 1.0]).unwrap();

        let grad = node.backward(&array![1.0, 1.0]).unwrap();
        assert_relative_eq!(grad[0], 0.5, epsilon = 1e-12);
        assert_relative_eq!(grad[1], 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_forward_saves_solution() {
        let a = spd_matrix();
        let b = array![1.0, 2.0, 3.0];
        let mut node = InverseSolveNode::new(&a, CgConfig::with_tolerance(1e-12));
        assert!(node.saved_solution().is_none());

        let x = node.forward(&b).unwrap();
        assert_eq!(node.saved_solution(), Some(&x));
        let residual = &a.dot(&x) - &b;
        assert!(dot(&residual, &residual) < 1e-22);
    }

    #[test]
    fn test_backward_before_forward() {
        let a = spd_matrix();
        let node = InverseSolveNode::new(&a, CgConfig::default());
        let err = node.backward(&array![1.0, 0.0, 0.0]).unwrap_err();
        assert!(err.is_argument_error());
        assert!(node.ridge_gradient(&array![1.0, 0.0, 0.0]).is_err());
    }

    #[test]
    fn test_preconditioned_node() {
        let a = spd_matrix();
        let b = array![0.5, -1.0, 1.5];
        let w = array![1.0, 1.0, 1.0];

        let mut plain = InverseSolveNode::new(&a, CgConfig::with_tolerance(1e-12));
        let mut precond = InverseSolveNode::with_preconditioner(
            &a,
            &IdentityPreconditioner,
            CgConfig::with_tolerance(1e-12),
        );
        let x0 = plain.forward(&b).unwrap();
        let x1 = precond.forward(&b).unwrap();
        let g0 = plain.backward(&w).unwrap();
        let g1 = precond.backward(&w).unwrap();
        for i in 0..3 {
            assert_relative_eq!(x0[i], x1[i], epsilon = 1e-10);
            assert_relative_eq!(g0[i], g1[i], epsilon = 1e-10);
        }
    }

    #[test]
    fn test_ridge_gradient_matches_finite_differences() {
        let kernel = GaussianKernel::new(1.0_f64).unwrap();
        let x = array![[0.0], [0.4], [1.0], [1.7], [2.5]];
        let b = array![1.0, -1.0, 0.5, 2.0, 0.0];
        let w = array![0.2, 0.4, -1.0, 0.3, 1.0];
        let ridge = 0.5;

        let solve_loss = |lambda: f64| -> f64 {
            let op = KernelLinOp::new(&kernel, x.view(), lambda, 1).unwrap();
            let mut node = InverseSolveNode::new(&op, CgConfig::with_tolerance(1e-13));
            dot(&w, &node.forward(&b).unwrap())
        };

        let op = KernelLinOp::new(&kernel, x.view(), ridge, 1).unwrap();
        let mut node = InverseSolveNode::new(&op, CgConfig::with_tolerance(1e-13));
        node.forward(&b).unwrap();
        let grad = node.ridge_gradient(&w).unwrap();

        let h = 1e-5;
        let fd = (solve_loss(ridge + h) - solve_loss(ridge - h)) / (2.0 * h);
        assert_relative_eq!(grad, fd, epsilon = 1e-6);
    }
}
