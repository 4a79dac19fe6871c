//! Kernel Ridge Solve Tests
//!
//! End-to-end solves of `(K(x, x) + λI) a = b` on random point clouds,
//! with and without Nyström preconditioning.

use math_kernel_solvers::{
    CgConfig, GaussianKernel, InverseSolveNode, KernelEvaluator, KernelLinOp, KernelSolveOptions,
    KernelSpec, LinearOperator, Result, ReverseNode, SolverConfig, kernel_linear_solve,
    kernel_linear_solve_with,
};
use ndarray::{Array1, Array2, ArrayView2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn random_points(n: usize, d: usize, seed: u64) -> Array2<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    Array2::from_shape_fn((n, d), |_| rng.random_range(-2.0..2.0))
}

fn flatten(a: &Array2<f64>) -> Array1<f64> {
    a.iter().copied().collect()
}

fn norm(v: &Array1<f64>) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

/// `K ≡ 0`, so the regularised operator is `λI`
struct ZeroKernel;

impl KernelEvaluator<f64> for ZeroKernel {
    fn matrix(&self, x: ArrayView2<'_, f64>, y: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        Ok(Array2::zeros((x.nrows(), y.nrows())))
    }

    fn apply(
        &self,
        x: ArrayView2<'_, f64>,
        _y: ArrayView2<'_, f64>,
        b: ArrayView2<'_, f64>,
    ) -> Result<Array2<f64>> {
        Ok(Array2::zeros((x.nrows(), b.ncols())))
    }
}

#[test]
fn test_gaussian_ridge_solve_2d() {
    init_logger();

    let x = random_points(100, 2, 42);
    let b = Array2::ones((100, 1));
    let options = KernelSolveOptions {
        ridge: 0.1,
        tolerance: Some(1e-6),
        ..Default::default()
    };

    let solution =
        kernel_linear_solve(&KernelSpec::gaussian(2, 1, 1.0), x.view(), b.view(), &options).unwrap();
    println!("CG iterations: {}", solution.iterations);
    assert!(solution.iterations < 200);

    let kernel = GaussianKernel::new(1.0).unwrap();
    let op = KernelLinOp::new(&kernel, x.view(), 0.1, 1).unwrap();
    let residual = op.apply(&flatten(&solution.coefficients)).unwrap() - &flatten(&b);
    assert!(norm(&residual) < 1e-5, "residual {}", norm(&residual));
}

#[test]
fn test_preconditioned_and_plain_agree() {
    init_logger();

    let x = random_points(100, 2, 7);
    let b = Array2::from_shape_fn((100, 1), |(i, _)| (i as f64 * 0.1).cos());
    let spec = KernelSpec::gaussian(2, 1, 1.0);
    let plain = KernelSolveOptions {
        ridge: 0.1,
        tolerance: Some(1e-8),
        ..Default::default()
    };
    let nystrom = KernelSolveOptions {
        use_preconditioner: true,
        seed: Some(2024),
        ..plain.clone()
    };

    let cg = kernel_linear_solve(&spec, x.view(), b.view(), &plain).unwrap();
    let pcg = kernel_linear_solve(&spec, x.view(), b.view(), &nystrom).unwrap();
    println!("CG: {} iterations, PCG: {} iterations", cg.iterations, pcg.iterations);
    assert!(pcg.iterations <= cg.iterations);

    for (u, v) in cg.coefficients.iter().zip(pcg.coefficients.iter()) {
        assert!((u - v).abs() < 1e-5);
    }
}

#[test]
fn test_woodbury_landmarks_agree() {
    let x = random_points(64, 2, 3);
    let b = Array2::ones((64, 1));
    let spec = KernelSpec::gaussian(2, 1, 0.8);
    let options = KernelSolveOptions {
        ridge: 0.2,
        tolerance: Some(1e-8),
        use_preconditioner: true,
        seed: Some(1),
        ridge_scaled_landmarks: true,
        ..Default::default()
    };
    let reference = KernelSolveOptions {
        use_preconditioner: false,
        ..options.clone()
    };

    let scaled = kernel_linear_solve(&spec, x.view(), b.view(), &options).unwrap();
    let plain = kernel_linear_solve(&spec, x.view(), b.view(), &reference).unwrap();
    assert!(scaled.iterations <= plain.iterations);
    for (u, v) in scaled.coefficients.iter().zip(plain.coefficients.iter()) {
        assert!((u - v).abs() < 1e-5);
    }
}

#[test]
fn test_nystrom_needs_no_more_iterations() {
    let spec = KernelSpec::gaussian(2, 1, 1.0);
    let b = Array2::ones((100, 1));
    let plain = KernelSolveOptions {
        ridge: 0.1,
        tolerance: Some(1e-6),
        ..Default::default()
    };

    for seed in [1, 42, 7, 99] {
        let x = random_points(100, 2, seed);
        let cg = kernel_linear_solve(&spec, x.view(), b.view(), &plain).unwrap();
        for ridge_scaled_landmarks in [false, true] {
            let options = KernelSolveOptions {
                use_preconditioner: true,
                seed: Some(seed),
                ridge_scaled_landmarks,
                ..plain.clone()
            };
            let pcg = kernel_linear_solve(&spec, x.view(), b.view(), &options).unwrap();
            assert!(
                pcg.iterations <= cg.iterations,
                "seed {seed}: PCG {} vs CG {}",
                pcg.iterations,
                cg.iterations
            );
        }
    }
}

#[test]
fn test_resolve_recovers_solution() {
    let x = random_points(60, 3, 11);
    let b = Array2::from_shape_fn((60, 1), |(i, _)| 1.0 + (i % 5) as f64);
    let spec = KernelSpec::gaussian(3, 1, 1.2);
    let options = KernelSolveOptions {
        ridge: 0.3,
        tolerance: Some(1e-10),
        ..Default::default()
    };
    let first = kernel_linear_solve(&spec, x.view(), b.view(), &options).unwrap();

    let kernel = GaussianKernel::new(1.2).unwrap();
    let op = KernelLinOp::new(&kernel, x.view(), 0.3, 1).unwrap();
    let b2 = op.apply(&flatten(&first.coefficients)).unwrap();
    let b2 = b2.into_shape_with_order((60, 1)).unwrap();

    let second = kernel_linear_solve(&spec, x.view(), b2.view(), &options).unwrap();
    for (u, v) in first.coefficients.iter().zip(second.coefficients.iter()) {
        assert!((u - v).abs() < 1e-7);
    }
}

#[test]
fn test_identity_operator_single_iteration() {
    let x = random_points(10, 2, 5);
    let b = Array2::from_shape_fn((10, 2), |(i, j)| i as f64 - 3.0 * j as f64);
    let options = KernelSolveOptions {
        ridge: 1.0,
        ..Default::default()
    };

    let solution = kernel_linear_solve_with(&ZeroKernel, None, x.view(), b.view(), &options).unwrap();

    assert_eq!(solution.iterations, 1);
    for (a, bi) in solution.coefficients.iter().zip(b.iter()) {
        assert!((a - bi).abs() < 1e-12);
    }
}

#[test]
fn test_multi_column_preconditioned() {
    let x = random_points(49, 2, 8);
    let b = Array2::from_shape_fn((49, 2), |(i, j)| if j == 0 { 1.0 } else { (i as f64).sin() });
    let options = KernelSolveOptions {
        ridge: 0.1,
        tolerance: Some(1e-8),
        use_preconditioner: true,
        seed: Some(99),
        ..Default::default()
    };

    let solution =
        kernel_linear_solve(&KernelSpec::gaussian(2, 2, 1.0), x.view(), b.view(), &options).unwrap();
    assert_eq!(solution.coefficients.dim(), (49, 2));

    let kernel = GaussianKernel::new(1.0).unwrap();
    let op = KernelLinOp::new(&kernel, x.view(), 0.1, 2).unwrap();
    let residual = op.apply(&flatten(&solution.coefficients)).unwrap() - &flatten(&b);
    assert!(norm(&residual) < 1e-7);
}

#[test]
fn test_config_driven_solve() {
    init_logger();

    let config = SolverConfig::from_json_str(
        r#"{
            "kernel": { "type": "gaussian", "dim": 2, "value_dim": 1, "bandwidth": 1.0 },
            "ridge": 0.1,
            "tolerance": 1e-7,
            "max_iterations": 500,
            "preconditioner": { "type": "nystrom", "seed": 17 },
            "log_interval": 10
        }"#,
    )
    .unwrap();

    let x = random_points(81, 2, 13);
    let b = Array2::ones((81, 1));
    let solution = kernel_linear_solve(&config.kernel, x.view(), b.view(), &config.to_options()).unwrap();

    assert!(solution.preconditioned);
    assert!(solution.residual_norm_sqr < 1e-14);
}

#[test]
fn test_max_iterations_reported() {
    let x = random_points(50, 2, 21);
    let b = Array2::ones((50, 1));
    let options = KernelSolveOptions {
        ridge: 1e-4,
        tolerance: Some(1e-12),
        max_iterations: 3,
        ..Default::default()
    };

    let err = kernel_linear_solve(&KernelSpec::gaussian(2, 1, 1.0), x.view(), b.view(), &options)
        .unwrap_err();
    assert!(err.is_convergence_error());
    println!("{err}");
}

#[test]
fn test_f32_solve() {
    let x = random_points(30, 2, 4).mapv(|v| v as f32);
    let b = Array2::<f32>::ones((30, 1));
    let options = KernelSolveOptions {
        ridge: 0.5,
        tolerance: Some(1e-3),
        ..Default::default()
    };

    let solution =
        kernel_linear_solve(&KernelSpec::gaussian(2, 1, 1.0), x.view(), b.view(), &options).unwrap();
    assert!(solution.residual_norm_sqr < 1e-6);
}

#[test]
fn test_gradient_through_kernel_solve() {
    let x = random_points(20, 2, 6);
    let kernel = GaussianKernel::new(1.0).unwrap();
    let op = KernelLinOp::new(&kernel, x.view(), 0.2, 1).unwrap();
    let b = Array1::from_shape_fn(20, |i| (i as f64 * 0.5).sin());
    let w = Array1::from_shape_fn(20, |i| 1.0 / (1.0 + i as f64));

    let mut node = InverseSolveNode::new(&op, CgConfig::with_tolerance(1e-12));
    let a = node.forward(&b).unwrap();
    let grad = node.backward(&w).unwrap();

    // L = w·a = w·A^(-1)b, so ∂L/∂b·b recovers L for a linear solve
    let loss: f64 = w.iter().zip(a.iter()).map(|(wi, ai)| wi * ai).sum();
    let reconstructed: f64 = grad.iter().zip(b.iter()).map(|(gi, bi)| gi * bi).sum();
    assert!((loss - reconstructed).abs() < 1e-8);
}

#[test]
fn test_f32_default_tolerance() {
    let x = random_points(100, 2, 42).mapv(|v| v as f32);
    let b = Array2::<f32>::ones((100, 1));
    let options = KernelSolveOptions {
        ridge: 0.1,
        ..Default::default()
    };

    let solution =
        kernel_linear_solve(&KernelSpec::gaussian(2, 1, 1.0), x.view(), b.view(), &options).unwrap();
    assert!(solution.residual_norm_sqr < 1e-8);
}
