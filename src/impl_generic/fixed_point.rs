//! Safeguarded fixed-point driver.
//!
//! Runs x ← g(x) to convergence, feeding each iterate pair to an
//! accelerator which may replace the candidate with an extrapolated one.
//! When safeguarding is on, an accelerated step is judged on the following
//! iteration: if its residual norm grew beyond the slack times the
//! reference norm, the step is rolled back to the unaccelerated candidate
//! and the history is restarted.

use numr::algorithm::linalg::LinearAlgebraAlgorithms;
use numr::error::Result;
use numr::ops::{ScalarOps, TensorOps};
use numr::runtime::{Runtime, RuntimeClient};
use numr::tensor::Tensor;

use crate::error::{AccelError, AccelResult};
use crate::impl_generic::anderson::AndersonAccelerator;
use crate::impl_generic::empty::NoAccelerator;
use crate::impl_generic::utils::tensor_norm;
use crate::traits::{Acceleration, FixedPointAccelerator, FixedPointOptions};

/// Result from the fixed-point driver.
#[derive(Debug, Clone)]
pub struct TensorFixedPointResult<R: Runtime> {
    /// The fixed point found.
    pub x: Tensor<R>,
    /// Residual x − g(x) at the final iterate (near zero on convergence).
    pub residual: Tensor<R>,
    /// Number of iterations used.
    pub iterations: usize,
    /// Norm of the final residual.
    pub residual_norm: f64,
    /// Whether the iteration converged.
    pub converged: bool,
    /// How many iterations applied an extrapolated candidate.
    pub accelerated_steps: usize,
}

/// Fixed-point iteration driver.
pub fn fixed_point_impl<R, C, G>(
    client: &C,
    g: G,
    x0: &Tensor<R>,
    options: &FixedPointOptions,
) -> AccelResult<TensorFixedPointResult<R>>
where
    R: Runtime,
    C: TensorOps<R> + ScalarOps<R> + LinearAlgebraAlgorithms<R> + RuntimeClient<R>,
    G: Fn(&Tensor<R>) -> Result<Tensor<R>>,
{
    let n = x0.shape()[0];
    if n == 0 {
        return Err(AccelError::InvalidInput {
            context: "fixed_point: empty initial guess".to_string(),
        });
    }

    match &options.acceleration {
        Acceleration::None => run_loop(client, g, x0, options, &mut NoAccelerator),
        Acceleration::Anderson(accel_options) => {
            let mut accel = AndersonAccelerator::new(n, accel_options)?;
            run_loop(client, g, x0, options, &mut accel)
        }
    }
}

fn run_loop<R, C, G, A>(
    client: &C,
    g: G,
    x0: &Tensor<R>,
    options: &FixedPointOptions,
    accel: &mut A,
) -> AccelResult<TensorFixedPointResult<R>>
where
    R: Runtime,
    C: TensorOps<R> + ScalarOps<R> + LinearAlgebraAlgorithms<R> + RuntimeClient<R>,
    G: Fn(&Tensor<R>) -> Result<Tensor<R>>,
    A: FixedPointAccelerator<R>,
{
    let mut x = x0.clone();
    let mut accelerated_steps = 0usize;
    // Unaccelerated candidate and reference norm of a step awaiting its
    // safeguard verdict.
    let mut pending: Option<(Tensor<R>, f64)> = None;

    for iter in 0..options.max_iter {
        let mut gx = evaluate(&g, &x, iter)?;
        let mut fx = residual(client, &x, &gx, iter)?;
        let mut res_norm = norm(client, &fx, iter)?;

        if let Some((candidate, ref_norm)) = pending.take() {
            if !accel.evaluate_safeguard(iter, res_norm, ref_norm) {
                // The accelerated step overshot: fall back to the plain
                // candidate and refill the history from scratch.
                accel.empty_history();
                x = candidate;
                gx = evaluate(&g, &x, iter)?;
                fx = residual(client, &x, &gx, iter)?;
                res_norm = norm(client, &fx, iter)?;
            }
        }

        if res_norm < options.tol {
            return Ok(TensorFixedPointResult {
                x,
                residual: fx,
                iterations: iter,
                residual_norm: res_norm,
                converged: true,
                accelerated_steps,
            });
        }

        // History accumulates from the first iteration; activation only
        // gates when extrapolated candidates start being applied.
        accel.check_activation(iter);
        accel.update_history(client, &gx, &x, iter)?;
        if accel.is_active() {
            let unaccelerated = gx.clone();
            accel.accelerate(client, &mut gx, &x, iter)?;
            if accel.was_successful() {
                accelerated_steps += 1;
                if accel.is_safeguarding() {
                    pending = Some((unaccelerated, res_norm));
                }
            }
        }

        x = gx;
    }

    let gx = evaluate(&g, &x, options.max_iter)?;
    let fx = residual(client, &x, &gx, options.max_iter)?;
    let res_norm = norm(client, &fx, options.max_iter)?;
    Ok(TensorFixedPointResult {
        x,
        residual: fx,
        iterations: options.max_iter,
        residual_norm: res_norm,
        converged: res_norm < options.tol,
        accelerated_steps,
    })
}

fn evaluate<R, G>(g: &G, x: &Tensor<R>, iter: usize) -> AccelResult<Tensor<R>>
where
    R: Runtime,
    G: Fn(&Tensor<R>) -> Result<Tensor<R>>,
{
    g(x).map_err(|e| AccelError::NumericalError {
        message: format!("fixed_point: g eval iter {} - {}", iter, e),
    })
}

fn residual<R, C>(client: &C, x: &Tensor<R>, gx: &Tensor<R>, iter: usize) -> AccelResult<Tensor<R>>
where
    R: Runtime,
    C: TensorOps<R> + RuntimeClient<R>,
{
    client.sub(x, gx).map_err(|e| AccelError::NumericalError {
        message: format!("fixed_point: residual iter {} - {}", iter, e),
    })
}

fn norm<R, C>(client: &C, fx: &Tensor<R>, iter: usize) -> AccelResult<f64>
where
    R: Runtime,
    C: TensorOps<R> + RuntimeClient<R>,
{
    tensor_norm(client, fx).map_err(|e| AccelError::NumericalError {
        message: format!("fixed_point: norm iter {} - {}", iter, e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::AndersonOptions;
    use numr::runtime::cpu::{CpuClient, CpuDevice, CpuRuntime};

    fn setup() -> (CpuDevice, CpuClient) {
        let device = CpuDevice::new();
        let client = CpuClient::new(device.clone());
        (device, client)
    }

    #[test]
    fn test_cosine_fixed_point() {
        let (device, client) = setup();

        // Fixed point of g(x) = cos(x): x* ≈ 0.7390851332. One-dimensional,
        // so the history depth clamps below the three-column threshold and
        // the engine stays out of the way.
        let x0 = Tensor::<CpuRuntime>::from_slice(&[1.0f64], &[1], &device);

        let result = fixed_point_impl(
            &client,
            |x| {
                let data: Vec<f64> = x.to_vec();
                let r: Vec<f64> = data.iter().map(|xi| xi.cos()).collect();
                Ok(Tensor::from_slice(&r, x.shape(), x.device()))
            },
            &x0,
            &FixedPointOptions::default(),
        )
        .unwrap();

        assert!(result.converged, "cosine iteration did not converge");
        assert_eq!(result.accelerated_steps, 0);
        let sol: Vec<f64> = result.x.to_vec();
        assert!((sol[0] - 0.7390851332).abs() < 1e-6, "sol = {}", sol[0]);
    }

    #[test]
    fn test_plain_iteration_without_acceleration() {
        let (device, client) = setup();

        // g(x) = 0.5 * x + 1, fixed point at x = 2.
        let x0 = Tensor::<CpuRuntime>::from_slice(&[0.0f64, 0.0], &[2], &device);
        let options = FixedPointOptions {
            acceleration: Acceleration::None,
            ..FixedPointOptions::default()
        };

        let result = fixed_point_impl(
            &client,
            |x| {
                let data: Vec<f64> = x.to_vec();
                let r: Vec<f64> = data.iter().map(|xi| 0.5 * xi + 1.0).collect();
                Ok(Tensor::from_slice(&r, x.shape(), x.device()))
            },
            &x0,
            &options,
        )
        .unwrap();

        assert!(result.converged);
        assert_eq!(result.accelerated_steps, 0);
        let sol: Vec<f64> = result.x.to_vec();
        assert!((sol[0] - 2.0).abs() < 1e-6);
        assert!((sol[1] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_accelerated_affine_map_beats_slow_contraction() {
        let (device, client) = setup();

        // Componentwise g(x) = a .* x + b; the 0.99 factor makes the plain
        // iteration hopeless within 50 steps, so convergence here is the
        // accelerator's doing.
        let a = [0.99f64, 0.5, 0.2, 0.1];
        let b = [0.1f64, 0.2, 0.3, 0.4];
        let x0 = Tensor::<CpuRuntime>::from_slice(&[0.0f64; 4], &[4], &device);
        let options = FixedPointOptions {
            max_iter: 50,
            acceleration: Acceleration::Anderson(AndersonOptions {
                mem: 4,
                ..AndersonOptions::default()
            }),
            ..FixedPointOptions::default()
        };

        let result = fixed_point_impl(
            &client,
            |x| {
                let data: Vec<f64> = x.to_vec();
                let r: Vec<f64> = data
                    .iter()
                    .zip(a.iter().zip(b.iter()))
                    .map(|(xi, (ai, bi))| ai * xi + bi)
                    .collect();
                Ok(Tensor::from_slice(&r, x.shape(), x.device()))
            },
            &x0,
            &options,
        )
        .unwrap();

        assert!(result.converged, "residual_norm = {}", result.residual_norm);
        assert!(result.accelerated_steps >= 1);
        let sol: Vec<f64> = result.x.to_vec();
        for i in 0..4 {
            let expected = b[i] / (1.0 - a[i]);
            assert!(
                (sol[i] - expected).abs() < 1e-5,
                "component {}: {} vs {}",
                i,
                sol[i],
                expected
            );
        }
    }

    #[test]
    fn test_empty_initial_guess_is_rejected() {
        let (device, client) = setup();
        let x0 = Tensor::<CpuRuntime>::from_slice(&[] as &[f64], &[0], &device);
        let result = fixed_point_impl(
            &client,
            |x| Ok(x.clone()),
            &x0,
            &FixedPointOptions::default(),
        );
        assert!(matches!(result, Err(AccelError::InvalidInput { .. })));
    }
}
