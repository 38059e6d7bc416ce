//! Utility functions shared by the acceleration routines.

use numr::error::Result;
use numr::ops::TensorOps;
use numr::runtime::{Runtime, RuntimeClient};
use numr::tensor::Tensor;

/// Compute the L2 norm of a 1D tensor.
pub fn tensor_norm<R, C>(client: &C, x: &Tensor<R>) -> Result<f64>
where
    R: Runtime,
    C: TensorOps<R> + RuntimeClient<R>,
{
    let x_sq = client.mul(x, x)?;
    let sum = client.sum(&x_sq, &[0], false)?;
    let sum_val: Vec<f64> = sum.to_vec();
    Ok(sum_val[0].sqrt())
}

/// Compute the squared Frobenius norm of a 2D tensor.
pub fn frobenius_norm_sq<R, C>(client: &C, m: &Tensor<R>) -> Result<f64>
where
    R: Runtime,
    C: TensorOps<R> + RuntimeClient<R>,
{
    let numel = m.shape()[0] * m.shape()[1];
    let m_sq = client.mul(m, m)?;
    let flat = m_sq.reshape(&[numel])?;
    let sum = client.sum(&flat, &[0], false)?;
    let sum_val: Vec<f64> = sum.to_vec();
    Ok(sum_val[0])
}

/// Recover the affine-combination weights implied by the extrapolation
/// coefficients η.
///
/// Returns α of length n + 1 with α₀ = η₀, αᵢ = ηᵢ − ηᵢ₋₁, α_n = 1 − η_{n−1};
/// the weights always sum to one. Diagnostic only — the engine applies the
/// correction directly from η.
pub fn mixing_weights(eta: &[f64]) -> Vec<f64> {
    let n = eta.len();
    let mut alpha = Vec::with_capacity(n + 1);
    if n == 0 {
        alpha.push(1.0);
        return alpha;
    }
    alpha.push(eta[0]);
    for i in 1..n {
        alpha.push(eta[i] - eta[i - 1]);
    }
    alpha.push(1.0 - eta[n - 1]);
    alpha
}

#[cfg(test)]
mod tests {
    use super::*;
    use numr::runtime::cpu::{CpuClient, CpuDevice, CpuRuntime};

    fn setup() -> (CpuDevice, CpuClient) {
        let device = CpuDevice::new();
        let client = CpuClient::new(device.clone());
        (device, client)
    }

    #[test]
    fn test_tensor_norm() {
        let (device, client) = setup();
        let x = Tensor::<CpuRuntime>::from_slice(&[3.0f64, 4.0], &[2], &device);
        let norm = tensor_norm(&client, &x).unwrap();
        assert!((norm - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_frobenius_norm_sq() {
        let (device, client) = setup();
        let m = Tensor::<CpuRuntime>::from_slice(&[1.0f64, 2.0, 3.0, 4.0], &[2, 2], &device);
        let sq = frobenius_norm_sq(&client, &m).unwrap();
        assert!((sq - 30.0).abs() < 1e-12);
    }

    #[test]
    fn test_mixing_weights_sum_to_one() {
        for eta in [
            vec![0.3],
            vec![0.25, -0.5, 1.75],
            vec![1e3, -2e3, 4.0, 0.0, 7.5],
        ] {
            let alpha = mixing_weights(&eta);
            assert_eq!(alpha.len(), eta.len() + 1);
            let sum: f64 = alpha.iter().sum();
            assert!((sum - 1.0).abs() < 1e-9, "sum = {}", sum);
        }
    }

    #[test]
    fn test_mixing_weights_empty() {
        let alpha = mixing_weights(&[]);
        assert_eq!(alpha, vec![1.0]);
    }
}
