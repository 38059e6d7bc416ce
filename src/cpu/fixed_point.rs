//! CPU implementation of the safeguarded fixed-point driver.

use crate::impl_generic::{fixed_point_impl, TensorFixedPointResult};
use crate::traits::{FixedPointAlgorithms, FixedPointOptions};
use numr::error::Result;
use numr::runtime::cpu::{CpuClient, CpuRuntime};
use numr::tensor::Tensor;

impl FixedPointAlgorithms<CpuRuntime> for CpuClient {
    fn fixed_point<G>(
        &self,
        g: G,
        x0: &Tensor<CpuRuntime>,
        options: &FixedPointOptions,
    ) -> Result<TensorFixedPointResult<CpuRuntime>>
    where
        G: Fn(&Tensor<CpuRuntime>) -> Result<Tensor<CpuRuntime>>,
    {
        let result = fixed_point_impl(self, g, x0, options).map_err(|e| {
            numr::error::Error::backend_limitation("cpu", "fixed_point", e.to_string())
        })?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{Acceleration, AndersonOptions};
    use numr::runtime::cpu::CpuDevice;

    #[test]
    fn test_fixed_point_cpu() {
        let device = CpuDevice::new();
        let client = CpuClient::new(device.clone());

        // Fixed point of cos(x) at ~0.7391
        let x0 = Tensor::<CpuRuntime>::from_slice(&[1.0f64], &[1], &device);

        let result = client
            .fixed_point(
                |x| {
                    let data: Vec<f64> = x.to_vec();
                    let r: Vec<f64> = data.iter().map(|xi| xi.cos()).collect();
                    Ok(Tensor::from_slice(&r, x.shape(), x.device()))
                },
                &x0,
                &FixedPointOptions::default(),
            )
            .unwrap();

        assert!(result.converged);
        let sol: Vec<f64> = result.x.to_vec();
        assert!((sol[0] - 0.7390851332).abs() < 1e-6);
    }

    #[test]
    fn test_fixed_point_cpu_accelerated() {
        let device = CpuDevice::new();
        let client = CpuClient::new(device.clone());

        let a = [0.95f64, 0.6, 0.3, 0.05];
        let b = [1.0f64, -0.5, 0.25, 2.0];
        let x0 = Tensor::<CpuRuntime>::from_slice(&[0.0f64; 4], &[4], &device);
        let options = FixedPointOptions {
            max_iter: 40,
            acceleration: Acceleration::Anderson(AndersonOptions {
                mem: 4,
                ..AndersonOptions::default()
            }),
            ..FixedPointOptions::default()
        };

        let result = client
            .fixed_point(
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

        assert!(result.converged);
        assert!(result.accelerated_steps >= 1);
        let sol: Vec<f64> = result.x.to_vec();
        for i in 0..4 {
            let expected = b[i] / (1.0 - a[i]);
            assert!((sol[i] - expected).abs() < 1e-5);
        }
    }
}
