//! No-op accelerator for uniform dispatch when acceleration is disabled.

use numr::algorithm::linalg::LinearAlgebraAlgorithms;
use numr::ops::{ScalarOps, TensorOps};
use numr::runtime::{Runtime, RuntimeClient};
use numr::tensor::Tensor;

use crate::error::AccelResult;
use crate::traits::FixedPointAccelerator;

/// Accelerator that never activates and never touches the candidate.
///
/// Lets an outer solver stay generic over [`FixedPointAccelerator`] without
/// branching on whether acceleration is enabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAccelerator;

impl<R: Runtime> FixedPointAccelerator<R> for NoAccelerator {
    fn check_activation(&mut self, _iter: usize) {}

    fn check_activation_by_residuals(
        &mut self,
        _r_prim: f64,
        _r_dual: f64,
        _max_norm_prim: f64,
        _max_norm_dual: f64,
    ) {
    }

    fn update_history<C>(
        &mut self,
        _client: &C,
        _g: &Tensor<R>,
        _x: &Tensor<R>,
        _iter: usize,
    ) -> AccelResult<()>
    where
        C: TensorOps<R> + ScalarOps<R> + LinearAlgebraAlgorithms<R> + RuntimeClient<R>,
    {
        Ok(())
    }

    fn accelerate<C>(
        &mut self,
        _client: &C,
        _g: &mut Tensor<R>,
        _x: &Tensor<R>,
        _iter: usize,
    ) -> AccelResult<()>
    where
        C: TensorOps<R> + ScalarOps<R> + LinearAlgebraAlgorithms<R> + RuntimeClient<R>,
    {
        Ok(())
    }

    fn empty_history(&mut self) {}

    fn empty_caches(&mut self) {}

    fn evaluate_safeguard(&mut self, _iter: usize, _new_norm: f64, _ref_norm: f64) -> bool {
        true
    }

    fn was_successful(&self) -> bool {
        false
    }

    fn is_active(&self) -> bool {
        false
    }

    fn is_safeguarding(&self) -> bool {
        false
    }

    fn mem(&self) -> usize {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use numr::runtime::cpu::{CpuClient, CpuDevice, CpuRuntime};

    #[test]
    fn test_noop_contract() {
        let device = CpuDevice::new();
        let client = CpuClient::new(device.clone());
        let mut accel = NoAccelerator;

        let x = Tensor::<CpuRuntime>::from_slice(&[1.0f64, 2.0], &[2], &device);
        let mut g = Tensor::<CpuRuntime>::from_slice(&[3.0f64, 4.0], &[2], &device);

        FixedPointAccelerator::<CpuRuntime>::check_activation(&mut accel, 100);
        assert!(!FixedPointAccelerator::<CpuRuntime>::is_active(&accel));

        accel.update_history(&client, &g, &x, 0).unwrap();
        accel.accelerate(&client, &mut g, &x, 0).unwrap();
        assert!(!FixedPointAccelerator::<CpuRuntime>::was_successful(&accel));

        let g_after: Vec<f64> = g.to_vec();
        assert_eq!(g_after, vec![3.0, 4.0]);
        assert_eq!(FixedPointAccelerator::<CpuRuntime>::mem(&accel), 0);
    }
}
