//! WebGPU implementation of the safeguarded fixed-point driver.

use crate::impl_generic::{fixed_point_impl, TensorFixedPointResult};
use crate::traits::{FixedPointAlgorithms, FixedPointOptions};
use numr::error::Result;
use numr::runtime::wgpu::{WgpuClient, WgpuRuntime};
use numr::tensor::Tensor;

impl FixedPointAlgorithms<WgpuRuntime> for WgpuClient {
    fn fixed_point<G>(
        &self,
        g: G,
        x0: &Tensor<WgpuRuntime>,
        options: &FixedPointOptions,
    ) -> Result<TensorFixedPointResult<WgpuRuntime>>
    where
        G: Fn(&Tensor<WgpuRuntime>) -> Result<Tensor<WgpuRuntime>>,
    {
        let result = fixed_point_impl(self, g, x0, options).map_err(|e| {
            numr::error::Error::backend_limitation("wgpu", "fixed_point", e.to_string())
        })?;
        Ok(result)
    }
}
