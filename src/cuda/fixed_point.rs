//! CUDA implementation of the safeguarded fixed-point driver.

use crate::impl_generic::{fixed_point_impl, TensorFixedPointResult};
use crate::traits::{FixedPointAlgorithms, FixedPointOptions};
use numr::error::Result;
use numr::runtime::cuda::{CudaClient, CudaRuntime};
use numr::tensor::Tensor;

impl FixedPointAlgorithms<CudaRuntime> for CudaClient {
    fn fixed_point<G>(
        &self,
        g: G,
        x0: &Tensor<CudaRuntime>,
        options: &FixedPointOptions,
    ) -> Result<TensorFixedPointResult<CudaRuntime>>
    where
        G: Fn(&Tensor<CudaRuntime>) -> Result<Tensor<CudaRuntime>>,
    {
        let result = fixed_point_impl(self, g, x0, options).map_err(|e| {
            numr::error::Error::backend_limitation("cuda", "fixed_point", e.to_string())
        })?;
        Ok(result)
    }
}
