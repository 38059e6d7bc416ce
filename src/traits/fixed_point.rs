//! Fixed-point driver trait and options.

use numr::error::Result;
use numr::runtime::Runtime;
use numr::tensor::Tensor;

use crate::impl_generic::TensorFixedPointResult;
use crate::traits::anderson::AndersonOptions;

/// Acceleration attached to the fixed-point loop.
#[derive(Debug, Clone)]
pub enum Acceleration {
    /// Plain iteration x ← g(x).
    None,
    /// Anderson acceleration with the given options.
    Anderson(AndersonOptions),
}

/// Options for the fixed-point driver.
#[derive(Debug, Clone)]
pub struct FixedPointOptions {
    /// Maximum number of outer iterations.
    pub max_iter: usize,
    /// Tolerance for convergence (norm of x − g(x)).
    pub tol: f64,
    /// Acceleration scheme.
    pub acceleration: Acceleration,
}

impl Default for FixedPointOptions {
    fn default() -> Self {
        Self {
            max_iter: 100,
            tol: 1e-8,
            acceleration: Acceleration::Anderson(AndersonOptions::default()),
        }
    }
}

/// Safeguarded fixed-point iteration for x = g(x).
///
/// Runs x ← g(x) to convergence, opportunistically replacing the candidate
/// with an Anderson-extrapolated one. Accelerated steps whose residual grows
/// beyond the safeguard slack are rolled back and the history is restarted.
pub trait FixedPointAlgorithms<R: Runtime> {
    /// Solve x = g(x) starting from `x0`.
    ///
    /// # Arguments
    /// * `g` - The fixed-point map g: R^n -> R^n
    /// * `x0` - Initial guess
    /// * `options` - Driver and acceleration options
    fn fixed_point<G>(
        &self,
        g: G,
        x0: &Tensor<R>,
        options: &FixedPointOptions,
    ) -> Result<TensorFixedPointResult<R>>
    where
        G: Fn(&Tensor<R>) -> Result<Tensor<R>>;
}
