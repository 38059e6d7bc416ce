//! Accelerator contract shared by the Anderson engine and the no-op variant.

use numr::algorithm::linalg::LinearAlgebraAlgorithms;
use numr::ops::{ScalarOps, TensorOps};
use numr::runtime::{Runtime, RuntimeClient};
use numr::tensor::Tensor;

use crate::error::AccelResult;

/// One acceleration engine attached to a fixed-point iteration x ← g(x).
///
/// The outer solver calls, once per iteration: an activation check, then
/// [`update_history`](Self::update_history), then
/// [`accelerate`](Self::accelerate), which may overwrite the candidate g in
/// place. The solver retains ownership of x and g; x is never modified.
///
/// Implementations are dispatched statically — a solver generic over this
/// trait pays nothing for the no-op variant.
pub trait FixedPointAccelerator<R: Runtime> {
    /// Iteration-based activation check. No-op for residual-only policies.
    fn check_activation(&mut self, iter: usize);

    /// Residual-based activation check. No-op for iteration-only policies.
    fn check_activation_by_residuals(
        &mut self,
        r_prim: f64,
        r_dual: f64,
        max_norm_prim: f64,
        max_norm_dual: f64,
    );

    /// Record the iterate pair (g, x): refresh the residual f = x − g and
    /// push the delta column for this step.
    fn update_history<C>(
        &mut self,
        client: &C,
        g: &Tensor<R>,
        x: &Tensor<R>,
        iter: usize,
    ) -> AccelResult<()>
    where
        C: TensorOps<R> + ScalarOps<R> + LinearAlgebraAlgorithms<R> + RuntimeClient<R>;

    /// Replace g with an extrapolated candidate when the history supports
    /// it. On any numerical failure g is left untouched and
    /// [`was_successful`](Self::was_successful) reports false.
    fn accelerate<C>(
        &mut self,
        client: &C,
        g: &mut Tensor<R>,
        x: &Tensor<R>,
        iter: usize,
    ) -> AccelResult<()>
    where
        C: TensorOps<R> + ScalarOps<R> + LinearAlgebraAlgorithms<R> + RuntimeClient<R>;

    /// Full wipe: history, previous iterates, activation latch.
    fn empty_history(&mut self);

    /// Cheap reset: drops the valid-column count without touching buffers.
    fn empty_caches(&mut self);

    /// Residual-norm safeguard: accept iff `new_norm ≤ slack · ref_norm`.
    /// Records the decision. The caller decides what the reference norm is.
    fn evaluate_safeguard(&mut self, iter: usize, new_norm: f64, ref_norm: f64) -> bool;

    /// Whether the most recent [`accelerate`](Self::accelerate) call
    /// applied an update to g.
    fn was_successful(&self) -> bool;

    /// Whether activation has fired.
    fn is_active(&self) -> bool;

    /// Whether accelerated steps should be safeguarded by the caller.
    fn is_safeguarding(&self) -> bool;

    /// History capacity in columns.
    fn mem(&self) -> usize;
}
