//! Anderson acceleration engine for fixed-point iterations.
//!
//! For an iteration x ← g(x) with residual f(x) = x − g(x), the engine
//! stores the m most recent deltas Δx, Δg, Δf as columns, solves a small
//! regularized least-squares system against the current residual, and
//! replaces the candidate g with g − G·η. When the solve is singular or the
//! coefficients blow up, the candidate is left untouched and the outer
//! iteration proceeds unaccelerated.
//!
//! # Algorithm
//!
//! With l = min(iter, m) valid columns and current residual f:
//! 1. Assemble M = XᵀF (Type-I) or M = FᵀF (Type-II), rhs = Xᵀf or Fᵀf
//! 2. Optionally add λ (Tikhonov) or λ·(‖X‖_F² + ‖F‖_F²) (Frobenius) to
//!    the diagonal
//! 3. Solve M·η = rhs with the runtime's pivoted LU
//! 4. If ‖η‖₂ is finite and below the coefficient cap: g ← g − G·η

use std::time::Instant;

use numr::algorithm::linalg::LinearAlgebraAlgorithms;
use numr::dtype::DType;
use numr::ops::{ScalarOps, TensorOps};
use numr::runtime::{Runtime, RuntimeClient};
use numr::tensor::Tensor;

use crate::error::{AccelError, AccelResult};
use crate::impl_generic::activation;
use crate::impl_generic::diagnostics::{AcceleratorTrace, AttemptStatus, RestartReason};
use crate::impl_generic::utils::{frobenius_norm_sq, tensor_norm};
use crate::traits::{
    ActivationPolicy, AndersonOptions, BroydenType, FixedPointAccelerator, MemoryPolicy,
    Regularizer,
};

/// Cap on ‖η‖₂; a solution above it is rejected as unreasonable.
pub const MAX_COEFF_NORM: f64 = 1e4;

/// Anderson accelerator with a fixed-capacity delta history.
///
/// One instance per solve. The history lives in three rings of m column
/// slots (Δx, Δg, Δf); slot `iter mod m` is written next, and only the
/// first min(iter, m) slots are ever read. Not safe for concurrent
/// mutation — use one instance per fixed-point problem.
#[derive(Debug, Clone)]
pub struct AndersonAccelerator<R: Runtime> {
    dim: usize,
    mem: usize,
    /// Deltas pushed since the last restart.
    iter: usize,
    init_phase: bool,
    x_delta: Vec<Option<Tensor<R>>>,
    g_delta: Vec<Option<Tensor<R>>>,
    f_delta: Vec<Option<Tensor<R>>>,
    x_prev: Option<Tensor<R>>,
    g_prev: Option<Tensor<R>>,
    f_prev: Option<Tensor<R>>,
    /// Residual x − g captured by the most recent `update_history`.
    f_cur: Option<Tensor<R>>,
    regularization: f64,
    safeguard_slack: f64,
    broyden: BroydenType,
    regularizer: Regularizer,
    memory: MemoryPolicy,
    activation: ActivationPolicy,
    activated: bool,
    safeguarded: bool,
    success: bool,
    accepted: usize,
    declined: usize,
    trace: AcceleratorTrace,
}

impl<R: Runtime> AndersonAccelerator<R> {
    /// Build an accelerator for vectors of length `dim`.
    ///
    /// Fails with [`AccelError::InvalidInput`] when `dim` is zero, the
    /// history depth is below 3, an activation threshold is below 2, an
    /// accuracy tolerance is negative, a regularizer is selected with a
    /// non-positive weight, or safeguarding is enabled with slack ≤ 1.
    /// The history depth is clamped to `dim`.
    pub fn new(dim: usize, options: &AndersonOptions) -> AccelResult<Self> {
        if dim == 0 {
            return Err(AccelError::InvalidInput {
                context: "anderson accelerator: dimension must be positive".to_string(),
            });
        }
        if options.mem <= 2 {
            return Err(AccelError::InvalidInput {
                context: format!(
                    "anderson accelerator: history depth must be at least 3, got {}",
                    options.mem
                ),
            });
        }
        if let ActivationPolicy::ByIteration { start_iter }
        | ActivationPolicy::ByIterationOrAccuracy { start_iter, .. } = options.activation
        {
            if start_iter < 2 {
                return Err(AccelError::InvalidInput {
                    context: format!(
                        "anderson accelerator: activation start must be at least 2, got {}",
                        start_iter
                    ),
                });
            }
        }
        if let ActivationPolicy::ByAccuracy { tol }
        | ActivationPolicy::ByIterationOrAccuracy { tol, .. } = options.activation
        {
            if !(tol >= 0.0) {
                return Err(AccelError::InvalidInput {
                    context: format!(
                        "anderson accelerator: activation tolerance must be non-negative, got {}",
                        tol
                    ),
                });
            }
        }
        if options.regularizer != Regularizer::None && !(options.regularization > 0.0) {
            return Err(AccelError::InvalidInput {
                context: format!(
                    "anderson accelerator: regularization weight must be positive, got {}",
                    options.regularization
                ),
            });
        }
        if options.safeguarded && !(options.safeguard_slack > 1.0) {
            return Err(AccelError::InvalidInput {
                context: format!(
                    "anderson accelerator: safeguard slack must exceed 1, got {}",
                    options.safeguard_slack
                ),
            });
        }

        let mem = options.mem.min(dim);
        Ok(Self {
            dim,
            mem,
            iter: 0,
            init_phase: true,
            x_delta: vec![None; mem],
            g_delta: vec![None; mem],
            f_delta: vec![None; mem],
            x_prev: None,
            g_prev: None,
            f_prev: None,
            f_cur: None,
            regularization: options.regularization,
            safeguard_slack: options.safeguard_slack,
            broyden: options.broyden,
            regularizer: options.regularizer,
            memory: options.memory,
            activation: options.activation,
            activated: false,
            safeguarded: options.safeguarded,
            success: false,
            accepted: 0,
            declined: 0,
            trace: AcceleratorTrace::new(options.logging),
        })
    }

    /// Diagnostic records accumulated so far.
    pub fn trace(&self) -> &AcceleratorTrace {
        &self.trace
    }

    /// Mutable access for draining records between solves.
    pub fn trace_mut(&mut self) -> &mut AcceleratorTrace {
        &mut self.trace
    }

    /// Deltas pushed since the last restart.
    pub fn pushed(&self) -> usize {
        self.iter
    }

    /// Number of history columns current computations read.
    pub fn valid_cols(&self) -> usize {
        self.iter.min(self.mem)
    }

    /// Whether no previous iterate has been captured yet.
    pub fn in_init_phase(&self) -> bool {
        self.init_phase
    }

    /// Safeguard decisions that accepted the accelerated candidate.
    pub fn accepted(&self) -> usize {
        self.accepted
    }

    /// Safeguard decisions that rolled the candidate back.
    pub fn declined(&self) -> usize {
        self.declined
    }

    fn update_history_inner<C>(
        &mut self,
        client: &C,
        g: &Tensor<R>,
        x: &Tensor<R>,
        iter: usize,
    ) -> AccelResult<()>
    where
        C: TensorOps<R> + ScalarOps<R> + LinearAlgebraAlgorithms<R> + RuntimeClient<R>,
    {
        if x.shape()[0] != self.dim || g.shape()[0] != self.dim {
            return Err(AccelError::InvalidInput {
                context: format!(
                    "update_history: expected vectors of length {}, got x: {}, g: {}",
                    self.dim,
                    x.shape()[0],
                    g.shape()[0]
                ),
            });
        }

        let f = client.sub(x, g).map_err(|e| AccelError::NumericalError {
            message: format!("update_history: residual - {}", e),
        })?;

        if self.init_phase {
            self.x_prev = Some(x.clone());
            self.g_prev = Some(g.clone());
            self.f_prev = Some(f.clone());
            self.f_cur = Some(f);
            self.init_phase = false;
            return Ok(());
        }

        if self.iter % self.mem == 0 && self.iter != 0 {
            if let MemoryPolicy::Restarted = self.memory {
                self.iter = 0;
                self.trace.record_restart(iter, RestartReason::MemoryFull);
            }
        }

        let j = self.iter % self.mem;
        let (dx, dg, df) = {
            let x_prev = self.x_prev.as_ref().ok_or_else(|| missing_state("x"))?;
            let g_prev = self.g_prev.as_ref().ok_or_else(|| missing_state("g"))?;
            let f_prev = self.f_prev.as_ref().ok_or_else(|| missing_state("f"))?;
            (
                client.sub(x, x_prev).map_err(|e| AccelError::NumericalError {
                    message: format!("update_history: x delta - {}", e),
                })?,
                client.sub(g, g_prev).map_err(|e| AccelError::NumericalError {
                    message: format!("update_history: g delta - {}", e),
                })?,
                client.sub(&f, f_prev).map_err(|e| AccelError::NumericalError {
                    message: format!("update_history: f delta - {}", e),
                })?,
            )
        };
        self.x_delta[j] = Some(dx);
        self.g_delta[j] = Some(dg);
        self.f_delta[j] = Some(df);

        self.x_prev = Some(x.clone());
        self.g_prev = Some(g.clone());
        self.f_prev = Some(f.clone());
        self.f_cur = Some(f);
        self.iter += 1;
        Ok(())
    }

    fn accelerate_inner<C>(
        &mut self,
        client: &C,
        g: &mut Tensor<R>,
        x: &Tensor<R>,
        iter: usize,
    ) -> AccelResult<()>
    where
        C: TensorOps<R> + ScalarOps<R> + LinearAlgebraAlgorithms<R> + RuntimeClient<R>,
    {
        self.success = false;
        debug_assert_eq!(x.shape()[0], self.dim);

        let l = self.iter.min(self.mem);
        if l < 3 {
            self.trace.record_attempt(iter, AttemptStatus::NotEnoughCols);
            return Ok(());
        }
        // Three pushed deltas imply update_history ran, so the current
        // residual is always present here.
        let f = match &self.f_cur {
            Some(f) => f.clone(),
            None => {
                return Err(AccelError::NumericalError {
                    message: "accelerate: missing current residual".to_string(),
                });
            }
        };

        let f_mat = cat_columns(client, &self.f_delta[..l], "accelerate: cat F")?;
        let f_col = f.unsqueeze(1).map_err(|e| AccelError::NumericalError {
            message: format!("accelerate: unsqueeze f - {}", e),
        })?;

        let (m_mat, rhs, x_mat) = match self.broyden {
            BroydenType::TypeI => {
                let x_mat = cat_columns(client, &self.x_delta[..l], "accelerate: cat X")?;
                let xt = x_mat.transpose(0, 1).map_err(|e| AccelError::NumericalError {
                    message: format!("accelerate: transpose X - {}", e),
                })?;
                let m_mat = client.matmul(&xt, &f_mat).map_err(|e| AccelError::NumericalError {
                    message: format!("accelerate: X'F - {}", e),
                })?;
                let rhs = client.matmul(&xt, &f_col).map_err(|e| AccelError::NumericalError {
                    message: format!("accelerate: X'f - {}", e),
                })?;
                (m_mat, rhs, Some(x_mat))
            }
            BroydenType::TypeII => {
                let ft = f_mat.transpose(0, 1).map_err(|e| AccelError::NumericalError {
                    message: format!("accelerate: transpose F - {}", e),
                })?;
                let m_mat = client.matmul(&ft, &f_mat).map_err(|e| AccelError::NumericalError {
                    message: format!("accelerate: F'F - {}", e),
                })?;
                let rhs = client.matmul(&ft, &f_col).map_err(|e| AccelError::NumericalError {
                    message: format!("accelerate: F'f - {}", e),
                })?;
                (m_mat, rhs, None)
            }
        };

        let m_mat = match self.regularizer {
            Regularizer::None => m_mat,
            Regularizer::Tikhonov => add_diagonal(client, &m_mat, self.regularization, l)?,
            Regularizer::Frobenius => {
                let x_mat = match x_mat {
                    Some(m) => m,
                    None => cat_columns(client, &self.x_delta[..l], "accelerate: cat X")?,
                };
                let x_sq = frobenius_norm_sq(client, &x_mat).map_err(|e| {
                    AccelError::NumericalError {
                        message: format!("accelerate: frobenius X - {}", e),
                    }
                })?;
                let f_sq = frobenius_norm_sq(client, &f_mat).map_err(|e| {
                    AccelError::NumericalError {
                        message: format!("accelerate: frobenius F - {}", e),
                    }
                })?;
                let beta = self.regularization * (x_sq + f_sq);
                self.trace.record_regularization(beta);
                add_diagonal(client, &m_mat, beta, l)?
            }
        };

        // A failed factorization is a skip, not an error: the outer solver
        // continues with the unaccelerated candidate.
        let eta = match LinearAlgebraAlgorithms::solve(client, &m_mat, &rhs) {
            Ok(eta) => eta,
            Err(_) => {
                self.trace.record_attempt(iter, AttemptStatus::FailSingular);
                return Ok(());
            }
        };

        let eta_flat = eta.reshape(&[l]).map_err(|e| AccelError::NumericalError {
            message: format!("accelerate: reshape eta - {}", e),
        })?;
        let eta_norm = tensor_norm(client, &eta_flat).map_err(|e| AccelError::NumericalError {
            message: format!("accelerate: eta norm - {}", e),
        })?;
        // NaN would slip past a plain `>` comparison.
        if !eta_norm.is_finite() || eta_norm > MAX_COEFF_NORM {
            self.trace.record_attempt(iter, AttemptStatus::FailEtaNorm);
            return Ok(());
        }

        let g_mat = cat_columns(client, &self.g_delta[..l], "accelerate: cat G")?;
        let correction = client
            .matmul(&g_mat, &eta)
            .map_err(|e| AccelError::NumericalError {
                message: format!("accelerate: G eta - {}", e),
            })?
            .reshape(&[self.dim])
            .map_err(|e| AccelError::NumericalError {
                message: format!("accelerate: reshape correction - {}", e),
            })?;
        *g = client.sub(g, &correction).map_err(|e| AccelError::NumericalError {
            message: format!("accelerate: apply correction - {}", e),
        })?;
        self.success = true;
        Ok(())
    }
}

impl<R: Runtime> FixedPointAccelerator<R> for AndersonAccelerator<R> {
    fn check_activation(&mut self, iter: usize) {
        if self.activated {
            return;
        }
        if activation::activates_by_iteration(&self.activation, iter) {
            self.activated = true;
        }
    }

    fn check_activation_by_residuals(
        &mut self,
        r_prim: f64,
        r_dual: f64,
        max_norm_prim: f64,
        max_norm_dual: f64,
    ) {
        if self.activated {
            return;
        }
        if activation::activates_by_residuals(
            &self.activation,
            r_prim,
            r_dual,
            max_norm_prim,
            max_norm_dual,
        ) {
            self.activated = true;
        }
    }

    fn update_history<C>(
        &mut self,
        client: &C,
        g: &Tensor<R>,
        x: &Tensor<R>,
        iter: usize,
    ) -> AccelResult<()>
    where
        C: TensorOps<R> + ScalarOps<R> + LinearAlgebraAlgorithms<R> + RuntimeClient<R>,
    {
        let timer = self.trace.is_enabled().then(Instant::now);
        let result = self.update_history_inner(client, g, x, iter);
        if let Some(t) = timer {
            self.trace.update_seconds += t.elapsed().as_secs_f64();
        }
        result
    }

    fn accelerate<C>(
        &mut self,
        client: &C,
        g: &mut Tensor<R>,
        x: &Tensor<R>,
        iter: usize,
    ) -> AccelResult<()>
    where
        C: TensorOps<R> + ScalarOps<R> + LinearAlgebraAlgorithms<R> + RuntimeClient<R>,
    {
        let timer = self.trace.is_enabled().then(Instant::now);
        let result = self.accelerate_inner(client, g, x, iter);
        if let Some(t) = timer {
            self.trace.accelerate_seconds += t.elapsed().as_secs_f64();
        }
        result
    }

    fn empty_history(&mut self) {
        for slot in self.x_delta.iter_mut() {
            *slot = None;
        }
        for slot in self.g_delta.iter_mut() {
            *slot = None;
        }
        for slot in self.f_delta.iter_mut() {
            *slot = None;
        }
        self.x_prev = None;
        self.g_prev = None;
        self.f_prev = None;
        self.f_cur = None;
        self.iter = 0;
        self.init_phase = true;
        self.activated = false;
        self.success = false;
    }

    /// Only the valid-column count is reset; stale slots are never read
    /// because reads stop at min(iter, mem).
    fn empty_caches(&mut self) {
        self.iter = 0;
    }

    fn evaluate_safeguard(&mut self, iter: usize, new_norm: f64, ref_norm: f64) -> bool {
        if !self.safeguarded {
            return true;
        }
        let accepted = new_norm <= self.safeguard_slack * ref_norm;
        if accepted {
            self.accepted += 1;
        } else {
            self.declined += 1;
        }
        self.trace
            .record_safeguard(iter, new_norm, ref_norm, self.safeguard_slack, accepted);
        accepted
    }

    fn was_successful(&self) -> bool {
        self.success
    }

    fn is_active(&self) -> bool {
        self.activated
    }

    fn is_safeguarding(&self) -> bool {
        self.safeguarded
    }

    fn mem(&self) -> usize {
        self.mem
    }
}

fn missing_state(what: &str) -> AccelError {
    AccelError::NumericalError {
        message: format!("update_history: missing previous {} vector", what),
    }
}

/// Stack stored delta columns into a [dim, l] matrix.
fn cat_columns<R, C>(
    client: &C,
    cols: &[Option<Tensor<R>>],
    context: &str,
) -> AccelResult<Tensor<R>>
where
    R: Runtime,
    C: TensorOps<R> + RuntimeClient<R>,
{
    let mut mats: Vec<Tensor<R>> = Vec::with_capacity(cols.len());
    for col in cols {
        let col = col.as_ref().ok_or_else(|| AccelError::NumericalError {
            message: format!("{} - missing history column", context),
        })?;
        let col = col.unsqueeze(1).map_err(|e| AccelError::NumericalError {
            message: format!("{} - {}", context, e),
        })?;
        mats.push(col);
    }
    let refs: Vec<&Tensor<R>> = mats.iter().collect();
    client.cat(&refs, 1).map_err(|e| AccelError::NumericalError {
        message: format!("{} - {}", context, e),
    })
}

/// M + w·I for an l×l matrix.
fn add_diagonal<R, C>(client: &C, m: &Tensor<R>, w: f64, l: usize) -> AccelResult<Tensor<R>>
where
    R: Runtime,
    C: TensorOps<R> + ScalarOps<R> + RuntimeClient<R>,
{
    let eye = client.eye(l, None, DType::F64).map_err(|e| AccelError::NumericalError {
        message: format!("accelerate: eye - {}", e),
    })?;
    let scaled = client.mul_scalar(&eye, w).map_err(|e| AccelError::NumericalError {
        message: format!("accelerate: scale eye - {}", e),
    })?;
    client.add(m, &scaled).map_err(|e| AccelError::NumericalError {
        message: format!("accelerate: regularize - {}", e),
    })
}
