//! Anderson acceleration for fixed-point iterations.
//!
//! For an iteration x ← g(x) with residual f(x) = x − g(x), an
//! [`AndersonAccelerator`] keeps the recent delta history and
//! opportunistically replaces the candidate g with an extrapolated value
//! g − G·η, where η solves a small regularized least-squares problem
//! against the residual history. Failed solves degrade gracefully: the
//! candidate passes through untouched and the outer iteration continues
//! unaccelerated.
//!
//! # Runtime-Generic Architecture
//!
//! All operations are implemented generically over numr's `Runtime` trait.
//! The same code works on CPU, CUDA, and WebGPU backends with **zero
//! duplication**.
//!
//! ```text
//! src/
//! ├── lib.rs                # Exports only
//! ├── error.rs              # AccelError / AccelResult
//! ├── traits/
//! │   ├── accelerator.rs    # FixedPointAccelerator contract
//! │   ├── anderson.rs       # AndersonOptions + variant tags
//! │   └── fixed_point.rs    # FixedPointAlgorithms driver trait
//! ├── impl_generic/
//! │   ├── anderson.rs       # AndersonAccelerator engine
//! │   ├── empty.rs          # NoAccelerator
//! │   ├── fixed_point.rs    # fixed_point_impl() driver
//! │   ├── activation.rs     # Activation-policy predicates
//! │   ├── diagnostics.rs    # AcceleratorTrace records
//! │   └── utils.rs          # Norms, mixing weights
//! ├── cpu/                  # CpuClient impl for FixedPointAlgorithms
//! ├── cuda/                 # CudaClient impl (feature-gated)
//! └── wgpu/                 # WgpuClient impl (feature-gated)
//! ```
//!
//! # Example
//!
//! ```
//! # use numr::runtime::cpu::{CpuClient, CpuDevice, CpuRuntime};
//! # use numr::tensor::Tensor;
//! use mixr::{FixedPointAlgorithms, FixedPointOptions};
//! # let device = CpuDevice::new();
//! # let client = CpuClient::new(device.clone());
//! // Fixed point of g(x) = 0.5 * x + 1 at x = 2
//! let x0 = Tensor::<CpuRuntime>::from_slice(&[0.0f64], &[1], &device);
//! let result = client.fixed_point(
//!     |x| {
//!         let data: Vec<f64> = x.to_vec();
//!         let r: Vec<f64> = data.iter().map(|xi| 0.5 * xi + 1.0).collect();
//!         Ok(Tensor::from_slice(&r, x.shape(), x.device()))
//!     },
//!     &x0,
//!     &FixedPointOptions::default(),
//! ).unwrap();
//! let sol: Vec<f64> = result.x.to_vec();
//! assert!((sol[0] - 2.0).abs() < 1e-6);
//! ```

pub mod error;
pub mod impl_generic;
pub mod traits;

mod cpu;

#[cfg(feature = "cuda")]
mod cuda;

#[cfg(feature = "wgpu")]
mod wgpu;

// Re-export error types
pub use error::{AccelError, AccelResult};

// Re-export the accelerator engine and its no-op twin
pub use impl_generic::{AndersonAccelerator, NoAccelerator, MAX_COEFF_NORM};

// Re-export the driver
pub use impl_generic::{fixed_point_impl, TensorFixedPointResult};

// Re-export diagnostics records
pub use impl_generic::diagnostics::{
    AcceleratorTrace, Attempt, AttemptStatus, Restart, RestartReason, SafeguardDecision,
};

// Re-export coefficient diagnostics
pub use impl_generic::utils::mixing_weights;

// Re-export traits and options
pub use traits::{
    Acceleration, ActivationPolicy, AndersonOptions, BroydenType, FixedPointAccelerator,
    FixedPointAlgorithms, FixedPointOptions, MemoryPolicy, Regularizer,
};
