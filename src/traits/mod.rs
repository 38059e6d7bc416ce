//! Trait definitions for fixed-point acceleration.

mod accelerator;
mod anderson;
mod fixed_point;

pub use accelerator::FixedPointAccelerator;
pub use anderson::{
    ActivationPolicy, AndersonOptions, BroydenType, MemoryPolicy, Regularizer,
};
pub use fixed_point::{Acceleration, FixedPointAlgorithms, FixedPointOptions};
