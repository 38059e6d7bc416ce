//! CPU implementations for fixed-point acceleration.

mod fixed_point;
