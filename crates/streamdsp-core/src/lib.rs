//! # streamdsp-core
//!
//! Foundational, allocation-free mechanisms shared by the streamdsp pipeline:
//! a stack-allocated vector for inline scratch buffers, denormal flushing,
//! a deterministic PRNG for dither noise, and a `libm`-backed real-math trait
//! for trig used by the sample-rate converter's window functions.

#![cfg_attr(feature = "simd", feature(portable_simd))]

pub mod denormal;
pub mod error;
pub mod math;
pub mod random;
#[cfg(feature = "simd")]
pub mod simd;
pub mod stack_vec;

pub use denormal::flush_denormal_f32;
pub use error::{CoreError, Result};
pub use math::Real;
pub use random::XorShiftRng;
pub use stack_vec::StackVec;
