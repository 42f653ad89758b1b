//! Portable SIMD utilities for audio DSP.
//!
//! This module provides SIMD-accelerated operations for the f32 hot-path
//! operations used by the format converter, channel router, and sample-rate
//! converter. Requires the `simd` feature and nightly Rust.

use core::simd::f32x4;
use std::simd::StdFloat;

pub const F32_LANES: usize = 4;

#[inline]
pub fn fill_f32(slice: &mut [f32], value: f32) {
    let vec = f32x4::splat(value);
    let (chunks, remainder) = slice.as_chunks_mut::<F32_LANES>();

    for chunk in chunks {
        *chunk = vec.to_array();
    }
    remainder.fill(value);
}

#[inline]
pub fn apply_gain_f32(input: &[f32], output: &mut [f32], gain: f32) {
    debug_assert!(input.len() <= output.len());

    let gain_vec = f32x4::splat(gain);
    let len = input.len();
    let chunks = len / F32_LANES;
    let remainder_start = chunks * F32_LANES;

    for i in 0..chunks {
        let offset = i * F32_LANES;
        let in_chunk = f32x4::from_slice(&input[offset..]);
        let result = in_chunk * gain_vec;
        output[offset..offset + F32_LANES].copy_from_slice(&result.to_array());
    }

    for i in remainder_start..len {
        output[i] = input[i] * gain;
    }
}

/// Element-wise multiply of two slices, written to `output`.
///
/// Used by the channel router's weighted-sum accumulation: one SIMD pass per
/// input channel, multiplying by that channel's weight and summing into the
/// output channel's accumulator.
#[inline]
pub fn multiply_add_f32(a: &[f32], b: &[f32], output: &mut [f32]) {
    debug_assert!(a.len() == b.len());
    debug_assert!(a.len() <= output.len());

    let len = a.len();
    let chunks = len / F32_LANES;
    let remainder_start = chunks * F32_LANES;

    for i in 0..chunks {
        let offset = i * F32_LANES;
        let a_chunk = f32x4::from_slice(&a[offset..]);
        let b_chunk = f32x4::from_slice(&b[offset..]);
        let result = a_chunk * b_chunk;
        output[offset..offset + F32_LANES].copy_from_slice(&result.to_array());
    }

    for i in remainder_start..len {
        output[i] = a[i] * b[i];
    }
}

pub fn sin_f32(input: &[f32], output: &mut [f32]) {
    debug_assert!(input.len() <= output.len());

    let len = input.len();
    let chunks = len / F32_LANES;
    let remainder_start = chunks * F32_LANES;

    for i in 0..chunks {
        let offset = i * F32_LANES;
        let in_chunk = f32x4::from_slice(&input[offset..]);
        let result = in_chunk.sin();
        output[offset..offset + F32_LANES].copy_from_slice(&result.to_array());
    }

    for i in remainder_start..len {
        output[i] = input[i].sin();
    }
}
