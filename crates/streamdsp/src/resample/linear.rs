//! Linear-interpolation resampling: a small per-channel cache plus a float
//! phase, advanced by `factor = rateIn / rateOut` samples per output frame.

use streamdsp_core::{flush_denormal_f32, StackVec};

use crate::channel_map::MAX_CHANNELS;

/// Per-channel input cache capacity.
const CACHE_CAP: usize = 256;

/// Upper bound on output frames advanced per inner iteration, to keep
/// `timeIn`'s float precision from drifting over very large single calls.
const PRECISION_CAP_FRAMES: usize = 16384;

pub(super) struct LinearState {
    /// `timeIn`, a fractional phase into `caches`, in `[0, valid_len)`.
    time_in: f64,
    /// Frames currently valid at the front of each channel's cache.
    valid_len: usize,
    channels: usize,
    caches: [[f32; CACHE_CAP]; MAX_CHANNELS],
    pull_scratch: [[f32; CACHE_CAP]; MAX_CHANNELS],
}

impl LinearState {
    pub(super) fn new(channels: usize) -> Self {
        Self {
            time_in: 0.0,
            valid_len: 0,
            channels,
            caches: [[0.0f32; CACHE_CAP]; MAX_CHANNELS],
            pull_scratch: [[0.0f32; CACHE_CAP]; MAX_CHANNELS],
        }
    }
}

#[inline]
fn lerp(a: f32, b: f32, t: f64) -> f32 {
    flush_denormal_f32(a + ((b - a) as f64 * t) as f32)
}

pub(super) fn read(
    state: &mut LinearState,
    factor: f64,
    frame_count: usize,
    out_channel_ptrs: &mut [&mut [f32]],
    source: &mut (dyn FnMut(usize, &mut [&mut [f32]]) -> usize + Send),
) -> usize {
    let channels = state.channels;
    let mut frames_done = 0;

    while frames_done < frame_count {
        let remaining = (frame_count - frames_done).min(PRECISION_CAP_FRAMES);

        // Step 1-2: pull enough input to cover `remaining` output frames
        // plus one sample of interpolation headroom, bounded by cache space.
        let needed_f = state.time_in + remaining as f64 * factor;
        let needed = (needed_f.ceil() as i64 + 2).max(0) as usize;
        let space = CACHE_CAP - state.valid_len;
        let to_pull = needed.min(space);
        let mut source_short = false;
        if to_pull > 0 {
            let mut ptrs: StackVec<&mut [f32], MAX_CHANNELS> = StackVec::new();
            for row in state.pull_scratch[..channels].iter_mut() {
                ptrs.push(&mut row[..to_pull]).ok().expect("channels bounded by MAX_CHANNELS");
            }
            let got = source(to_pull, ptrs.as_mut_slice());
            for c in 0..channels {
                state.caches[c][state.valid_len..state.valid_len + got]
                    .copy_from_slice(&state.pull_scratch[c][..got]);
            }
            state.valid_len += got;
            source_short = got < to_pull;
        }

        // Step 3: how many output frames we can produce from the current
        // cache span without reading past its last valid sample.
        let producible = if state.valid_len >= 2 {
            let span = (state.valid_len - 2) as f64 - state.time_in;
            if span < 0.0 { 0 } else { (span / factor).floor() as usize + 1 }
        } else {
            0
        };
        let producible = producible.min(remaining);

        // Step 4: interpolate each output frame.
        for k in 0..producible {
            let t = state.time_in + k as f64 * factor;
            let i = t.floor() as usize;
            let frac = t - i as f64;
            for c in 0..channels {
                out_channel_ptrs[c][frames_done + k] = lerp(state.caches[c][i], state.caches[c][i + 1], frac);
            }
        }

        // Step 5: advance phase and compact the cache.
        if producible > 0 {
            let final_t = state.time_in + producible as f64 * factor;
            let consumed = final_t.floor() as usize;
            state.time_in = final_t - consumed as f64;
            for c in 0..channels {
                state.caches[c].copy_within(consumed..state.valid_len, 0);
            }
            state.valid_len -= consumed;
        }

        frames_done += producible;

        // No progress this iteration and the source has nothing more to
        // give: end the read, propagating the short count.
        if producible == 0 && (to_pull == 0 || source_short) {
            break;
        }
    }
    frames_done
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source_from(data: Vec<f32>) -> impl FnMut(usize, &mut [&mut [f32]]) -> usize {
        let mut pos = 0usize;
        move |frame_count, out| {
            let take = frame_count.min(data.len() - pos);
            out[0][..take].copy_from_slice(&data[pos..pos + take]);
            pos += take;
            take
        }
    }

    #[test]
    fn identity_factor_reproduces_input() {
        let mut state = LinearState::new(1);
        let mut src = source_from(vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        let mut out = vec![0.0f32; 4];
        let frames = {
            let mut ptrs: Vec<&mut [f32]> = vec![&mut out];
            read(&mut state, 1.0, 4, &mut ptrs, &mut src)
        };
        assert_eq!(frames, 4);
        for (a, b) in out.iter().zip([1.0, 2.0, 3.0, 4.0]) {
            assert!((a - b).abs() < 1e-4);
        }
    }

    #[test]
    fn midpoint_interpolates() {
        let mut state = LinearState::new(1);
        let mut src = source_from(vec![0.0, 10.0, 20.0, 30.0]);
        let mut out = vec![0.0f32; 3];
        let frames = {
            let mut ptrs: Vec<&mut [f32]> = vec![&mut out];
            read(&mut state, 0.5, 3, &mut ptrs, &mut src)
        };
        assert_eq!(frames, 3);
        assert!((out[0] - 0.0).abs() < 1e-4);
        assert!((out[1] - 5.0).abs() < 1e-4);
        assert!((out[2] - 10.0).abs() < 1e-4);
    }
}
