use std::sync::atomic::{AtomicU32, Ordering};

use crate::error::{DspError, Result};

/// Seqlock-style shared cell for the SRC's two rate fields.
///
/// `set_sample_rate(in, out)` needs both fields to change together without
/// the read side ever observing a torn (old_in, new_out) pair. A single
/// version counter bracketing the two atomic stores gives that: writers bump
/// it to odd before writing, then to even after; readers retry whenever they
/// observe an odd or changing version.
pub struct RateState {
    rate_in: AtomicU32,
    rate_out: AtomicU32,
    version: AtomicU32,
}

impl RateState {
    pub fn new(rate_in: u32, rate_out: u32) -> Self {
        Self { rate_in: AtomicU32::new(rate_in), rate_out: AtomicU32::new(rate_out), version: AtomicU32::new(0) }
    }

    /// Read both rates once per SRC read iteration, per the concurrency
    /// contract: the SRC must never assume a consistent snapshot from two
    /// independent loads.
    pub fn load(&self) -> (u32, u32) {
        loop {
            let v1 = self.version.load(Ordering::Acquire);
            if v1 & 1 != 0 {
                std::hint::spin_loop();
                continue;
            }
            let rate_in = self.rate_in.load(Ordering::Acquire);
            let rate_out = self.rate_out.load(Ordering::Acquire);
            let v2 = self.version.load(Ordering::Acquire);
            if v1 == v2 {
                return (rate_in, rate_out);
            }
        }
    }

    pub fn store(&self, rate_in: u32, rate_out: u32) -> Result<()> {
        if rate_in == 0 || rate_out == 0 {
            return Err(DspError::invalid_argument("sample rates must be non-zero"));
        }
        self.version.fetch_add(1, Ordering::AcqRel);
        self.rate_in.store(rate_in, Ordering::Release);
        self.rate_out.store(rate_out, Ordering::Release);
        self.version.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    pub fn set_input_rate(&self, rate_in: u32) -> Result<()> {
        let (_, rate_out) = self.load();
        self.store(rate_in, rate_out)
    }

    pub fn set_output_rate(&self, rate_out: u32) -> Result<()> {
        let (rate_in, _) = self.load();
        self.store(rate_in, rate_out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_returns_initial_rates() {
        let state = RateState::new(44100, 48000);
        assert_eq!(state.load(), (44100, 48000));
    }

    #[test]
    fn store_updates_both_rates_atomically() {
        let state = RateState::new(44100, 48000);
        state.store(48000, 44100).unwrap();
        assert_eq!(state.load(), (48000, 44100));
    }

    #[test]
    fn store_rejects_zero_rate() {
        let state = RateState::new(44100, 48000);
        assert!(state.store(0, 48000).is_err());
        assert_eq!(state.load(), (44100, 48000));
    }
}
