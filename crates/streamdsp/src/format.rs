//! PCM sample formats, per-sample conversion kernels, and dither.
//!
//! Every sample is stored native-endian. `S24` is tightly packed: three bytes
//! per sample, never padded to four.

use std::fmt;

use streamdsp_core::XorShiftRng;

/// A supported PCM sample format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleFormat {
    U8,
    S16,
    S24,
    S32,
    F32,
}

impl SampleFormat {
    /// Bytes occupied by one sample of this format.
    #[inline]
    pub const fn bytes_per_sample(&self) -> usize {
        match self {
            SampleFormat::U8 => 1,
            SampleFormat::S16 => 2,
            SampleFormat::S24 => 3,
            SampleFormat::S32 => 4,
            SampleFormat::F32 => 4,
        }
    }

    /// Bytes occupied by one frame (all channels) of this format.
    #[inline]
    pub const fn bytes_per_frame(&self, channels: usize) -> usize {
        self.bytes_per_sample() * channels
    }

    /// Effective bit width used to decide whether a conversion into this
    /// format from a wider one is a genuine reduction (see [`dither_applies`]).
    #[inline]
    const fn width_bits(&self) -> u32 {
        match self {
            SampleFormat::U8 => 8,
            SampleFormat::S16 => 16,
            SampleFormat::S24 => 24,
            SampleFormat::S32 => 32,
            SampleFormat::F32 => 32,
        }
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SampleFormat::U8 => "u8",
            SampleFormat::S16 => "s16",
            SampleFormat::S24 => "s24",
            SampleFormat::S32 => "s32",
            SampleFormat::F32 => "f32",
        };
        f.write_str(name)
    }
}

/// Dither applied before quantizing down into `u8` or `s16`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DitherMode {
    #[default]
    None,
    Rectangle,
    Triangle,
}

/// Dither only ever applies when narrowing into `u8`/`s16` from something
/// wider; per the data model, "reductions into u8 or s16" is the precise
/// condition, not merely "destination is u8 or s16".
#[inline]
pub(crate) fn dither_applies(from: SampleFormat, to: SampleFormat) -> bool {
    matches!(to, SampleFormat::U8 | SampleFormat::S16) && from.width_bits() > to.width_bits()
}

/// Draws one dither offset in `[min, max)` from `rng`, per `mode`.
///
/// Rectangle draws one uniform sample; triangle sums two independent
/// uniforms, producing a triangular PDF per the data model.
pub(crate) fn dither_offset(rng: &mut XorShiftRng, mode: DitherMode, min: f64, max: f64) -> f64 {
    match mode {
        DitherMode::None => 0.0,
        DitherMode::Rectangle => {
            let u = (rng.next_noise_sample() + 1.0) * 0.5;
            min + u * (max - min)
        }
        DitherMode::Triangle => {
            let u1 = (rng.next_noise_sample() + 1.0) * 0.5;
            let u2 = (rng.next_noise_sample() + 1.0) * 0.5;
            min + ((u1 + u2) * 0.5) * (max - min)
        }
    }
}

// ---------------------------------------------------------------------------
// s24 helpers: tightly packed, native-endian, MSB-aligned per spec
// ---------------------------------------------------------------------------

/// Reads a 3-byte s24 sample, left-justified into a 32-bit word (per the
/// `(byte0<<8)|(byte1<<16)|(byte2<<24)` rule). The low byte is always zero.
#[inline]
fn read_s24_msb_aligned(bytes: [u8; 3]) -> i32 {
    let b0 = bytes[0] as i32;
    let b1 = bytes[1] as i32;
    let b2 = bytes[2] as i32;
    (b0 << 8) | (b1 << 16) | (b2 << 24)
}

/// Writes the three high bytes of an MSB-aligned 32-bit word as an s24 sample.
#[inline]
fn write_s24_from_msb_aligned(x: i32) -> [u8; 3] {
    let v = x as u32;
    [((v >> 8) & 0xFF) as u8, ((v >> 16) & 0xFF) as u8, ((v >> 24) & 0xFF) as u8]
}

// ---------------------------------------------------------------------------
// Per-sample conversion rules (spec.md §4.1's table)
// ---------------------------------------------------------------------------

#[inline]
pub(crate) fn u8_to_s16(x: u8) -> i16 {
    (((x as i32) - 128) << 8) as i16
}

#[inline]
pub(crate) fn u8_to_s24(x: u8) -> [u8; 3] {
    [0, 0, (x as i32 - 128) as u8]
}

#[inline]
pub(crate) fn u8_to_s32(x: u8) -> i32 {
    ((x as i32) - 128) << 24
}

#[inline]
pub(crate) fn u8_to_f32(x: u8) -> f32 {
    (x as f32) * (2.0 / 255.0) - 1.0
}

#[inline]
pub(crate) fn s16_to_u8(x: i16, dither: f64) -> u8 {
    let dithered = (x as f64 + dither).clamp(-128.0 * 256.0, 127.0 * 256.0 + 255.0);
    (((dithered as i32) >> 8) + 128) as u8
}

#[inline]
pub(crate) fn s16_to_s24(x: i16) -> [u8; 3] {
    let lo = (x as u16 & 0xFF) as u8;
    let hi = ((x as u16) >> 8) as u8;
    [0, lo, hi]
}

#[inline]
pub(crate) fn s16_to_s32(x: i16) -> i32 {
    (x as i32) << 16
}

#[inline]
pub(crate) fn s16_to_f32(x: i16) -> f32 {
    (x as f32) * (1.0 / 32768.0)
}

#[inline]
pub(crate) fn s24_to_u8(bytes: [u8; 3], dither: f64) -> u8 {
    let msb = read_s24_msb_aligned(bytes) as i64 + (dither as i64);
    let clamped = msb.clamp(i32::MIN as i64, i32::MAX as i64) as i32;
    (((clamped >> 24) as i32) + 128) as u8
}

#[inline]
pub(crate) fn s24_to_s16(bytes: [u8; 3], dither: f64) -> i16 {
    let msb = read_s24_msb_aligned(bytes) as i64 + (dither as i64);
    let clamped = msb.clamp(i32::MIN as i64, i32::MAX as i64) as i32;
    (clamped >> 16) as i16
}

#[inline]
pub(crate) fn s24_to_s32(bytes: [u8; 3]) -> i32 {
    read_s24_msb_aligned(bytes)
}

#[inline]
pub(crate) fn s24_to_f32(bytes: [u8; 3]) -> f32 {
    let signed_24 = read_s24_msb_aligned(bytes) >> 8;
    (signed_24 as f32) * (1.0 / 8_388_608.0)
}

#[inline]
pub(crate) fn s32_to_u8(x: i32, dither: f64) -> u8 {
    let dithered = (x as i64 + dither as i64).clamp(i32::MIN as i64, i32::MAX as i64) as i32;
    (((dithered >> 24) as i32) + 128) as u8
}

#[inline]
pub(crate) fn s32_to_s16(x: i32, dither: f64) -> i16 {
    let dithered = (x as i64 + dither as i64).clamp(i32::MIN as i64, i32::MAX as i64) as i32;
    (dithered >> 16) as i16
}

#[inline]
pub(crate) fn s32_to_s24(x: i32) -> [u8; 3] {
    write_s24_from_msb_aligned(x)
}

#[inline]
pub(crate) fn s32_to_f32(x: i32) -> f32 {
    (x as f64 / 2_147_483_648.0) as f32
}

#[inline]
pub(crate) fn f32_to_u8(x: f32, dither: f64) -> u8 {
    let clipped = (x as f64 + dither).clamp(-1.0, 1.0);
    ((clipped + 1.0) * 127.5).round() as u8
}

#[inline]
pub(crate) fn f32_to_s16(x: f32, dither: f64) -> i16 {
    let clipped = (x as f64 + dither).clamp(-1.0, 1.0);
    (clipped * 32767.0).round() as i16
}

#[inline]
pub(crate) fn f32_to_s24(x: f32) -> [u8; 3] {
    let clipped = x.clamp(-1.0, 1.0);
    let v = (clipped as f64 * 8_388_607.0).round() as i32;
    let msb_aligned = v << 8;
    write_s24_from_msb_aligned(msb_aligned)
}

#[inline]
pub(crate) fn f32_to_s32(x: f32) -> i32 {
    let clipped = x.clamp(-1.0, 1.0);
    (clipped as f64 * 2_147_483_647.0).round() as i32
}

/// Which of the 25 `(from, to)` pairs a [`crate::format_converter::FormatConverter`]
/// was configured for, picked once at construction and matched once per
/// scratch block at read time (sealed enum dispatch, no function pointers).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConversionKernel {
    Same(SampleFormat),
    U8ToS16,
    U8ToS24,
    U8ToS32,
    U8ToF32,
    S16ToU8,
    S16ToS24,
    S16ToS32,
    S16ToF32,
    S24ToU8,
    S24ToS16,
    S24ToS32,
    S24ToF32,
    S32ToU8,
    S32ToS16,
    S32ToS24,
    S32ToF32,
    F32ToU8,
    F32ToS16,
    F32ToS24,
    F32ToS32,
}

impl ConversionKernel {
    pub(crate) fn select(from: SampleFormat, to: SampleFormat) -> Self {
        use SampleFormat::*;
        if from == to {
            return ConversionKernel::Same(from);
        }
        match (from, to) {
            (U8, S16) => ConversionKernel::U8ToS16,
            (U8, S24) => ConversionKernel::U8ToS24,
            (U8, S32) => ConversionKernel::U8ToS32,
            (U8, F32) => ConversionKernel::U8ToF32,
            (S16, U8) => ConversionKernel::S16ToU8,
            (S16, S24) => ConversionKernel::S16ToS24,
            (S16, S32) => ConversionKernel::S16ToS32,
            (S16, F32) => ConversionKernel::S16ToF32,
            (S24, U8) => ConversionKernel::S24ToU8,
            (S24, S16) => ConversionKernel::S24ToS16,
            (S24, S32) => ConversionKernel::S24ToS32,
            (S24, F32) => ConversionKernel::S24ToF32,
            (S32, U8) => ConversionKernel::S32ToU8,
            (S32, S16) => ConversionKernel::S32ToS16,
            (S32, S24) => ConversionKernel::S32ToS24,
            (S32, F32) => ConversionKernel::S32ToF32,
            (F32, U8) => ConversionKernel::F32ToU8,
            (F32, S16) => ConversionKernel::F32ToS16,
            (F32, S24) => ConversionKernel::F32ToS24,
            (F32, S32) => ConversionKernel::F32ToS32,
            _ => unreachable!("all 20 non-identity (from, to) pairs are covered"),
        }
    }

    /// Converts one sample, reading/writing native-endian bytes from/to
    /// `src`/`dst`, which must be exactly `from.bytes_per_sample()` and
    /// `to.bytes_per_sample()` long respectively.
    pub(crate) fn convert_one(&self, src: &[u8], dst: &mut [u8], dither: f64) {
        match self {
            ConversionKernel::Same(fmt) => {
                dst[..fmt.bytes_per_sample()].copy_from_slice(&src[..fmt.bytes_per_sample()]);
            }
            ConversionKernel::U8ToS16 => {
                dst.copy_from_slice(&u8_to_s16(src[0]).to_ne_bytes());
            }
            ConversionKernel::U8ToS24 => {
                dst.copy_from_slice(&u8_to_s24(src[0]));
            }
            ConversionKernel::U8ToS32 => {
                dst.copy_from_slice(&u8_to_s32(src[0]).to_ne_bytes());
            }
            ConversionKernel::U8ToF32 => {
                dst.copy_from_slice(&u8_to_f32(src[0]).to_ne_bytes());
            }
            ConversionKernel::S16ToU8 => {
                let x = i16::from_ne_bytes([src[0], src[1]]);
                dst[0] = s16_to_u8(x, dither);
            }
            ConversionKernel::S16ToS24 => {
                let x = i16::from_ne_bytes([src[0], src[1]]);
                dst.copy_from_slice(&s16_to_s24(x));
            }
            ConversionKernel::S16ToS32 => {
                let x = i16::from_ne_bytes([src[0], src[1]]);
                dst.copy_from_slice(&s16_to_s32(x).to_ne_bytes());
            }
            ConversionKernel::S16ToF32 => {
                let x = i16::from_ne_bytes([src[0], src[1]]);
                dst.copy_from_slice(&s16_to_f32(x).to_ne_bytes());
            }
            ConversionKernel::S24ToU8 => {
                dst[0] = s24_to_u8([src[0], src[1], src[2]], dither);
            }
            ConversionKernel::S24ToS16 => {
                dst.copy_from_slice(&s24_to_s16([src[0], src[1], src[2]], dither).to_ne_bytes());
            }
            ConversionKernel::S24ToS32 => {
                dst.copy_from_slice(&s24_to_s32([src[0], src[1], src[2]]).to_ne_bytes());
            }
            ConversionKernel::S24ToF32 => {
                dst.copy_from_slice(&s24_to_f32([src[0], src[1], src[2]]).to_ne_bytes());
            }
            ConversionKernel::S32ToU8 => {
                let x = i32::from_ne_bytes([src[0], src[1], src[2], src[3]]);
                dst[0] = s32_to_u8(x, dither);
            }
            ConversionKernel::S32ToS16 => {
                let x = i32::from_ne_bytes([src[0], src[1], src[2], src[3]]);
                dst.copy_from_slice(&s32_to_s16(x, dither).to_ne_bytes());
            }
            ConversionKernel::S32ToS24 => {
                let x = i32::from_ne_bytes([src[0], src[1], src[2], src[3]]);
                dst.copy_from_slice(&s32_to_s24(x));
            }
            ConversionKernel::S32ToF32 => {
                let x = i32::from_ne_bytes([src[0], src[1], src[2], src[3]]);
                dst.copy_from_slice(&s32_to_f32(x).to_ne_bytes());
            }
            ConversionKernel::F32ToU8 => {
                let x = f32::from_ne_bytes([src[0], src[1], src[2], src[3]]);
                dst[0] = f32_to_u8(x, dither);
            }
            ConversionKernel::F32ToS16 => {
                let x = f32::from_ne_bytes([src[0], src[1], src[2], src[3]]);
                dst.copy_from_slice(&f32_to_s16(x, dither).to_ne_bytes());
            }
            ConversionKernel::F32ToS24 => {
                let x = f32::from_ne_bytes([src[0], src[1], src[2], src[3]]);
                dst.copy_from_slice(&f32_to_s24(x));
            }
            ConversionKernel::F32ToS32 => {
                let x = f32::from_ne_bytes([src[0], src[1], src[2], src[3]]);
                dst.copy_from_slice(&f32_to_s32(x).to_ne_bytes());
            }
        }
    }

    /// `[min, max)` dither range for pairs where [`ConversionKernel::dither_applies`]
    /// is true. Each range is sized to one output LSB of headroom around zero,
    /// per spec.md §4.1's per-pair table (the two ranges not stated explicitly,
    /// `S32ToU8`/`S32ToS16`, follow the same final-shift-amount rule as their
    /// `S24` counterparts, since the shift applied before truncation is identical).
    pub(crate) fn dither_range(&self) -> (f64, f64) {
        match self {
            ConversionKernel::S16ToU8 => (-128.0, 127.0),
            ConversionKernel::S24ToU8 | ConversionKernel::S32ToU8 => {
                (-(1i64 << 23) as f64, ((1i64 << 23) - 1) as f64)
            }
            ConversionKernel::S24ToS16 | ConversionKernel::S32ToS16 => {
                (-(1i64 << 15) as f64, ((1i64 << 15) - 1) as f64)
            }
            ConversionKernel::F32ToU8 => (-1.0 / 128.0, 1.0 / 127.0),
            ConversionKernel::F32ToS16 => (-1.0 / 32768.0, 1.0 / 32767.0),
            _ => (0.0, 0.0),
        }
    }

    pub(crate) fn dither_applies(&self) -> bool {
        match self {
            ConversionKernel::Same(_) => false,
            ConversionKernel::U8ToS16
            | ConversionKernel::U8ToS24
            | ConversionKernel::U8ToS32
            | ConversionKernel::U8ToF32
            | ConversionKernel::S16ToS24
            | ConversionKernel::S16ToS32
            | ConversionKernel::S16ToF32
            | ConversionKernel::S24ToS32
            | ConversionKernel::S24ToF32
            | ConversionKernel::S32ToS24
            | ConversionKernel::S32ToF32
            | ConversionKernel::F32ToS24
            | ConversionKernel::F32ToS32 => false,
            ConversionKernel::S16ToU8
            | ConversionKernel::S24ToU8
            | ConversionKernel::S24ToS16
            | ConversionKernel::S32ToU8
            | ConversionKernel::S32ToS16
            | ConversionKernel::F32ToU8
            | ConversionKernel::F32ToS16 => true,
        }
    }
}
