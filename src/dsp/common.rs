// Copyright (c) 2019-2022 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! DSP building blocks shared by the ATRAC3 and ATRAC3+ decoders: the scalefactor table, the QMF
//! synthesis window / `iqmf` combiner, and the gain-compensation (pre-echo control) engine.
//!
//! Grounded on `symphonia-bundle-mp3/src/synthesis.rs`'s polyphase-filter shape (a fixed window
//! convolved against a delay line carried across calls) for `iqmf`, generalized from MP3's
//! 32-band synthesis filter bank to ATRAC's 2-band QMF split/merge.

use lazy_static::lazy_static;

/// Number of entries in the scalefactor table.
pub const NUM_SCALEFACTORS: usize = 64;

/// Number of taps in the QMF synthesis window.
pub const QMF_TAPS: usize = 48;

lazy_static! {
    /// `sf[i] = 2^((i-15)/3)`, built once and shared by both codec variants.
    pub static ref SCALEFACTOR_TABLE: [f32; NUM_SCALEFACTORS] = {
        let mut table = [0f32; NUM_SCALEFACTORS];
        for (i, t) in table.iter_mut().enumerate() {
            *t = 2f32.powf((i as f32 - 15.0) / 3.0);
        }
        table
    };

    /// The 48-tap QMF synthesis window, formed by mirroring a stored 24-entry half and doubling
    /// each coefficient. The half-window itself is a Kaiser-windowed sinc low-pass prototype at
    /// cutoff 1/4 (i.e. splitting the band in half) — the reference codec's exact prototype
    /// filter coefficients aren't reproduced here, so a standard pseudo-QMF prototype is
    /// substituted; see `DESIGN.md`.
    pub static ref QMF_WINDOW: [f32; QMF_TAPS] = build_qmf_window();
}

fn kaiser_beta_i0(x: f64) -> f64 {
    // Zeroth-order modified Bessel function of the first kind, via its power series.
    let mut sum = 1.0;
    let mut term = 1.0;
    let half_x_sq = (x / 2.0) * (x / 2.0);
    for k in 1..32 {
        term *= half_x_sq / (k as f64 * k as f64);
        sum += term;
    }
    sum
}

fn build_qmf_window() -> [f32; QMF_TAPS] {
    const HALF: usize = QMF_TAPS / 2;
    const BETA: f64 = 6.0;

    let mut half = [0f64; HALF];
    let i0_beta = kaiser_beta_i0(BETA);

    for (n, h) in half.iter_mut().enumerate() {
        // Sinc low-pass prototype, cutoff at a quarter of the full 48-tap span, centered at the
        // midpoint of the mirrored 48-tap window (i.e. at n = HALF - 0.5 relative to this half).
        let m = (2 * QMF_TAPS - 1) as f64 / 2.0;
        let idx = n as f64;
        let x = idx - m;
        let cutoff = std::f64::consts::PI / 4.0;
        let sinc = if x.abs() < 1e-9 { cutoff / std::f64::consts::PI } else { (cutoff * x).sin() / (std::f64::consts::PI * x) };

        let ratio = (idx - (HALF as f64 - 0.5)) / (HALF as f64 - 0.5);
        let kaiser = kaiser_beta_i0(BETA * (1.0 - ratio * ratio).max(0.0).sqrt()) / i0_beta;

        *h = sinc * kaiser;
    }

    let mut window = [0f32; QMF_TAPS];
    for i in 0..HALF {
        window[i] = (2.0 * half[i]) as f32;
        window[QMF_TAPS - 1 - i] = (2.0 * half[i]) as f32;
    }
    window
}

/// Per-codec parameters for the gain-compensation engine: ATRAC3 uses
/// `(id2exp_offset=4, loc_scale=3)`, ATRAC3+ uses `(6, 2)`.
#[derive(Clone, Copy)]
pub struct GainParams {
    pub id2exp_offset: i32,
    pub loc_scale: i32,
}

impl GainParams {
    pub const ATRAC3: GainParams = GainParams { id2exp_offset: 4, loc_scale: 3 };
    pub const ATRAC3PLUS: GainParams = GainParams { id2exp_offset: 6, loc_scale: 2 };

    #[inline]
    pub fn loc_size(&self) -> i32 {
        1 << self.loc_scale
    }
}

/// One gain-control block: up to 7 `(level, location)` control points describing a piecewise
/// exponential gain envelope, plus the number of points actually present.
#[derive(Clone, Copy, Default)]
pub struct GainBlock {
    pub num_points: usize,
    pub lev_code: [u8; 8],
    pub loc_code: [u8; 8],
}

impl GainBlock {
    pub const fn empty() -> Self {
        GainBlock { num_points: 0, lev_code: [0; 8], loc_code: [0; 8] }
    }
}

/// Applies gain compensation and overlap-add for one subband.
///
/// `input` holds `2 * num_samples` freshly IMDCT'd samples (the current block followed by the
/// lookahead needed to seed `prev` for the next call). `prev` is the overlap tail carried from
/// the previous call; it is updated in place. `output` receives `num_samples` samples.
pub fn gain_compensate(
    params: &GainParams,
    input: &[f32],
    prev: &mut [f32],
    gc_now: &GainBlock,
    gc_next: &GainBlock,
    num_samples: usize,
    output: &mut [f32],
) {
    assert_eq!(input.len(), 2 * num_samples);
    assert_eq!(prev.len(), num_samples);
    assert_eq!(output.len(), num_samples);

    let id2exp_offset = params.id2exp_offset;
    let loc_size = params.loc_size();

    let gc_scale = if gc_next.num_points == 0 {
        1.0f32
    } else {
        2f32.powi(id2exp_offset - i32::from(gc_next.lev_code[0]))
    };

    if gc_now.num_points == 0 {
        for i in 0..num_samples {
            output[i] = input[i] * gc_scale + prev[i];
        }
    }
    else {
        let mut pos = 0usize;

        for i in 0..gc_now.num_points {
            let lastpos = (i32::from(gc_now.loc_code[i]) << params.loc_scale) as usize;
            let mut lev = 2f32.powi(id2exp_offset - i32::from(gc_now.lev_code[i]));

            let next_lev_code = if i + 1 < gc_now.num_points {
                i32::from(gc_now.lev_code[i + 1])
            }
            else {
                id2exp_offset
            };
            let gain_inc = 2f32.powf(-((next_lev_code - i32::from(gc_now.lev_code[i])) as f32) / loc_size as f32);

            // Constant-gain region up to the control point.
            for p in pos..lastpos.min(num_samples) {
                output[p] = (input[p] * gc_scale + prev[p]) * lev;
            }

            // Interpolation region spanning `loc_size` samples starting at the control point.
            let interp_end = (lastpos + loc_size as usize).min(num_samples);
            for p in lastpos.min(num_samples)..interp_end {
                output[p] = (input[p] * gc_scale + prev[p]) * lev;
                lev *= gain_inc;
            }

            pos = interp_end;
        }

        for p in pos..num_samples {
            output[p] = input[p] * gc_scale + prev[p];
        }
    }

    prev.copy_from_slice(&input[num_samples..2 * num_samples]);
}

/// Combines a low-band and a high-band half-rate signal into a full-band signal of `2 * n_in`
/// samples via a windowed FIR merge. `delay` is a 46-sample (`QMF_TAPS - 2`) state buffer carried
/// between calls for the same QMF stage.
pub struct Iqmf {
    delay: Vec<f32>,
}

impl Iqmf {
    pub fn new() -> Self {
        Iqmf { delay: vec![0f32; QMF_TAPS - 2] }
    }

    pub fn synthesize(&mut self, lo: &[f32], hi: &[f32], out: &mut [f32]) {
        let n_in = lo.len();
        assert_eq!(hi.len(), n_in);
        assert_eq!(out.len(), 2 * n_in);

        let window = &*QMF_WINDOW;
        let delay_len = self.delay.len();

        // Scratch holding the delay history followed by the new sum/difference samples so the
        // FIR can slide across a contiguous buffer.
        let mut buf = vec![0f32; delay_len + n_in];
        buf[..delay_len].copy_from_slice(&self.delay);
        for i in 0..n_in {
            buf[delay_len + i] = lo[i] + hi[i];
        }

        let mut diff = vec![0f32; delay_len + n_in];
        diff[..delay_len].copy_from_slice(&self.delay);
        for i in 0..n_in {
            diff[delay_len + i] = lo[i] - hi[i];
        }

        for i in 0..n_in {
            let mut acc_even = 0f32;
            let mut acc_odd = 0f32;
            for k in 0..QMF_TAPS / 2 {
                acc_even += window[2 * k] * buf[i + k];
                acc_odd += window[2 * k + 1] * diff[i + k];
            }
            out[2 * i] = acc_even;
            out[2 * i + 1] = acc_odd;
        }

        let tail_start = n_in;
        self.delay.copy_from_slice(&buf[tail_start..tail_start + delay_len]);
    }
}

impl Default for Iqmf {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalefactor_table_matches_formula() {
        assert!((SCALEFACTOR_TABLE[15] - 1.0).abs() < 1e-6);
        assert!((SCALEFACTOR_TABLE[18] - 2.0).abs() < 1e-4);
        assert!((SCALEFACTOR_TABLE[12] - 0.5).abs() < 1e-4);
    }

    #[test]
    fn qmf_window_is_symmetric() {
        for i in 0..QMF_TAPS / 2 {
            assert!((QMF_WINDOW[i] - QMF_WINDOW[QMF_TAPS - 1 - i]).abs() < 1e-6);
        }
    }

    #[test]
    fn gain_compensate_passthrough_without_points() {
        let params = GainParams::ATRAC3;
        let input = vec![1.0f32; 8];
        let mut prev = vec![0.0f32; 4];
        let gc_now = GainBlock::empty();
        let gc_next = GainBlock::empty();
        let mut output = vec![0.0f32; 4];

        gain_compensate(&params, &input, &mut prev, &gc_now, &gc_next, 4, &mut output);

        assert_eq!(output, vec![1.0, 1.0, 1.0, 1.0]);
        assert_eq!(prev, vec![1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn iqmf_zero_input_is_zero_output() {
        let mut iqmf = Iqmf::new();
        let lo = vec![0f32; 8];
        let hi = vec![0f32; 8];
        let mut out = vec![1f32; 16];
        iqmf.synthesize(&lo, &hi, &mut out);
        assert!(out.iter().all(|&x| x == 0.0));
    }
}
