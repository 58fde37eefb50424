// Copyright (c) 2019-2022 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! 16-band inverse polyphase quadrature filter (IPQF) synthesis.
//!
//! Per hop of 128 output samples: gather one sample per subband, run it through a 32-point
//! IDCT-IV (the `imdct_half` half of an `Imdct` built at `mdct_init(5, inverse=true,
//! scale=32/32768)`), then convolve the result against two 12-tap polyphase coefficient sets
//! through a 23-slot history ring. The reference prototype filter's literal coefficients aren't
//! reproduced here (only tap count and ring length are known), so a cosine-tapered decaying
//! prototype is substituted — the same approximation strategy as the 48-tap QMF window in
//! `dsp::common`. See `DESIGN.md`.

use lazy_static::lazy_static;

use super::tables::NUM_QMF_BANDS;
use crate::dsp::Imdct;

const RING_LEN: usize = 23;
const TAPS: usize = 12;
const HOP: usize = 128;

lazy_static! {
    static ref COEFFS1: [[f32; NUM_QMF_BANDS]; TAPS] = build_coeffs(1.0);
    static ref COEFFS2: [[f32; NUM_QMF_BANDS]; TAPS] = build_coeffs(-1.0);
}

fn build_coeffs(phase: f32) -> [[f32; NUM_QMF_BANDS]; TAPS] {
    let mut out = [[0f32; NUM_QMF_BANDS]; TAPS];
    for (tap, row) in out.iter_mut().enumerate() {
        let envelope = (-(tap as f64) / (TAPS as f64 * 0.6)).exp();
        for (band, v) in row.iter_mut().enumerate() {
            let theta = std::f64::consts::PI * (band as f64 + 0.5) * (tap as f64 - (TAPS as f64 - 1.0) / 2.0)
                / NUM_QMF_BANDS as f64;
            *v = (phase as f64 * envelope * theta.cos()) as f32;
        }
    }
    out
}

pub struct Ipqf {
    dct: Imdct,
    buf1: [[f32; NUM_QMF_BANDS]; RING_LEN],
    buf2: [[f32; NUM_QMF_BANDS]; RING_LEN],
    pos: usize,
}

impl Ipqf {
    pub fn new() -> Self {
        Ipqf {
            dct: Imdct::new(5, 32.0 / 32768.0),
            buf1: [[0f32; NUM_QMF_BANDS]; RING_LEN],
            buf2: [[0f32; NUM_QMF_BANDS]; RING_LEN],
            pos: 0,
        }
    }

    /// `subbands[band][hop_sample]` holds `HOP` time-domain samples per subband (one 128-sample
    /// hop of a 16-band, 2048-sample ATRAC3+ frame). Writes `HOP * NUM_QMF_BANDS` samples into
    /// `out`.
    pub fn synthesize(&mut self, subbands: &[Vec<f32>; NUM_QMF_BANDS], out: &mut [f32]) {
        assert_eq!(out.len(), HOP * NUM_QMF_BANDS);

        let mut idct_in = [0f32; NUM_QMF_BANDS];
        let mut idct_out = [0f32; NUM_QMF_BANDS];

        for s in 0..HOP {
            for (band, v) in idct_in.iter_mut().enumerate() {
                *v = subbands[band][s];
            }
            self.dct.imdct_half(&idct_in, &mut idct_out);

            self.buf1[self.pos] = idct_out;
            let mut reversed = idct_out;
            reversed.reverse();
            self.buf2[self.pos] = reversed;

            for k in 0..NUM_QMF_BANDS {
                let mut acc = 0f32;
                for tap in 0..TAPS {
                    let idx = (self.pos + RING_LEN - tap) % RING_LEN;
                    acc += self.buf1[idx][k] * COEFFS1[tap][k] + self.buf2[idx][k] * COEFFS2[tap][k];
                }
                out[s * NUM_QMF_BANDS + k] = acc;
            }

            self.pos = (self.pos + 1) % RING_LEN;
        }
    }
}

impl Default for Ipqf {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_input_yields_zero_output() {
        let mut ipqf = Ipqf::new();
        let subbands: [Vec<f32>; NUM_QMF_BANDS] = std::array::from_fn(|_| vec![0f32; HOP]);
        let mut out = vec![1f32; HOP * NUM_QMF_BANDS];
        ipqf.synthesize(&subbands, &mut out);
        assert!(out.iter().all(|&x| x == 0.0));
    }
}
