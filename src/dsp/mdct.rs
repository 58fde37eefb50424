// Copyright (c) 2019-2022 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Inverse Modified Discrete Cosine Transform, computed from a half-size complex FFT.
//!
//! Keeps the reusable-transform-object shape of `symphonia-core/src/dsp/mdct.rs`'s `Imdct` (built
//! once per size via `new`, reused every frame via a method call), but the transform itself is an
//! FFT-derived algorithm: a half-size (`N/4`) complex IFFT with pre-rotation and post-rotation
//! twiddles, rather than that module's DCT-IV-matrix decomposition — the two are different
//! algorithms for the same transform, and the downstream gain-compensation math depends on the
//! exact twiddle-table formulas (`tcos`/`tsin`) used here.

use super::complex::Complex32;
use super::fft::Fft;

#[inline]
fn cmul(are: f32, aim: f32, bre: f32, bim: f32) -> (f32, f32) {
    (are * bre - aim * bim, are * bim + aim * bre)
}

/// A reusable `N`-point IMDCT, `N = 2^nbits`.
pub struct Imdct {
    fft: Fft,
    n: usize,
    n2: usize,
    n4: usize,
    tcos: Vec<f32>,
    tsin: Vec<f32>,
}

impl Imdct {
    /// Builds an `N = 2^nbits`-point IMDCT. `scale`'s sign selects the table phase offset
    /// (`1/8` vs `1/8 + N/4`) the same way the reference codec's `mdct_init(nbits, inverse,
    /// scale)` does; its magnitude scales every output sample by `sqrt(|scale|)`.
    pub fn new(nbits: u32, scale: f32) -> Self {
        let n = 1usize << nbits;
        let n2 = n >> 1;
        let n4 = n >> 2;

        let fft = Fft::new(n4, true);

        let theta0 = 1.0 / 8.0 + if scale < 0.0 { n4 as f64 } else { 0.0 };
        let s = (scale.abs() as f64).sqrt();

        let mut tcos = vec![0f32; n4];
        let mut tsin = vec![0f32; n4];
        for k in 0..n4 {
            let alpha = 2.0 * std::f64::consts::PI * (k as f64 + theta0) / (n as f64);
            tcos[k] = (-alpha.cos() * s) as f32;
            tsin[k] = (-alpha.sin() * s) as f32;
        }

        Imdct { fft, n, n2, n4, tcos, tsin }
    }

    /// Transform size (`N`).
    pub fn size(&self) -> usize {
        self.n
    }

    /// Computes the half-length IMDCT: `N/2` spectral coefficients in, `N/2` time samples out.
    pub fn imdct_half(&self, input: &[f32], output: &mut [f32]) {
        assert_eq!(input.len(), self.n2);
        assert_eq!(output.len(), self.n2);

        let n4 = self.n4;
        let mut z = vec![Complex32::zero(); n4];

        // Pre-rotation.
        for k in 0..n4 {
            let in1 = input[2 * k];
            let in2 = input[self.n2 - 1 - 2 * k];
            let (re, im) = cmul(in2, in1, self.tcos[k], self.tsin[k]);
            z[k] = Complex32::new(re, im);
        }

        self.fft.process(&mut z);

        // Post-rotation, writing directly into the output's interleaved (re, im) layout.
        for k in 0..n4 {
            let zk = z[k];
            let zk2 = z[n4 - 1 - k];
            let (r0, i0) = cmul(zk.im, zk.re, self.tsin[k], self.tcos[k]);
            let (r1, i1) = cmul(zk2.im, zk2.re, self.tsin[n4 - 1 - k], self.tcos[n4 - 1 - k]);
            output[2 * k] = r0;
            output[2 * k + 1] = i0;
            output[2 * (n4 - 1 - k)] = r1;
            output[2 * (n4 - 1 - k) + 1] = i1;
        }
    }

    /// Computes the full `N`-sample IMDCT by mirroring [`imdct_half`](Imdct::imdct_half)'s
    /// `N/2`-sample result: `out[k] = -out[N/2-1-k]`, `out[N-1-k] = out[N/2+k]` for
    /// `k in [0, N/4)`.
    pub fn imdct_calc(&self, input: &[f32], output: &mut [f32]) {
        assert_eq!(input.len(), self.n2);
        assert_eq!(output.len(), self.n);

        let mut half = vec![0f32; self.n2];
        self.imdct_half(input, &mut half);

        output[self.n4..self.n4 + self.n2].copy_from_slice(&half);

        for k in 0..self.n4 {
            output[k] = -output[self.n2 - 1 - k];
            output[self.n - 1 - k] = output[self.n2 + k];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Brute-force IMDCT, `O(n^2)`, used only to validate the FFT-derived fast path.
    fn imdct_analytical(x: &[f32], y: &mut [f32], scale: f64) {
        let n_in = x.len();
        let n_out = x.len() << 1;
        let pi_2n = std::f64::consts::PI / (2 * n_out) as f64;

        for (i, yi) in y.iter_mut().enumerate() {
            let mut accum = 0.0;
            for (j, &xj) in x.iter().enumerate() {
                accum += f64::from(xj) * (pi_2n * ((2 * i + 1 + n_in) * (2 * j + 1)) as f64).cos();
            }
            *yi = (scale * accum) as f32;
        }
    }

    #[test]
    fn matches_brute_force_imdct() {
        // N_IN spectral coefficients in, 2*N_IN = N time samples out: N_IN plays the role of
        // `n2` (half the full transform size) in `Imdct`'s own terms.
        const N_IN: usize = 16;
        const N: usize = 2 * N_IN;

        let x: Vec<f32> = (0..N_IN).map(|i| (i as f32 + 1.0) * 0.1).collect();

        let mut expected = vec![0f32; N];
        let scale = (2.0f64 / N as f64).sqrt();
        imdct_analytical(&x, &mut expected, scale);

        // The magnitude of `scale` passed to `Imdct::new` is the overall linear scale factor
        // applied to every output sample (the pre- and post-rotation each contribute a factor of
        // `sqrt(|scale|)`); keep it positive so no extra sign flip is introduced.
        let nbits = N.trailing_zeros();
        let imdct = Imdct::new(nbits, scale as f32);
        assert_eq!(imdct.n2, N_IN);

        let mut actual = vec![0f32; imdct.n];
        imdct.imdct_calc(&x, &mut actual);

        for (a, b) in actual.iter().zip(expected.iter()) {
            assert!((a - b).abs() < 5e-3, "{} vs {}", a, b);
        }
    }
}
