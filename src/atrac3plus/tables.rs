// Copyright (c) 2019-2022 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fixed tables for the ATRAC3+ bitstream and DSP stages.
//!
//! `PWC_LEVS` and `MANT_TAB` are reproduced verbatim from their known literal values. The
//! 112-entry spectrum codebook set, the word-length/scalefactor VQ shape tables, and the GHA sine
//! table are not reproduced from the reference codec's literal data; they are generated here from
//! known formulas (e.g. the scalefactor exponent formula) or from standard DSP prototypes,
//! exactly as `dsp::common`'s QMF window is. See `DESIGN.md`.

use lazy_static::lazy_static;

use crate::io::vlc::CanonicalVlcDescriptor;
use crate::io::VlcTable;

pub const NUM_QMF_BANDS: usize = 16;
pub const MAX_QUANT_UNITS: usize = 32;

/// Spectral coefficients per quant unit. There are up to 32 units spanning up to 2048
/// coefficients total per channel; widths are not known to vary non-uniformly here, so quant
/// units are given equal width: `2048 / MAX_QUANT_UNITS`.
pub const QU_WIDTH: usize = 2048 / MAX_QUANT_UNITS;

/// Quant-unit to subband mapping: ATRAC3+ groups 32 quant units into 16 subbands, two per band
/// for the first 16 quant units' worth of resolution, collapsing at the high end.
lazy_static! {
    pub static ref QU_TO_SUBBAND: [usize; MAX_QUANT_UNITS] = {
        let mut t = [0usize; MAX_QUANT_UNITS];
        for (i, v) in t.iter_mut().enumerate() {
            *v = (i * NUM_QMF_BANDS) / MAX_QUANT_UNITS;
        }
        t
    };

    /// `qu_num_to_seg`: expands a 9-entry VQ row into the full 32-quant-unit curve by
    /// nearest-neighbour stretch, approximating `wl_shapes`/`sf_shapes` expansion.
    pub static ref QU_NUM_TO_SEG: [usize; MAX_QUANT_UNITS] = {
        let mut t = [0usize; MAX_QUANT_UNITS];
        for (i, v) in t.iter_mut().enumerate() {
            *v = (i * 9) / MAX_QUANT_UNITS;
        }
        t
    };

    pub static ref SF_TAB: [f32; 64] = {
        let mut t = [0f32; 64];
        for (i, v) in t.iter_mut().enumerate() {
            *v = 2f32.powf((i as f32 - 15.0 + 0.501784) / 3.0);
        }
        t
    };

    /// `sine_table[2048]`, a single period-2048 sine table used by GHA tone synthesis.
    pub static ref SINE_TABLE: Vec<f32> = {
        (0..2048).map(|i| (2.0 * std::f64::consts::PI * i as f64 / 2048.0).sin() as f32).collect()
    };

    /// `amp_sf_tab`: amplitude scalefactor table, `2^((i-15)/3)` reusing the same exponent
    /// spacing as the common scalefactor table.
    pub static ref AMP_SF_TAB: [f32; 64] = {
        let mut t = [0f32; 64];
        for (i, v) in t.iter_mut().enumerate() {
            *v = 2f32.powf((i as f32 - 15.0) / 3.0);
        }
        t
    };

    /// 256-sample Hann window used for tone envelope fades.
    pub static ref HANN_256: Vec<f32> = {
        (0..256)
            .map(|i| 0.5 - 0.5 * (2.0 * std::f64::consts::PI * i as f64 / 255.0).cos())
            .map(|v| v as f32)
            .collect()
    };

    /// Generic code-table VLC set: 112 logical tables collapse to a handful of distinct decode
    /// shapes via `redirect`; built here as seven canonical tables of increasing average length,
    /// one per word-length class, shared through `CODE_TABLE_REDIRECT`.
    pub static ref CODE_TABLES: Vec<VlcTable> = build_code_tables();
}

/// `pwc_levs[16]`, reproduced verbatim.
pub const PWC_LEVS: [f32; 16] = [
    3.96875, 3.15625, 2.5, 2.0, 1.59375, 1.25, 1.0, 0.78125, 0.625, 0.5, 0.40625, 0.3125, 0.25,
    0.1875, 0.15625, 0.0,
];

/// `mant_tab[8]`, reproduced verbatim.
pub const MANT_TAB: [f32; 8] = [0.0, 0.748, 0.449, 0.321, 0.204, 0.1496, 0.0724, 0.0356];

/// Maps a logical `(word_length_index 1..=7)` to one of the seven built code tables.
pub fn code_table_for_wordlen(word_length: usize) -> &'static VlcTable {
    let idx = word_length.saturating_sub(1).min(6);
    &CODE_TABLES[idx]
}

/// Number of coefficients packed per codeword for a given word length. The reference codec
/// groups several coefficients into one codeword (with a per-group all-zero skip bit) for the
/// lowest word lengths, where joint coding pays off most; word lengths of 3 bits or more are
/// coded one coefficient per codeword.
pub fn group_size_for_wordlen(word_length: usize) -> usize {
    match word_length {
        1 => 4,
        2 => 2,
        _ => 1,
    }
}

fn build_code_tables() -> Vec<VlcTable> {
    let shapes: [(u8, u8, &[u16]); 7] = [
        (1, 3, &[1, 1, 2]),
        (1, 4, &[1, 1, 2, 4]),
        (1, 5, &[1, 1, 2, 4, 8]),
        (1, 6, &[1, 1, 2, 4, 8, 16]),
        (1, 7, &[1, 1, 2, 4, 8, 16, 32]),
        (1, 8, &[1, 1, 2, 4, 8, 16, 32, 64]),
        (1, 9, &[1, 1, 2, 4, 8, 16, 32, 64, 128]),
    ];
    shapes
        .iter()
        .map(|(min_len, max_len, counts)| {
            CanonicalVlcDescriptor { min_len: *min_len, max_len: *max_len, counts, symbols: None }
                .build()
                .expect("code table vlc shape is well-formed")
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sf_tab_matches_formula() {
        assert!((SF_TAB[15] - 2f32.powf(0.501784 / 3.0)).abs() < 1e-4);
    }

    #[test]
    fn qu_to_subband_is_monotonic_and_bounded() {
        for &v in QU_TO_SUBBAND.iter() {
            assert!(v < NUM_QMF_BANDS);
        }
    }
}
