// Copyright (c) 2019-2022 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-quant-unit spectrum decode, including the "clone master" slave-channel shortcut and
//! grouped low-word-length coding.

use crate::error::Result;
use crate::io::BitReader;

use super::tables::{code_table_for_wordlen, group_size_for_wordlen, QU_WIDTH};

/// Decodes the spectral coefficients for one channel unit's quant units into a fixed
/// 2048-entry integer spectrum (only `[0, num_quant_units * QU_WIDTH)` is populated).
///
/// `master` is `Some(spectrum)` when decoding a stereo unit's slave channel; a quant unit with
/// `qu_tab_idx[u] == 0` and a non-zero master word-length is a verbatim copy of the master's
/// decoded coefficients rather than a fresh bitstream read.
pub fn decode_spectrum(
    reader: &mut BitReader<'_>,
    num_quant_units: usize,
    qu_wordlen: &[u8; 32],
    qu_tab_idx: &[u8; 32],
    master: Option<&[i32; 2048]>,
) -> Result<[i32; 2048]> {
    let mut out = [0i32; 2048];

    for qu in 0..num_quant_units {
        let wordlen = qu_wordlen[qu] as usize;
        if wordlen == 0 {
            continue;
        }

        let start = qu * QU_WIDTH;
        let end = start + QU_WIDTH;

        if let Some(master_spectrum) = master {
            if qu_tab_idx[qu] == 0 {
                out[start..end].copy_from_slice(&master_spectrum[start..end]);
                continue;
            }
        }

        let table = code_table_for_wordlen(wordlen);
        let group_size = group_size_for_wordlen(wordlen);

        let mut i = start;
        while i < end {
            let this_group = group_size.min(end - i);

            if group_size > 1 {
                // A group of `group_size` coefficients shares one leading skip bit: when set, the
                // whole group is zero and no codeword follows.
                if reader.read_bit() {
                    i += this_group;
                    continue;
                }
                for k in 0..this_group {
                    out[i + k] = sign_extend_sym(reader.read_vlc(table));
                }
            }
            else {
                out[i] = sign_extend_sym(reader.read_vlc(table));
            }

            i += this_group;
        }
    }

    Ok(out)
}

#[inline]
fn sign_extend_sym(symbol: i32) -> i32 {
    symbol
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_wordlen_units_are_skipped() {
        let data = [0u8; 64];
        let mut reader = BitReader::new(&data);
        let qu_wordlen = [0u8; 32];
        let qu_tab_idx = [0u8; 32];
        let spectrum = decode_spectrum(&mut reader, 4, &qu_wordlen, &qu_tab_idx, None).unwrap();
        assert!(spectrum.iter().all(|&x| x == 0));
    }

    #[test]
    fn word_length_one_group_skip_bit_zeros_whole_group() {
        // word length 1 groups 4 coefficients per codeword; an all-1 leading skip bit per group
        // should leave every coefficient in that quant unit's first group at zero without
        // consuming a codeword.
        let data = [0xFFu8; 64];
        let mut reader = BitReader::new(&data);
        let mut qu_wordlen = [0u8; 32];
        qu_wordlen[0] = 1;
        let qu_tab_idx = [0u8; 32];

        let spectrum = decode_spectrum(&mut reader, 1, &qu_wordlen, &qu_tab_idx, None).unwrap();
        assert!(spectrum[..QU_WIDTH].iter().all(|&x| x == 0));
    }
}
