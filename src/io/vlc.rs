// Copyright (c) 2019-2022 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Canonical Huffman / VLC table construction and lookup.
//!
//! Grounded on the jump/value cascaded lookup of `symphonia-core`'s `io::bit::huffman` module
//! (`HuffmanEntry::{is_jump, is_value, jump_offset, next_len}`), generalized to a flat
//! `(length, code, symbol)` descriptor construction at runtime instead of compile-time
//! `val8!`/`jmp8!` macro tables. Each table owns its levels as an independently allocated `Vec`
//! rather than slicing one giant static arena — there is no reason to preserve that layout here.

use std::collections::HashMap;

use super::bitstream::BitReader;

/// Maximum number of bits resolved by a single cascaded table level.
const MAX_LEVEL_BITS: u32 = 9;

/// Maximum number of cascade levels a lookup may traverse.
const MAX_LEVELS: u32 = 3;

#[derive(Clone, Copy)]
enum Entry {
    /// A fully resolved codeword: `symbol` decodes with `length` bits consumed at this level.
    Value { symbol: i32, length: u8 },
    /// An unresolved prefix: continue the lookup in `tables[table]` after consuming `bits` more
    /// bits.
    Jump { table: u32, bits: u8 },
}

/// One input codeword: `code` occupies the low `len` bits of the integer, MSB-first.
#[derive(Clone, Copy)]
pub struct RawCode {
    pub code: u32,
    pub len: u8,
    pub symbol: i32,
}

/// A cascaded VLC decode table built from `(length, code, symbol)` descriptors.
///
/// Construction is fallible: a codeword longer than the descriptor permits, a duplicate prefix,
/// or `code >= 2^bits` is an error raised at table-init time. Runtime lookups
/// ([`VlcTable::read`]) never fail — the tables built here are always exhaustive.
pub struct VlcTable {
    levels: Vec<Vec<Entry>>,
}

impl VlcTable {
    /// Builds a table from parallel `bits[i]`/`codes[i]`/optional `symbols[i]` arrays. Entries
    /// with `bits[i] == 0` are skipped (unused slots in a sparse descriptor).
    pub fn build(bits: &[u8], codes: &[u32], symbols: Option<&[i32]>) -> Result<VlcTable, &'static str> {
        if bits.len() != codes.len() {
            return Err("vlc: bits/codes length mismatch");
        }
        if let Some(syms) = symbols {
            if syms.len() != bits.len() {
                return Err("vlc: symbols length mismatch");
            }
        }

        let mut raw = Vec::with_capacity(bits.len());
        for (i, (&len, &code)) in bits.iter().zip(codes.iter()).enumerate() {
            if len == 0 {
                continue;
            }
            if code >= (1u32 << len) {
                return Err("vlc: code wider than its declared length");
            }
            let symbol = symbols.map(|s| s[i]).unwrap_or(i as i32);
            raw.push(RawCode { code, len, symbol });
        }

        Self::from_raw(&raw)
    }

    /// Builds a table directly from a list of `RawCode`s (used by the canonical descriptor
    /// builder and directly by callers that already have explicit codewords).
    pub fn from_raw(raw: &[RawCode]) -> Result<VlcTable, &'static str> {
        let mut levels = Vec::new();
        if raw.is_empty() {
            levels.push(vec![Entry::Value { symbol: 0, length: 0 }]);
            return Ok(VlcTable { levels });
        }
        build_level(&mut levels, raw, 0, 0)?;
        Ok(VlcTable { levels })
    }

    /// Decodes one symbol from `reader`, advancing it past the codeword.
    pub fn read(&self, reader: &mut BitReader<'_>) -> i32 {
        let mut table_idx = 0usize;
        loop {
            let table = &self.levels[table_idx];
            let level_bits = table.len().trailing_zeros();
            let prefix = reader.peek_bits(level_bits) as usize;
            match table[prefix] {
                Entry::Value { symbol, length } => {
                    reader.skip_bits(u32::from(length));
                    return symbol;
                }
                Entry::Jump { table: next, bits } => {
                    reader.skip_bits(u32::from(bits));
                    table_idx = next as usize;
                }
            }
        }
    }
}

/// Recursively builds one cascade level covering `codes` whose top bits have already consumed
/// `consumed` bits of their total length. Returns the index of the newly built level.
fn build_level(
    levels: &mut Vec<Vec<Entry>>,
    codes: &[RawCode],
    consumed: u32,
    depth: u32,
) -> Result<usize, &'static str> {
    if depth >= MAX_LEVELS {
        return Err("vlc: codeword exceeds maximum cascade depth");
    }

    let max_remaining = codes.iter().map(|c| u32::from(c.len) - consumed).max().unwrap_or(0);
    let level_bits = max_remaining.min(MAX_LEVEL_BITS).max(1);
    let size = 1usize << level_bits;

    let mut table = vec![None; size];
    let mut jump_buckets: HashMap<u32, Vec<RawCode>> = HashMap::new();

    for &c in codes {
        let remaining = u32::from(c.len) - consumed;
        if remaining <= level_bits {
            let prefix = c.code & ((1u32 << remaining) - 1);
            let fill = 1usize << (level_bits - remaining);
            let base = (prefix as usize) << (level_bits - remaining);
            for k in 0..fill {
                let idx = base + k;
                if table[idx].is_some() {
                    return Err("vlc: overlapping codewords");
                }
                table[idx] = Some(Entry::Value { symbol: c.symbol, length: remaining as u8 });
            }
        } else {
            let shift = remaining - level_bits;
            let prefix = (c.code >> shift) & ((1u32 << level_bits) - 1);
            jump_buckets.entry(prefix).or_default().push(c);
        }
    }

    // Reserve this level's slot before recursing so sub-tables get higher indexes; fill it in
    // once every bucket has a built sub-table index.
    let this_index = levels.len();
    levels.push(Vec::new());

    for (prefix, bucket) in jump_buckets {
        let sub_index = build_level(levels, &bucket, consumed + level_bits, depth + 1)?;
        let idx = prefix as usize;
        if table[idx].is_some() {
            return Err("vlc: overlapping codewords");
        }
        table[idx] = Some(Entry::Jump { table: sub_index as u32, bits: level_bits as u8 });
    }

    let resolved: Vec<Entry> = table
        .into_iter()
        .map(|e| e.unwrap_or(Entry::Value { symbol: 0, length: level_bits as u8 }))
        .collect();
    levels[this_index] = resolved;

    Ok(this_index)
}

/// A compact canonical-Huffman descriptor: `min_len`, `max_len`, then one count per length in
/// `[min_len, max_len]` giving how many codewords of that length exist. Codes are assigned in
/// ascending numeric order as length increases, per the canonical Huffman convention.
pub struct CanonicalVlcDescriptor<'a> {
    pub min_len: u8,
    pub max_len: u8,
    pub counts: &'a [u16],
    /// Symbol value for the `i`-th codeword in emission order (ascending length, then ascending
    /// code value). If `None`, the emission index itself is used as the symbol.
    pub symbols: Option<&'a [i32]>,
}

impl<'a> CanonicalVlcDescriptor<'a> {
    pub fn build(&self) -> Result<VlcTable, &'static str> {
        if self.counts.len() != (self.max_len - self.min_len + 1) as usize {
            return Err("vlc: canonical descriptor count/length mismatch");
        }

        let mut raw = Vec::new();
        let mut code: u32 = 0;
        let mut emitted = 0usize;

        for (i, &count) in self.counts.iter().enumerate() {
            let len = self.min_len + i as u8;
            for _ in 0..count {
                let symbol = self.symbols.map(|s| s[emitted]).unwrap_or(emitted as i32);
                raw.push(RawCode { code, len, symbol });
                code += 1;
                emitted += 1;
            }
            code <<= 1;
        }

        VlcTable::from_raw(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_bit_table_roundtrips() {
        // Two one-bit codes.
        let bits = [1u8, 1];
        let codes = [0u32, 1];
        let table = VlcTable::build(&bits, &codes, None).unwrap();

        let buf = [0b1011_0000u8];
        let mut r = BitReader::new(&buf);
        assert_eq!(table.read(&mut r), 1); // '1'
        assert_eq!(table.read(&mut r), 0); // '0'
        assert_eq!(table.read(&mut r), 1); // '1'
        assert_eq!(table.read(&mut r), 1); // '1'
    }

    #[test]
    fn multi_length_canonical_table() {
        // Classic example: symbols with lengths {1, 2, 3, 3}.
        // Canonical codes: 0 (len1=0), 10 (len2=2), 110 (len3=6), 111 (len3=7).
        let desc = CanonicalVlcDescriptor { min_len: 1, max_len: 3, counts: &[1, 1, 2], symbols: None };
        let table = desc.build().unwrap();

        // Encode symbol sequence 0, 1, 2, 3 back to back: 0 10 110 111 -> 0_10_110_111
        // bits: 0 1 0 1 1 0 1 1 1 -> pad to byte boundary: 0101_1011_1000_0000
        let buf = [0b0101_1011u8, 0b1000_0000];
        let mut r = BitReader::new(&buf);
        assert_eq!(table.read(&mut r), 0);
        assert_eq!(table.read(&mut r), 1);
        assert_eq!(table.read(&mut r), 2);
        assert_eq!(table.read(&mut r), 3);
    }

    #[test]
    fn rejects_overlong_code() {
        let bits = [2u8];
        let codes = [5u32]; // 5 >= 2^2
        assert!(VlcTable::build(&bits, &codes, None).is_err());
    }

    #[test]
    fn long_codewords_cascade_through_subtables() {
        // A 12-bit codeword forces a second cascade level (primary table caps at 9 bits).
        let bits = [12u8];
        let codes = [0b1111_1111_1111u32];
        let table = VlcTable::build(&bits, &codes, None).unwrap();

        let buf = [0xFFu8, 0xF0];
        let mut r = BitReader::new(&buf);
        assert_eq!(table.read(&mut r), 0);
    }
}
