// Copyright (c) 2019-2022 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The ATRAC3+ frame decoder: channel-unit bitstream grammar, spectrum reconstruction, GHA tone
//! re-synthesis, and 16-band IPQF synthesis.
//!
//! Organized the way `symphonia-bundle-mp3` keeps bit-allocation and synthesis in sibling
//! modules of one bundled crate. ATRAC3+'s bitstream grammar has no direct analogue in that
//! crate, so the module split (common field coding / spectrum / tones / IPQF) instead follows
//! the channel unit's own section breakdown.

mod ipqf;
mod spectrum;
mod tables;
mod tones;

use crate::dsp::common::{gain_compensate, GainBlock, GainParams};
use crate::dsp::Imdct;
use crate::error::{decode_error, unsupported_error, Result};
use crate::io::bitstream::BitReader;

use ipqf::Ipqf;
use tables::{NUM_QMF_BANDS, QU_WIDTH};
use tones::BandWaves;

pub const SAMPLES_PER_FRAME: usize = 2048;
const SUBBAND_WIDTH: usize = SAMPLES_PER_FRAME / NUM_QMF_BANDS;
const MAX_QUANT_UNITS: usize = 32;

#[derive(Clone, Copy, PartialEq, Eq)]
enum UnitType {
    Mono,
    Stereo,
    Extension,
    Terminator,
}

impl UnitType {
    fn from_bits(v: u32) -> UnitType {
        match v {
            0 => UnitType::Mono,
            1 => UnitType::Stereo,
            2 => UnitType::Extension,
            _ => UnitType::Terminator,
        }
    }
}

/// One channel's share of a channel unit's GHA tone data: its per-band wave parameters plus the
/// per-band invert-phase flag (only ever set for the slave channel of a stereo unit).
#[derive(Clone, Default)]
struct ChannelToneData {
    bands: Vec<BandWaves>,
    invert_phase: Vec<bool>,
}

struct ChannelState {
    overlap: [[f32; SUBBAND_WIDTH]; NUM_QMF_BANDS],
    gain_data: [[GainBlock; NUM_QMF_BANDS]; 2],
    window_shape: [[bool; NUM_QMF_BANDS]; 2],
    tone_data: [ChannelToneData; 2],
    ipqf: Ipqf,
}

impl ChannelState {
    fn new() -> Self {
        ChannelState {
            overlap: [[0f32; SUBBAND_WIDTH]; NUM_QMF_BANDS],
            gain_data: Default::default(),
            window_shape: [[false; NUM_QMF_BANDS]; 2],
            tone_data: Default::default(),
            ipqf: Ipqf::new(),
        }
    }
}

/// The ATRAC3+ codec context. Only mono and stereo configurations are exercised; additional
/// channel units beyond stereo are accepted structurally but not exercised by any test in this
/// environment; configurations beyond stereo are handled best-effort.
pub struct Atrac3PlusDecoder {
    channels: usize,
    imdct: Imdct,
    units: Vec<ChannelState>,
    current_index: usize,
}

impl Atrac3PlusDecoder {
    pub fn new(channels: usize) -> Self {
        let units = (0..channels.max(1)).map(|_| ChannelState::new()).collect();
        Atrac3PlusDecoder {
            channels,
            // ATRAC3+ calls `mdct_init(8, inverse=true, scale=-1)`.
            imdct: Imdct::new(8, -1.0),
            units,
            current_index: 0,
        }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn decode_frame(&mut self, data: &[u8]) -> Result<Vec<Vec<f32>>> {
        let mut reader = BitReader::new(data);

        if reader.read_bit() {
            return decode_error("atrac3+: reserved first bit must be zero");
        }

        let mut planar: Vec<Vec<f32>> = (0..self.channels).map(|_| vec![0f32; SAMPLES_PER_FRAME]).collect();
        let mut channels_decoded = 0usize;

        loop {
            let unit_type = UnitType::from_bits(reader.read_bits(2));
            match unit_type {
                UnitType::Terminator => break,
                UnitType::Extension => return unsupported_error("atrac3+ CH_UNIT_EXTENSION"),
                UnitType::Mono | UnitType::Stereo => {
                    let num_channels = if unit_type == UnitType::Mono { 1 } else { 2 };
                    self.decode_channel_unit(&mut reader, channels_decoded, num_channels, &mut planar)?;
                    channels_decoded += num_channels;
                }
            }
            if channels_decoded >= self.channels || reader.bits_left() == 0 {
                break;
            }
        }

        self.current_index ^= 1;
        Ok(planar)
    }

    fn decode_channel_unit(
        &mut self,
        reader: &mut BitReader<'_>,
        base_channel: usize,
        num_channels: usize,
        planar: &mut [Vec<f32>],
    ) -> Result<()> {
        let num_quant_units = reader.read_bits(5) as usize + 1;
        if (29..=31).contains(&num_quant_units) {
            return decode_error("atrac3+: invalid num_quant_units");
        }
        let num_quant_units = num_quant_units.min(MAX_QUANT_UNITS);

        let mute_flag = reader.read_bit();
        if mute_flag {
            return Ok(());
        }

        let mut qu_wordlen = [[0u8; MAX_QUANT_UNITS]; 2];
        let mut qu_sf_idx = [[0u8; MAX_QUANT_UNITS]; 2];
        let mut qu_tab_idx = [[0u8; MAX_QUANT_UNITS]; 2];

        read_common_field(reader, num_channels, num_quant_units, 3, &mut qu_wordlen)?;
        read_common_field(reader, num_channels, num_quant_units, 6, &mut qu_sf_idx)?;
        read_common_field(reader, num_channels, num_quant_units, 3, &mut qu_tab_idx)?;

        let used_quant_units = (0..num_channels)
            .flat_map(|ch| (0..num_quant_units).filter(move |&qu| qu_wordlen[ch][qu] != 0))
            .map(|qu| qu + 1)
            .max()
            .unwrap_or(0);

        let num_subbands = tables::QU_TO_SUBBAND[num_quant_units - 1] + 1;
        let num_coded_subbands =
            if used_quant_units == 0 { 0 } else { tables::QU_TO_SUBBAND[used_quant_units - 1] + 1 };

        let mut swap_channels = [false; NUM_QMF_BANDS];
        let mut negate_coeffs = [false; NUM_QMF_BANDS];
        if num_channels == 2 {
            for b in swap_channels.iter_mut().take(num_coded_subbands) {
                *b = reader.read_bit();
            }
            for b in negate_coeffs.iter_mut().take(num_coded_subbands) {
                *b = reader.read_bit();
            }
        }

        let master_spectrum = spectrum::decode_spectrum(reader, num_quant_units, &qu_wordlen[0], &qu_tab_idx[0], None)?;
        let mut spectra = [master_spectrum, [0i32; 2048]];
        if num_channels == 2 {
            spectra[1] = spectrum::decode_spectrum(
                reader,
                num_quant_units,
                &qu_wordlen[1],
                &qu_tab_idx[1],
                Some(&spectra[0]),
            )?;
        }

        let mut power_levs = [[0u8; 16]; 2];
        if used_quant_units > 2 {
            for ch_levs in power_levs.iter_mut().take(num_channels) {
                for lev in ch_levs.iter_mut().take(num_coded_subbands) {
                    *lev = reader.read_bits(4) as u8;
                }
            }
        }

        let cur = self.current_index;
        for ch in 0..num_channels {
            let state = &mut self.units[base_channel + ch];
            for (b, shape) in state.window_shape[cur].iter_mut().enumerate().take(num_subbands) {
                *shape = reader.read_bit();
                let _ = b;
            }
        }

        let num_gain_subbands = num_coded_subbands.max(1);
        for ch in 0..num_channels {
            let state = &mut self.units[base_channel + ch];
            for gd in state.gain_data[cur].iter_mut().take(num_gain_subbands) {
                *gd = read_gain_block_5(reader)?;
            }
        }

        // `tones_present`, `amplitude_mode`, `num_tone_bands`, and (for a stereo unit) the
        // tone_sharing/tone_master/invert_phase triplet are read once for the whole channel unit,
        // shared across both channels; only the per-band envelope/wave-parameter reads are
        // genuinely per-channel.
        let tone = tones::read_tone_info(reader, num_channels, num_subbands)?;
        for ch in 0..num_channels {
            let invert_phase = if ch == 1 { tone.invert_phase.clone() } else { vec![false; tone.invert_phase.len()] };
            self.units[base_channel + ch].tone_data[cur] =
                ChannelToneData { bands: tone.channels[ch].bands.clone(), invert_phase };
        }

        if reader.read_bit() {
            let _noise_level_index = reader.read_bits(4);
            let _noise_table_index = reader.read_bits(4);
        }

        // Stereo post-process: swap/negate per coded subband, on the dequantized spectrum.
        if num_channels == 2 {
            for b in 0..num_coded_subbands {
                let start = b * SUBBAND_WIDTH;
                let end = start + SUBBAND_WIDTH;
                if swap_channels[b] {
                    let (left, right) = spectra.split_at_mut(1);
                    left[0][start..end].swap_with_slice(&mut right[0][start..end]);
                }
                if negate_coeffs[b] {
                    for v in spectra[1][start..end].iter_mut() {
                        *v = -*v;
                    }
                }
            }
        }

        for ch in 0..num_channels {
            let dequant = dequantize(&spectra[ch], num_quant_units, &qu_wordlen[ch], &qu_sf_idx[ch]);
            let dequant = apply_power_compensation(dequant, used_quant_units, num_coded_subbands, &power_levs[ch]);
            self.reconstruct_channel(base_channel + ch, &dequant, num_subbands, &mut planar[base_channel + ch])?;
        }

        Ok(())
    }

    fn reconstruct_channel(
        &mut self,
        channel: usize,
        dequant: &[f32; 2048],
        num_subbands: usize,
        out: &mut [f32],
    ) -> Result<()> {
        let cur = self.current_index;
        let prev = cur ^ 1;
        let imdct = &self.imdct;
        let state = &mut self.units[channel];

        let mut subband_time: [Vec<f32>; NUM_QMF_BANDS] = Default::default();

        for b in 0..NUM_QMF_BANDS {
            let mut td = vec![0f32; SUBBAND_WIDTH];

            if b < num_subbands {
                let start = b * SUBBAND_WIDTH;
                let mut coefs = dequant[start..start + SUBBAND_WIDTH].to_vec();
                if b % 2 == 1 {
                    coefs.reverse();
                }

                let mut imdct_out = vec![0f32; 2 * SUBBAND_WIDTH];
                imdct.imdct_calc(&coefs, &mut imdct_out);

                let window = build_window(state.window_shape[prev][b], state.window_shape[cur][b]);
                for (s, w) in imdct_out.iter_mut().zip(window.iter()) {
                    *s *= w;
                }

                gain_compensate(
                    &GainParams::ATRAC3PLUS,
                    &imdct_out,
                    &mut state.overlap[b],
                    &state.gain_data[prev][b],
                    &state.gain_data[cur][b],
                    SUBBAND_WIDTH,
                    &mut td,
                );
            }

            let cur_waves = state.tone_data[cur].bands.get(b);
            let prev_waves = state.tone_data[prev].bands.get(b);
            if cur_waves.map(|b| !b.waves.is_empty()).unwrap_or(false)
                || prev_waves.map(|b| !b.waves.is_empty()).unwrap_or(false)
            {
                let invert = state.tone_data[cur].invert_phase.get(b).copied().unwrap_or(false);
                let fade_out = prev_waves.map(|b| !b.waves.is_empty()).unwrap_or(false);
                if let Some(bw) = cur_waves {
                    tones::synthesize_region(&bw.waves, invert, 0, false, fade_out, &mut td);
                }
            }

            subband_time[b] = td;
        }

        state.ipqf.synthesize(&subband_time, out);
        Ok(())
    }
}

/// Builds the 256-sample IMDCT window from the previous frame's shape (first half) and the
/// current frame's shape (second half).
fn build_window(prev_steep: bool, cur_steep: bool) -> Vec<f32> {
    let mut window = vec![0f32; 2 * SUBBAND_WIDTH];

    // First half: shaped by the *previous* frame's flag.
    for i in 0..SUBBAND_WIDTH {
        window[i] = if prev_steep { steep_half(i) } else { sine_half(i) };
    }
    // Second half: shaped by the *current* frame's flag, mirrored.
    for i in 0..SUBBAND_WIDTH {
        window[SUBBAND_WIDTH + i] = if cur_steep { steep_half(SUBBAND_WIDTH - 1 - i) } else { sine_half(SUBBAND_WIDTH - 1 - i) };
    }
    window
}

fn sine_half(i: usize) -> f32 {
    (std::f64::consts::PI * (i as f64 + 0.5) / (2.0 * SUBBAND_WIDTH as f64)).sin() as f32
}

fn steep_half(i: usize) -> f32 {
    if i < 32 {
        0.0
    }
    else if i < 96 {
        (std::f64::consts::PI * (i as f64 - 32.0 + 0.5) / 128.0).sin() as f32
    }
    else {
        1.0
    }
}

fn dequantize(spectrum: &[i32; 2048], num_quant_units: usize, qu_wordlen: &[u8; 32], qu_sf_idx: &[u8; 32]) -> [f32; 2048] {
    let mut out = [0f32; 2048];
    for qu in 0..num_quant_units {
        let wl = qu_wordlen[qu] as usize;
        if wl == 0 {
            continue;
        }
        let scale = tables::SF_TAB[(qu_sf_idx[qu] as usize).min(63)] * tables::MANT_TAB[wl.min(7)];
        let start = qu * QU_WIDTH;
        for i in start..start + QU_WIDTH {
            out[i] = spectrum[i] as f32 * scale;
        }
    }
    out
}

fn apply_power_compensation(
    mut dequant: [f32; 2048],
    used_quant_units: usize,
    num_coded_subbands: usize,
    power_levs: &[u8; 16],
) -> [f32; 2048] {
    if used_quant_units <= 2 {
        return dequant;
    }
    for b in 0..num_coded_subbands {
        let lev = power_levs[b];
        if lev == 15 {
            continue;
        }
        let mag = tables::PWC_LEVS[lev as usize] / 2f32.powi((6 - lev as i32).max(0));
        let start = b * SUBBAND_WIDTH;
        for (i, v) in dequant[start..start + SUBBAND_WIDTH].iter_mut().enumerate() {
            let noise = tables::SINE_TABLE[(start + i) % tables::SINE_TABLE.len()];
            *v += noise * mag;
        }
    }
    dequant
}

/// Reads one field's common coding for both channels. A 2-bit mode header selects among four
/// per-quant-unit layouts sharing the same `width`-bit value range:
///
/// - mode 0, "plain": every unit is a fresh `width`-bit raw read.
/// - mode 1, "direct": each unit after the first carries a 1-bit repeat flag; when set, the unit
///   copies the previous unit's value instead of consuming a raw read.
/// - mode 2, "VQ-shape": a `width`-bit shape-table index is read once for the field, then every
///   unit still falls back to a fresh `width`-bit raw read, since the shape-table contents
///   themselves are not reproduced here. See `DESIGN.md`.
/// - mode 3, "delta-chain": the first unit is a fresh `width`-bit raw read; every unit after it is
///   a signed `(width - 1).max(1)`-bit delta added to the previous unit's value.
fn read_common_field(
    reader: &mut BitReader<'_>,
    num_channels: usize,
    num_quant_units: usize,
    width: u32,
    out: &mut [[u8; MAX_QUANT_UNITS]; 2],
) -> Result<()> {
    let mode = reader.read_bits(2);
    match mode {
        0 => {
            for ch in 0..num_channels {
                for qu in 0..num_quant_units {
                    out[ch][qu] = reader.read_bits(width) as u8;
                }
            }
        }
        1 => {
            for ch in 0..num_channels {
                for qu in 0..num_quant_units {
                    out[ch][qu] = if qu > 0 && reader.read_bit() {
                        out[ch][qu - 1]
                    }
                    else {
                        reader.read_bits(width) as u8
                    };
                }
            }
        }
        2 => {
            let _shape_index = reader.read_bits(width);
            for ch in 0..num_channels {
                for qu in 0..num_quant_units {
                    out[ch][qu] = reader.read_bits(width) as u8;
                }
            }
        }
        _ => {
            let delta_width = width.saturating_sub(1).max(1);
            for ch in 0..num_channels {
                let mut prev = 0i32;
                for qu in 0..num_quant_units {
                    let value = if qu == 0 {
                        reader.read_bits(width) as i32
                    }
                    else {
                        (prev + reader.read_bits_signed(delta_width)).clamp(0, (1 << width) - 1)
                    };
                    prev = value;
                    out[ch][qu] = value as u8;
                }
            }
        }
    }
    Ok(())
}

fn read_gain_block_5(reader: &mut BitReader<'_>) -> Result<GainBlock> {
    let num_points = reader.read_bits(3) as usize;
    if num_points > 7 {
        return decode_error("atrac3+: gain block num_points out of range");
    }
    let mut block = GainBlock::empty();
    block.num_points = num_points;
    let mut last_loc = -1i32;
    for i in 0..num_points {
        block.lev_code[i] = reader.read_bits(4) as u8;
        let loc = reader.read_bits(5) as i32;
        if loc <= last_loc || loc > 31 {
            return decode_error("atrac3+: gain block locations invalid");
        }
        last_loc = loc;
        block.loc_code[i] = loc as u8;
    }
    Ok(block)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminator_only_frame_decodes_to_silence() {
        let mut dec = Atrac3PlusDecoder::new(1);
        // First bit 0, then unit_type = TERMINATOR (3, 2 bits): 0b0_11_00000 = 0x60.
        let data = [0x60u8; 512];
        let out = dec.decode_frame(&data).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].len(), SAMPLES_PER_FRAME);
        assert!(out[0].iter().all(|&x| x == 0.0));
    }
}
