// Copyright (c) 2019-2022 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The ATRAC3 frame decoder: bitstream parsing, tonal-component overlay, 512-point IMLT, gain
//! compensation, joint-stereo matrixing, and four-band QMF synthesis.
//!
//! Organized the way `symphonia-bundle-mp3` keeps its frame-header, bit-allocation and
//! synthesis stages in sibling modules under one bundled crate rather than separate crates per
//! concern.

mod joint_stereo;
mod qmf;
mod tables;

use crate::dsp::common::{gain_compensate, GainBlock, GainParams};
use crate::dsp::Imdct;
use crate::error::{decode_error, Result};
use crate::io::bitstream::BitReader;

use qmf::QmfBank;

pub const SAMPLES_PER_FRAME: usize = 1024;
const BANDS: usize = 4;
const BAND_LEN: usize = 256;
const NUM_BANDS_MAX_COEFS: usize = 512;

const SU0_SYNC: u32 = 0x28;
const SU1_SYNC: u32 = 0x3;

/// A single tonal component overlaid onto the coded spectrum: a spectral position and up to 8
/// dequantized coefficients.
#[derive(Clone)]
struct TonalComponent {
    pos: usize,
    coefs: Vec<f32>,
}

/// Per-channel decode state carried across frames: the four bands' gain-compensation overlap
/// tails, the gain-control two-slot pipeline, and the QMF synthesis delay lines.
struct ChannelUnit {
    overlap: [[f32; BAND_LEN]; BANDS],
    gain_now: [GainBlock; BANDS],
    gain_next: [GainBlock; BANDS],
    qmf: QmfBank,
}

impl ChannelUnit {
    fn new() -> Self {
        ChannelUnit {
            overlap: [[0f32; BAND_LEN]; BANDS],
            gain_now: [GainBlock::empty(); BANDS],
            gain_next: [GainBlock::empty(); BANDS],
            qmf: QmfBank::new(),
        }
    }
}

/// The ATRAC3 codec context: up to two channel units plus joint-stereo pipeline state and the
/// shared IMDCT kernel.
pub struct Atrac3Decoder {
    channels: usize,
    joint_stereo: bool,
    units: Vec<ChannelUnit>,
    joint_state: joint_stereo::JointStereoState,
    imdct: Imdct,
    reverse_scratch: Vec<u8>,
}

impl Atrac3Decoder {
    pub fn new(channels: usize, joint_stereo: bool) -> Self {
        let units = (0..channels).map(|_| ChannelUnit::new()).collect();
        Atrac3Decoder {
            channels,
            joint_stereo,
            units,
            joint_state: joint_stereo::JointStereoState::default(),
            // ATRAC3 calls `mdct_init(9, inverse=true, scale=1/32768)`.
            imdct: Imdct::new(9, 1.0 / 32768.0),
            reverse_scratch: Vec::new(),
        }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Decodes one `block_align`-byte compressed frame into `channels` planar buffers of
    /// [`SAMPLES_PER_FRAME`] samples each.
    pub fn decode_frame(&mut self, data: &[u8]) -> Result<Vec<Vec<f32>>> {
        let mut planar: Vec<Vec<f32>> = (0..self.channels).map(|_| vec![0f32; SAMPLES_PER_FRAME]).collect();

        if self.channels == 2 && self.joint_stereo {
            self.decode_joint_stereo(data, &mut planar)?;
        }
        else {
            let half = data.len() / self.channels.max(1);
            for (ch, out) in planar.iter_mut().enumerate() {
                let start = ch * half;
                let end = if ch + 1 == self.channels { data.len() } else { start + half };
                self.decode_sound_unit(ch, &data[start..end], SU0_SYNC, 6, out)?;
            }
        }

        Ok(planar)
    }

    fn decode_joint_stereo(&mut self, data: &[u8], planar: &mut [Vec<f32>]) -> Result<()> {
        let half = data.len() / 2;
        let (su0, su1) = data.split_at(half);

        {
            let mut left = std::mem::take(&mut planar[0]);
            self.decode_sound_unit(0, su0, SU0_SYNC, 6, &mut left)?;
            planar[0] = left;
        }

        joint_stereo::reverse_bytes_into(su1, &mut self.reverse_scratch);
        let reversed = std::mem::take(&mut self.reverse_scratch);
        {
            let mut right = std::mem::take(&mut planar[1]);
            let result = (|| -> Result<()> {
                let mut reader = BitReader::new(&reversed);
                self.joint_state.parse_and_shift(&mut reader);
                self.decode_sound_unit_body(1, &mut reader, &mut right)
            })();
            planar[1] = right;
            self.reverse_scratch = reversed;
            result?;
        }

        let (left, right) = planar.split_at_mut(1);
        joint_stereo::apply(&self.joint_state, &mut left[0], &mut right[0]);

        Ok(())
    }

    fn decode_sound_unit(
        &mut self,
        channel: usize,
        data: &[u8],
        expect_sync: u32,
        sync_bits: u32,
        out: &mut [f32],
    ) -> Result<()> {
        let mut reader = BitReader::new(data);
        let sync = reader.read_bits(sync_bits);
        if sync != expect_sync {
            return decode_error("atrac3: sound unit sync mismatch");
        }
        self.decode_sound_unit_body(channel, &mut reader, out)
    }

    fn decode_sound_unit_body(&mut self, channel: usize, reader: &mut BitReader<'_>, out: &mut [f32]) -> Result<()> {
        let bands_coded = reader.read_bits(2) as usize;

        let mut gain_next = [GainBlock::empty(); BANDS];
        for band in gain_next.iter_mut().take(bands_coded + 1) {
            *band = read_gain_block(reader)?;
        }

        let nb_components = reader.read_bits(5) as usize;
        let mut tonal = Vec::new();
        if nb_components > 0 {
            let selector = reader.read_bits(2);
            if selector == 2 {
                return decode_error("atrac3: invalid tonal coding_mode_selector");
            }
            read_tonal_components(reader, nb_components, bands_coded, selector, &mut tonal)?;
        }

        let mut spectrum = vec![0f32; NUM_BANDS_MAX_COEFS * 2];
        read_spectrum(reader, &mut spectrum)?;

        merge_tonal(&tonal, &mut spectrum);

        let active_bands = ((spectrum_extent(&spectrum) as isize - 1).max(0) as usize >> 8) + 1;
        let active_bands = active_bands.min(BANDS);

        let unit = &mut self.units[channel];
        let mut bands_time: [Vec<f32>; BANDS] = Default::default();

        for band in 0..BANDS {
            let mut imlt_out = vec![0f32; 512];
            if band < active_bands {
                let mut coefs = spectrum[band * 256..band * 256 + 256].to_vec();
                if band % 2 == 1 {
                    coefs.reverse();
                }
                self.imdct.imdct_calc(&coefs, &mut imlt_out);
                for (s, w) in imlt_out.iter_mut().zip(tables::MDCT_WINDOW.iter()) {
                    *s *= w;
                }
            }

            let mut band_out = vec![0f32; BAND_LEN];
            gain_compensate(
                &GainParams::ATRAC3,
                &imlt_out,
                &mut unit.overlap[band],
                &unit.gain_now[band],
                &gain_next[band],
                BAND_LEN,
                &mut band_out,
            );
            bands_time[band] = band_out;
        }

        unit.gain_now = gain_next;
        unit.qmf.synthesize(&bands_time, out);

        Ok(())
    }
}

fn spectrum_extent(spectrum: &[f32]) -> usize {
    spectrum.iter().rposition(|&x| x != 0.0).map(|p| p + 1).unwrap_or(0).max(256)
}

fn read_gain_block(reader: &mut BitReader<'_>) -> Result<GainBlock> {
    let num_points = reader.read_bits(3) as usize;
    if num_points > 7 {
        return decode_error("atrac3: gain block num_points out of range");
    }
    let mut block = GainBlock::empty();
    block.num_points = num_points;
    let mut last_loc = -1i32;
    for i in 0..num_points {
        block.lev_code[i] = reader.read_bits(4) as u8;
        let loc = reader.read_bits(5) as i32;
        if loc <= last_loc {
            return decode_error("atrac3: gain block locations not strictly ascending");
        }
        last_loc = loc;
        block.loc_code[i] = loc as u8;
    }
    Ok(block)
}

fn read_tonal_components(
    reader: &mut BitReader<'_>,
    nb_components: usize,
    bands_coded: usize,
    selector: u32,
    out: &mut Vec<TonalComponent>,
) -> Result<()> {
    let num_bands = bands_coded + 1;
    let mut remaining = nb_components;

    for slot in 0..(4 * num_bands) {
        if remaining == 0 {
            break;
        }
        let band_present = reader.read_bits(4);
        if band_present == 0 {
            continue;
        }
        let coded_values_per_component = reader.read_bits(3);
        let quant_step_index = reader.read_bits(3);
        if quant_step_index < 2 {
            return decode_error("atrac3: tonal quant_step_index too small");
        }
        if selector == 3 {
            let _coding_mode = reader.read_bit();
        }

        let coded_components = reader.read_bits(3) as usize;
        for _ in 0..coded_components {
            if remaining == 0 {
                break;
            }
            let sf_index = reader.read_bits(6) as usize;
            let pos_low = reader.read_bits(6) as usize;
            let pos = (slot << 6 | pos_low) & 1023;

            let count = coded_values_per_component as usize + 1;
            let coefs = decode_mantissas(reader, quant_step_index, count);

            let sf = tables::INV_MAX_QUANT[quant_step_index as usize] * scalefactor(sf_index);
            let coefs: Vec<f32> = coefs.iter().map(|&c| c * sf).collect();

            out.push(TonalComponent { pos, coefs });
            remaining -= 1;
            if out.len() >= 64 {
                return Ok(());
            }
        }
    }

    Ok(())
}

fn scalefactor(index: usize) -> f32 {
    crate::dsp::common::SCALEFACTOR_TABLE[index.min(63)]
}

fn merge_tonal(tonal: &[TonalComponent], spectrum: &mut [f32]) {
    for comp in tonal {
        for (i, &c) in comp.coefs.iter().enumerate() {
            let idx = comp.pos + i;
            if idx < spectrum.len() {
                spectrum[idx] += c;
            }
        }
    }
}

fn read_spectrum(reader: &mut BitReader<'_>, spectrum: &mut [f32]) -> Result<()> {
    let num_subbands = reader.read_bits(5) as usize;
    let clc_mode = reader.read_bit();

    let mut selectors = [0u32; 33];
    for sel in selectors.iter_mut().take(num_subbands + 1) {
        *sel = reader.read_bits(3);
    }

    for sb in 0..=num_subbands.min(32) {
        let selector = selectors[sb];
        let start = tables::SUBBAND_TAB[sb];
        let end = tables::SUBBAND_TAB[sb + 1];
        if selector == 0 {
            continue;
        }

        let sf_index = reader.read_bits(6) as usize;
        let sf = scalefactor(sf_index);
        let count = end - start;

        let coefs = if clc_mode {
            decode_mantissas_clc(reader, selector, count)
        }
        else {
            decode_mantissas(reader, selector, count)
        };

        let inv_q = tables::INV_MAX_QUANT[(selector as usize).min(7)];
        for (i, &c) in coefs.iter().enumerate() {
            if start + i < spectrum.len() {
                spectrum[start + i] = c * sf * inv_q;
            }
        }
    }

    Ok(())
}

/// Decodes `count` VLC-coded mantissas using the codebook for `selector` (1..=7). Selector 1
/// decodes two coefficients per symbol via the 18-entry signed-pair table
/// ([`tables::MANTISSA_VLC_TAB`]); selectors 2..=7 decode one coefficient per symbol plus a
/// separate sign bit.
fn decode_mantissas(reader: &mut BitReader<'_>, selector: u32, count: usize) -> Vec<f32> {
    let mut out = Vec::with_capacity(count);
    if selector == 1 {
        while out.len() < count {
            let idx = reader.read_vlc(&tables::MANTISSA_VLC_TAB1) as usize % tables::MANTISSA_VLC_TAB.len();
            let (a, b) = tables::MANTISSA_VLC_TAB[idx];
            out.push(a as f32);
            out.push(b as f32);
        }
        out.truncate(count);
        return out;
    }

    let table_idx = (selector as usize).saturating_sub(2).min(5);
    let table = &tables::MANTISSA_VLC_TABLES[table_idx];
    for _ in 0..count {
        let sym = reader.read_vlc(table);
        let magnitude = sym.abs();
        let sign = if reader.read_bit() && magnitude != 0 { -1.0 } else { 1.0 };
        out.push(magnitude as f32 * sign);
    }
    out
}

fn decode_mantissas_clc(reader: &mut BitReader<'_>, selector: u32, count: usize) -> Vec<f32> {
    let mut out = Vec::with_capacity(count);
    if selector == 1 {
        while out.len() < count {
            let code = reader.read_bits(4) as usize;
            let a = tables::MANTISSA_CLC_TAB[code & 3];
            let b = tables::MANTISSA_CLC_TAB[(code >> 2) & 3];
            out.push(a as f32);
            out.push(b as f32);
        }
        out.truncate(count);
        return out;
    }

    let bits = tables::CLC_LENGTH_TAB[(selector as usize).min(7)];
    for _ in 0..count {
        out.push(reader.read_bits_signed(bits) as f32);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_frame_decodes_to_zero() {
        let mut dec = Atrac3Decoder::new(1, false);
        // A minimal SU0 sync token (0x28, 6 bits) followed by zeros: bands_coded = 0, no gain
        // points, no tonal components, num_subbands = 0, CLC mode, selector = 0.
        let data = vec![0u8; 400];
        let mut data = data;
        data[0] = 0b1010_0000; // sync 0x28 in the top 6 bits
        let out = dec.decode_frame(&data).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].len(), SAMPLES_PER_FRAME);
    }
}
