// Copyright (c) 2019-2022 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! GHA (generalised harmonic analysis) tone decode and re-synthesis.

use crate::error::{decode_error, Result};
use crate::io::BitReader;

use super::tables::{HANN_256, SINE_TABLE};

pub const MAX_WAVES: usize = 48;
const MAX_WAVES_PER_BAND: usize = 16;

#[derive(Clone, Copy, Default)]
pub struct WaveParam {
    pub freq_index: u16,
    pub amp_sf: u8,
    pub amp_index: u8,
    pub phase_index: u8,
}

#[derive(Clone, Copy, Default)]
pub struct Envelope {
    pub has_start: bool,
    pub start_pos: u8,
    pub has_stop: bool,
    pub stop_pos: u8,
}

#[derive(Clone, Default)]
pub struct BandWaves {
    pub envelope: Envelope,
    pub waves: Vec<WaveParam>,
}

#[derive(Clone, Default)]
pub struct ChannelWaveData {
    pub bands: Vec<BandWaves>,
}

#[derive(Clone, Default)]
pub struct ToneInfo {
    pub present: bool,
    pub tone_sharing: Vec<bool>,
    pub tone_master: Vec<bool>,
    pub invert_phase: Vec<bool>,
    pub channels: [ChannelWaveData; 2],
}

/// Reads the per-unit tone info (if `tones_present`). `amplitude_mode` other than 1 is rejected
/// with an error the caller maps to `NOT_IMPLEMENTED`.
pub fn read_tone_info(reader: &mut BitReader<'_>, num_channels: usize, num_subbands: usize) -> Result<ToneInfo> {
    let present = reader.read_bit();
    if !present {
        return Ok(ToneInfo { present: false, ..Default::default() });
    }

    let amplitude_mode = reader.read_bits(1);
    if amplitude_mode != 1 {
        return Err(crate::error::Error::Unsupported("atrac3+ tone amplitude_mode=0"));
    }

    let num_tone_bands = (reader.read_bits(5) as usize + 1).min(num_subbands);

    let mut tone_sharing = vec![false; num_tone_bands];
    let mut tone_master = vec![false; num_tone_bands];
    let mut invert_phase = vec![false; num_tone_bands];
    if num_channels == 2 {
        for b in 0..num_tone_bands {
            tone_sharing[b] = reader.read_bit();
            tone_master[b] = reader.read_bit();
            invert_phase[b] = reader.read_bit();
        }
    }

    let mut channels: [ChannelWaveData; 2] = Default::default();
    let mut total_waves = 0usize;

    for ch in 0..num_channels {
        let mut bands = Vec::with_capacity(num_tone_bands);
        for b in 0..num_tone_bands {
            if ch == 1 && tone_sharing[b] {
                bands.push(channels[0].bands[b].clone());
                continue;
            }

            let has_start = reader.read_bit();
            let start_pos = if has_start { reader.read_bits(5) as u8 } else { 0 };
            let has_stop = reader.read_bit();
            let stop_pos = if has_stop { reader.read_bits(5) as u8 } else { 0 };

            let num_waves = (reader.read_bits(4) as usize).min(MAX_WAVES_PER_BAND);
            let mut waves = Vec::with_capacity(num_waves);
            let mut prev_freq: i32 = -1;
            for _ in 0..num_waves {
                if total_waves >= MAX_WAVES {
                    return decode_error("atrac3+: too many GHA waves in frame");
                }
                let freq_index = reader.read_bits(10) as u16;
                if prev_freq >= 0 && (freq_index as i32) < prev_freq {
                    // descending order permitted; no further validation beyond range.
                }
                prev_freq = freq_index as i32;

                let amp_sf = reader.read_bits(6) as u8;
                let amp_index = reader.read_bits(4) as u8;
                let phase_index = reader.read_bits(5) as u8;

                waves.push(WaveParam { freq_index, amp_sf, amp_index, phase_index });
                total_waves += 1;
            }

            bands.push(BandWaves { envelope: Envelope { has_start, start_pos, has_stop, stop_pos }, waves });
        }
        channels[ch] = ChannelWaveData { bands };
    }

    if num_channels == 2 {
        for b in 0..num_tone_bands {
            if tone_master[b] {
                channels.swap(0, 1);
                break;
            }
        }
    }

    Ok(ToneInfo { present: true, tone_sharing, tone_master, invert_phase, channels })
}

/// Synthesises one subband's 128-sample region for `waves`, applying a one-sided or two-sided
/// Hann envelope fade depending on whether the neighbouring frame also has waves on this band.
pub fn synthesize_region(
    waves: &[WaveParam],
    invert_phase: bool,
    region_offset: usize,
    fade_in: bool,
    fade_out: bool,
    out: &mut [f32],
) {
    let len = out.len();
    for wave in waves {
        let freq = wave.freq_index as usize;
        let amp = super::tables::AMP_SF_TAB[(wave.amp_sf as usize).min(63)];
        let phase_offset = (wave.phase_index as i32) * 64 - region_offset as i32;
        let sign = if invert_phase { -1.0 } else { 1.0 };

        for (i, sample) in out.iter_mut().enumerate() {
            let phase = (freq * i) as i32 + phase_offset;
            let idx = phase.rem_euclid(2048) as usize;
            *sample += sign * amp * SINE_TABLE[idx];
        }
    }

    if fade_in {
        for (i, sample) in out.iter_mut().enumerate().take(len.min(HANN_256.len())) {
            *sample *= HANN_256[i];
        }
    }
    if fade_out {
        let hann_len = HANN_256.len();
        for (i, sample) in out.iter_mut().enumerate() {
            if i + hann_len >= len {
                *sample *= HANN_256[hann_len - 1 - (len - 1 - i)];
            }
        }
    }
}
