// Copyright (c) 2019-2022 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Sony OMA/AA3 (`ea3` tag + EA3 sync header) parsing.

use super::{CodecKind, ContainerDescriptor, ContainerKind};
use crate::error::{decode_error, Result};

const EA3_SYNC_HEADER_LEN: usize = 96;
const OMA_SRS: [u32; 8] = [320, 441, 480, 882, 960, 0, 0, 0];

pub fn parse(data: &[u8], stream_len: u64) -> Result<ContainerDescriptor> {
    if data.len() < 10 || &data[0..3] != b"ea3" {
        return decode_error("oma: missing ea3 tag");
    }

    let h = &data[0..10];
    let header_size = ((h[6] as u32 & 0x7F) << 21)
        | ((h[7] as u32 & 0x7F) << 14)
        | ((h[8] as u32 & 0x7F) << 7)
        | (h[9] as u32 & 0x7F);

    let sync_offset = 10 + header_size as usize;
    if data.len() < sync_offset + EA3_SYNC_HEADER_LEN {
        return decode_error("oma: truncated EA3 sync header");
    }

    let sync = &data[sync_offset..sync_offset + EA3_SYNC_HEADER_LEN];
    if &sync[0..3] != b"EA3" || sync[3] != 0 || sync[4] != 0 || sync[5] != 0x60 {
        return decode_error("oma: bad EA3 sync header magic");
    }

    let codec_id = sync[32];
    let params = ((sync[33] as u32) << 16) | ((sync[34] as u32) << 8) | sync[35] as u32;

    let sample_rate = OMA_SRS[((params >> 13) & 7) as usize] * 100;
    if sample_rate == 0 {
        return decode_error("oma: invalid sample rate index");
    }

    let data_offset = (sync_offset + EA3_SYNC_HEADER_LEN) as u64;
    let data_size = stream_len.saturating_sub(data_offset);

    let (codec, block_align, channels, joint_stereo) = match codec_id {
        0 => {
            let block_align = (params & 0x3FF) * 8;
            let joint_stereo = (params >> 17) & 1 != 0;
            (CodecKind::Atrac3, block_align, 2u16, joint_stereo)
        }
        1 => {
            let block_align = ((params & 0x3FF) * 8) + 8;
            let channels = match (params >> 10) & 7 {
                0 => 2,
                1 => 1,
                2 => 2,
                3 => 3,
                4 => 4,
                5 => 6,
                6 => 7,
                7 => 8,
                _ => unreachable!(),
            };
            (CodecKind::Atrac3Plus, block_align, channels, false)
        }
        _ => return decode_error("oma: unsupported codec id"),
    };

    if block_align == 0 {
        return decode_error("oma: zero block_align");
    }

    let samples_per_frame = match codec {
        CodecKind::Atrac3 => 1024u32,
        CodecKind::Atrac3Plus => 2048u32,
    };
    let bit_rate = (block_align * 8 * sample_rate) / samples_per_frame;

    let mut extradata = [0u8; 14];
    extradata[0] = 1;
    extradata[1] = (sample_rate & 0xFF) as u8;
    extradata[2] = ((sample_rate >> 8) & 0xFF) as u8;
    if joint_stereo {
        extradata[5] = 1;
        extradata[7] = 1;
    }
    extradata[9] = 1;

    Ok(ContainerDescriptor {
        kind: ContainerKind::Oma,
        codec,
        sample_rate,
        channels,
        block_align,
        bit_rate,
        joint_stereo,
        extradata,
        data_offset,
        data_size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_oma(codec_id: u8, params: u32) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"ea3");
        out.push(0x03); // version
        out.extend_from_slice(&[0, 0]);
        // header_size = 0 (syncsafe, all bytes zero).
        out.extend_from_slice(&[0, 0, 0, 0]);

        let mut sync = vec![0u8; EA3_SYNC_HEADER_LEN];
        sync[0..3].copy_from_slice(b"EA3");
        sync[3] = 0;
        sync[4] = 0;
        sync[5] = 0x60;
        sync[32] = codec_id;
        sync[33] = ((params >> 16) & 0xFF) as u8;
        sync[34] = ((params >> 8) & 0xFF) as u8;
        sync[35] = (params & 0xFF) as u8;
        out.extend_from_slice(&sync);

        out.extend(std::iter::repeat(0u8).take(1024));
        out
    }

    #[test]
    fn parses_atrac3_oma() {
        // sample rate index 2 (44.1kHz -> index1=441*100=44100), block_align raw = 48 -> *8=384
        let params = (2u32 << 13) | 48;
        let buf = build_oma(0, params);
        let descriptor = parse(&buf, buf.len() as u64).unwrap();
        assert_eq!(descriptor.codec, CodecKind::Atrac3);
        assert_eq!(descriptor.sample_rate, 44100);
        assert_eq!(descriptor.block_align, 384);
        assert_eq!(descriptor.channels, 2);
    }

    #[test]
    fn parses_atrac3plus_oma_channels() {
        let params = (2u32 << 13) | (1u32 << 10) | 48; // channel config 1 -> mono
        let buf = build_oma(1, params);
        let descriptor = parse(&buf, buf.len() as u64).unwrap();
        assert_eq!(descriptor.codec, CodecKind::Atrac3Plus);
        assert_eq!(descriptor.channels, 1);
        assert_eq!(descriptor.block_align, 48 * 8 + 8);
    }

    #[test]
    fn rejects_bad_magic() {
        let buf = vec![0u8; 64];
        assert!(parse(&buf, buf.len() as u64).is_err());
    }
}
