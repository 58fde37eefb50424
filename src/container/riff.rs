// Copyright (c) 2019-2022 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! RIFF WAVE chunk parsing: `fmt ` and `data`.

use byteorder::{ByteOrder, LittleEndian};

use super::{CodecKind, ContainerDescriptor, ContainerKind};
use crate::error::{decode_error, Result};

const WAVE_FORMAT_ATRAC3: u16 = 0x0270;
const WAVE_FORMAT_ATRAC3PLUS: u16 = 0x0E23;
const WAVE_FORMAT_EXTENSIBLE: u16 = 0xFFFE;

pub fn parse(data: &[u8], stream_len: u64) -> Result<ContainerDescriptor> {
    if data.len() < 12 || &data[0..4] != b"RIFF" || &data[8..12] != b"WAVE" {
        return decode_error("riff: bad RIFF/WAVE magic");
    }

    let mut pos = 12usize;
    let mut fmt: Option<FmtChunk> = None;
    let mut data_offset: Option<u64> = None;
    let mut data_size: Option<u64> = None;

    while pos + 8 <= data.len() {
        let fourcc = &data[pos..pos + 4];
        let size = LittleEndian::read_u32(&data[pos + 4..pos + 8]) as usize;
        let body_start = pos + 8;

        if fourcc == b"fmt " {
            if body_start + 24 > data.len() {
                return decode_error("riff: truncated fmt chunk");
            }
            fmt = Some(parse_fmt(&data[body_start..body_start + size.min(data.len() - body_start)])?);
        }
        else if fourcc == b"data" {
            data_offset = Some(body_start as u64);
            data_size = Some(if size == 0 { stream_len.saturating_sub(body_start as u64) } else { size as u64 });
            break;
        }

        let padded = size + (size & 1);
        pos = body_start + padded;
    }

    let fmt = fmt.ok_or(crate::error::Error::Decode("riff: missing fmt chunk"))?;
    let data_offset = data_offset.ok_or(crate::error::Error::Decode("riff: missing data chunk"))?;
    let data_size = data_size.unwrap();

    if fmt.block_align == 0 {
        return decode_error("riff: zero block_align");
    }

    Ok(ContainerDescriptor {
        kind: ContainerKind::RiffWav,
        codec: fmt.codec,
        sample_rate: fmt.sample_rate,
        channels: fmt.channels,
        block_align: fmt.block_align,
        bit_rate: fmt.avg_bytes_per_sec * 8,
        joint_stereo: fmt.joint_stereo,
        extradata: fmt.extradata,
        data_offset,
        data_size,
    })
}

struct FmtChunk {
    codec: CodecKind,
    sample_rate: u32,
    channels: u16,
    avg_bytes_per_sec: u32,
    block_align: u32,
    joint_stereo: bool,
    extradata: [u8; 14],
}

fn parse_fmt(body: &[u8]) -> Result<FmtChunk> {
    if body.len() < 16 {
        return decode_error("riff: fmt chunk too short");
    }

    let mut tag = LittleEndian::read_u16(&body[0..2]);
    let channels = LittleEndian::read_u16(&body[2..4]);
    let sample_rate = LittleEndian::read_u32(&body[4..8]);
    let avg_bytes_per_sec = LittleEndian::read_u32(&body[8..12]);
    let block_align = LittleEndian::read_u16(&body[12..14]) as u32;

    if tag == WAVE_FORMAT_EXTENSIBLE {
        if body.len() >= 40 {
            let sub_format = LittleEndian::read_u16(&body[24..26]);
            tag = sub_format;
        }
        else {
            return decode_error("riff: truncated WAVE_FORMAT_EXTENSIBLE fmt chunk");
        }
    }

    let codec = match tag {
        WAVE_FORMAT_ATRAC3 => CodecKind::Atrac3,
        WAVE_FORMAT_ATRAC3PLUS => CodecKind::Atrac3Plus,
        _ => return decode_error("riff: unsupported format tag"),
    };

    let mut extradata = [0u8; 14];
    extradata[0] = 1;
    if body.len() >= 28 {
        extradata[1..11].copy_from_slice(&body[18..28]);
    }
    let joint_stereo = body.len() >= 23 && body[22] == 1;

    Ok(FmtChunk {
        codec,
        sample_rate,
        channels,
        avg_bytes_per_sec,
        block_align,
        joint_stereo,
        extradata,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_at3(block_align: u16, extra: &[u8; 10]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(b"WAVE");

        out.extend_from_slice(b"fmt ");
        out.extend_from_slice(&28u32.to_le_bytes());
        out.extend_from_slice(&WAVE_FORMAT_ATRAC3.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes()); // channels
        out.extend_from_slice(&44100u32.to_le_bytes()); // sample rate
        out.extend_from_slice(&(44100u32 * 2).to_le_bytes()); // avg bytes/sec
        out.extend_from_slice(&block_align.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes()); // bits per sample
        out.extend_from_slice(&2u16.to_le_bytes()); // cbSize
        out.extend_from_slice(extra);

        out.extend_from_slice(b"data");
        out.extend_from_slice(&(block_align as u32 * 2).to_le_bytes());
        out.extend(std::iter::repeat(0u8).take(block_align as usize * 2));
        out
    }

    #[test]
    fn parses_minimal_atrac3_wav() {
        let extra = [0u8; 10];
        let buf = build_at3(384, &extra);
        let descriptor = parse(&buf, buf.len() as u64).unwrap();
        assert_eq!(descriptor.codec, CodecKind::Atrac3);
        assert_eq!(descriptor.sample_rate, 44100);
        assert_eq!(descriptor.block_align, 384);
        assert_eq!(descriptor.extradata[0], 1);
    }

    #[test]
    fn rejects_missing_data_chunk() {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.extend_from_slice(b"WAVE");
        assert!(parse(&buf, buf.len() as u64).is_err());
    }
}
