// Copyright (c) 2019-2022 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Synthesizes minimal RIFF and OMA containers in memory and exercises the streaming API
//! boundary behaviours: open/probe, full-length read, EOF, seek, and the one-shot helpers.

use std::io::Write;

use atrac_codec::container::{CodecKind, ContainerKind};
use atrac_codec::{decode_file_to_f32, decode_memory_to_f32, AtracDecoder};

const EA3_SYNC_HEADER_LEN: usize = 96;

fn build_at3_wav(num_frames: usize, channels: u16, block_align: u16) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(b"WAVE");

    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&28u32.to_le_bytes());
    out.extend_from_slice(&0x0270u16.to_le_bytes()); // WAVE_FORMAT_ATRAC3
    out.extend_from_slice(&channels.to_le_bytes());
    out.extend_from_slice(&44100u32.to_le_bytes());
    out.extend_from_slice(&(44100u32 * block_align as u32).to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&2u16.to_le_bytes());
    out.extend_from_slice(&[0u8; 10]);

    let data_size = block_align as u32 * num_frames as u32;
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_size.to_le_bytes());
    out.extend(std::iter::repeat(0u8).take(data_size as usize));
    out
}

fn build_oma_atrac3plus(num_frames: usize) -> Vec<u8> {
    // Channel config 1 -> mono, sample-rate index 1 -> 44100, raw block_align 6 -> (6*8)+8 = 56.
    let params: u32 = (1u32 << 13) | (1u32 << 10) | 6;
    let block_align = ((params & 0x3FF) * 8) + 8;

    let mut out = Vec::new();
    out.extend_from_slice(b"ea3");
    out.push(0x03);
    out.extend_from_slice(&[0, 0]);
    out.extend_from_slice(&[0, 0, 0, 0]); // syncsafe header_size = 0

    let mut sync = vec![0u8; EA3_SYNC_HEADER_LEN];
    sync[0..3].copy_from_slice(b"EA3");
    sync[3] = 0;
    sync[4] = 0;
    sync[5] = 0x60;
    sync[32] = 1; // codec_id: atrac3plus
    sync[33] = ((params >> 16) & 0xFF) as u8;
    sync[34] = ((params >> 8) & 0xFF) as u8;
    sync[35] = (params & 0xFF) as u8;
    out.extend_from_slice(&sync);

    out.extend(std::iter::repeat(0u8).take(block_align as usize * num_frames));
    out
}

#[test]
fn riff_atrac3_round_trip_and_eof() {
    let buf = build_at3_wav(3, 1, 384);
    let mut decoder = AtracDecoder::open_memory(&buf).unwrap();

    assert_eq!(decoder.descriptor().kind, ContainerKind::RiffWav);
    assert_eq!(decoder.descriptor().codec, CodecKind::Atrac3);
    assert_eq!(decoder.channels(), 1);

    let total = decoder.length() as usize;
    assert_eq!(total, 3 * atrac_codec::atrac3::SAMPLES_PER_FRAME);

    let mut out = vec![0f32; total];
    let written = decoder.read_f32(&mut out).unwrap();
    assert_eq!(written, total);
    assert_eq!(decoder.cursor(), total as u64);
    assert!(out.iter().all(|&x| x == 0.0));

    let mut tail = vec![0f32; 32];
    assert_eq!(decoder.read_f32(&mut tail).unwrap(), 0);
}

#[test]
fn riff_atrac3_seek_crosses_frame_boundary() {
    let buf = build_at3_wav(4, 1, 384);
    let mut decoder = AtracDecoder::open_memory(&buf).unwrap();

    let frame_len = atrac_codec::atrac3::SAMPLES_PER_FRAME as u64;
    let target = frame_len + 17;
    decoder.seek_to_pcm_frame(target).unwrap();
    assert_eq!(decoder.cursor(), target);

    let mut out = vec![0f32; 4];
    let written = decoder.read_f32(&mut out).unwrap();
    assert_eq!(written, 4);
    assert_eq!(decoder.cursor(), target + 4);
}

#[test]
fn riff_atrac3_seek_past_end_clamps_to_length() {
    let buf = build_at3_wav(1, 1, 384);
    let mut decoder = AtracDecoder::open_memory(&buf).unwrap();
    let length = decoder.length();

    decoder.seek_to_pcm_frame(length + 1000).unwrap();
    assert_eq!(decoder.cursor(), length);

    let mut out = vec![0f32; 8];
    assert_eq!(decoder.read_f32(&mut out).unwrap(), 0);
}

#[test]
fn oma_atrac3plus_decodes_through_streaming_api() {
    let buf = build_oma_atrac3plus(2);
    let mut decoder = AtracDecoder::open_memory(&buf).unwrap();

    assert_eq!(decoder.descriptor().kind, ContainerKind::Oma);
    assert_eq!(decoder.descriptor().codec, CodecKind::Atrac3Plus);
    assert_eq!(decoder.channels(), 1);

    let total = decoder.length() as usize;
    assert_eq!(total, 2 * atrac_codec::atrac3plus::SAMPLES_PER_FRAME);

    let mut out = vec![0f32; total];
    let written = decoder.read_f32(&mut out).unwrap();
    assert_eq!(written, total);
}

#[test]
fn decode_memory_to_f32_matches_streaming_length() {
    let buf = build_at3_wav(2, 1, 384);
    let (descriptor, pcm) = decode_memory_to_f32(&buf).unwrap();
    assert_eq!(descriptor.codec, CodecKind::Atrac3);
    assert_eq!(pcm.len(), 2 * atrac_codec::atrac3::SAMPLES_PER_FRAME * descriptor.channels as usize);
}

#[test]
fn decode_file_to_f32_reads_from_disk() {
    let buf = build_at3_wav(1, 1, 384);
    let mut path = std::env::temp_dir();
    path.push(format!("atrac-codec-integration-{}.at3", std::process::id()));
    {
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(&buf).unwrap();
    }

    let result = decode_file_to_f32(&path);
    std::fs::remove_file(&path).ok();

    let (descriptor, pcm) = result.unwrap();
    assert_eq!(descriptor.codec, CodecKind::Atrac3);
    assert_eq!(pcm.len(), atrac_codec::atrac3::SAMPLES_PER_FRAME);
}

#[test]
fn open_memory_rejects_unrecognised_container() {
    let buf = vec![0u8; 64];
    assert!(AtracDecoder::open_memory(&buf).is_err());
}

#[test]
fn open_memory_rejects_truncated_buffer() {
    let buf = vec![0u8; 4];
    assert!(AtracDecoder::open_memory(&buf).is_err());
}
