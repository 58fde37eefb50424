// Copyright (c) 2019-2022 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The public decoder handle: open a file or an in-memory buffer, pull PCM, seek by frame index.

use std::path::Path;

use crate::container::{ContainerDescriptor, Demuxer};
use crate::error::Result;
use crate::stream::DecoderContext;

/// An open ATRAC3/ATRAC3+ stream, ready to produce PCM.
///
/// Owns either a file handle or a borrowed memory buffer (`'a` is `'static` for
/// [`AtracDecoder::open_file`]). Dropping it releases the underlying file handle normally —
/// there is no separate `close` call to forget.
pub struct AtracDecoder<'a> {
    ctx: DecoderContext<'a>,
}

impl AtracDecoder<'static> {
    /// Opens a container from a path, probing it to choose a container parser and codec.
    pub fn open_file<P: AsRef<Path>>(path: P) -> Result<AtracDecoder<'static>> {
        let demuxer = Demuxer::open_file(path.as_ref())?;
        Ok(AtracDecoder { ctx: DecoderContext::from_demuxer(demuxer) })
    }
}

impl<'a> AtracDecoder<'a> {
    /// Opens a container from an in-memory buffer borrowed for the decoder's lifetime.
    pub fn open_memory(data: &'a [u8]) -> Result<AtracDecoder<'a>> {
        let demuxer = Demuxer::open_memory(data)?;
        Ok(AtracDecoder { ctx: DecoderContext::from_demuxer(demuxer) })
    }

    /// The container and codec metadata discovered at open time.
    pub fn descriptor(&self) -> &ContainerDescriptor {
        self.ctx.descriptor()
    }

    pub fn channels(&self) -> usize {
        self.ctx.channels()
    }

    /// Total PCM frame count, derived from the container's frame count and the codec's fixed
    /// samples-per-frame. Zero for a zero-length stream.
    pub fn length(&self) -> u64 {
        self.ctx.total_pcm_frames()
    }

    /// The next PCM frame index [`read_f32`](Self::read_f32)/[`read_s16`](Self::read_s16) will
    /// produce.
    pub fn cursor(&self) -> u64 {
        self.ctx.current_pcm_frame()
    }

    /// Reads up to `out.len() / channels()` interleaved PCM frames into `out`, returning the
    /// number of frames written (less than requested only at end of stream).
    pub fn read_f32(&mut self, out: &mut [f32]) -> Result<usize> {
        let channels = self.channels().max(1);
        let n = out.len() / channels;
        self.ctx.read_pcm_frames_f32(n, Some(out))
    }

    /// Same as [`read_f32`](Self::read_f32), converting to 16-bit PCM.
    pub fn read_s16(&mut self, out: &mut [i16]) -> Result<usize> {
        let channels = self.channels().max(1);
        let n = out.len() / channels;
        self.ctx.read_pcm_frames_s16(n, Some(out))
    }

    /// Seeks to PCM frame `index`, clamped to [`length`](Self::length). The seek is frame-aligned
    /// to the codec's fixed block size; any samples before `index` within that block are decoded
    /// and discarded so the next read starts exactly at `index`.
    pub fn seek_to_pcm_frame(&mut self, index: u64) -> Result<()> {
        self.ctx.seek_to_pcm_frame(index)
    }
}

/// Decodes an entire file to interleaved `f32` PCM in one call. Intended for short clips and
/// tests; [`AtracDecoder`] should be preferred for anything that benefits from streaming.
pub fn decode_file_to_f32<P: AsRef<Path>>(path: P) -> Result<(ContainerDescriptor, Vec<f32>)> {
    let mut decoder = AtracDecoder::open_file(path)?;
    let descriptor = decoder.descriptor().clone();
    let total = decoder.length() as usize;
    let mut out = vec![0f32; total * decoder.channels()];
    let written = decoder.read_f32(&mut out)?;
    out.truncate(written * decoder.channels());
    Ok((descriptor, out))
}

/// Decodes an entire in-memory buffer to interleaved `f32` PCM in one call.
pub fn decode_memory_to_f32(data: &[u8]) -> Result<(ContainerDescriptor, Vec<f32>)> {
    let mut decoder = AtracDecoder::open_memory(data)?;
    let descriptor = decoder.descriptor().clone();
    let total = decoder.length() as usize;
    let mut out = vec![0f32; total * decoder.channels()];
    let written = decoder.read_f32(&mut out)?;
    out.truncate(written * decoder.channels());
    Ok((descriptor, out))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_silent_at3_wav(num_frames: usize) -> Vec<u8> {
        const BLOCK_ALIGN: u16 = 384;
        let mut out = Vec::new();
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(b"WAVE");

        out.extend_from_slice(b"fmt ");
        out.extend_from_slice(&28u32.to_le_bytes());
        out.extend_from_slice(&0x0270u16.to_le_bytes()); // WAVE_FORMAT_ATRAC3
        out.extend_from_slice(&1u16.to_le_bytes()); // mono
        out.extend_from_slice(&44100u32.to_le_bytes());
        out.extend_from_slice(&(44100u32 * 2).to_le_bytes());
        out.extend_from_slice(&BLOCK_ALIGN.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&2u16.to_le_bytes());
        out.extend_from_slice(&[0u8; 10]);

        let data_size = BLOCK_ALIGN as u32 * num_frames as u32;
        out.extend_from_slice(b"data");
        out.extend_from_slice(&data_size.to_le_bytes());
        out.extend(std::iter::repeat(0u8).take(data_size as usize));
        out
    }

    #[test]
    fn open_memory_reports_descriptor_and_length() {
        let buf = build_silent_at3_wav(4);
        let decoder = AtracDecoder::open_memory(&buf).unwrap();
        assert_eq!(decoder.channels(), 1);
        assert_eq!(decoder.length(), 4 * crate::atrac3::SAMPLES_PER_FRAME as u64);
        assert_eq!(decoder.cursor(), 0);
    }

    #[test]
    fn read_f32_advances_cursor_and_hits_eof() {
        let buf = build_silent_at3_wav(2);
        let mut decoder = AtracDecoder::open_memory(&buf).unwrap();
        let total = decoder.length() as usize;

        let mut out = vec![0f32; total];
        let written = decoder.read_f32(&mut out).unwrap();
        assert_eq!(written, total);
        assert_eq!(decoder.cursor(), total as u64);

        let mut tail = vec![0f32; 16];
        let written_after_eof = decoder.read_f32(&mut tail).unwrap();
        assert_eq!(written_after_eof, 0);
    }

    #[test]
    fn seek_to_pcm_frame_lands_on_requested_index() {
        let buf = build_silent_at3_wav(3);
        let mut decoder = AtracDecoder::open_memory(&buf).unwrap();
        let target = crate::atrac3::SAMPLES_PER_FRAME as u64 + 10;
        decoder.seek_to_pcm_frame(target).unwrap();
        assert_eq!(decoder.cursor(), target);
    }

    #[test]
    fn decode_memory_to_f32_yields_full_length() {
        let buf = build_silent_at3_wav(1);
        let (descriptor, pcm) = decode_memory_to_f32(&buf).unwrap();
        assert_eq!(pcm.len(), descriptor.samples_per_frame() * descriptor.channels as usize);
    }
}
