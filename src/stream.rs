// Copyright (c) 2019-2022 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Streaming decode glue: owns a demuxer, a codec context, an interleave scratch buffer, and the
//! leftover-sample bookkeeping for serving arbitrary-sized PCM reads off of fixed-size frames.

use log::warn;

use crate::codec::CodecContext;
use crate::container::{ContainerDescriptor, Demuxer};
use crate::error::Result;

/// Owns everything a streaming decode needs: the demuxer, the active codec, an interleaved PCM
/// scratch buffer, and the count/offset of already-decoded samples left over from the last
/// compressed frame.
pub struct DecoderContext<'a> {
    demuxer: Demuxer<'a>,
    codec: CodecContext,
    channels: usize,
    samples_per_frame: usize,
    interleave_buf: Vec<f32>,
    frame_scratch: Vec<u8>,
    leftover_offset: usize,
    leftover_count: usize,
    current_pcm_frame: u64,
}

impl<'a> DecoderContext<'a> {
    pub fn from_demuxer(demuxer: Demuxer<'a>) -> DecoderContext<'a> {
        let descriptor = demuxer.descriptor.clone();
        let codec_kind = descriptor.codec;
        let channels = descriptor.channels as usize;
        let samples_per_frame = descriptor.samples_per_frame();

        DecoderContext {
            demuxer,
            codec: CodecContext::new(codec_kind, channels, descriptor.joint_stereo),
            channels,
            samples_per_frame,
            interleave_buf: Vec::with_capacity(samples_per_frame * channels),
            frame_scratch: Vec::new(),
            leftover_offset: 0,
            leftover_count: 0,
            current_pcm_frame: 0,
        }
    }

    pub fn descriptor(&self) -> &ContainerDescriptor {
        &self.demuxer.descriptor
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn total_pcm_frames(&self) -> u64 {
        self.demuxer.descriptor.total_pcm_frames()
    }

    pub fn current_pcm_frame(&self) -> u64 {
        self.current_pcm_frame
    }

    /// Pulls one compressed frame, decodes it, and interleaves the result into
    /// `interleave_buf`, refreshing the leftover window. Returns `false` at end of stream.
    fn refill(&mut self) -> Result<bool> {
        let n = self.demuxer.read_frame(&mut self.frame_scratch)?;
        if n == 0 {
            return Ok(false);
        }

        let planar = match self.codec.decode_frame(&self.frame_scratch) {
            Ok(planar) => planar,
            Err(err) => {
                warn!("discarding frame after decode error: {}", err);
                vec![vec![0f32; self.samples_per_frame]; self.channels]
            }
        };

        self.interleave_buf.clear();
        self.interleave_buf.resize(self.samples_per_frame * self.channels, 0.0);
        for s in 0..self.samples_per_frame {
            for (ch, plane) in planar.iter().enumerate().take(self.channels) {
                self.interleave_buf[s * self.channels + ch] = plane.get(s).copied().unwrap_or(0.0);
            }
        }

        self.leftover_offset = 0;
        self.leftover_count = self.samples_per_frame;
        Ok(true)
    }

    /// Reads up to `n` PCM frames as interleaved `f32` samples into `out` (length
    /// `n * channels`; pass an empty slice to skip-decode without writing). Returns the number
    /// of PCM frames actually written, which never exceeds `n`.
    pub fn read_pcm_frames_f32(&mut self, n: usize, mut out: Option<&mut [f32]>) -> Result<usize> {
        let mut written = 0usize;

        while written < n {
            if self.leftover_count == 0 {
                if !self.refill()? {
                    break;
                }
            }

            let take = self.leftover_count.min(n - written);
            if let Some(dst) = out.as_deref_mut() {
                let src_start = self.leftover_offset * self.channels;
                let src_end = src_start + take * self.channels;
                let dst_start = written * self.channels;
                let dst_end = dst_start + take * self.channels;
                if dst_end <= dst.len() {
                    dst[dst_start..dst_end].copy_from_slice(&self.interleave_buf[src_start..src_end]);
                }
            }

            self.leftover_offset += take;
            self.leftover_count -= take;
            written += take;
            self.current_pcm_frame += take as u64;
        }

        Ok(written)
    }

    /// Same contract as [`read_pcm_frames_f32`](Self::read_pcm_frames_f32), converting each
    /// sample via `clamp(round(x * 32767), -32768, 32767)`.
    pub fn read_pcm_frames_s16(&mut self, n: usize, out: Option<&mut [i16]>) -> Result<usize> {
        match out {
            None => self.read_pcm_frames_f32(n, None),
            Some(dst) => {
                let mut scratch = vec![0f32; n * self.channels];
                let written = self.read_pcm_frames_f32(n, Some(&mut scratch))?;
                for (d, &s) in dst.iter_mut().zip(scratch.iter()).take(written * self.channels) {
                    *d = f32_to_i16(s);
                }
                Ok(written)
            }
        }
    }

    /// Frame-aligned seek: positions the demuxer at the containing compressed frame, discards
    /// leftovers and codec state, then skip-decodes the remainder to land on `pcm_index`
    /// (clamped to the stream length).
    pub fn seek_to_pcm_frame(&mut self, pcm_index: u64) -> Result<()> {
        let total = self.total_pcm_frames();
        let pcm_index = pcm_index.min(total);

        let target_frame = pcm_index / self.samples_per_frame as u64;
        let remainder = (pcm_index % self.samples_per_frame as u64) as usize;

        self.demuxer.seek_frame(target_frame)?;
        self.codec = CodecContext::new(
            self.demuxer.descriptor.codec,
            self.channels,
            self.demuxer.descriptor.joint_stereo,
        );
        self.leftover_count = 0;
        self.leftover_offset = 0;
        self.current_pcm_frame = target_frame * self.samples_per_frame as u64;

        if remainder > 0 {
            self.read_pcm_frames_f32(remainder, None)?;
        }

        Ok(())
    }
}

#[inline]
fn f32_to_i16(x: f32) -> i16 {
    let scaled = (x * 32767.0).round();
    scaled.clamp(-32768.0, 32767.0) as i16
}
