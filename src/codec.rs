// Copyright (c) 2019-2022 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The tagged codec context: a sum type over the two decoder variants. Dispatch is a `match` at
//! the `decode_frame` call site, not dynamic dispatch — the branch is predictable and the
//! variants have disjoint state shapes.

use crate::atrac3::Atrac3Decoder;
use crate::atrac3plus::Atrac3PlusDecoder;
use crate::container::CodecKind;
use crate::error::Result;

pub enum CodecContext {
    Atrac3(Atrac3Decoder),
    Atrac3Plus(Atrac3PlusDecoder),
}

impl CodecContext {
    pub fn new(kind: CodecKind, channels: usize, joint_stereo: bool) -> CodecContext {
        match kind {
            CodecKind::Atrac3 => CodecContext::Atrac3(Atrac3Decoder::new(channels, joint_stereo)),
            CodecKind::Atrac3Plus => CodecContext::Atrac3Plus(Atrac3PlusDecoder::new(channels)),
        }
    }

    pub fn channels(&self) -> usize {
        match self {
            CodecContext::Atrac3(d) => d.channels(),
            CodecContext::Atrac3Plus(d) => d.channels(),
        }
    }

    pub fn samples_per_frame(&self) -> usize {
        match self {
            CodecContext::Atrac3(_) => crate::atrac3::SAMPLES_PER_FRAME,
            CodecContext::Atrac3Plus(_) => crate::atrac3plus::SAMPLES_PER_FRAME,
        }
    }

    /// Decodes one compressed frame into planar channel buffers. A malformed frame is reported
    /// as an error the caller discards: bitstream-grammar errors do not poison the decoder, since
    /// each variant's `decode_frame` only commits state after a successful parse of the fields it
    /// touches.
    pub fn decode_frame(&mut self, data: &[u8]) -> Result<Vec<Vec<f32>>> {
        match self {
            CodecContext::Atrac3(d) => d.decode_frame(data),
            CodecContext::Atrac3Plus(d) => d.decode_frame(data),
        }
    }
}
