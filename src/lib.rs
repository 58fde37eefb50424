// Copyright (c) 2019-2022 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A self-contained ATRAC3 and ATRAC3+ audio decoder.
//!
//! This crate demuxes RIFF WAVE (`.at3`) and Sony OMA/AA3 (`.oma`, `.aa3`) containers and
//! decodes their payload to interleaved PCM. The decoder is split into a container layer
//! ([`container`]), two independent codec implementations ([`atrac3`], [`atrac3plus`]) behind a
//! tagged dispatch ([`codec`]), a streaming read/seek layer ([`stream`]), and the public surface
//! ([`api`]).

pub mod api;
pub mod atrac3;
pub mod atrac3plus;
pub mod codec;
pub mod container;
pub mod dsp;
pub mod error;
pub mod io;
pub mod stream;

pub use api::{decode_file_to_f32, decode_memory_to_f32, AtracDecoder};
pub use error::{Error, Result, ResultCode};
