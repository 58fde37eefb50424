// Copyright (c) 2019-2022 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bitstream reading and canonical Huffman/VLC table construction.

pub mod bitstream;
pub mod vlc;

pub use bitstream::BitReader;
pub use vlc::{CanonicalVlcDescriptor, VlcTable};
