// Copyright (c) 2019-2022 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! FFT-derived IMDCT kernel and the DSP building blocks shared by both ATRAC codec variants.

pub mod common;
pub mod complex;
pub mod fft;
pub mod mdct;

pub use complex::Complex32;
pub use fft::Fft;
pub use mdct::Imdct;
