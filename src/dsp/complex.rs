// Copyright (c) 2019-2022 The Project Symphonia Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A minimal single-precision complex number, grounded on the shape of
//! `symphonia-core/src/dsp/complex.rs` but trimmed to the handful of operations the FFT kernel
//! needs.

use std::ops::{Add, Mul, Sub};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Complex32 {
    pub re: f32,
    pub im: f32,
}

impl Complex32 {
    #[inline]
    pub const fn new(re: f32, im: f32) -> Self {
        Complex32 { re, im }
    }

    #[inline]
    pub const fn zero() -> Self {
        Complex32 { re: 0.0, im: 0.0 }
    }

    /// Returns `self` rotated by `-j` (i.e. multiplied by `-i`), used throughout the split-radix
    /// butterfly stages.
    #[inline]
    pub fn mul_neg_i(self) -> Self {
        Complex32 { re: self.im, im: -self.re }
    }

    #[inline]
    pub fn conj(self) -> Self {
        Complex32 { re: self.re, im: -self.im }
    }

    #[inline]
    pub fn scale(self, s: f32) -> Self {
        Complex32 { re: self.re * s, im: self.im * s }
    }
}

impl Add for Complex32 {
    type Output = Complex32;
    #[inline]
    fn add(self, rhs: Complex32) -> Complex32 {
        Complex32 { re: self.re + rhs.re, im: self.im + rhs.im }
    }
}

impl Sub for Complex32 {
    type Output = Complex32;
    #[inline]
    fn sub(self, rhs: Complex32) -> Complex32 {
        Complex32 { re: self.re - rhs.re, im: self.im - rhs.im }
    }
}

impl Mul for Complex32 {
    type Output = Complex32;
    #[inline]
    fn mul(self, rhs: Complex32) -> Complex32 {
        Complex32 { re: self.re * rhs.re - self.im * rhs.im, im: self.re * rhs.im + self.im * rhs.re }
    }
}
