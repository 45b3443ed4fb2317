// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Provides the fractional 2D viewport used to assign screen regions.

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A 2D rectangle in normalized `[0, 1]` coordinates of a destination
/// surface.
///
/// A viewport describes which fraction of its parent's pixel extent a
/// rendering task covers. Unlike a pixel rectangle it composes under
/// subdivision without accumulating integer rounding: splitting a parent
/// viewport produces child viewports whose union is exactly the parent.
#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    bytemuck::Pod,
    bytemuck::Zeroable,
    Serialize,
    Deserialize,
    Encode,
    Decode,
)]
#[repr(C)]
pub struct Viewport {
    /// The left edge of the rectangle.
    pub x: f32,
    /// The bottom edge of the rectangle.
    pub y: f32,
    /// The width of the rectangle.
    pub w: f32,
    /// The height of the rectangle.
    pub h: f32,
}

impl Viewport {
    /// The full surface, `(0, 0, 1, 1)`.
    pub const FULL: Self = Self {
        x: 0.0,
        y: 0.0,
        w: 1.0,
        h: 1.0,
    };

    /// Creates a new `Viewport` from its left/bottom corner and size.
    #[inline]
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Returns the right edge, `x + w`.
    #[inline]
    pub fn x_end(&self) -> f32 {
        self.x + self.w
    }

    /// Returns the top edge, `y + h`.
    #[inline]
    pub fn y_end(&self) -> f32 {
        self.y + self.h
    }

    /// Returns the covered area, `w * h`.
    #[inline]
    pub fn area(&self) -> f32 {
        self.w * self.h
    }

    /// Returns `true` if the viewport covers a non-empty region.
    #[inline]
    pub fn has_area(&self) -> bool {
        self.w > 0.0 && self.h > 0.0
    }

    /// Returns `true` if all components are non-negative.
    ///
    /// Degenerate viewports with zero width or height are valid; they mark
    /// tasks that will not render.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.x >= 0.0 && self.y >= 0.0 && self.w >= 0.0 && self.h >= 0.0
    }
}

impl Default for Viewport {
    /// Returns the default `Viewport`, which is [`Viewport::FULL`].
    #[inline]
    fn default() -> Self {
        Self::FULL
    }
}

impl fmt::Display for Viewport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[ {} {} {} {} ]", self.x, self.y, self.w, self.h)
    }
}
