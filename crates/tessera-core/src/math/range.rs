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

//! Provides the fractional 1D database range used for sort-last
//! decomposition.

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A 1D interval `[start, end]` in normalized `[0, 1]` coordinates of the
/// database (depth) axis.
///
/// Tasks rendering disjoint ranges draw disjoint subsets of the scene
/// database and are composited back-to-front afterwards.
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
pub struct Range {
    /// The lower bound of the interval.
    pub start: f32,
    /// The upper bound of the interval.
    pub end: f32,
}

impl Range {
    /// The full database, `[0, 1]`.
    pub const ALL: Self = Self {
        start: 0.0,
        end: 1.0,
    };

    /// Creates a new `Range` from its bounds.
    #[inline]
    pub const fn new(start: f32, end: f32) -> Self {
        Self { start, end }
    }

    /// Returns `true` if the interval covers a non-empty part of the
    /// database.
    #[inline]
    pub fn has_data(&self) -> bool {
        self.end > self.start
    }

    /// Returns `true` if the interval lies within `[0, 1]` and is ordered.
    ///
    /// Degenerate ranges with `start == end` are valid; they mark tasks
    /// that will not render.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.start >= 0.0 && self.end <= 1.0 && self.start <= self.end
    }
}

impl Default for Range {
    /// Returns the default `Range`, which is [`Range::ALL`].
    #[inline]
    fn default() -> Self {
        Self::ALL
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[ {} {} ]", self.start, self.end)
    }
}
