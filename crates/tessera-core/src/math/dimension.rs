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

//! Provides the integer pixel extent fractional coordinates are resolved
//! against.

use serde::{Deserialize, Serialize};

/// A two-dimensional pixel extent, typically a channel's native output
/// size or the pixel size a compound inherits from its destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PixelViewport {
    /// The width component of the extent, in pixels.
    pub width: u32,
    /// The height component of the extent, in pixels.
    pub height: u32,
}

impl PixelViewport {
    /// Creates a new `PixelViewport` with the given extent.
    #[inline]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns `true` if the extent covers at least one pixel.
    #[inline]
    pub fn has_area(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}
