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

//! # Tessera Balance
//!
//! Adaptive load equalization for compound rendering trees.
//!
//! The [`LoadEqualizer`] governs one internal compound: each frame it
//! observes how long every child channel took to render its last
//! assignment and repartitions the screen (or the database range) so that
//! all children finish at approximately the same time. Children are
//! organized in a balanced binary split tree; at every level a relative
//! split position is determined by balancing the left subtree against the
//! right subtree.

#![warn(missing_docs)]

pub mod config;
pub mod equalizer;

mod history;
mod tree;

pub use config::{ConfigError, EqualizerConfig, Mode};
pub use equalizer::LoadEqualizer;
