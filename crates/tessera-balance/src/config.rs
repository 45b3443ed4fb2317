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

//! Configuration block of the load equalizer.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::Display;
use tessera_core::math::PixelViewport;

/// How the governed compound's workload is partitioned between children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Mode {
    /// Mixed vertical/horizontal splits alternating level by level,
    /// producing a 2D tiling.
    #[default]
    #[serde(rename = "2D")]
    TwoD,
    /// Split the viewport along the X axis only.
    #[serde(rename = "VERTICAL")]
    Vertical,
    /// Split the viewport along the Y axis only.
    #[serde(rename = "HORIZONTAL")]
    Horizontal,
    /// Split the database range instead of the viewport (sort-last).
    #[serde(rename = "DB")]
    Db,
}

impl Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::TwoD => "2D",
            Mode::Vertical => "VERTICAL",
            Mode::Horizontal => "HORIZONTAL",
            Mode::Db => "DB",
        };
        write!(f, "{name}")
    }
}

/// The configuration surface of a [`LoadEqualizer`](crate::LoadEqualizer).
///
/// All numeric parameters are fixed after construction; `frozen` is the
/// one runtime-settable flag and suppresses new assignments without
/// disturbing the split tree or history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EqualizerConfig {
    /// The partitioning mode.
    #[serde(default)]
    pub mode: Mode,
    /// Exponential-smoothing factor in `[0, 1]` between the computed
    /// target time and the previously measured time. `0` follows the
    /// computation immediately, `1` freezes on the last measurement.
    #[serde(default = "default_damping")]
    pub damping: f32,
    /// Minimum tile extent in pixels for the 2D modes.
    #[serde(default = "default_boundary_2i")]
    pub boundary_2i: PixelViewport,
    /// Minimum split granularity on the database axis for DB mode.
    #[serde(default = "default_boundary_f")]
    pub boundary_f: f32,
    /// Suppresses new assignments while set.
    #[serde(default)]
    pub frozen: bool,
}

fn default_damping() -> f32 {
    0.5
}

fn default_boundary_2i() -> PixelViewport {
    PixelViewport::new(1, 1)
}

fn default_boundary_f() -> f32 {
    f32::EPSILON
}

impl Default for EqualizerConfig {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            damping: default_damping(),
            boundary_2i: default_boundary_2i(),
            boundary_f: default_boundary_f(),
            frozen: false,
        }
    }
}

impl EqualizerConfig {
    /// Checks the numeric envelope of the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.damping) {
            return Err(ConfigError::DampingOutOfRange(self.damping));
        }
        if self.boundary_2i.width < 1 || self.boundary_2i.height < 1 {
            return Err(ConfigError::PixelBoundaryTooSmall(self.boundary_2i));
        }
        if self.boundary_f < f32::EPSILON {
            return Err(ConfigError::RangeBoundaryTooSmall(self.boundary_f));
        }
        Ok(())
    }

    /// Loads a configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Loads a configuration from a JSON file.
    pub fn from_file(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_json(&content)?)
    }

    /// Saves the configuration to a JSON file.
    pub fn to_file(&self, path: &str) -> Result<(), Box<dyn std::error::Error>> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

impl Display for EqualizerConfig {
    /// Renders the configuration in its text form. Parameters at their
    /// default value are suppressed.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "load_equalizer")?;
        writeln!(f, "{{")?;
        writeln!(f, "    mode    {}", self.mode)?;
        if self.damping != default_damping() {
            writeln!(f, "    damping {}", self.damping)?;
        }
        if self.boundary_2i != default_boundary_2i() {
            writeln!(
                f,
                "    boundary [ {} {} ]",
                self.boundary_2i.width, self.boundary_2i.height
            )?;
        }
        if self.boundary_f != default_boundary_f() {
            writeln!(f, "    boundary {}", self.boundary_f)?;
        }
        writeln!(f, "}}")
    }
}

/// An error describing an invalid [`EqualizerConfig`].
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// The damping factor lies outside `[0, 1]`.
    DampingOutOfRange(f32),
    /// The pixel boundary has a zero component.
    PixelBoundaryTooSmall(PixelViewport),
    /// The database boundary is below the float epsilon.
    RangeBoundaryTooSmall(f32),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::DampingOutOfRange(damping) => {
                write!(f, "Damping {damping} is outside [0, 1]")
            }
            ConfigError::PixelBoundaryTooSmall(boundary) => {
                write!(
                    f,
                    "Pixel boundary [ {} {} ] must be at least one pixel per axis",
                    boundary.width, boundary.height
                )
            }
            ConfigError::RangeBoundaryTooSmall(boundary) => {
                write!(f, "Database boundary {boundary} is below the float epsilon")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
