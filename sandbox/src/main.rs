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

//! Drives the load equalizer against a simulated heterogeneous cluster.
//!
//! Four channels with different per-area rendering costs render a shared
//! surface for a number of frames; after each frame the simulated timings
//! are fed back and the resulting partition printed. An optional argument
//! names a JSON equalizer configuration to run with.

use anyhow::Context;
use tessera_balance::{EqualizerConfig, LoadEqualizer};
use tessera_core::{
    Channel, ChannelId, Compound, PixelViewport, Statistic, StatisticKind, Viewport,
};

const FRAMES: u32 = 12;

/// Per-area rendering cost of each simulated channel, in microseconds for
/// the full surface.
const CHANNEL_COSTS: [f32; 4] = [8_000.0, 12_000.0, 24_000.0, 48_000.0];

fn main() -> anyhow::Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => EqualizerConfig::from_file(&path)
            .map_err(|err| anyhow::anyhow!("{err}"))
            .with_context(|| format!("loading equalizer configuration from {path}"))?,
        None => EqualizerConfig {
            damping: 0.25,
            ..Default::default()
        },
    };

    let mut equalizer = LoadEqualizer::new(config).context("invalid equalizer configuration")?;
    print!("{equalizer}");

    let pvp = PixelViewport::new(1920, 1080);
    let children = CHANNEL_COSTS
        .iter()
        .enumerate()
        .map(|(i, _)| {
            let id = i as u32 + 1;
            Compound::leaf(id, 1.0, Channel::new(ChannelId(id), format!("gpu{i}"), pvp))
        })
        .collect();
    let mut compound = Compound::group(children);
    compound.set_inherited_pixel_viewport(pvp);

    for frame in 1..=FRAMES {
        equalizer.notify_frame_start(&mut compound, frame);

        println!("frame {frame}");
        for (i, child) in compound.children().iter().enumerate() {
            let vp = child.viewport();
            println!(
                "    gpu{i} vp {vp} ({:.1}% of the surface)",
                vp.area() * 100.0
            );
        }

        // Simulate rendering: each channel's time is proportional to the
        // area it was assigned.
        for (i, child) in compound.children().iter().enumerate() {
            let area = child.viewport().area();
            if area <= 0.0 {
                continue;
            }
            let time = (CHANNEL_COSTS[i] * area).max(1.0) as i64;
            let id = i as u32 + 1;
            let stats = [
                Statistic::new(id, StatisticKind::Clear, 0, 50),
                Statistic::new(id, StatisticKind::Draw, 50, time),
                Statistic::new(id, StatisticKind::Readback, time, time + 200),
            ];
            equalizer.notify_load_data(ChannelId(id), frame, &stats);
        }
    }

    let mut tree = String::new();
    equalizer.describe_tree(&compound, &mut tree)?;
    println!("final split tree:\n{tree}");

    let smallest = compound
        .children()
        .iter()
        .map(|child| child.viewport())
        .fold(Viewport::FULL, |smallest, vp| {
            if vp.area() < smallest.area() {
                vp
            } else {
                smallest
            }
        });
    println!("smallest tile after balancing: {smallest}");

    equalizer.release(&mut compound);
    Ok(())
}
