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

//! Per-frame timing statistics emitted by channels.
//!
//! Every rendering operation a channel performs for a task is reported as
//! one [`Statistic`] with microsecond start and end times. The framework
//! batches the statistics of one `(channel, frame)` pair and delivers them
//! to the listeners registered on that channel.

/// The rendering operation a [`Statistic`] measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatisticKind {
    /// Clearing the framebuffer region of a task.
    Clear,
    /// Issuing the task's draw commands.
    Draw,
    /// Reading the rendered pixels back from the GPU.
    Readback,
    /// Assembling (compositing) input frames. Assembly blocks on input
    /// frames from other channels, so times past it are not attributable
    /// to the task's own rendering cost.
    Assemble,
    /// Transmitting an output frame to another node.
    FrameTransmit,
    /// Compressing an output frame for transmission.
    FrameCompress,
    /// Waiting for an input frame to become ready.
    FrameWait,
}

/// A single timing record for one rendering operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Statistic {
    /// The per-frame rendering task this record belongs to.
    pub task_id: u32,
    /// The operation measured.
    pub kind: StatisticKind,
    /// Start of the operation, in microseconds.
    pub start_time: i64,
    /// End of the operation, in microseconds.
    pub end_time: i64,
}

impl Statistic {
    /// Creates a new timing record.
    pub const fn new(task_id: u32, kind: StatisticKind, start_time: i64, end_time: i64) -> Self {
        Self {
            task_id,
            kind,
            start_time,
            end_time,
        }
    }

    /// Returns the measured duration in microseconds.
    #[inline]
    pub fn duration(&self) -> i64 {
        self.end_time - self.start_time
    }
}
