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

//! Time-series history of per-frame, per-leaf load measurements.

use std::collections::VecDeque;
use tessera_core::{ChannelId, Range, Statistic, StatisticKind, Viewport};

/// One leaf assignment issued for a frame, together with its measured
/// cost once statistics arrive.
#[derive(Debug, Clone)]
pub(crate) struct LoadData {
    /// The rendering task the assignment belongs to.
    pub task_id: u32,
    /// The channel the task renders on; `None` only for the synthetic
    /// seed record.
    pub channel: Option<ChannelId>,
    /// The assigned fractional viewport.
    pub vp: Viewport,
    /// The assigned database range.
    pub range: Range,
    /// Measured rendering time in microseconds, `-1` while unknown.
    pub time: i64,
    /// Normalized load density, `time / vp.area()`, once `time` is known.
    pub load: f32,
}

impl Default for LoadData {
    fn default() -> Self {
        Self {
            task_id: 0,
            channel: None,
            vp: Viewport::FULL,
            range: Range::ALL,
            time: -1,
            load: 0.0,
        }
    }
}

/// The assignments issued for one frame, in split-tree leaf order.
#[derive(Debug, Default)]
pub(crate) struct FrameRecord {
    pub frame_number: u32,
    pub items: Vec<LoadData>,
}

impl FrameRecord {
    /// Returns `true` once every item carries a measured time.
    pub fn is_complete(&self) -> bool {
        self.items.iter().all(|data| data.time >= 0)
    }
}

/// A bounded FIFO of [`FrameRecord`]s, ordered by ascending frame number.
///
/// The history grows by one record per balanced frame and shrinks during
/// maintenance: everything strictly older than the youngest fully
/// measured record is evicted. An empty history is reseeded with a
/// synthetic uniform-load record so the first split has something to
/// work from.
#[derive(Debug, Default)]
pub(crate) struct FrameHistory {
    records: VecDeque<FrameRecord>,
}

impl FrameHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evicts stale records and reseeds an empty history.
    pub fn maintain(&mut self) {
        // Youngest record whose every item has been measured.
        let mut use_frame = 0;
        for record in self.records.iter().rev() {
            if record.is_complete() {
                use_frame = record.frame_number;
                break;
            }
        }

        while self
            .records
            .front()
            .is_some_and(|record| record.frame_number < use_frame)
        {
            self.records.pop_front();
        }

        if self.records.is_empty() {
            log::trace!("seeding history with synthetic uniform load");
            self.records.push_back(FrameRecord {
                frame_number: 0,
                items: vec![LoadData {
                    time: 1,
                    load: 1.0,
                    ..Default::default()
                }],
            });
        }
    }

    /// Appends a new, empty record for `frame_number`.
    pub fn push_frame(&mut self, frame_number: u32) {
        self.records.push_back(FrameRecord {
            frame_number,
            items: Vec::new(),
        });
    }

    /// Returns the oldest retained record. After [`maintain`](Self::maintain)
    /// this is the youngest fully measured record.
    pub fn front(&self) -> &FrameRecord {
        self.records
            .front()
            .expect("history is never empty after maintenance")
    }

    /// Returns the record currently being populated, if any.
    pub fn back_mut(&mut self) -> Option<&mut FrameRecord> {
        self.records.back_mut()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[cfg(test)]
    pub fn records(&self) -> impl Iterator<Item = &FrameRecord> {
        self.records.iter()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Folds a batch of per-channel statistics into the matching record.
    ///
    /// The first item matching `channel` in the record for `frame_number`
    /// receives the reduced measurement. Batches for unknown frames, for
    /// items that will not render, or without any attributable operation
    /// are ignored.
    pub fn ingest(&mut self, channel: ChannelId, frame_number: u32, statistics: &[Statistic]) {
        let Some(record) = self
            .records
            .iter_mut()
            .find(|record| record.frame_number == frame_number)
        else {
            return;
        };

        let Some(data) = record
            .items
            .iter_mut()
            .find(|data| data.channel == Some(channel))
        else {
            return;
        };

        assert!(data.task_id > 0, "recorded assignment without a task id");

        if data.vp.area() <= 0.0 {
            return;
        }

        let mut start_time = i64::MAX;
        let mut end_time = 0i64;
        let mut time_transmit = 0i64;
        for stat in statistics {
            if stat.task_id != data.task_id {
                continue;
            }
            match stat.kind {
                StatisticKind::Clear | StatisticKind::Draw | StatisticKind::Readback => {
                    start_time = start_time.min(stat.start_time);
                    end_time = end_time.max(stat.end_time);
                }
                StatisticKind::FrameTransmit => {
                    time_transmit += stat.end_time - stat.start_time;
                }
                // Assembly blocks on input frames from other channels;
                // times past it are not attributable to this task.
                StatisticKind::Assemble => break,
                _ => {}
            }
        }

        if start_time == i64::MAX {
            return;
        }

        data.time = (end_time - start_time).max(1).max(time_transmit);
        data.load = data.time as f32 / data.vp.area();
        log::trace!(
            "added load {} (t={}) for {channel} {} {} @ {frame_number}",
            data.load,
            data.time,
            data.vp,
            data.range
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn measured(frame_number: u32, times: &[i64]) -> FrameRecord {
        FrameRecord {
            frame_number,
            items: times
                .iter()
                .enumerate()
                .map(|(i, &time)| LoadData {
                    task_id: i as u32 + 1,
                    channel: Some(ChannelId(i as u32)),
                    time,
                    load: if time >= 0 { time as f32 } else { 0.0 },
                    ..Default::default()
                })
                .collect(),
        }
    }

    #[test]
    fn test_maintain_seeds_empty_history() {
        let mut history = FrameHistory::new();
        history.maintain();

        assert_eq!(history.len(), 1);
        let seed = history.front();
        assert_eq!(seed.frame_number, 0);
        assert_eq!(seed.items.len(), 1);
        assert_eq!(seed.items[0].time, 1);
        assert_eq!(seed.items[0].load, 1.0);
        assert_eq!(seed.items[0].task_id, 0);
        assert!(seed.items[0].channel.is_none());
    }

    #[test]
    fn test_maintain_evicts_older_than_youngest_complete() {
        let mut history = FrameHistory::new();
        history.records.push_back(measured(1, &[10, 20]));
        history.records.push_back(measured(2, &[12, 18]));
        history.records.push_back(measured(3, &[-1, 9]));

        history.maintain();

        // Frame 2 is the youngest complete record; frame 1 goes, frame 3
        // is still pending.
        assert_eq!(history.len(), 2);
        assert_eq!(history.front().frame_number, 2);
    }

    #[test]
    fn test_maintain_keeps_incomplete_records_without_complete_anchor() {
        let mut history = FrameHistory::new();
        history.records.push_back(measured(5, &[-1, -1]));
        history.maintain();

        assert_eq!(history.len(), 1);
        assert_eq!(history.front().frame_number, 5);
    }

    #[test]
    fn test_ingest_reduces_statistics() {
        let mut history = FrameHistory::new();
        let mut record = measured(7, &[-1]);
        record.items[0].vp = Viewport::new(0.0, 0.0, 0.5, 1.0);
        history.records.push_back(record);

        let stats = [
            Statistic::new(1, StatisticKind::Clear, 100, 150),
            Statistic::new(1, StatisticKind::Draw, 150, 4_000),
            Statistic::new(2, StatisticKind::Draw, 0, 50_000), // other task
            Statistic::new(1, StatisticKind::Readback, 4_000, 4_500),
            Statistic::new(1, StatisticKind::FrameTransmit, 4_500, 5_000),
        ];
        history.ingest(ChannelId(0), 7, &stats);

        let data = &history.front().items[0];
        assert_eq!(data.time, 4_400); // 4_500 - 100
        assert_eq!(data.load, 4_400.0 / 0.5);
    }

    #[test]
    fn test_ingest_stops_at_assembly() {
        let mut history = FrameHistory::new();
        history.records.push_back(measured(3, &[-1]));

        let stats = [
            Statistic::new(1, StatisticKind::Draw, 0, 1_000),
            Statistic::new(1, StatisticKind::Assemble, 1_000, 2_000),
            // Blocked on input frames; must not extend the measurement.
            Statistic::new(1, StatisticKind::Readback, 2_000, 9_000),
        ];
        history.ingest(ChannelId(0), 3, &stats);

        assert_eq!(history.front().items[0].time, 1_000);
    }

    #[test]
    fn test_ingest_transmit_dominates_when_longer() {
        let mut history = FrameHistory::new();
        history.records.push_back(measured(3, &[-1]));

        let stats = [
            Statistic::new(1, StatisticKind::Draw, 0, 500),
            Statistic::new(1, StatisticKind::FrameTransmit, 500, 2_500),
        ];
        history.ingest(ChannelId(0), 3, &stats);

        assert_eq!(history.front().items[0].time, 2_000);
    }

    #[test]
    fn test_ingest_clamps_time_to_one() {
        let mut history = FrameHistory::new();
        history.records.push_back(measured(3, &[-1]));

        let stats = [Statistic::new(1, StatisticKind::Draw, 400, 400)];
        history.ingest(ChannelId(0), 3, &stats);

        assert_eq!(history.front().items[0].time, 1);
    }

    #[test]
    fn test_ingest_ignores_unmatched_input() {
        let mut history = FrameHistory::new();
        history.records.push_back(measured(3, &[-1]));

        // Unknown frame.
        history.ingest(ChannelId(0), 4, &[Statistic::new(1, StatisticKind::Draw, 0, 10)]);
        assert_eq!(history.front().items[0].time, -1);

        // Unknown channel.
        history.ingest(ChannelId(9), 3, &[Statistic::new(1, StatisticKind::Draw, 0, 10)]);
        assert_eq!(history.front().items[0].time, -1);

        // No attributable operation.
        history.ingest(
            ChannelId(0),
            3,
            &[Statistic::new(1, StatisticKind::FrameWait, 0, 10)],
        );
        assert_eq!(history.front().items[0].time, -1);
    }

    #[test]
    fn test_ingest_skips_empty_assignments() {
        let mut history = FrameHistory::new();
        let mut record = measured(3, &[-1]);
        record.items[0].vp = Viewport::new(0.0, 0.0, 0.0, 1.0);
        record.items[0].time = 0;
        history.records.push_back(record);

        history.ingest(ChannelId(0), 3, &[Statistic::new(1, StatisticKind::Draw, 0, 10)]);
        assert_eq!(history.front().items[0].time, 0);
    }
}
