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

//! The adaptive load equalizer.
//!
//! The equalizer organizes the governed compound's children in a binary
//! tree. At each level a relative split position is determined by
//! balancing the left subtree against the right subtree, using the load
//! densities measured for a past frame.

use crate::config::{ConfigError, EqualizerConfig};
use crate::history::{FrameHistory, LoadData};
use crate::tree::{Node, NodeId, NodeKind, SplitMode, SplitTree};
use std::fmt;
use tessera_core::math::clamp;
use tessera_core::{ChannelId, Compound, ListenerId, PixelViewport, Range, Statistic, Viewport};

/// Repartitions a compound's 2D viewport or database range between its
/// children so that every child finishes at approximately the same time.
///
/// The equalizer presents two ports to the framework: a frame-start hook
/// ([`notify_frame_start`](Self::notify_frame_start)) producing new
/// assignments, and a load-data sink
/// ([`notify_load_data`](Self::notify_load_data)) fed with each channel's
/// timing statistics as they arrive. Both are invoked serially from the
/// server loop; for any frame, assignments are produced before that
/// frame's statistics can arrive.
///
/// The governed compound's children must reference distinct channels and
/// their child set must stay unchanged while the equalizer governs them;
/// the root must carry an inherited pixel viewport. Detach the equalizer
/// with [`release`](Self::release) before dropping it so the channel
/// listeners are removed.
pub struct LoadEqualizer {
    config: EqualizerConfig,
    listener: ListenerId,
    tree: Option<SplitTree>,
    history: FrameHistory,
}

impl LoadEqualizer {
    /// Creates an equalizer with the given configuration.
    pub fn new(config: EqualizerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        log::info!("new load equalizer: mode {}", config.mode);
        Ok(Self {
            config,
            listener: ListenerId::next(),
            tree: None,
            history: FrameHistory::new(),
        })
    }

    /// Returns the configuration the equalizer runs with.
    pub fn config(&self) -> &EqualizerConfig {
        &self.config
    }

    /// Returns `true` while new assignments are suppressed.
    pub fn is_frozen(&self) -> bool {
        self.config.frozen
    }

    /// Suppresses or resumes new assignments. Freezing does not disturb
    /// the split tree or the history.
    pub fn set_frozen(&mut self, frozen: bool) {
        self.config.frozen = frozen;
    }

    /// Frame-start hook, invoked before the governed compound's frame
    /// begins.
    ///
    /// Builds the split tree on first use, runs history maintenance, and
    /// unless frozen or inactive computes fresh viewport/range
    /// assignments for all children.
    pub fn notify_frame_start(&mut self, compound: &mut Compound, frame_number: u32) {
        if self.tree.is_none() {
            if compound.children().is_empty() {
                return; // leaf compound, nothing to split
            }
            self.tree = Some(SplitTree::build(
                compound.children_mut(),
                self.config.mode,
                self.listener,
            ));
        }

        self.history.maintain();

        if self.config.frozen || !compound.is_running() {
            return;
        }

        let n_resources: f32 = compound
            .children()
            .iter()
            .filter(|child| child.is_running())
            .map(|child| child.usage())
            .sum();
        if n_resources <= 0.0 {
            log::warn!("no running children with usage, frame {frame_number} not balanced");
            return;
        }

        self.history.push_frame(frame_number);
        self.compute_split(compound, n_resources);
    }

    /// Load-data sink, invoked once per child channel as that channel's
    /// statistics for a past frame arrive.
    pub fn notify_load_data(
        &mut self,
        channel: ChannelId,
        frame_number: u32,
        statistics: &[Statistic],
    ) {
        self.history.ingest(channel, frame_number, statistics);
    }

    /// Detaches the equalizer from the compound it governed: removes the
    /// channel listeners, drops the split tree, and clears the history.
    pub fn release(&mut self, compound: &mut Compound) {
        if let Some(tree) = self.tree.take() {
            tree.release(compound.children_mut(), self.listener);
        }
        self.history.clear();
    }

    /// Renders the configuration in its text form.
    pub fn describe(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        write!(out, "{}", self.config)
    }

    /// Renders the split tree with per-node target times, if built.
    pub fn describe_tree(&self, compound: &Compound, out: &mut dyn fmt::Write) -> fmt::Result {
        match &self.tree {
            Some(tree) => tree.describe(compound.children(), out),
            None => Ok(()),
        }
    }

    /// Computes and applies this frame's assignments.
    fn compute_split(&mut self, compound: &mut Compound, n_resources: f32) {
        let mut tree = self.tree.take().expect("split tree built before balancing");
        debug_assert_eq!(
            tree.leaf_count(),
            compound.children().len(),
            "child set changed under the split tree"
        );

        let pvp = compound.inherited_pixel_viewport();
        debug_assert!(
            pvp.has_area(),
            "governed compound without an inherited pixel viewport"
        );

        let front = self.history.front();
        log::trace!("----- balance using frame {}", front.frame_number);
        let items: Vec<LoadData> = front
            .items
            .iter()
            .filter(|data| data.vp.has_area() && data.range.has_data())
            .cloned()
            .collect();

        // One sorted index vector per sweep direction.
        let mut order_x: Vec<usize> = (0..items.len()).collect();
        let mut order_y = order_x.clone();
        let mut order_range = order_x.clone();
        order_x.sort_by(|&a, &b| items[a].vp.x.total_cmp(&items[b].vp.x));
        order_y.sort_by(|&a, &b| items[a].vp.y.total_cmp(&items[b].vp.y));
        order_range.sort_by(|&a, &b| items[a].range.start.total_cmp(&items[b].range.start));

        let total_time: i64 = items.iter().map(|data| data.time).sum();
        let per_resource = total_time as f32 / n_resources;
        log::trace!(
            "render time {total_time}, {per_resource} per resource unit, {n_resources} resources"
        );

        let mut pass = SplitPass {
            tree: &mut tree,
            history: &mut self.history,
            items,
            order_x,
            order_y,
            order_range,
            damping: self.config.damping,
            boundary_2i: self.config.boundary_2i,
            boundary_f: self.config.boundary_f,
            pvp,
        };

        let root = pass.tree.root();
        let leftover =
            pass.assign_target_times(root, total_time as f32, per_resource, compound.children());
        pass.assign_leftover_time(root, leftover);
        pass.compute_split(compound.children_mut(), root, Viewport::FULL, Range::ALL);

        self.tree = Some(tree);
    }
}

impl fmt::Display for LoadEqualizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.config)
    }
}

/// The sweep axis of a 2D split.
#[derive(Debug, Clone, Copy)]
enum Axis {
    X,
    Y,
}

impl Axis {
    /// The sweep-axis interval `(start, end)` of a viewport.
    fn span(self, vp: &Viewport) -> (f32, f32) {
        match self {
            Axis::X => (vp.x, vp.x_end()),
            Axis::Y => (vp.y, vp.y_end()),
        }
    }

    /// The cross-axis interval and extent `(start, end, extent)` of a
    /// viewport.
    fn cross(self, vp: &Viewport) -> (f32, f32, f32) {
        match self {
            Axis::X => (vp.y, vp.y_end(), vp.h),
            Axis::Y => (vp.x, vp.x_end(), vp.w),
        }
    }

    /// The pixel extent along this axis.
    fn pixel_extent(self, pvp: PixelViewport) -> u32 {
        match self {
            Axis::X => pvp.width,
            Axis::Y => pvp.height,
        }
    }
}

/// One frame's balancing computation over the split tree.
struct SplitPass<'a> {
    tree: &'a mut SplitTree,
    history: &'a mut FrameHistory,
    /// Measured items of the reference frame, empty assignments dropped.
    items: Vec<LoadData>,
    order_x: Vec<usize>,
    order_y: Vec<usize>,
    order_range: Vec<usize>,
    damping: f32,
    boundary_2i: PixelViewport,
    boundary_f: f32,
    /// The governed compound's inherited pixel viewport.
    pvp: PixelViewport,
}

impl SplitPass<'_> {
    /// Assigns each leaf its target time bottom-up and aggregates the
    /// per-node extents and boundaries. `budget` threads the unassigned
    /// remainder of the total time through the leaves in left-to-right
    /// order; the final remainder is returned.
    fn assign_target_times(
        &mut self,
        id: NodeId,
        budget: f32,
        resource_time: f32,
        children: &[Compound],
    ) -> f32 {
        let node = *self.tree.node(id);
        match node.kind {
            NodeKind::Leaf { child } => {
                let compound = &children[child];
                let usage = if compound.is_running() {
                    compound.usage()
                } else {
                    0.0
                };
                let mut time = resource_time * usage;

                if usage > 0.0 {
                    // Smooth the change using the task's last measured time.
                    let task_id = compound.task_id();
                    if let Some(data) = self
                        .history
                        .front()
                        .items
                        .iter()
                        .find(|data| data.task_id == task_id)
                    {
                        time = (1.0 - self.damping) * time + self.damping * data.time as f32;
                    }
                }

                let max_size = compound
                    .channel()
                    .expect("leaf compound owns a channel")
                    .pixel_viewport();
                let boundary_2i = self.boundary_2i;
                let boundary_f = self.boundary_f;

                let node = self.tree.node_mut(id);
                node.max_size = max_size;
                node.boundary_2i = boundary_2i;
                node.boundary_f = boundary_f;
                node.time = time.min(budget);
                node.usage = usage;
                log::trace!(
                    "leaf usage {usage} target {}, remaining {}",
                    node.time,
                    budget - node.time
                );
                budget - node.time
            }
            NodeKind::Split { left, right } => {
                let mut remaining = self.assign_target_times(left, budget, resource_time, children);
                remaining = self.assign_target_times(right, remaining, resource_time, children);

                let l = *self.tree.node(left);
                let r = *self.tree.node(right);
                let node = self.tree.node_mut(id);
                node.time = l.time + r.time;
                node.usage = l.usage + r.usage;
                match node.split_mode {
                    SplitMode::Vertical => {
                        node.max_size = PixelViewport::new(
                            l.max_size.width + r.max_size.width,
                            l.max_size.height.min(r.max_size.height),
                        );
                        node.boundary_2i = PixelViewport::new(
                            l.boundary_2i.width + r.boundary_2i.width,
                            l.boundary_2i.height.max(r.boundary_2i.height),
                        );
                        node.boundary_f = l.boundary_f.max(r.boundary_f);
                    }
                    SplitMode::Horizontal => {
                        node.max_size = PixelViewport::new(
                            l.max_size.width.min(r.max_size.width),
                            l.max_size.height + r.max_size.height,
                        );
                        node.boundary_2i = PixelViewport::new(
                            l.boundary_2i.width.max(r.boundary_2i.width),
                            l.boundary_2i.height + r.boundary_2i.height,
                        );
                        node.boundary_f = l.boundary_f.max(r.boundary_f);
                    }
                    SplitMode::Db => {
                        node.boundary_2i = PixelViewport::new(
                            l.boundary_2i.width.max(r.boundary_2i.width),
                            l.boundary_2i.height.max(r.boundary_2i.height),
                        );
                        node.boundary_f = l.boundary_f + r.boundary_f;
                    }
                }
                log::trace!("node time {}, remaining {remaining}", node.time);
                remaining
            }
        }
    }

    /// Distributes the unassigned remainder back down the tree in
    /// proportion to subtree usage.
    fn assign_leftover_time(&mut self, id: NodeId, time: f32) {
        let node = *self.tree.node(id);
        match node.kind {
            NodeKind::Leaf { .. } => {
                if node.usage > 0.0 {
                    self.tree.node_mut(id).time += time;
                } else {
                    assert!(time < 1e-4, "leftover time {time} on an unused leaf");
                }
            }
            NodeKind::Split { left, right } => {
                if node.usage > 0.0 {
                    let left_usage = self.tree.node(left).usage;
                    let mut left_time = time * left_usage / node.usage;
                    let mut right_time = time - left_time;
                    // Collapse floating-point dust onto one side.
                    if time - left_time < 1e-4 {
                        left_time = time;
                        right_time = 0.0;
                    } else if time - right_time < 1e-4 {
                        left_time = 0.0;
                        right_time = time;
                    }

                    self.assign_leftover_time(left, left_time);
                    self.assign_leftover_time(right, right_time);
                    let sum = self.tree.node(left).time + self.tree.node(right).time;
                    self.tree.node_mut(id).time = sum;
                } else {
                    assert!(time <= 1e-4, "leftover time {time} on an unused subtree");
                }
            }
        }
    }

    /// Recursively assigns `vp`/`range` to the subtree under `id`,
    /// dividing at load-balanced split positions.
    fn compute_split(&mut self, children: &mut [Compound], id: NodeId, vp: Viewport, range: Range) {
        let node = *self.tree.node(id);
        log::trace!("compute split {vp}, {range} target {}", node.time);
        debug_assert!(vp.is_valid(), "invalid viewport {vp}");
        debug_assert!(range.is_valid(), "invalid range {range}");
        assert!(
            node.usage > 0.0 || !vp.has_area() || !range.has_data(),
            "assigning work to an unused subtree: {vp}, {range}"
        );

        let (left, right) = match node.kind {
            NodeKind::Leaf { child } => {
                self.assign_leaf(children, child, vp, range);
                return;
            }
            NodeKind::Split { left, right } => (left, right),
        };

        match node.split_mode {
            SplitMode::Vertical => {
                assert!(
                    range == Range::ALL,
                    "mixed 2D/DB load-balancing is not supported"
                );
                let split_pos = self.split_position_2d(&node, left, right, &vp, Axis::X);
                let end = vp.x_end();

                let mut child_vp = vp;
                child_vp.w = split_pos - vp.x;
                self.compute_split(children, left, child_vp, range);

                child_vp.x = child_vp.x_end();
                child_vp.w = end - child_vp.x;
                // Rounding can leave the right child slightly short of the
                // parent edge.
                while child_vp.x_end() < end {
                    child_vp.w += f32::EPSILON;
                }
                self.compute_split(children, right, child_vp, range);
            }
            SplitMode::Horizontal => {
                assert!(
                    range == Range::ALL,
                    "mixed 2D/DB load-balancing is not supported"
                );
                let split_pos = self.split_position_2d(&node, left, right, &vp, Axis::Y);
                let end = vp.y_end();

                let mut child_vp = vp;
                child_vp.h = split_pos - vp.y;
                self.compute_split(children, left, child_vp, range);

                child_vp.y = child_vp.y_end();
                child_vp.h = end - child_vp.y;
                while child_vp.y_end() < end {
                    child_vp.h += f32::EPSILON;
                }
                self.compute_split(children, right, child_vp, range);
            }
            SplitMode::Db => {
                assert!(
                    vp == Viewport::FULL,
                    "mixed 2D/DB load-balancing is not supported"
                );
                let split_pos = self.split_position_db(&node, left, right, &range);

                let mut child_range = range;
                child_range.end = split_pos;
                self.compute_split(children, left, vp, child_range);

                child_range.start = child_range.end;
                child_range.end = range.end;
                self.compute_split(children, right, vp, child_range);
            }
        }
    }

    /// Applies the final assignment to a leaf compound and records it in
    /// the current frame record.
    fn assign_leaf(&mut self, children: &mut [Compound], child: usize, vp: Viewport, range: Range) {
        let compound = &mut children[child];
        compound.set_viewport(vp);
        compound.set_range(range);

        let channel = compound.channel().expect("leaf compound owns a channel");
        log::trace!("{} set {vp}, {range}", channel.name());

        let mut data = LoadData {
            task_id: compound.task_id(),
            channel: Some(channel.id()),
            vp,
            range,
            ..Default::default()
        };
        debug_assert!(data.task_id > 0);
        if !vp.has_area() || !range.has_data() {
            data.time = 0; // will not render
        }

        let record = self
            .history
            .back_mut()
            .expect("a frame record is appended before balancing");
        record.items.push(data);
    }

    /// Sweeps the measured load along `axis` until the left subtree's
    /// target time is covered, then enforces maximum extents, the pixel
    /// boundary, and snapping.
    fn split_position_2d(
        &self,
        node: &Node,
        left: NodeId,
        right: NodeId,
        vp: &Viewport,
        axis: Axis,
    ) -> f32 {
        let left_node = *self.tree.node(left);
        let right_node = *self.tree.node(right);

        let (start, end) = axis.span(vp);
        let (band_lo, band_hi, band_extent) = axis.cross(vp);

        let mut time_left = left_node.time;
        let mut split_pos = start;
        let order = match axis {
            Axis::X => &self.order_x,
            Axis::Y => &self.order_y,
        };
        let mut working: Vec<usize> = order.clone();

        while time_left > f32::EPSILON && split_pos < end && !working.is_empty() {
            log::trace!("{time_left}ms left for {} tiles", working.len());

            let items = &self.items;
            // Drop items that no longer cover the sweep frontier.
            working.retain(|&i| axis.span(&items[i].vp).1 > split_pos);
            if working.is_empty() {
                break;
            }

            // Next discontinuity where the load density can change.
            let mut current_pos = 1.0f32;
            for &i in &working {
                current_pos = current_pos.min(axis.span(&items[i].vp).1);
            }
            debug_assert!(current_pos > split_pos, "{current_pos} <= {split_pos}");
            debug_assert!(current_pos <= 1.0);

            // Accumulate the normalized load over the strip, projecting
            // each item onto the parent's cross-axis band.
            let mut current_load = 0.0f32;
            for &i in &working {
                let data = &items[i];
                if axis.span(&data.vp).0 >= current_pos {
                    break; // sorted; not yet reached by the sweep
                }
                let (item_lo, item_hi, item_extent) = axis.cross(&data.vp);
                let mut contrib = item_extent;
                if item_lo < band_lo {
                    contrib -= band_lo - item_lo;
                }
                if item_hi > band_hi {
                    contrib -= item_hi - band_hi;
                }
                if contrib > 0.0 {
                    current_load += data.load * (contrib / band_extent);
                }
            }

            let span = current_pos - split_pos;
            let current_time = span * band_extent * current_load;
            log::trace!("{split_pos}..{current_pos}: t={current_time} of {time_left}");

            if current_time >= time_left {
                // Found the strip holding the split position.
                split_pos += span * time_left / current_time;
                time_left = 0.0;
            } else {
                time_left -= current_time;
                split_pos = current_pos;
            }
        }

        // Enforce maximum extents and the minimum tile size.
        let pvp_extent = axis.pixel_extent(self.pvp) as f32;
        let boundary = axis.pixel_extent(node.boundary_2i) as f32 / pvp_extent;
        if left_node.usage == 0.0 {
            split_pos = start;
        } else if right_node.usage == 0.0 {
            split_pos = end;
        } else if boundary > 0.0 {
            let length_right = end - split_pos;
            let length_left = split_pos - start;
            let max_right = axis.pixel_extent(right_node.max_size) as f32 / pvp_extent;
            let max_left = axis.pixel_extent(left_node.max_size) as f32 / pvp_extent;
            if length_right > max_right {
                split_pos = end - max_right;
            } else if length_left > max_left {
                split_pos = start + max_left;
            }

            if split_pos - start < boundary {
                split_pos = start + boundary;
            }
            if end - split_pos < boundary {
                split_pos = end - boundary;
            }

            // Snap to the nearest boundary multiple.
            let ratio = (split_pos / boundary + 0.5) as u32;
            split_pos = ratio as f32 * boundary;
        }

        let split_pos = clamp(split_pos, start, end);
        log::trace!("split {vp} at {split_pos} along {axis:?}");
        split_pos
    }

    /// Sweeps the measured load along the database axis until the left
    /// subtree's target time is covered, then snaps to the range
    /// granularity.
    fn split_position_db(&self, node: &Node, left: NodeId, right: NodeId, range: &Range) -> f32 {
        let left_node = *self.tree.node(left);
        let right_node = *self.tree.node(right);

        let mut time_left = left_node.time;
        let mut split_pos = range.start;
        let end = range.end;
        let mut working: Vec<usize> = self.order_range.clone();

        while time_left > f32::EPSILON && split_pos < end && !working.is_empty() {
            log::trace!("{time_left}ms left for {} ranges", working.len());

            let items = &self.items;
            working.retain(|&i| items[i].range.end > split_pos);
            if working.is_empty() {
                break;
            }

            let mut current_pos = 1.0f32;
            for &i in &working {
                current_pos = current_pos.min(items[i].range.end);
            }
            debug_assert!(current_pos > split_pos, "{current_pos} <= {split_pos}");

            // Database strips are not projected; every overlapping item
            // contributes its full density.
            let mut current_load = 0.0f32;
            for &i in &working {
                let data = &items[i];
                if data.range.start >= current_pos {
                    break;
                }
                current_load += data.load;
            }
            log::trace!("{split_pos}..{current_pos}: load {current_load} of {time_left}");

            if current_load >= time_left {
                let span = current_pos - split_pos;
                split_pos += span * time_left / current_load;
                time_left = 0.0;
            } else {
                time_left -= current_load;
                split_pos = current_pos;
            }
        }

        let boundary = node.boundary_f;
        if left_node.usage == 0.0 {
            split_pos = range.start;
        } else if right_node.usage == 0.0 {
            split_pos = end;
        }

        let ratio = (split_pos / boundary + 0.5) as u32;
        split_pos = ratio as f32 * boundary;
        if split_pos - range.start < boundary {
            split_pos = range.start;
        }
        if end - split_pos < boundary {
            split_pos = end;
        }
        log::trace!("split {range} at {split_pos}");
        split_pos
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Mode;
    use tessera_core::math::approx_eq_eps;
    use tessera_core::{Channel, StatisticKind};

    fn cluster(usages: &[f32], pvp: PixelViewport) -> Compound {
        let children = usages
            .iter()
            .enumerate()
            .map(|(i, &usage)| {
                let id = i as u32 + 1;
                let channel = Channel::new(ChannelId(id), format!("channel{id}"), pvp);
                Compound::leaf(id, usage, channel)
            })
            .collect();
        let mut root = Compound::group(children);
        root.set_inherited_pixel_viewport(pvp);
        root
    }

    fn equalizer(mode: Mode, damping: f32) -> LoadEqualizer {
        LoadEqualizer::new(EqualizerConfig {
            mode,
            damping,
            ..Default::default()
        })
        .unwrap()
    }

    fn draw_stat(task_id: u32, time: i64) -> [Statistic; 1] {
        [Statistic::new(task_id, StatisticKind::Draw, 0, time)]
    }

    fn vp_approx(vp: Viewport, x: f32, y: f32, w: f32, h: f32) -> bool {
        approx_eq_eps(vp.x, x, 1e-3)
            && approx_eq_eps(vp.y, y, 1e-3)
            && approx_eq_eps(vp.w, w, 1e-3)
            && approx_eq_eps(vp.h, h, 1e-3)
    }

    #[test]
    fn test_first_frame_splits_evenly() {
        let mut compound = cluster(&[1.0, 1.0], PixelViewport::new(1024, 768));
        let mut eq = equalizer(Mode::Vertical, 0.0);

        eq.notify_frame_start(&mut compound, 1);

        let children = compound.children();
        assert!(vp_approx(children[0].viewport(), 0.0, 0.0, 0.5, 1.0));
        assert!(vp_approx(children[1].viewport(), 0.5, 0.0, 0.5, 1.0));
        assert_eq!(children[0].range(), Range::ALL);
        assert_eq!(children[1].range(), Range::ALL);
    }

    #[test]
    fn test_record_contains_one_item_per_leaf() {
        let mut compound = cluster(&[1.0; 4], PixelViewport::new(1024, 1024));
        let mut eq = equalizer(Mode::TwoD, 0.5);

        eq.notify_frame_start(&mut compound, 1);

        let record = eq.history.records().last().unwrap();
        assert_eq!(record.frame_number, 1);
        assert_eq!(record.items.len(), 4);
        for (i, item) in record.items.iter().enumerate() {
            assert_eq!(item.task_id, i as u32 + 1);
            assert_eq!(item.time, -1);
        }
    }

    #[test]
    fn test_damping_zero_rebalances_toward_equal_times() {
        let mut compound = cluster(&[1.0, 1.0], PixelViewport::new(1024, 768));
        let mut eq = equalizer(Mode::Vertical, 0.0);

        eq.notify_frame_start(&mut compound, 1);
        eq.notify_load_data(ChannelId(1), 1, &draw_stat(1, 20));
        eq.notify_load_data(ChannelId(2), 1, &draw_stat(2, 10));

        eq.notify_frame_start(&mut compound, 2);

        // The left half was twice as expensive; equal targets of 15 move
        // the split to 15 / 40 per unit width.
        let children = compound.children();
        assert!(vp_approx(children[0].viewport(), 0.0, 0.0, 0.375, 1.0));
        assert!(vp_approx(children[1].viewport(), 0.375, 0.0, 0.625, 1.0));
    }

    #[test]
    fn test_damping_one_reproduces_previous_partition() {
        let mut compound = cluster(&[1.0, 1.0], PixelViewport::new(1024, 768));
        let mut eq = equalizer(Mode::Vertical, 1.0);

        eq.notify_frame_start(&mut compound, 1);
        eq.notify_load_data(ChannelId(1), 1, &draw_stat(1, 20));
        eq.notify_load_data(ChannelId(2), 1, &draw_stat(2, 10));

        eq.notify_frame_start(&mut compound, 2);

        // Fully damped targets equal the previous measurements, whose
        // sweep reproduces the previous split exactly.
        let children = compound.children();
        assert!(vp_approx(children[0].viewport(), 0.0, 0.0, 0.5, 1.0));
        assert!(vp_approx(children[1].viewport(), 0.5, 0.0, 0.5, 1.0));
    }

    #[test]
    fn test_history_eviction_keeps_measured_anchor() {
        let mut compound = cluster(&[1.0, 1.0], PixelViewport::new(1024, 768));
        let mut eq = equalizer(Mode::Vertical, 0.5);

        eq.notify_frame_start(&mut compound, 1);
        assert_eq!(eq.history.len(), 2); // synthetic seed + frame 1

        eq.notify_load_data(ChannelId(1), 1, &draw_stat(1, 20));
        eq.notify_load_data(ChannelId(2), 1, &draw_stat(2, 10));

        eq.notify_frame_start(&mut compound, 2);
        // The synthetic seed is older than the measured frame 1 and gone.
        assert_eq!(eq.history.len(), 2);
        assert_eq!(eq.history.front().frame_number, 1);

        eq.notify_frame_start(&mut compound, 3);
        // Frame 2 is still unmeasured; frame 1 stays the anchor.
        assert_eq!(eq.history.len(), 3);
        assert_eq!(eq.history.front().frame_number, 1);
    }

    #[test]
    fn test_frozen_appends_no_record() {
        let mut compound = cluster(&[1.0, 1.0], PixelViewport::new(1024, 768));
        let mut eq = equalizer(Mode::Vertical, 0.5);

        eq.notify_frame_start(&mut compound, 1);
        let assigned = compound.children()[0].viewport();
        let records = eq.history.len();

        eq.set_frozen(true);
        eq.notify_frame_start(&mut compound, 2);

        assert_eq!(eq.history.len(), records);
        assert_eq!(compound.children()[0].viewport(), assigned);

        eq.set_frozen(false);
        eq.notify_frame_start(&mut compound, 3);
        assert_eq!(eq.history.len(), records + 1);
    }

    #[test]
    fn test_inactive_compound_is_not_balanced() {
        let mut compound = cluster(&[1.0, 1.0], PixelViewport::new(1024, 768));
        compound.set_active(false);
        let mut eq = equalizer(Mode::Vertical, 0.5);

        eq.notify_frame_start(&mut compound, 1);

        // The tree exists (listeners registered) but nothing was assigned.
        assert_eq!(compound.children()[0].channel().unwrap().listener_count(), 1);
        assert_eq!(eq.history.len(), 1); // synthetic seed only
    }

    #[test]
    fn test_childless_compound_is_ignored() {
        let channel = Channel::new(ChannelId(1), "solo", PixelViewport::new(640, 480));
        let mut leaf = Compound::leaf(1, 1.0, channel);
        let mut eq = equalizer(Mode::TwoD, 0.5);

        eq.notify_frame_start(&mut leaf, 1);

        assert_eq!(eq.history.len(), 0);
        assert_eq!(leaf.viewport(), Viewport::FULL);
    }

    #[test]
    fn test_release_removes_listeners_and_history() {
        let mut compound = cluster(&[1.0, 1.0, 1.0], PixelViewport::new(1024, 768));
        let mut eq = equalizer(Mode::TwoD, 0.5);

        eq.notify_frame_start(&mut compound, 1);
        for child in compound.children() {
            assert_eq!(child.channel().unwrap().listener_count(), 1);
        }

        eq.release(&mut compound);
        for child in compound.children() {
            assert_eq!(child.channel().unwrap().listener_count(), 0);
        }
        assert_eq!(eq.history.len(), 0);
    }

    #[test]
    fn test_all_children_idle_skips_balance() {
        let mut compound = cluster(&[1.0, 1.0], PixelViewport::new(1024, 768));
        for child in compound.children_mut() {
            child.set_active(false);
        }
        let mut eq = equalizer(Mode::Vertical, 0.5);

        eq.notify_frame_start(&mut compound, 1);
        assert_eq!(eq.history.len(), 1); // synthetic seed only
    }

    #[test]
    fn test_describe_tree_lists_targets() {
        let mut compound = cluster(&[1.0, 1.0], PixelViewport::new(1024, 768));
        let mut eq = equalizer(Mode::Vertical, 0.0);
        eq.notify_frame_start(&mut compound, 1);

        let mut text = String::new();
        eq.describe_tree(&compound, &mut text).unwrap();
        assert!(text.contains("split VERTICAL"));
        assert!(text.contains("channel1"));
        assert!(text.contains("channel2"));
    }
}
