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

//! Defines the compound configuration tree.
//!
//! A compound describes how a logical rendering workload is decomposed
//! across channels: internal compounds group their children, leaf
//! compounds bind one rendering task to one [`Channel`]. Schedulers
//! repartition work by mutating the fractional [`Viewport`] and database
//! [`Range`] of the leaves under the compound they govern.

use crate::channel::Channel;
use crate::math::{PixelViewport, Range, Viewport};

/// One node of the rendering configuration tree.
///
/// Leaves carry a positive task identifier and own the [`Channel`] they
/// render to; every node carries a `usage` weight expressing its relative
/// resource capacity and an `active` flag. The root of a governed subtree
/// additionally knows the pixel extent its fractional coordinates resolve
/// against.
///
/// Schedulers governing a compound require the leaves below it to
/// reference **distinct** channels; load data is correlated per channel.
#[derive(Debug, Clone)]
pub struct Compound {
    task_id: u32,
    usage: f32,
    active: bool,
    viewport: Viewport,
    range: Range,
    channel: Option<Channel>,
    children: Vec<Compound>,
    inherited_pvp: PixelViewport,
}

impl Compound {
    /// Creates a leaf compound binding the rendering task `task_id` to
    /// `channel`, weighted by `usage`.
    ///
    /// # Panics
    /// Panics if `task_id` is zero; zero is reserved for synthetic
    /// records.
    pub fn leaf(task_id: u32, usage: f32, channel: Channel) -> Self {
        assert!(task_id > 0, "leaf compounds require a positive task id");
        Self {
            task_id,
            usage,
            active: true,
            viewport: Viewport::FULL,
            range: Range::ALL,
            channel: Some(channel),
            children: Vec::new(),
            inherited_pvp: PixelViewport::default(),
        }
    }

    /// Creates an internal compound grouping `children`.
    pub fn group(children: Vec<Compound>) -> Self {
        Self {
            task_id: 0,
            usage: 1.0,
            active: true,
            viewport: Viewport::FULL,
            range: Range::ALL,
            channel: None,
            children,
            inherited_pvp: PixelViewport::default(),
        }
    }

    /// Returns this compound's children, in configuration order.
    #[inline]
    pub fn children(&self) -> &[Compound] {
        &self.children
    }

    /// Returns mutable access to this compound's children.
    #[inline]
    pub fn children_mut(&mut self) -> &mut [Compound] {
        &mut self.children
    }

    /// Returns `true` if this compound has no children.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Returns `true` if this compound participates in the current frame.
    #[inline]
    pub fn is_running(&self) -> bool {
        self.active
    }

    /// Activates or deactivates this compound.
    ///
    /// An inactive compound keeps its configuration but is skipped when
    /// work is distributed.
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Returns this compound's usage weight.
    #[inline]
    pub fn usage(&self) -> f32 {
        self.usage
    }

    /// Sets this compound's usage weight.
    ///
    /// # Panics
    /// Panics if `usage` is negative.
    pub fn set_usage(&mut self, usage: f32) {
        assert!(usage >= 0.0, "usage must be non-negative");
        self.usage = usage;
    }

    /// Returns the task identifier of this leaf, or `0` for internal
    /// compounds.
    #[inline]
    pub fn task_id(&self) -> u32 {
        self.task_id
    }

    /// Returns the channel this leaf renders to, if any.
    #[inline]
    pub fn channel(&self) -> Option<&Channel> {
        self.channel.as_ref()
    }

    /// Returns mutable access to this leaf's channel, if any.
    #[inline]
    pub fn channel_mut(&mut self) -> Option<&mut Channel> {
        self.channel.as_mut()
    }

    /// Returns the fractional viewport currently assigned to this
    /// compound.
    #[inline]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Assigns a fractional viewport to this compound.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Returns the database range currently assigned to this compound.
    #[inline]
    pub fn range(&self) -> Range {
        self.range
    }

    /// Assigns a database range to this compound.
    pub fn set_range(&mut self, range: Range) {
        self.range = range;
    }

    /// Returns the pixel extent this compound's fractional coordinates
    /// resolve against.
    #[inline]
    pub fn inherited_pixel_viewport(&self) -> PixelViewport {
        self.inherited_pvp
    }

    /// Sets the inherited pixel extent.
    ///
    /// The configuration layer computes this during compound update; only
    /// the root of a governed subtree needs it.
    pub fn set_inherited_pixel_viewport(&mut self, pvp: PixelViewport) {
        self.inherited_pvp = pvp;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ChannelId;

    fn leaf(task_id: u32) -> Compound {
        let channel = Channel::new(
            ChannelId(task_id),
            format!("channel{task_id}"),
            PixelViewport::new(1024, 768),
        );
        Compound::leaf(task_id, 1.0, channel)
    }

    #[test]
    fn test_leaf_construction() {
        let compound = leaf(3);
        assert!(compound.is_leaf());
        assert!(compound.is_running());
        assert_eq!(compound.task_id(), 3);
        assert_eq!(compound.usage(), 1.0);
        assert_eq!(compound.viewport(), Viewport::FULL);
        assert_eq!(compound.range(), Range::ALL);
        assert!(compound.channel().is_some());
    }

    #[test]
    #[should_panic(expected = "positive task id")]
    fn test_leaf_rejects_zero_task_id() {
        let channel = Channel::new(ChannelId(0), "bad", PixelViewport::new(1, 1));
        let _ = Compound::leaf(0, 1.0, channel);
    }

    #[test]
    fn test_group_construction() {
        let group = Compound::group(vec![leaf(1), leaf(2)]);
        assert!(!group.is_leaf());
        assert_eq!(group.children().len(), 2);
        assert_eq!(group.task_id(), 0);
        assert!(group.channel().is_none());
        assert_eq!(group.children()[0].task_id(), 1);
        assert_eq!(group.children()[1].task_id(), 2);
    }

    #[test]
    fn test_assignment_mutators() {
        let mut compound = leaf(1);
        let vp = Viewport::new(0.0, 0.0, 0.5, 1.0);
        compound.set_viewport(vp);
        compound.set_range(Range::new(0.25, 0.75));
        assert_eq!(compound.viewport(), vp);
        assert_eq!(compound.range(), Range::new(0.25, 0.75));

        compound.set_active(false);
        assert!(!compound.is_running());
        compound.set_usage(0.5);
        assert_eq!(compound.usage(), 0.5);
    }
}
