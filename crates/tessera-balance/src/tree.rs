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

//! The split tree: the governed compound's children arranged as a
//! balanced binary tree with a per-node split orientation.

use crate::config::Mode;
use std::fmt;
use tessera_core::{Compound, ListenerId, PixelViewport};

/// The axis an internal node divides its region along.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SplitMode {
    /// Divide the viewport along X.
    Vertical,
    /// Divide the viewport along Y.
    Horizontal,
    /// Divide the database range.
    Db,
}

impl fmt::Display for SplitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SplitMode::Vertical => "VERTICAL",
            SplitMode::Horizontal => "HORIZONTAL",
            SplitMode::Db => "DB",
        };
        write!(f, "{name}")
    }
}

impl Mode {
    /// The split orientation a node uses when the mode is not `2D`.
    /// `2D` itself resolves to vertical leaves with alternating internal
    /// nodes, derived during tree construction.
    fn base_split_mode(self) -> SplitMode {
        match self {
            Mode::TwoD | Mode::Vertical => SplitMode::Vertical,
            Mode::Horizontal => SplitMode::Horizontal,
            Mode::Db => SplitMode::Db,
        }
    }
}

/// Index of a node within the tree's arena.
pub(crate) type NodeId = usize;

/// The structural role of a node.
#[derive(Debug, Clone, Copy)]
pub(crate) enum NodeKind {
    /// One leaf compound, referenced by its child index under the
    /// governed compound.
    Leaf { child: usize },
    /// Two subtrees balanced against each other.
    Split { left: NodeId, right: NodeId },
}

/// One split-tree node with the per-frame balancing state swept over it.
///
/// `time` and `usage` are recomputed every frame; `max_size` and the
/// boundaries are refreshed from the channels and configuration at the
/// same time, aggregated upwards according to the node's split mode.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Node {
    pub kind: NodeKind,
    pub split_mode: SplitMode,
    /// Target rendering time for this subtree.
    pub time: f32,
    /// Aggregated usage of the running leaves below this node.
    pub usage: f32,
    /// Largest pixel extent this subtree can cover.
    pub max_size: PixelViewport,
    /// Minimum pixel extent a tile of this subtree may have.
    pub boundary_2i: PixelViewport,
    /// Minimum database-range granularity of this subtree.
    pub boundary_f: f32,
}

impl Node {
    fn new(kind: NodeKind, split_mode: SplitMode) -> Self {
        Self {
            kind,
            split_mode,
            time: 0.0,
            usage: 0.0,
            max_size: PixelViewport::default(),
            boundary_2i: PixelViewport::default(),
            boundary_f: 0.0,
        }
    }
}

/// A balanced binary tree over the governed compound's children.
///
/// Nodes live in an arena indexed by [`NodeId`]; leaves reference
/// children by their position under the governed compound, so the child
/// set must stay unchanged for the lifetime of the tree. Left-to-right
/// leaf order matches configuration order.
#[derive(Debug)]
pub(crate) struct SplitTree {
    nodes: Vec<Node>,
    root: NodeId,
    leaf_count: usize,
}

impl SplitTree {
    /// Builds the tree over `children` and registers `listener` on every
    /// leaf channel.
    ///
    /// # Panics
    /// Panics if `children` is empty, if a child lacks a channel or a
    /// positive task id, or (in debug builds) if two children share a
    /// channel.
    pub fn build(children: &mut [Compound], mode: Mode, listener: ListenerId) -> Self {
        assert!(!children.is_empty(), "cannot split a childless compound");
        debug_assert!(
            distinct_channels(children),
            "children of a governed compound must use distinct channels"
        );

        let mut nodes = Vec::with_capacity(2 * children.len() - 1);
        let root = build_node(&mut nodes, children, 0, children.len(), mode, listener);
        let tree = Self {
            nodes,
            root,
            leaf_count: children.len(),
        };
        log::debug!("built split tree over {} children", tree.leaf_count);
        tree
    }

    /// Removes `listener` from every leaf channel.
    pub fn release(self, children: &mut [Compound], listener: ListenerId) {
        for node in &self.nodes {
            if let NodeKind::Leaf { child } = node.kind {
                let channel = children[child]
                    .channel_mut()
                    .expect("leaf compound owns a channel");
                channel.remove_listener(listener);
            }
        }
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    #[inline]
    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id]
    }

    #[inline]
    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    /// Renders the tree with per-node split modes and target times.
    pub fn describe(
        &self,
        children: &[Compound],
        out: &mut dyn fmt::Write,
    ) -> fmt::Result {
        self.describe_node(children, self.root, 0, out)
    }

    fn describe_node(
        &self,
        children: &[Compound],
        id: NodeId,
        indent: usize,
        out: &mut dyn fmt::Write,
    ) -> fmt::Result {
        let node = &self.nodes[id];
        match node.kind {
            NodeKind::Leaf { child } => {
                let name = children[child]
                    .channel()
                    .map_or("<none>", |channel| channel.name());
                writeln!(out, "{:indent$}{name} target time {}", "", node.time)
            }
            NodeKind::Split { left, right } => {
                writeln!(
                    out,
                    "{:indent$}split {} target time {}",
                    "", node.split_mode, node.time
                )?;
                self.describe_node(children, left, indent + 4, out)?;
                self.describe_node(children, right, indent + 4, out)
            }
        }
    }
}

fn build_node(
    nodes: &mut Vec<Node>,
    children: &mut [Compound],
    lo: usize,
    hi: usize,
    mode: Mode,
    listener: ListenerId,
) -> NodeId {
    if hi - lo == 1 {
        let compound = &mut children[lo];
        assert!(compound.task_id() > 0, "leaf compound without a task id");
        let channel = compound
            .channel_mut()
            .expect("leaf compound owns a channel");
        channel.add_listener(listener);

        nodes.push(Node::new(
            NodeKind::Leaf { child: lo },
            mode.base_split_mode(),
        ));
        return nodes.len() - 1;
    }

    let mid = lo + (hi - lo) / 2;
    let left = build_node(nodes, children, lo, mid, mode, listener);
    let right = build_node(nodes, children, mid, hi, mode, listener);

    // In 2D the orientation alternates level by level, producing a tiling.
    let split_mode = match mode {
        Mode::TwoD => {
            if nodes[right].split_mode == SplitMode::Vertical {
                SplitMode::Horizontal
            } else {
                SplitMode::Vertical
            }
        }
        other => other.base_split_mode(),
    };

    nodes.push(Node::new(NodeKind::Split { left, right }, split_mode));
    nodes.len() - 1
}

fn distinct_channels(children: &[Compound]) -> bool {
    let mut ids: Vec<_> = children
        .iter()
        .filter_map(|child| child.channel().map(|channel| channel.id()))
        .collect();
    ids.sort_unstable();
    ids.windows(2).all(|pair| pair[0] != pair[1])
}
