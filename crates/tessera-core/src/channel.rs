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

//! Defines the channel resource: one GPU rendering output with a fixed
//! pixel viewport.

use crate::math::PixelViewport;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// The stable identity of a [`Channel`], usable as a map key.
///
/// Channel identities are assigned by the configuration layer and stay
/// constant for the lifetime of a session; statistics notifications are
/// correlated with rendering assignments through them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(pub u32);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "channel.{}", self.0)
    }
}

/// An opaque handle identifying one listener registered on a channel.
///
/// Listener registration is an accounting edge, not an ownership edge: a
/// scheduler registers one handle per leaf it governs and removes them on
/// teardown. Channels outlive their listeners by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Allocates a process-wide unique listener handle.
    pub fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// One GPU rendering output with a fixed pixel viewport.
///
/// A channel is owned by the leaf compound that renders to it. The
/// framework routes per-frame timing statistics back to interested
/// listeners keyed by the channel's [`ChannelId`].
#[derive(Debug, Clone)]
pub struct Channel {
    id: ChannelId,
    name: String,
    pixel_viewport: PixelViewport,
    listeners: Vec<ListenerId>,
}

impl Channel {
    /// Creates a new channel with the given identity, name, and native
    /// pixel extent.
    pub fn new(id: ChannelId, name: impl Into<String>, pixel_viewport: PixelViewport) -> Self {
        Self {
            id,
            name: name.into(),
            pixel_viewport,
            listeners: Vec::new(),
        }
    }

    /// Returns the channel's stable identity.
    #[inline]
    pub fn id(&self) -> ChannelId {
        self.id
    }

    /// Returns the channel's human-readable name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the channel's native pixel extent.
    #[inline]
    pub fn pixel_viewport(&self) -> PixelViewport {
        self.pixel_viewport
    }

    /// Registers a listener for this channel's load data.
    pub fn add_listener(&mut self, listener: ListenerId) {
        log::trace!("{}: adding listener {listener:?}", self.name);
        self.listeners.push(listener);
    }

    /// Removes one registration of the given listener.
    ///
    /// Removing a listener that was never registered is a no-op.
    pub fn remove_listener(&mut self, listener: ListenerId) {
        if let Some(pos) = self.listeners.iter().position(|l| *l == listener) {
            self.listeners.swap_remove(pos);
            log::trace!("{}: removed listener {listener:?}", self.name);
        }
    }

    /// Returns the number of currently registered listeners.
    #[inline]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}
