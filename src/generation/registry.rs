// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-levelbar project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Active channel set

use std::collections::BTreeSet;
use std::sync::Arc;

/// Identifier of a logical channel, in `0..channel_count`
pub type ChannelId = usize;

/// Tracks which channel ids are currently registered.
///
/// Channels are registered in ascending order and deregistered in descending
/// order; the callback passed to each operation runs once per channel, in
/// that order, right after the set is updated.
#[derive(Debug, Default)]
pub struct ChannelRegistry {
    active: BTreeSet<ChannelId>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `0..channel_count`, calling `on_added` for each id in ascending order
    pub fn register_all<F>(&mut self, channel_count: usize, mut on_added: F)
    where
        F: FnMut(ChannelId),
    {
        for channel in 0..channel_count {
            if self.active.insert(channel) {
                on_added(channel);
            }
        }
    }

    /// Deregister every active id, calling `on_removed` for each in descending order
    pub fn deregister_all<F>(&mut self, mut on_removed: F)
    where
        F: FnMut(ChannelId),
    {
        while let Some(channel) = self.active.pop_last() {
            on_removed(channel);
        }
    }

    /// Registered ids in ascending order
    pub fn snapshot(&self) -> Arc<[ChannelId]> {
        self.active.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_ascending_deregister_descending() {
        let mut registry = ChannelRegistry::new();
        let mut added = Vec::new();
        registry.register_all(5, |id| added.push(id));

        assert_eq!(added, vec![0, 1, 2, 3, 4]);
        assert_eq!(&*registry.snapshot(), &[0, 1, 2, 3, 4]);

        let mut removed = Vec::new();
        registry.deregister_all(|id| removed.push(id));

        assert_eq!(removed, vec![4, 3, 2, 1, 0]);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_registering_twice_does_not_duplicate() {
        let mut registry = ChannelRegistry::new();
        registry.register_all(3, |_| {});

        let mut added = Vec::new();
        registry.register_all(3, |id| added.push(id));

        assert!(added.is_empty());
        assert_eq!(registry.len(), 3);
    }
}
