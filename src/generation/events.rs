// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-levelbar project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Generator events and their synchronous delivery
//!
//! Listeners are registered on an [`EventPublisher`] and called in
//! subscription order, on the thread that emits the event, each one running
//! to completion before the next listener (and the next event) is served.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use log::error;
use tokio::sync::mpsc;

use super::levels::LevelBounds;
use super::registry::ChannelId;
use super::{GeneratorError, GeneratorState};

/// Levels of one published block
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelLevelData {
    /// Registered channel ids, index-aligned with `levels`
    pub channel_ids: Arc<[ChannelId]>,
    /// Raw level of each channel
    pub levels: Arc<[f32]>,
    /// Position of the block in the level sequence
    pub block_index: usize,
    /// Bounds of the activation the block belongs to
    pub bounds: LevelBounds,
    /// Publication time
    pub timestamp: DateTime<Utc>,
}

impl ChannelLevelData {
    /// `(channel id, raw level)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (ChannelId, f32)> + '_ {
        self.channel_ids
            .iter()
            .copied()
            .zip(self.levels.iter().copied())
    }

    /// Every level mapped to `[0, 1]` with the activation bounds
    pub fn transformed(&self) -> Result<Vec<f32>, GeneratorError> {
        self.levels
            .iter()
            .map(|level| self.bounds.transform(*level as f64))
            .collect()
    }
}

/// Notification emitted by the generator
#[derive(Debug, Clone, PartialEq)]
pub enum GeneratorEvent {
    /// A channel was registered while connecting
    ChannelAdded(ChannelId),
    /// A channel was deregistered while disconnecting
    ChannelRemoved(ChannelId),
    /// One level block was published by the scheduler
    ChannelLevelDataReceived(ChannelLevelData),
    /// The generator entered a new state
    GeneratorStateChanged(GeneratorState),
}

impl GeneratorEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            GeneratorEvent::ChannelAdded(_) => "ChannelAdded",
            GeneratorEvent::ChannelRemoved(_) => "ChannelRemoved",
            GeneratorEvent::ChannelLevelDataReceived(_) => "ChannelLevelDataReceived",
            GeneratorEvent::GeneratorStateChanged(_) => "GeneratorStateChanged",
        }
    }
}

/// Receiver of generator events.
///
/// Implemented for every `Fn(&GeneratorEvent) + Send + Sync` closure.
pub trait GeneratorListener: Send + Sync {
    fn on_event(&self, event: &GeneratorEvent);
}

impl<F> GeneratorListener for F
where
    F: Fn(&GeneratorEvent) + Send + Sync,
{
    fn on_event(&self, event: &GeneratorEvent) {
        self(event)
    }
}

/// Handle returned by a subscription, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type ListenerEntry = (ListenerId, Arc<dyn GeneratorListener>);

/// Registry of listeners receiving every event exactly once, in emission order
#[derive(Default)]
pub struct EventPublisher {
    listeners: RwLock<Vec<ListenerEntry>>,
    next_id: AtomicU64,
}

impl fmt::Debug for EventPublisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventPublisher")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl EventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener
    pub fn subscribe<L>(&self, listener: L) -> ListenerId
    where
        L: GeneratorListener + 'static,
    {
        self.subscribe_arc(Arc::new(listener))
    }

    /// Register a listener that is shared with other owners
    pub fn subscribe_arc(&self, listener: Arc<dyn GeneratorListener>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));
        id
    }

    /// Register a listener forwarding every event into an unbounded channel.
    ///
    /// Events keep their emission order. Once the receiver is dropped the
    /// events are discarded until the listener is unsubscribed.
    pub fn subscribe_channel(&self) -> (ListenerId, mpsc::UnboundedReceiver<GeneratorEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = self.subscribe(move |event: &GeneratorEvent| {
            // A closed receiver is not an error for the publisher
            let _ = sender.send(event.clone());
        });
        (id, receiver)
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Deliver `event` to every listener, in subscription order.
    ///
    /// The listener list is snapshotted first, so listeners may subscribe or
    /// unsubscribe from within a callback. A panicking listener is reported
    /// and skipped; the remaining listeners still receive the event.
    /// Returns the number of listeners that failed.
    pub fn publish(&self, event: &GeneratorEvent) -> usize {
        let listeners: Vec<ListenerEntry> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let mut failures = 0;
        for (id, listener) in listeners {
            if catch_unwind(AssertUnwindSafe(|| listener.on_event(event))).is_err() {
                failures += 1;
                error!(
                    "Listener {:?} panicked while handling a {} event",
                    id,
                    event.kind()
                );
            }
        }
        failures
    }
}
