// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-levelbar project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Synthetic multi-channel level generator
//!
//! [`LevelBarGenerator`] stands in for a real acquisition device. On
//! [`connect`](LevelBarGenerator::connect) it synthesizes a finite sequence of
//! per-channel level blocks, registers its channels and starts a periodic
//! scheduler that publishes one block per tick, cycling through the sequence
//! until [`disconnect`](LevelBarGenerator::disconnect).
//!
//! Every notification goes through the generator's [`EventPublisher`]:
//!
//! ```no_run
//! use rust_levelbar::config::GeneratorConfig;
//! use rust_levelbar::generation::{GeneratorEvent, LevelBarGenerator};
//!
//! # async fn run() -> Result<(), rust_levelbar::generation::GeneratorError> {
//! let generator = LevelBarGenerator::new(GeneratorConfig::default());
//! generator.subscribe(|event: &GeneratorEvent| println!("{:?}", event.kind()));
//!
//! generator.connect().await?;
//! // ... level blocks are published every 4 ms after a 1 s delay
//! generator.disconnect().await;
//! # Ok(())
//! # }
//! ```

mod error;
pub mod events;
pub mod levels;
pub mod registry;
pub mod scheduler;
pub mod waveform;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::Utc;
use log::{debug, info, warn};
use tokio::sync::watch;

use crate::config::GeneratorConfig;

pub use error::GeneratorError;
pub use events::{
    ChannelLevelData, EventPublisher, GeneratorEvent, GeneratorListener, ListenerId,
};
pub use levels::{peak_level, LevelBounds, LevelSequence};
pub use registry::{ChannelId, ChannelRegistry};
pub use scheduler::{Scheduler, TickCursor, TickHandler};
pub use waveform::WaveformSynthesizer;

/// Activation state of the generator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeneratorState {
    Stopped,
    Running,
}

impl fmt::Display for GeneratorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeneratorState::Stopped => write!(f, "stopped"),
            GeneratorState::Running => write!(f, "running"),
        }
    }
}

/// Data valid for exactly one connect/disconnect cycle
#[derive(Debug)]
struct Activation {
    sequence: LevelSequence,
    bounds: LevelBounds,
    channel_ids: Arc<[ChannelId]>,
}

/// State shared between the generator handle and its scheduler worker
#[derive(Debug)]
struct Shared {
    config: GeneratorConfig,
    publisher: EventPublisher,
    state: watch::Sender<GeneratorState>,
    activation: RwLock<Option<Arc<Activation>>>,
    // Held for the whole tick body, so ticks never overlap
    cursor: Mutex<TickCursor>,
    published: AtomicU64,
}

impl Shared {
    fn current_activation(&self) -> Option<Arc<Activation>> {
        self.activation
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_activation(&self, activation: Option<Arc<Activation>>) {
        *self
            .activation
            .write()
            .unwrap_or_else(PoisonError::into_inner) = activation;
    }

    fn set_state(&self, state: GeneratorState) {
        self.state.send_replace(state);
        info!("Level generator {}", state);
        self.publisher
            .publish(&GeneratorEvent::GeneratorStateChanged(state));
    }
}

impl TickHandler for Shared {
    fn on_tick(&self, tick: u64) {
        let mut cursor = self.cursor.lock().unwrap_or_else(PoisonError::into_inner);

        let Some(activation) = self.current_activation() else {
            return;
        };
        let Some(index) = cursor.advance(activation.sequence.len()) else {
            return;
        };
        let Some(levels) = activation.sequence.block(index) else {
            return;
        };

        let data = ChannelLevelData {
            channel_ids: activation.channel_ids.clone(),
            levels: levels.clone(),
            block_index: index,
            bounds: activation.bounds,
            timestamp: Utc::now(),
        };
        self.publisher
            .publish(&GeneratorEvent::ChannelLevelDataReceived(data));

        let published = self.published.fetch_add(1, Ordering::Relaxed) + 1;
        if tick % 1000 == 0 {
            debug!(
                "Tick {}: published block {} ({} blocks since start)",
                tick, index, published
            );
        }
    }
}

#[derive(Debug, Default)]
struct Lifecycle {
    registry: ChannelRegistry,
    scheduler: Option<Scheduler>,
}

/// Synthetic level source.
///
/// The handle is cheap to clone; every clone drives the same generator.
/// [`connect`](Self::connect) and [`disconnect`](Self::disconnect) are
/// serialized against each other and may be called from any task.
#[derive(Debug, Clone)]
pub struct LevelBarGenerator {
    shared: Arc<Shared>,
    lifecycle: Arc<tokio::sync::Mutex<Lifecycle>>,
}

impl LevelBarGenerator {
    /// Create a stopped generator. The configuration is validated on connect.
    pub fn new(config: GeneratorConfig) -> Self {
        let (state, _) = watch::channel(GeneratorState::Stopped);
        Self {
            shared: Arc::new(Shared {
                config,
                publisher: EventPublisher::new(),
                state,
                activation: RwLock::new(None),
                cursor: Mutex::new(TickCursor::new()),
                published: AtomicU64::new(0),
            }),
            lifecycle: Arc::new(tokio::sync::Mutex::new(Lifecycle::default())),
        }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.shared.config
    }

    /// Event registry of this generator
    pub fn events(&self) -> &EventPublisher {
        &self.shared.publisher
    }

    /// Register a listener for every future event
    pub fn subscribe<L>(&self, listener: L) -> ListenerId
    where
        L: GeneratorListener + 'static,
    {
        self.shared.publisher.subscribe(listener)
    }

    pub fn subscribe_arc(&self, listener: Arc<dyn GeneratorListener>) -> ListenerId {
        self.shared.publisher.subscribe_arc(listener)
    }

    /// Receive every future event through an unbounded channel
    pub fn subscribe_channel(
        &self,
    ) -> (ListenerId, tokio::sync::mpsc::UnboundedReceiver<GeneratorEvent>) {
        self.shared.publisher.subscribe_channel()
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.shared.publisher.unsubscribe(id)
    }

    pub fn state(&self) -> GeneratorState {
        *self.shared.state.borrow()
    }

    /// Receiver notified on every state transition
    pub fn watch_state(&self) -> watch::Receiver<GeneratorState> {
        self.shared.state.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.state() == GeneratorState::Running
    }

    /// Bounds of the current activation, if connected
    pub fn bounds(&self) -> Option<LevelBounds> {
        self.shared
            .current_activation()
            .map(|activation| activation.bounds)
    }

    /// Number of level blocks published since the generator was created
    pub fn ticks_published(&self) -> u64 {
        self.shared.published.load(Ordering::Relaxed)
    }

    /// Activate the generator.
    ///
    /// Synthesizes a fresh level sequence, emits one `ChannelAdded` per channel
    /// in ascending order, then `GeneratorStateChanged(Running)`, and starts
    /// publishing one block per tick after the configured start delay.
    /// Connecting a running generator logs a warning and does nothing.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Configuration errors, or a sequence whose bounds cannot normalize
    /// levels. The generator stays stopped and no event is emitted.
    pub async fn connect(&self) -> Result<(), GeneratorError> {
        let mut lifecycle = self.lifecycle.lock().await;

        if self.is_running() {
            warn!("Connect requested while the generator is already running, ignoring");
            return Ok(());
        }

        let config = self.shared.config.clone();
        config.validate()?;

        let synthesis_config = config.clone();
        let sequence = tokio::task::spawn_blocking(move || {
            WaveformSynthesizer::new(synthesis_config).synthesize()
        })
        .await
        .map_err(|e| GeneratorError::Synthesis(e.to_string()))??;
        let bounds = sequence.bounds()?;

        info!(
            "Synthesized {} level blocks for {} channels, levels in [{:.6}, {:.6}]",
            sequence.len(),
            config.channel_count,
            bounds.min(),
            bounds.max()
        );

        let publisher = &self.shared.publisher;
        lifecycle.registry.register_all(config.channel_count, |channel| {
            publisher.publish(&GeneratorEvent::ChannelAdded(channel));
        });

        self.shared.set_activation(Some(Arc::new(Activation {
            sequence,
            bounds,
            channel_ids: lifecycle.registry.snapshot(),
        })));
        self.shared
            .cursor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .reset();

        self.shared.set_state(GeneratorState::Running);

        lifecycle.scheduler = Some(Scheduler::start(
            self.shared.clone(),
            config.start_delay(),
            config.interval(),
        ));

        Ok(())
    }

    /// Deactivate the generator.
    ///
    /// Stops the scheduler and waits for a tick in progress to complete, then
    /// emits one `ChannelRemoved` per channel in descending order followed by
    /// `GeneratorStateChanged(Stopped)`. The level sequence and its bounds are
    /// discarded. Disconnecting a stopped generator logs a warning and does
    /// nothing.
    pub async fn disconnect(&self) {
        let mut lifecycle = self.lifecycle.lock().await;

        if !self.is_running() {
            warn!("Disconnect requested while the generator is already stopped, ignoring");
            return;
        }

        if let Some(scheduler) = lifecycle.scheduler.take() {
            let ticks = scheduler.stop().await;
            debug!("Scheduler stopped after {} ticks", ticks);
        }

        self.shared.set_activation(None);

        let publisher = &self.shared.publisher;
        lifecycle.registry.deregister_all(|channel| {
            publisher.publish(&GeneratorEvent::ChannelRemoved(channel));
        });

        self.shared.set_state(GeneratorState::Stopped);
    }

    /// Map a raw level to `[0, 1]` using the bounds of the current activation.
    ///
    /// # Errors
    ///
    /// [`GeneratorError::BoundsUnavailable`] when the generator is not
    /// connected, [`GeneratorError::InvalidLevel`] when `level` is not
    /// strictly positive.
    pub fn transform_level_value(&self, level: f64) -> Result<f32, GeneratorError> {
        self.bounds()
            .ok_or(GeneratorError::BoundsUnavailable)?
            .transform(level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn fast_config(channel_count: usize) -> GeneratorConfig {
        GeneratorConfig {
            channel_count,
            interval_ms: 1,
            start_delay_ms: 0,
            sampling_time: 0.05,
            seed: Some(7),
            ..Default::default()
        }
    }

    fn lifecycle_events(events: &[GeneratorEvent]) -> Vec<GeneratorEvent> {
        events
            .iter()
            .filter(|event| !matches!(event, GeneratorEvent::ChannelLevelDataReceived(_)))
            .cloned()
            .collect()
    }

    fn drain(
        receiver: &mut tokio::sync::mpsc::UnboundedReceiver<GeneratorEvent>,
    ) -> Vec<GeneratorEvent> {
        let mut events = Vec::new();
        while let Ok(event) = receiver.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_tick_without_activation_publishes_nothing() {
        let generator = LevelBarGenerator::new(fast_config(4));
        let (_, mut receiver) = generator.subscribe_channel();

        generator.shared.on_tick(1);
        generator.shared.on_tick(2);

        assert!(drain(&mut receiver).is_empty());
        assert_eq!(generator.ticks_published(), 0);
        assert_eq!(generator.shared.cursor.lock().unwrap().position(), 0);
    }

    #[tokio::test]
    async fn test_connect_disconnect_event_order() {
        let generator = LevelBarGenerator::new(GeneratorConfig {
            start_delay_ms: 60_000,
            ..fast_config(4)
        });
        let (_, mut receiver) = generator.subscribe_channel();

        generator.connect().await.unwrap();
        assert_eq!(generator.state(), GeneratorState::Running);
        generator.disconnect().await;
        assert_eq!(generator.state(), GeneratorState::Stopped);

        let events = lifecycle_events(&drain(&mut receiver));
        assert_eq!(
            events,
            vec![
                GeneratorEvent::ChannelAdded(0),
                GeneratorEvent::ChannelAdded(1),
                GeneratorEvent::ChannelAdded(2),
                GeneratorEvent::ChannelAdded(3),
                GeneratorEvent::GeneratorStateChanged(GeneratorState::Running),
                GeneratorEvent::ChannelRemoved(3),
                GeneratorEvent::ChannelRemoved(2),
                GeneratorEvent::ChannelRemoved(1),
                GeneratorEvent::ChannelRemoved(0),
                GeneratorEvent::GeneratorStateChanged(GeneratorState::Stopped),
            ]
        );
    }

    #[tokio::test]
    async fn test_repeated_transitions_are_no_ops() {
        let generator = LevelBarGenerator::new(GeneratorConfig {
            start_delay_ms: 60_000,
            ..fast_config(3)
        });
        let (_, mut receiver) = generator.subscribe_channel();

        generator.disconnect().await;
        assert!(drain(&mut receiver).is_empty());

        generator.connect().await.unwrap();
        generator.connect().await.unwrap();
        assert_eq!(lifecycle_events(&drain(&mut receiver)).len(), 4);

        generator.disconnect().await;
        generator.disconnect().await;
        assert_eq!(lifecycle_events(&drain(&mut receiver)).len(), 4);
    }

    #[tokio::test]
    async fn test_first_published_block_is_index_one() {
        let generator = LevelBarGenerator::new(fast_config(5));
        let (_, mut receiver) = generator.subscribe_channel();

        generator.connect().await.unwrap();

        let first = loop {
            let event = tokio::time::timeout(Duration::from_secs(5), receiver.recv())
                .await
                .expect("no level data published")
                .unwrap();
            if let GeneratorEvent::ChannelLevelDataReceived(data) = event {
                break data;
            }
        };
        generator.disconnect().await;

        assert_eq!(first.block_index, 1);
        assert_eq!(&*first.channel_ids, &[0, 1, 2, 3, 4]);
        assert_eq!(first.levels.len(), 5);
        assert!(generator.ticks_published() >= 1);
    }

    #[tokio::test]
    async fn test_reconnect_restarts_at_block_one() {
        let generator = LevelBarGenerator::new(GeneratorConfig {
            start_delay_ms: 60_000,
            ..fast_config(3)
        });
        let (_, mut receiver) = generator.subscribe_channel();

        let block_indices = |events: Vec<GeneratorEvent>| -> Vec<usize> {
            events
                .into_iter()
                .filter_map(|event| match event {
                    GeneratorEvent::ChannelLevelDataReceived(data) => Some(data.block_index),
                    _ => None,
                })
                .collect()
        };

        generator.connect().await.unwrap();
        for tick in 1..=3 {
            generator.shared.on_tick(tick);
        }
        generator.disconnect().await;
        assert_eq!(block_indices(drain(&mut receiver)), vec![1, 2, 3]);

        // The position is not carried over to the next activation
        generator.connect().await.unwrap();
        generator.shared.on_tick(1);
        generator.disconnect().await;
        assert_eq!(block_indices(drain(&mut receiver)), vec![1]);
    }

    #[tokio::test]
    async fn test_no_level_data_after_disconnect() {
        let generator = LevelBarGenerator::new(fast_config(6));
        let (_, mut receiver) = generator.subscribe_channel();

        generator.connect().await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        generator.disconnect().await;

        let events = drain(&mut receiver);
        let stopped = events
            .iter()
            .position(|event| matches!(event, GeneratorEvent::ChannelRemoved(5)))
            .unwrap();
        assert!(events[stopped..]
            .iter()
            .all(|event| !matches!(event, GeneratorEvent::ChannelLevelDataReceived(_))));

        let published = generator.ticks_published();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(generator.ticks_published(), published);
        assert!(drain(&mut receiver).is_empty());
    }

    #[tokio::test]
    async fn test_transform_requires_activation() {
        let generator = LevelBarGenerator::new(GeneratorConfig {
            start_delay_ms: 60_000,
            ..fast_config(40)
        });
        assert_eq!(
            generator.transform_level_value(0.05),
            Err(GeneratorError::BoundsUnavailable)
        );

        generator.connect().await.unwrap();
        let bounds = generator.bounds().unwrap();
        assert_eq!(
            generator.transform_level_value(bounds.min() as f64).unwrap(),
            0.0
        );
        assert!((generator.transform_level_value(bounds.max() as f64).unwrap() - 1.0).abs() < 1e-6);
        assert_eq!(
            generator.transform_level_value(0.0),
            Err(GeneratorError::InvalidLevel(0.0))
        );

        generator.disconnect().await;
        assert!(generator.bounds().is_none());
    }

    #[tokio::test]
    async fn test_invalid_configuration_keeps_generator_stopped() {
        let generator = LevelBarGenerator::new(GeneratorConfig {
            interval_ms: 0,
            ..fast_config(4)
        });
        let (_, mut receiver) = generator.subscribe_channel();

        assert_eq!(generator.connect().await, Err(GeneratorError::ZeroInterval));
        assert_eq!(generator.state(), GeneratorState::Stopped);
        assert!(drain(&mut receiver).is_empty());
    }

    #[tokio::test]
    async fn test_watch_state() {
        let generator = LevelBarGenerator::new(GeneratorConfig {
            start_delay_ms: 60_000,
            ..fast_config(2)
        });
        let mut state = generator.watch_state();
        assert_eq!(*state.borrow(), GeneratorState::Stopped);

        let handle = generator.clone();
        tokio::spawn(async move { handle.connect().await });

        state.changed().await.unwrap();
        assert_eq!(*state.borrow_and_update(), GeneratorState::Running);
        generator.disconnect().await;
        assert_eq!(*state.borrow(), GeneratorState::Stopped);
    }
}
