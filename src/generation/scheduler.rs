// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-levelbar project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Periodic tick scheduler
//!
//! A dedicated worker task owns a repeating timer and runs one tick body at a
//! time. Missed ticks are not dropped: when a tick body overruns, the pending
//! ticks run back-to-back until the worker has caught up. Stopping the
//! scheduler is acknowledged: [`Scheduler::stop`] returns only once the worker
//! has exited, after any tick that was already running has completed.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, warn};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// Work executed on every scheduler tick
pub trait TickHandler: Send + Sync + 'static {
    /// Run one tick. `tick` counts from 1 within a scheduler run.
    fn on_tick(&self, tick: u64);
}

/// Position in the level sequence, advanced before use.
///
/// Starting from 0, the first published block is therefore block 1; block 0
/// is only reached again after a full wraparound.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickCursor {
    position: usize,
}

impl TickCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance to the next block of a sequence of `len` blocks.
    ///
    /// Returns `None`, leaving the cursor untouched, when the sequence is empty.
    pub fn advance(&mut self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        self.position = (self.position + 1) % len;
        Some(self.position)
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn reset(&mut self) {
        self.position = 0;
    }
}

/// Handle on a running tick worker
#[derive(Debug)]
pub struct Scheduler {
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<u64>>,
}

impl Scheduler {
    /// Spawn the worker: first tick after `start_delay`, then every `period`.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if `period` is zero.
    pub fn start<H>(handler: Arc<H>, start_delay: Duration, period: Duration) -> Self
    where
        H: TickHandler,
    {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        debug!(
            "Starting scheduler: start delay {:?}, period {:?}",
            start_delay, period
        );

        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + start_delay, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Burst);
            let mut tick = 0u64;

            loop {
                tokio::select! {
                    // Shutdown wins over a simultaneously due tick
                    biased;

                    _ = &mut shutdown_rx => break,

                    _ = interval.tick() => {
                        tick += 1;
                        let outcome = catch_unwind(AssertUnwindSafe(|| handler.on_tick(tick)));
                        if outcome.is_err() {
                            error!("Scheduler tick {} failed, skipping it", tick);
                        }
                    }
                }
            }

            debug!("Scheduler worker stopped after {} ticks", tick);
            tick
        });

        Self {
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    /// Signal the worker to stop and wait until it has exited.
    ///
    /// Returns the number of ticks the worker ran.
    pub async fn stop(mut self) -> u64 {
        if let Some(shutdown) = self.shutdown.take() {
            // The worker may already be gone if it was aborted
            let _ = shutdown.send(());
        }

        match self.handle.take() {
            Some(handle) => match handle.await {
                Ok(ticks) => ticks,
                Err(e) => {
                    error!("Scheduler worker terminated abnormally: {}", e);
                    0
                }
            },
            None => 0,
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            warn!("Scheduler dropped without being stopped, aborting its worker");
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

    #[derive(Default)]
    struct CountingHandler {
        ticks: AtomicU64,
    }

    impl TickHandler for CountingHandler {
        fn on_tick(&self, _tick: u64) {
            self.ticks.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_cursor_pre_increments() {
        let mut cursor = TickCursor::new();

        assert_eq!(cursor.advance(3), Some(1));
        assert_eq!(cursor.advance(3), Some(2));
        assert_eq!(cursor.advance(3), Some(0));
        assert_eq!(cursor.advance(3), Some(1));

        assert_eq!(cursor.advance(0), None);
        assert_eq!(cursor.position(), 1);

        cursor.reset();
        assert_eq!(cursor.advance(1), Some(0));
    }

    #[tokio::test]
    async fn test_scheduler_ticks_until_stopped() {
        let handler = Arc::new(CountingHandler::default());
        let scheduler = Scheduler::start(
            handler.clone(),
            Duration::ZERO,
            Duration::from_millis(5),
        );

        time::sleep(Duration::from_millis(100)).await;
        let ticks = scheduler.stop().await;

        let counted = handler.ticks.load(Ordering::SeqCst);
        assert!(counted > 0, "no tick was executed");
        assert_eq!(ticks, counted);

        time::sleep(Duration::from_millis(30)).await;
        assert_eq!(handler.ticks.load(Ordering::SeqCst), counted);
    }

    #[tokio::test]
    async fn test_start_delay_is_honored() {
        let handler = Arc::new(CountingHandler::default());
        let scheduler = Scheduler::start(
            handler.clone(),
            Duration::from_secs(10),
            Duration::from_millis(1),
        );

        time::sleep(Duration::from_millis(50)).await;
        assert_eq!(scheduler.stop().await, 0);
        assert_eq!(handler.ticks.load(Ordering::SeqCst), 0);
    }

    struct SlowHandler {
        started: AtomicBool,
        finished: AtomicBool,
    }

    impl TickHandler for SlowHandler {
        fn on_tick(&self, _tick: u64) {
            self.started.store(true, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(100));
            self.finished.store(true, Ordering::SeqCst);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_stop_waits_for_in_flight_tick() {
        let handler = Arc::new(SlowHandler {
            started: AtomicBool::new(false),
            finished: AtomicBool::new(false),
        });
        let scheduler = Scheduler::start(
            handler.clone(),
            Duration::ZERO,
            Duration::from_secs(60),
        );

        while !handler.started.load(Ordering::SeqCst) {
            time::sleep(Duration::from_millis(1)).await;
        }

        scheduler.stop().await;
        assert!(handler.finished.load(Ordering::SeqCst));
    }

    struct PanickingHandler {
        ticks: AtomicU64,
    }

    impl TickHandler for PanickingHandler {
        fn on_tick(&self, tick: u64) {
            self.ticks.fetch_add(1, Ordering::SeqCst);
            if tick == 1 {
                panic!("bad tick");
            }
        }
    }

    #[tokio::test]
    async fn test_failed_tick_does_not_stop_the_feed() {
        let handler = Arc::new(PanickingHandler {
            ticks: AtomicU64::new(0),
        });
        let scheduler = Scheduler::start(
            handler.clone(),
            Duration::ZERO,
            Duration::from_millis(5),
        );

        time::sleep(Duration::from_millis(60)).await;
        scheduler.stop().await;

        assert!(handler.ticks.load(Ordering::SeqCst) > 1);
    }

    struct StallingHandler {
        ticks: AtomicU64,
    }

    impl TickHandler for StallingHandler {
        fn on_tick(&self, tick: u64) {
            self.ticks.fetch_add(1, Ordering::SeqCst);
            if tick == 1 {
                std::thread::sleep(Duration::from_millis(200));
            }
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_overrun_ticks_run_back_to_back() {
        let handler = Arc::new(StallingHandler {
            ticks: AtomicU64::new(0),
        });
        let scheduler = Scheduler::start(
            handler.clone(),
            Duration::ZERO,
            Duration::from_millis(10),
        );

        time::sleep(Duration::from_millis(300)).await;
        let ticks = scheduler.stop().await;

        // About 30 periods elapsed; the ~20 missed during the stall are caught up
        assert_eq!(ticks, handler.ticks.load(Ordering::SeqCst));
        assert!(ticks >= 24, "missed ticks were dropped: only {} ran", ticks);
    }
}
