// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-levelbar project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use std::io::{IsTerminal, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use log::{debug, error, info};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time;

use crate::config::{Config, MonitorConfig};
use crate::generation::LevelBarGenerator;
use crate::monitor::LevelMonitor;

/// Period of the heartbeat log line
const HEARTBEAT_PERIOD: Duration = Duration::from_secs(10);

/// Runs the level generator and its consumers until shut down
pub struct Daemon {
    tasks: Vec<JoinHandle<Result<()>>>,
    running: watch::Sender<bool>,
    generator: Option<LevelBarGenerator>,
    monitor: Option<Arc<LevelMonitor>>,
    console_output: bool,
}

impl Default for Daemon {
    fn default() -> Self {
        Self::new()
    }
}

impl Daemon {
    /// Create a new daemon instance.
    ///
    /// Monitor frames are drawn on stdout only when it is a terminal.
    pub fn new() -> Self {
        let (running, _) = watch::channel(true);
        Daemon {
            tasks: Vec::new(),
            running,
            generator: None,
            monitor: None,
            console_output: std::io::stdout().is_terminal(),
        }
    }

    /// Force monitor frames on or off
    pub fn with_console_output(mut self, enabled: bool) -> Self {
        self.console_output = enabled;
        self
    }

    /// Build and connect the generator, then start the configured tasks
    pub async fn launch(&mut self, config: &Config) -> Result<()> {
        let generator = LevelBarGenerator::new(config.generator.clone());

        if config.monitor.enabled {
            let monitor = Arc::new(LevelMonitor::new(config.monitor.clone()));
            generator.subscribe_arc(monitor.clone());
            self.start_monitor(monitor.clone(), &config.monitor)?;
            self.monitor = Some(monitor);
        }

        info!(
            "Connecting level generator: {} channels, one block every {} ms after {} ms",
            config.generator.channel_count,
            config.generator.interval_ms,
            config.generator.start_delay_ms
        );
        let connected = generator
            .connect()
            .await
            .context("Failed to connect the level generator");
        self.generator = Some(generator.clone());
        connected?;

        // Start heartbeat task for monitoring
        self.start_heartbeat(generator)?;

        Ok(())
    }

    /// Start the render loop of the console monitor
    fn start_monitor(&mut self, monitor: Arc<LevelMonitor>, config: &MonitorConfig) -> Result<()> {
        if config.render_interval_ms == 0 {
            anyhow::bail!("Monitor render interval must be greater than zero");
        }
        debug!("Starting level monitor, rendering every {:?}", config.render_interval());

        let mut running = self.running.subscribe();
        let period = config.render_interval();
        let console_output = self.console_output;
        let task = tokio::spawn(async move {
            let mut ticker = time::interval(period);
            loop {
                tokio::select! {
                    changed = running.changed() => {
                        if changed.is_err() || !*running.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        monitor.render(Instant::now());
                        if console_output {
                            let status = monitor.status_line();
                            let frame = monitor.frame(true);
                            let mut stdout = std::io::stdout().lock();
                            // Home the cursor and clear the screen before each frame
                            if let Err(e) = write!(stdout, "\x1b[H\x1b[2J{}\n{}", status, frame)
                                .and_then(|_| stdout.flush())
                            {
                                return Err(anyhow::Error::new(e)
                                    .context("Failed to draw the monitor frame"));
                            }
                        }
                    }
                }
            }
            debug!("Level monitor stopped after {} frames", monitor.frames_rendered());
            Ok(())
        });

        self.tasks.push(task);
        Ok(())
    }

    /// Start a heartbeat task that logs generator status periodically
    fn start_heartbeat(&mut self, generator: LevelBarGenerator) -> Result<()> {
        debug!("Starting heartbeat monitor");

        let mut running = self.running.subscribe();
        let task = tokio::spawn(async move {
            let mut ticker = time::interval_at(time::Instant::now() + HEARTBEAT_PERIOD, HEARTBEAT_PERIOD);
            loop {
                tokio::select! {
                    changed = running.changed() => {
                        if changed.is_err() || !*running.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        info!(
                            "Daemon heartbeat: generator {}, {} level blocks published",
                            generator.state(),
                            generator.ticks_published()
                        );
                    }
                }
            }
            Ok(())
        });

        self.tasks.push(task);
        Ok(())
    }

    pub fn generator(&self) -> Option<&LevelBarGenerator> {
        self.generator.as_ref()
    }

    pub fn monitor(&self) -> Option<&Arc<LevelMonitor>> {
        self.monitor.as_ref()
    }

    /// Stop all running tasks
    pub fn shutdown(&self) {
        info!("Shutting down daemon tasks");
        self.running.send_replace(false);
    }

    /// Wait for all tasks to complete, then disconnect the generator
    pub async fn join(self) -> Result<()> {
        for task in self.tasks {
            match task.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("Task failed: {:#}", e),
                Err(e) => error!("Task panicked: {}", e),
            }
        }

        if let Some(generator) = self.generator {
            generator.disconnect().await;
            info!(
                "Level generator disconnected after {} published blocks",
                generator.ticks_published()
            );
        }
        Ok(())
    }
}
