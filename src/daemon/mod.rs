// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-levelbar project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! # Daemon Module
//!
//! The daemon module runs the level generator as a long-lived service, together
//! with the tasks consuming its output.
//!
//! ## Components
//!
//! * **Launch Daemon**: starts the generator, the console monitor render loop
//!   and a heartbeat task, then shuts them down in order
//!
//! ## Usage
//!
//! ```no_run
//! use rust_levelbar::{config::Config, daemon::Daemon};
//!
//! async fn run() -> anyhow::Result<()> {
//!     let config = Config::from_file("config.yaml")?;
//!
//!     // Create and launch daemon
//!     let mut daemon = Daemon::new();
//!     daemon.launch(&config).await?;
//!
//!     // Wait for shutdown signal (e.g., Ctrl+C)
//!     tokio::signal::ctrl_c().await?;
//!
//!     // Clean shutdown: stops the tasks, then disconnects the generator
//!     daemon.shutdown();
//!     daemon.join().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod launch_daemon;

pub use launch_daemon::Daemon;
