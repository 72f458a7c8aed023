//! # MADDPG driver
//!
//! Training, benchmarking and display driver for multi-agent actor-critic
//! experiments on particle-world scenarios.
//!
//! ## Modules
//!
//! - [`env`] - Multi-agent environment interface, particle world, scenarios
//! - [`trainer`] - Per-agent trainer interface, replay buffer, random trainer
//! - [`training`] - Control loop, roster, reward ledger, pickle outputs
//! - [`checkpoint`] - Trainer state persistence
//! - [`render`] - Frame rasterisation and video recording
//! - [`ui`] - Terminal scene viewer
//! - [`config`] - TOML configuration loading and validation
//! - [`error`] - Structured error types

pub mod checkpoint;
pub mod config;
pub mod env;
pub mod error;
pub mod render;
pub mod trainer;
pub mod training;
pub mod ui;
