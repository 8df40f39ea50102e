//! genefuse-core library.
//!
//! Fuses pairs of gene rankings and measures how well rankings place held-out
//! true-positive genes.
//!
//! # Conventions
//!
//! - **Errors**: `thiserror` enums per module, wrapped by [`Error`] with stable
//!   [`ErrorCode`]s. Configuration loading returns `anyhow::Result`.
//! - **Logging**: `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).
#![forbid(unsafe_code)]

pub mod config;
pub mod distribute;
pub mod error;
pub mod eval;
pub mod fusion;
pub mod pipeline;
pub mod ranking;
pub mod store;

pub use error::{Error, ErrorCode};
