//! # Siphon
//!
//! A concurrent extract/transform/load pipeline runtime.
//!
//! ## Overview
//!
//! Siphon drives a three-stage pipeline:
//! - **Observe** (extract): fetch one unit of external data (HTTP, rendered
//!   HTTP, file, or SQL) and hand the response to a user callback.
//! - **Adapt** (transform): map a Finding emitted by a callback to zero or
//!   more downstream Observations or Exporters.
//! - **Export** (load): write a record to a sink resolved through the
//!   Session Registry.
//!
//! The Manager owns the three queues, schedules independently-sized worker
//! pools over them, de-duplicates observations by hash, and terminates once
//! the pipeline reaches a quiescent fixed point.
//!
//! ## Quick start
//!
//! ```no_run
//! use siphon::cmd::{run_pipeline, Cli};
//! use clap::Parser;
//!
//! #[tokio::main]
//! async fn main() -> siphon::Result<()> {
//!     Cli::load_dotenv();
//!     let cli = Cli::parse();
//!     cli.init_logging();
//!     let settings = siphon::config::Settings::from_path(&cli.settings)?;
//!     let _ = settings;
//!     // An external collaborator assembles a PipelineContext (observers,
//!     // adapters, sessions) and hands it to run_pipeline.
//!     Ok(())
//! }
//! ```

pub use errors::{PipelineError, Result};

pub mod adapter;
pub mod cmd;
pub mod config;
pub mod context;
pub mod errors;
pub mod item;
pub mod log;
pub mod observer;
pub mod pipeline;
pub mod session;
pub mod utils;
