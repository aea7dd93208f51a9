#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`spec`]: Wait specification (`WaitSpec`, `WaitSpecBuilder`, `WaitPurpose`)
//! - [`backoff`]: Poll interval schedule (`Backoff`)
//! - [`reader`]: Remote state abstraction (`ResourceReader`, `Observed`, `ReadError`)
//! - [`outcome`]: Terminal results (`WaitOutcome`, `WaitResult`, `WaitReport`)
//! - [`error`]: Wait errors (`WaitError`)
//! - [`waiter`]: The polling loop (`wait`, `wait_until`)
//!
//! # Architecture
//!
//! ```text
//! WaitSpec ──> wait() ──fetch(id)──> ResourceReader ──> remote API
//!                 │
//!           classify(status)
//!                 │
//!        sleep(min(interval, remaining)) <── CancellationToken
//!                 │
//!            WaitOutcome
//! ```

pub mod backoff;
pub mod error;
pub mod outcome;
pub mod reader;
pub mod spec;
pub mod waiter;

// --- Public API Re-exports ---

pub use backoff::Backoff;
pub use error::WaitError;
pub use outcome::{WaitOutcome, WaitReport, WaitResult};
pub use reader::{Observed, ReadError, ResourceReader, ResourceSnapshot};
pub use spec::{StateClass, WaitPurpose, WaitSpec, WaitSpecBuilder};
pub use waiter::{wait, wait_until};
