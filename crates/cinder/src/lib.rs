#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`error`]: Domain error types (`CinderError`)
//! - [`types`]: REST resource types (`Volume`, `VolumeType`, `QosSpecs`, `Service`, `Pool`)
//! - [`client`]: REST API abstraction (`BlockStorageClient` trait, `ReqwestBlockStorageClient`)
//! - [`capability`]: Capability negotiation (`CapabilitySet`, `ClientFactory`)
//! - [`reader`]: Waiter adapters (`VolumeReader`, `MigrationReader`)
//! - [`wait`]: Volume wait helpers (`wait_for_volume_status`, `wait_for_volume_deletion`)
//! - [`cleanup`]: Safe deletion helpers (`safe_delete_volume`, `delete_volume_type_safe`)
//! - [`host`]: `host@backend#pool` parsing (`HostTarget`)
//!
//! # Architecture
//!
//! ```text
//! ClientFactory.negotiate(required)
//!        │
//!        ▼
//! BlockStorageClient ──show_volume──> VolumeReader / MigrationReader
//!        │                                   │
//!        │                            powerprobe_waiter::wait
//!        ▼                                   │
//!   cleanup helpers <──────────── wait_for_volume_* helpers
//! ```

pub mod capability;
pub mod cleanup;
pub mod client;
pub mod error;
pub mod host;
pub mod reader;
pub mod types;
pub mod wait;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

// --- Public API Re-exports ---

// Client
pub use client::{BlockStorageClient, ReqwestBlockStorageClient};

// Capability negotiation
pub use capability::{Capability, CapabilitySet, ClientFactory};

// Error
pub use error::CinderError;

// Types
pub use types::{
    CreateVolumeRequest, CreateVolumeTypeRequest, Pool, PoolCapabilities, QosConsumer, QosSpecs,
    Service, Volume, VolumeType,
};

// Readers
pub use reader::{MigrationProgress, MigrationReader, VolumeReader};

// Waits
pub use wait::{
    migration_spec, volume_deletion_spec, volume_status_spec, wait_for_migration,
    wait_for_volume_deletion, wait_for_volume_status,
};

// Cleanup
pub use cleanup::{
    DeleteOutcome, TypeDeletePolicy, delete_volume_and_wait, delete_volume_type_safe,
    safe_delete_volume,
};

// Host strings
pub use host::HostTarget;
