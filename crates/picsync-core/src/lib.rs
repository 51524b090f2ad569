//! picsync Core - Domain logic and port definitions
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `RemoteFileDescriptor`, `SyncCursor`, `BackupContainer`,
//!   `SyncContext`, `CycleState`, `CycleReport`
//! - **Port definitions** - Traits for adapters: `IRemoteStore`, `ILocalFileSystem`,
//!   `ICursorStore`, `IClock`, `IImageTransformer`
//! - **Configuration** - The YAML configuration file model
//!
//! # Architecture
//!
//! The domain module contains pure business logic with no I/O.
//! Ports define trait interfaces that adapter crates implement; the sync
//! crate drives them to run a cycle.

pub mod config;
pub mod domain;
pub mod ports;
