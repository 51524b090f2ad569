//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the domain core
//! depends on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IRemoteStore`] - Cloud drive listing, download and reparenting
//! - [`ILocalFileSystem`] - Existence checks and atomic writes
//! - [`ICursorStore`] - Persistence of the sync context
//! - [`IClock`] - Source of the cycle start instant
//! - [`IImageTransformer`] - Post-download resize/convert step

pub mod clock;
pub mod cursor_store;
pub mod image_transformer;
pub mod local_filesystem;
pub mod remote_store;

pub use clock::{IClock, SystemClock};
pub use cursor_store::ICursorStore;
pub use image_transformer::IImageTransformer;
pub use local_filesystem::ILocalFileSystem;
pub use remote_store::{IRemoteStore, ListPage, ProgressFn, RemoteError, Tokens};
