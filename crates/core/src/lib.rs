//! Amooora Core - Shared access-control types.
//!
//! This crate provides the types shared by every Amooora component:
//! - `web` - Public site with the navigation shell and admin screens
//! - `cli` - Operator commands against the access directory
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no HTTP clients.
//! The backend that stores access records is reached through the
//! [`AccessDirectory`] trait, implemented by the web crate's backend client and
//! by in-memory fakes in tests.
//!
//! # Modules
//!
//! - [`types`] - User ids, roles, statuses, access records and capabilities
//! - [`directory`] - The access directory contract

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod directory;
pub mod types;

pub use directory::{AccessDirectory, DirectoryError};
pub use types::*;
