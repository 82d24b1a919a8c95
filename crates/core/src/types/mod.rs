//! Core types for Amooora.
//!
//! This module provides type-safe wrappers for access-control concepts.

pub mod access;
pub mod capabilities;
pub mod id;
pub mod status;

pub use access::{AccessRecord, AccessState, filter_records};
pub use capabilities::{Capabilities, capabilities};
pub use id::UserId;
pub use status::*;
