//! Amooora web library.
//!
//! Server-rendered site with a session-aware navigation shell, a sign-in
//! prompt and the admin user management screen. Identity, access records and
//! account deletion live in the hosted backend ([`backend`]); this crate keeps
//! only per-session state.
//!
//! The crate is a library so the binary, the operator CLI and the integration
//! tests share the same code.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod access;
pub mod backend;
pub mod config;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod routes;
pub mod screens;
pub mod services;
pub mod session;
pub mod shell;
pub mod state;
