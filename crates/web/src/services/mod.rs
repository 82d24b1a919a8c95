//! Operations shared by the web screens and the operator CLI.

pub mod accounts;

pub use accounts::{DeleteError, DeleteReport, delete_accounts};
