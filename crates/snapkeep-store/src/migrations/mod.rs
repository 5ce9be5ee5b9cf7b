//! Migration framework
//!
//! Provides:
//! - Migration runner with checksums and tamper detection
//! - Idempotent application
//! - Embedded SQL migrations

mod checksums;
mod embedded;
mod runner;

pub use embedded::{get_migrations, Migration};
pub use runner::apply_migrations;
