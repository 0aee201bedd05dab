//! Satchel Test - Shared test utilities for the plugin host.
//!
//! This crate provides archive and cache fixtures plus mock collaborators
//! that integration tests across the workspace can use as a dev-dependency.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! satchel-test.workspace = true
//! ```
//!
//! ```rust,ignore
//! use satchel_test::{ArchiveBuilder, MockLoader, TestDirs};
//!
//! let dirs = TestDirs::new()?;
//! ArchiveBuilder::new()
//!     .with_folder("hello")
//!     .with_metadata(&PluginConfig::new("hello", "greeter", "example.com/hello"))?
//!     .write_to(&dirs.archives.join("hello.zip"))?;
//!
//! let loader = MockLoader::new().with_plugin("example.com/hello", ["greet"]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod fixtures;
pub mod mocks;

pub use fixtures::*;
pub use mocks::*;

/// Install a test-friendly tracing subscriber.
///
/// Honors `RUST_LOG`, writes through the test harness capture, and is safe
/// to call from every test.
pub fn init_test_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("satchel_plugins=debug"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
