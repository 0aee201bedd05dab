//! Archive-backed plugin host.
//!
//! Plugins ship as `.zip` archives in an archive directory. The host keeps
//! an extracted copy of each one in a cache directory, loads them through a
//! pluggable [`Loader`], and only registers the ones whose instances satisfy
//! the capability contract named in their metadata.
//!
//! - [`ContentHash`] / [`Identity`]: SHA-256 identities of archives and cached plugins
//! - [`PluginConfig`] / [`MetadataCodec`]: the `plugin.yml` metadata file
//! - [`index_archives`] / [`index_cache`]: rebuilding both indexes from disk
//! - [`plan`] / [`Reconciler`]: diffing the indexes and applying the diff
//! - [`CapabilityValidator`]: enforcing capability contracts
//! - [`PluginRegistry`]: validated plugins by name
//! - [`PluginHost`]: the aggregate tying it all together
//!
//! # Cache identity
//!
//! An extracted plugin is identified by the hash of the archive it came
//! from, written once into its metadata (`hash:`). Plugins marked `local`
//! have no archive; their identity is the digest of their metadata file and
//! they are never evicted.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use satchel_plugins::{FactoryLoader, InstanceHandle, PluginHost, PluginInstance};
//!
//! struct Hello;
//!
//! impl PluginInstance for Hello {
//!     fn operations(&self) -> Vec<String> {
//!         vec!["greet".into()]
//!     }
//! }
//!
//! let loader = FactoryLoader::new()
//!     .with_default("github.com/user/hello", |_| Ok(Arc::new(Hello) as InstanceHandle));
//! let mut host = PluginHost::new("./plugins", "./plugins-cache", loader);
//! host.register_type("greeter", ["greet"]);
//!
//! host.load_plugins()?;
//! for name in host.list_by_type("greeter") {
//!     let plugin = host.plugin(&name)?;
//!     assert!(plugin.downcast_ref::<Hello>().is_some());
//! }
//! # Ok::<(), satchel_plugins::PluginError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod contract;
pub mod error;
pub mod extract;
pub mod host;
pub mod identity;
pub mod index;
pub mod instance;
pub mod loader;
pub mod manifest;
pub mod reconcile;
pub mod registry;

pub use contract::{CapabilityContract, CapabilityValidator};
pub use error::{PluginError, PluginResult};
pub use extract::{Extractor, ZipExtractor};
pub use host::{LoadReport, PluginHost};
pub use identity::{ContentHash, Identity, LOCAL_PREFIX};
pub use index::{
    ARCHIVE_EXTENSION, ArchiveIndex, CacheIndex, CachedPluginEntry, index_archives, index_cache,
};
pub use instance::{InstanceHandle, PluginInstance, downcast_arc};
pub use loader::{DEFAULT_SYMBOL, FactoryLoader, Loader, PluginFactory};
pub use manifest::{MANIFEST_FILE_NAME, MetadataCodec, PluginConfig, YamlCodec, read_metadata};
pub use reconcile::{
    DIR_HASH_LEN, ReconcileOutcome, ReconcilePlan, Reconciler, extraction_dir_name, plan,
};
pub use registry::{INTERNAL_ROOT, PluginRecord, PluginRegistry, PluginState};
