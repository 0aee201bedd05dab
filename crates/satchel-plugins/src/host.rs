//! The plugin host.
//!
//! [`PluginHost`] owns the collaborators (extractor, metadata codec,
//! loader), the capability contracts, and the registry. A load pass runs
//! synchronously on the caller's thread:
//!
//! 1. index the archive and cache directories
//! 2. extract new archives, then evict stale plugins
//! 3. load, validate and register every live cache entry in path order
//!
//! Mutating calls take `&mut self` and queries take `&self`, so the borrow
//! checker keeps a load pass and a query from overlapping.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::contract::{CapabilityContract, CapabilityValidator};
use crate::error::{PluginError, PluginResult};
use crate::extract::{Extractor, ZipExtractor};
use crate::index::{ArchiveIndex, CacheIndex, CachedPluginEntry, index_archives, index_cache};
use crate::instance::InstanceHandle;
use crate::loader::{DEFAULT_SYMBOL, Loader};
use crate::manifest::{MetadataCodec, PluginConfig, YamlCodec, read_metadata};
use crate::reconcile::{ReconcileOutcome, ReconcilePlan, Reconciler, plan};
use crate::registry::{INTERNAL_ROOT, PluginRecord, PluginRegistry, PluginState};

/// Summary of a completed load pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Plugins extracted from new archives.
    pub extracted: Vec<CachedPluginEntry>,
    /// Plugin directories removed because their archive is gone.
    pub evicted: Vec<PathBuf>,
    /// Names registered by this pass, in load order.
    pub registered: Vec<String>,
    /// Names from earlier passes that this pass no longer produced.
    pub pruned: Vec<String>,
}

/// Hosts archive-backed plugins.
pub struct PluginHost {
    archive_dir: PathBuf,
    cache_dir: PathBuf,
    symbol: String,
    extractor: Box<dyn Extractor>,
    codec: Box<dyn MetadataCodec>,
    loader: Box<dyn Loader>,
    validator: CapabilityValidator,
    registry: PluginRegistry,
}

impl fmt::Debug for PluginHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginHost")
            .field("archive_dir", &self.archive_dir)
            .field("cache_dir", &self.cache_dir)
            .field("symbol", &self.symbol)
            .field("capabilities", &self.validator.names())
            .field("plugins", &self.registry.len())
            .finish_non_exhaustive()
    }
}

impl PluginHost {
    /// Create a host over `archive_dir` and `cache_dir`.
    ///
    /// Nothing is touched on disk until a pass runs. Empty paths are
    /// accepted here and rejected by the first pass.
    #[must_use]
    pub fn new(
        archive_dir: impl Into<PathBuf>,
        cache_dir: impl Into<PathBuf>,
        loader: impl Loader + 'static,
    ) -> Self {
        Self {
            archive_dir: archive_dir.into(),
            cache_dir: cache_dir.into(),
            symbol: DEFAULT_SYMBOL.to_string(),
            extractor: Box::new(ZipExtractor),
            codec: Box::new(YamlCodec),
            loader: Box::new(loader),
            validator: CapabilityValidator::new(),
            registry: PluginRegistry::new(),
        }
    }

    /// Replace the archive extractor.
    #[must_use]
    pub fn with_extractor(mut self, extractor: impl Extractor + 'static) -> Self {
        self.extractor = Box::new(extractor);
        self
    }

    /// Replace the metadata codec.
    #[must_use]
    pub fn with_codec(mut self, codec: impl MetadataCodec + 'static) -> Self {
        self.codec = Box::new(codec);
        self
    }

    /// Set the symbol the loader resolves in each plugin.
    #[must_use]
    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = symbol.into();
        self
    }

    /// Register an initial set of capability contracts.
    #[must_use]
    pub fn with_contracts(
        mut self,
        contracts: impl IntoIterator<Item = CapabilityContract>,
    ) -> Self {
        for contract in contracts {
            self.validator.register(contract);
        }
        self
    }

    /// The archive directory.
    #[must_use]
    pub fn archive_dir(&self) -> &Path {
        &self.archive_dir
    }

    /// The cache directory.
    #[must_use]
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// The symbol resolved in each plugin.
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Register a capability type from its operation names.
    pub fn register_type<I, S>(&mut self, name: impl Into<String>, operations: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.validator.register(CapabilityContract::new(name, operations));
    }

    /// Register a capability contract.
    pub fn register_contract(&mut self, contract: CapabilityContract) {
        self.validator.register(contract);
    }

    /// The registered contract for `capability`, if any.
    #[must_use]
    pub fn contract(&self, capability: &str) -> Option<&CapabilityContract> {
        self.validator.get(capability)
    }

    /// Index both directories without changing anything.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::MissingDirectoryConfig`] if a directory path is
    /// empty, or any indexing error.
    pub fn index(&self) -> PluginResult<(ArchiveIndex, CacheIndex)> {
        self.check_dirs()?;
        let archives = index_archives(&self.archive_dir)?;
        let cache = index_cache(&self.cache_dir, self.codec.as_ref())?;
        Ok((archives, cache))
    }

    /// Compute what a pass would extract and evict (dry run).
    ///
    /// # Errors
    ///
    /// Same as [`index`](Self::index).
    pub fn plan(&self) -> PluginResult<ReconcilePlan> {
        let (archives, cache) = self.index()?;
        Ok(plan(&archives, &cache))
    }

    /// Bring the cache in line with the archives without loading anything.
    ///
    /// # Errors
    ///
    /// Returns the first indexing, extraction or I/O error. Mutations made
    /// before the failure stay on disk.
    pub fn reconcile(&mut self) -> PluginResult<ReconcileOutcome> {
        let (archives, cache) = self.index()?;
        let plan = plan(&archives, &cache);
        if plan.is_empty() {
            debug!(cache = %self.cache_dir.display(), "Plugin cache is up to date");
        } else {
            info!(
                extract = plan.to_extract.len(),
                evict = plan.to_evict.len(),
                "Reconciling plugin cache"
            );
        }
        Reconciler::new(&self.cache_dir, self.extractor.as_ref(), self.codec.as_ref())
            .apply(&plan, cache)
    }

    /// Run one full pass: reconcile, then load and register every plugin.
    ///
    /// Each plugin is queryable as soon as it is registered. The first
    /// failure ends the pass; plugins registered before it stay. Plugins
    /// registered by an earlier pass but absent from this one are dropped
    /// once the pass completes. Internal plugins are never dropped.
    ///
    /// # Errors
    ///
    /// Returns the first reconciliation, metadata, load or validation error.
    pub fn load_plugins(&mut self) -> PluginResult<LoadReport> {
        let outcome = self.reconcile()?;

        let mut registered = Vec::with_capacity(outcome.entries.len());
        for entry in &outcome.entries {
            match self.load_entry(entry) {
                Ok(name) => registered.push(name),
                Err(e) => {
                    warn!(
                        metadata = %entry.metadata_path.display(),
                        state = %PluginState::Failed(e.to_string()),
                        "Plugin load pass aborted"
                    );
                    return Err(e);
                },
            }
        }

        let keep: BTreeSet<String> = registered.iter().cloned().collect();
        let pruned = self.registry.prune(&keep);

        info!(
            extracted = outcome.extracted.len(),
            evicted = outcome.evicted.len(),
            registered = registered.len(),
            pruned = pruned.len(),
            "Plugin load pass complete"
        );

        Ok(LoadReport {
            extracted: outcome.extracted,
            evicted: outcome.evicted,
            registered,
            pruned,
        })
    }

    /// Register a plugin supplied by the host process itself.
    ///
    /// The plugin is marked internal, rooted at `internal/<name>`, and
    /// validated like any other. The archive and cache directories are not
    /// touched. An archive plugin of the same name takes its place while
    /// that archive is present; the internal plugin is restored once a pass
    /// drops it.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::ConfigDecode`] if `name` or `type` is empty,
    /// or a validation error if the instance does not satisfy its contract.
    pub fn register_internal(
        &mut self,
        instance: InstanceHandle,
        mut config: PluginConfig,
    ) -> PluginResult<()> {
        let root = Path::new(INTERNAL_ROOT).join(&config.name);
        config.validate(&root)?;
        config.internal = true;

        self.validator
            .validate(&config.name, instance.as_ref(), &config.capability_type)?;
        self.registry.insert(PluginRecord {
            config,
            root,
            instance,
        });
        Ok(())
    }

    /// Names of all registered plugins, sorted.
    #[must_use]
    pub fn list(&self) -> BTreeSet<String> {
        self.registry.names()
    }

    /// Names of registered plugins of one capability type, sorted.
    ///
    /// Empty for an unknown type.
    #[must_use]
    pub fn list_by_type(&self, capability: &str) -> BTreeSet<String> {
        self.registry.names_by_type(capability)
    }

    /// The instance registered under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<InstanceHandle> {
        self.registry.instance(name)
    }

    /// The instance registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::NoSuchPlugin`] if nothing is registered under
    /// `name`.
    pub fn plugin(&self, name: &str) -> PluginResult<InstanceHandle> {
        self.get(name)
            .ok_or_else(|| PluginError::NoSuchPlugin(name.to_string()))
    }

    /// The full record registered under `name`.
    #[must_use]
    pub fn record(&self, name: &str) -> Option<&PluginRecord> {
        self.registry.get(name)
    }

    /// The registry.
    #[must_use]
    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    fn check_dirs(&self) -> PluginResult<()> {
        if self.archive_dir.as_os_str().is_empty() {
            return Err(PluginError::MissingDirectoryConfig("archive"));
        }
        if self.cache_dir.as_os_str().is_empty() {
            return Err(PluginError::MissingDirectoryConfig("cache"));
        }
        Ok(())
    }

    /// Decode, load, validate and register one cached plugin.
    fn load_entry(&mut self, entry: &CachedPluginEntry) -> PluginResult<String> {
        let root = entry.root().to_path_buf();
        debug!(plugin = %root.display(), state = %PluginState::Extracted, "Loading plugin");

        let (config, _) = read_metadata(self.codec.as_ref(), &entry.metadata_path)?;
        config.validate(&entry.metadata_path)?;

        let instance = self.loader.load(&root, &config.import, &self.symbol)?;
        debug!(plugin = %config.name, state = %PluginState::Loaded, "Loaded plugin");

        self.validator
            .validate(&config.name, instance.as_ref(), &config.capability_type)?;

        let name = config.name.clone();
        self.registry.insert(PluginRecord {
            config,
            root,
            instance,
        });
        debug!(
            plugin = %name,
            state = %PluginState::Registered,
            identity = %entry.identity,
            "Plugin ready"
        );
        Ok(name)
    }
}
