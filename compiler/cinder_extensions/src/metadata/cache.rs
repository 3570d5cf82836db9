//! Compilation-wide cache of decoded metadata modules.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use super::{MetadataError, MetadataModule};

/// Decoded modules keyed by module name.
///
/// Modules are immutable once decoded, so readers share them through
/// `Arc` and the lock is only held for the map lookup.
#[derive(Default)]
pub struct MetadataCache {
    modules: RwLock<FxHashMap<String, Arc<MetadataModule>>>,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<Arc<MetadataModule>> {
        self.modules.read().get(name).cloned()
    }

    /// The cached module `name`, decoding `bytes` on first use.
    ///
    /// Decoding happens outside the lock. When two threads race on the
    /// same module the first insertion wins and both get that copy.
    pub fn get_or_decode(&self, name: &str, bytes: &[u8]) -> Result<Arc<MetadataModule>, MetadataError> {
        if let Some(module) = self.get(name) {
            tracing::trace!(module = name, "metadata cache hit");
            return Ok(module);
        }
        let decoded = Arc::new(MetadataModule::from_bytes(bytes)?);
        tracing::debug!(module = name, types = decoded.types.len(), "decoded metadata module");
        let mut modules = self.modules.write();
        Ok(Arc::clone(
            modules.entry(name.to_owned()).or_insert(decoded),
        ))
    }

    /// Cache an already decoded module, replacing any previous entry.
    pub fn insert(&self, module: MetadataModule) -> Arc<MetadataModule> {
        let module = Arc::new(module);
        self.modules
            .write()
            .insert(module.name.clone(), Arc::clone(&module));
        module
    }

    pub fn len(&self) -> usize {
        self.modules.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.read().is_empty()
    }
}
