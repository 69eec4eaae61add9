//! Process-wide cache of lowered units.
//!
//! Units are keyed by source identity (path, hash, whatever the caller
//! chooses). The entry API gives compute-if-absent semantics: under a
//! concurrent race one caller lowers, the rest wait on the shard lock and
//! read the published `Arc`. A lowering failure publishes nothing, so a
//! later attempt retries.

use crate::error::LowerResult;
use crate::unit::LoweredUnit;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use once_cell::sync::Lazy;
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct UnitCache {
    units: DashMap<String, Arc<LoweredUnit>>,
}

static GLOBAL: Lazy<UnitCache> = Lazy::new(UnitCache::new);

impl UnitCache {
    pub fn new() -> UnitCache {
        UnitCache::default()
    }

    /// The shared process-wide cache.
    pub fn global() -> &'static UnitCache {
        &GLOBAL
    }

    pub fn get(&self, key: &str) -> Option<Arc<LoweredUnit>> {
        self.units.get(key).map(|entry| entry.clone())
    }

    /// Return the cached unit for `key`, lowering and publishing it through
    /// `lower` on first use.
    pub fn get_or_lower(
        &self,
        key: &str,
        lower: impl FnOnce() -> LowerResult<LoweredUnit>,
    ) -> LowerResult<Arc<LoweredUnit>> {
        match self.units.entry(key.to_string()) {
            Entry::Occupied(entry) => Ok(entry.get().clone()),
            Entry::Vacant(entry) => {
                tracing::debug!("[lowering] cache miss: {key}");
                let unit = Arc::new(lower()?);
                entry.insert(unit.clone());
                Ok(unit)
            }
        }
    }

    /// Drop the cached unit for `key` (source changed).
    pub fn invalidate(&self, key: &str) -> bool {
        self.units.remove(key).is_some()
    }

    pub fn clear(&self) {
        self.units.clear();
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_unit(name: &str) -> LoweredUnit {
        LoweredUnit {
            name: name.to_string(),
            fragments: Vec::new(),
            key_constants: Vec::new(),
            nested_callables: Vec::new(),
            imports: Vec::new(),
        }
    }

    #[test]
    fn lowers_once_and_reuses() {
        let cache = UnitCache::new();
        let mut calls = 0;
        let first = cache
            .get_or_lower("a.cin", || {
                calls += 1;
                Ok(dummy_unit("a"))
            })
            .unwrap();
        let second = cache
            .get_or_lower("a.cin", || {
                calls += 1;
                Ok(dummy_unit("a"))
            })
            .unwrap();
        assert_eq!(calls, 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn failed_lowering_publishes_nothing() {
        use crate::error::{LowerError, LowerErrorKind};
        use cinder_common::Span;

        let cache = UnitCache::new();
        let result = cache.get_or_lower("bad.cin", || {
            Err(LowerError {
                kind: LowerErrorKind::DuplicateDefaultCase,
                span: Span::EMPTY,
                source_text: String::new(),
            })
        });
        assert!(result.is_err());
        assert!(cache.get("bad.cin").is_none());

        // A later attempt may succeed.
        let unit = cache.get_or_lower("bad.cin", || Ok(dummy_unit("bad"))).unwrap();
        assert_eq!(unit.name, "bad");
    }

    #[test]
    fn invalidate_removes_entry() {
        let cache = UnitCache::new();
        cache.get_or_lower("a.cin", || Ok(dummy_unit("a"))).unwrap();
        assert!(cache.invalidate("a.cin"));
        assert!(!cache.invalidate("a.cin"));
        assert!(cache.is_empty());
    }
}
