//! # Algorithm Registry
//!
//! A tag → factory map. The same type backs every pluggable concern in the
//! identity layer: key factories, meta factories, document factories, the
//! address and ID parsers, and the transportable data / file formats.
//!
//! ## Lifecycle
//!
//! Registration happens during a single-threaded init phase through
//! `&mut self`. Once the owner wraps the registry (usually inside
//! [`Extensions`](crate::extensions::Extensions)) in an `Arc`, nothing can
//! mutate it any more and lookups from any number of threads are lock-free
//! plain `HashMap` reads. The borrow checker is the run-once barrier.
//!
//! The last registration for a tag wins. The reserved tag
//! [`WILDCARD_TAG`](crate::config::WILDCARD_TAG) (`"*"`) is the fallback for
//! tags nobody registered.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::config::WILDCARD_TAG;

/// A string-tagged map of shared factories.
///
/// `F` is normally a trait object (`dyn MetaFactory`, `dyn PublicKeyFactory`,
/// ...), which is why the factories are stored behind `Arc`.
pub struct AlgorithmRegistry<F: ?Sized> {
    entries: HashMap<String, Arc<F>>,
}

impl<F: ?Sized> AlgorithmRegistry<F> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Register `factory` under `tag`, returning the factory it replaced.
    pub fn register(&mut self, tag: impl Into<String>, factory: Arc<F>) -> Option<Arc<F>> {
        let tag = tag.into();
        tracing::debug!(tag = %tag, "registering factory");
        self.entries.insert(tag, factory)
    }

    /// Look up the factory registered for exactly `tag`.
    pub fn lookup(&self, tag: &str) -> Option<&Arc<F>> {
        self.entries.get(tag)
    }

    /// Try `tag`, then `fallback`.
    pub fn resolve(&self, tag: &str, fallback: &str) -> Option<&Arc<F>> {
        self.lookup(tag).or_else(|| self.lookup(fallback))
    }

    /// Try `tag` (when there is one), then the wildcard entry.
    pub fn resolve_or_wildcard(&self, tag: Option<&str>) -> Option<&Arc<F>> {
        match tag {
            Some(tag) => self.resolve(tag, WILDCARD_TAG),
            None => self.lookup(WILDCARD_TAG),
        }
    }

    /// Whether anything is registered under `tag`.
    pub fn contains(&self, tag: &str) -> bool {
        self.entries.contains_key(tag)
    }

    /// All registered tags, in no particular order.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<F: ?Sized> Default for AlgorithmRegistry<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: ?Sized> Clone for AlgorithmRegistry<F> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<F: ?Sized> fmt::Debug for AlgorithmRegistry<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: Vec<&str> = self.tags().collect();
        tags.sort_unstable();
        f.debug_struct("AlgorithmRegistry")
            .field("tags", &tags)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Named: Send + Sync {
        fn name(&self) -> &str;
    }

    struct Fixed(&'static str);

    impl Named for Fixed {
        fn name(&self) -> &str {
            self.0
        }
    }

    fn fixed(name: &'static str) -> Arc<dyn Named> {
        Arc::new(Fixed(name))
    }

    #[test]
    fn lookup_unknown_tag_is_absent() {
        let registry: AlgorithmRegistry<dyn Named> = AlgorithmRegistry::new();
        assert!(registry.lookup("unknown-tag").is_none());
        assert!(registry.resolve_or_wildcard(Some("unknown-tag")).is_none());
    }

    #[test]
    fn last_registration_wins() {
        let mut registry: AlgorithmRegistry<dyn Named> = AlgorithmRegistry::new();
        assert!(registry.register("1", fixed("first")).is_none());
        let replaced = registry.register("1", fixed("second"));
        assert_eq!(replaced.map(|f| f.name().to_string()).as_deref(), Some("first"));
        assert_eq!(registry.lookup("1").map(|f| f.name()), Some("second"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn resolve_falls_back() {
        let mut registry: AlgorithmRegistry<dyn Named> = AlgorithmRegistry::new();
        registry.register("visa", fixed("visa"));
        registry.register(WILDCARD_TAG, fixed("general"));

        assert_eq!(registry.resolve("visa", WILDCARD_TAG).map(|f| f.name()), Some("visa"));
        assert_eq!(
            registry.resolve("custom", WILDCARD_TAG).map(|f| f.name()),
            Some("general")
        );
        assert_eq!(registry.resolve_or_wildcard(None).map(|f| f.name()), Some("general"));
        assert!(registry.resolve("custom", "also-missing").is_none());
    }

    #[test]
    fn shared_reads_across_threads() {
        let mut registry: AlgorithmRegistry<dyn Named> = AlgorithmRegistry::new();
        registry.register("ECC", fixed("ecc"));
        let registry = Arc::new(registry);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.lookup("ECC").map(|f| f.name().to_string()))
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap().as_deref(), Some("ecc"));
        }
    }

    #[test]
    fn debug_lists_sorted_tags() {
        let mut registry: AlgorithmRegistry<dyn Named> = AlgorithmRegistry::new();
        registry.register("b", fixed("b"));
        registry.register("a", fixed("a"));
        assert_eq!(format!("{:?}", registry), r#"AlgorithmRegistry { tags: ["a", "b"] }"#);
    }
}
