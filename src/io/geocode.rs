//! Geocoding collaborator seam
//!
//! Reverse geocoding lives outside this repo; the pipeline only sees the
//! `PlaceResolver` capability, which turns a raw position key (geohash)
//! into a resolved place name. `CachedResolver` keeps the upstream service
//! out of the hot path through an injected get/put cache with no eviction.
//! Failed lookups are cached as the empty string so a hopeless key is never
//! sent upstream twice.

use anyhow::Context;
use rustc_hash::FxHashMap;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Key/value lookup capability, no eviction
pub trait LookupCache {
    fn get(&self, key: &str) -> Option<String>;
    fn put(&mut self, key: &str, value: String);
}

/// Resolves a geohash to a place name; None when unresolvable
pub trait PlaceResolver {
    fn resolve(&mut self, geohash: &str) -> Option<String>;
}

/// Plain in-memory cache
#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: FxHashMap<String, String>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl LookupCache for InMemoryCache {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn put(&mut self, key: &str, value: String) {
        self.entries.insert(key.to_string(), value);
    }
}

/// Resolver over a pre-resolved geohash -> place table
///
/// The batch binary feeds from a table produced by the external geocoding
/// service; empty values mean the service already gave up on that key.
#[derive(Debug, Default)]
pub struct TableResolver {
    table: FxHashMap<String, String>,
}

impl TableResolver {
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Self { table: entries.into_iter().collect() }
    }

    /// Load the table from a JSON object file ({"geohash": "place", ...})
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read places file {}", path.display()))?;
        let table: HashMap<String, String> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse places file {}", path.display()))?;
        Ok(Self::from_entries(table))
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl PlaceResolver for TableResolver {
    fn resolve(&mut self, geohash: &str) -> Option<String> {
        self.table.get(geohash).filter(|place| !place.is_empty()).cloned()
    }
}

/// Cache-first wrapper around another resolver
pub struct CachedResolver<R, C> {
    inner: R,
    cache: C,
}

impl<R: PlaceResolver, C: LookupCache> CachedResolver<R, C> {
    pub fn new(inner: R, cache: C) -> Self {
        Self { inner, cache }
    }

    /// Hand the cache back, e.g. for the injector to persist
    pub fn into_cache(self) -> C {
        self.cache
    }
}

impl<R: PlaceResolver, C: LookupCache> PlaceResolver for CachedResolver<R, C> {
    fn resolve(&mut self, geohash: &str) -> Option<String> {
        if let Some(cached) = self.cache.get(geohash) {
            return if cached.is_empty() { None } else { Some(cached) };
        }

        match self.inner.resolve(geohash) {
            Some(place) => {
                self.cache.put(geohash, place.clone());
                Some(place)
            }
            None => {
                // Negative result: remember it so the upstream is not
                // queried again for this key
                self.cache.put(geohash, String::new());
                None
            }
        }
    }
}
