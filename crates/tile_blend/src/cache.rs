//! Bounded caches for masks, blended tiles and backgrounds
//!
//! All three caches share one [`LruCache`] implementation. Entries carry a
//! monotonic use tick for LRU ordering and a last-used [`Instant`] for the
//! periodic time-to-live sweep. Cached images are owned by the cache; callers
//! only ever borrow them, so nothing drawn from the cache can alter it.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

use tile_blend_core::{Direction, TileTypeId};
use tiny_skia::Pixmap;
use tracing::{debug, info};

use crate::compositor::MaskSource;
use crate::error::BlendError;
use crate::mask::generate_mask;
use crate::settings::CacheSettings;

/// Per-cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Entries dropped to stay within capacity
    pub evictions: u64,
    /// Entries dropped by the time-to-live sweep
    pub expired: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f32 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f32 / lookups as f32
        }
    }
}

#[derive(Debug)]
struct Slot<V> {
    value: V,
    tick: u64,
    last_used: Instant,
}

/// Size-bounded least-recently-used map.
///
/// When an insert would exceed the capacity, least recently used entries are
/// evicted first so that the cache holds `floor(capacity * retain_ratio)`
/// entries afterwards (at least the inserted one).
#[derive(Debug)]
pub struct LruCache<K, V> {
    entries: HashMap<K, Slot<V>>,
    capacity: usize,
    retain_ratio: f32,
    tick: u64,
    stats: CacheStats,
}

impl<K: Eq + Hash + Clone, V> LruCache<K, V> {
    pub fn new(capacity: usize, retain_ratio: f32) -> Self {
        Self {
            entries: HashMap::new(),
            capacity: capacity.max(1),
            retain_ratio: retain_ratio.clamp(0.0, 1.0),
            tick: 0,
            stats: CacheStats::default(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    /// Number of entries kept after an over-capacity eviction
    fn retained_len(&self) -> usize {
        ((self.capacity as f32 * self.retain_ratio).floor() as usize).max(1)
    }

    /// Look up an entry and mark it as most recently used
    pub fn get(&mut self, key: &K, now: Instant) -> Option<&V> {
        let tick = self.next_tick();
        match self.entries.get_mut(key) {
            Some(slot) => {
                self.stats.hits += 1;
                slot.tick = tick;
                slot.last_used = now;
                Some(&slot.value)
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Look up an entry without touching its recency or the counters
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.entries.get(key).map(|slot| &slot.value)
    }

    /// Insert or replace an entry, returning the replaced value
    pub fn insert(&mut self, key: K, value: V, now: Instant) -> Option<V> {
        if !self.entries.contains_key(&key) {
            self.make_room();
        }
        let tick = self.next_tick();
        self.entries
            .insert(
                key,
                Slot {
                    value,
                    tick,
                    last_used: now,
                },
            )
            .map(|slot| slot.value)
    }

    /// Look up an entry, creating it on a miss
    pub fn get_or_try_insert_with<E>(
        &mut self,
        key: K,
        now: Instant,
        create: impl FnOnce() -> Result<V, E>,
    ) -> Result<&V, E> {
        if !self.entries.contains_key(&key) {
            // A failed build leaves the cache untouched
            let value = create()?;
            self.make_room();
            self.stats.misses += 1;
            let tick = self.next_tick();
            let slot = self.entries.entry(key).or_insert(Slot {
                value,
                tick,
                last_used: now,
            });
            return Ok(&slot.value);
        }
        let tick = self.next_tick();
        let slot = match self.entries.entry(key) {
            Entry::Occupied(entry) => {
                self.stats.hits += 1;
                let slot = entry.into_mut();
                slot.tick = tick;
                slot.last_used = now;
                slot
            }
            Entry::Vacant(entry) => {
                self.stats.misses += 1;
                entry.insert(Slot {
                    value: create()?,
                    tick,
                    last_used: now,
                })
            }
        };
        Ok(&slot.value)
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.entries.remove(key).map(|slot| slot.value)
    }

    /// Keep only entries matching the predicate; returns how many were dropped
    pub fn retain(&mut self, mut keep: impl FnMut(&K, &V) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, slot| keep(key, &slot.value));
        before - self.entries.len()
    }

    /// Drop entries unused for longer than `ttl`; returns how many were dropped
    pub fn sweep_expired(&mut self, now: Instant, ttl: Duration) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, slot| now.saturating_duration_since(slot.last_used) <= ttl);
        let expired = before - self.entries.len();
        self.stats.expired += expired as u64;
        expired
    }

    /// Evict least recently used entries if the cache is over capacity
    pub fn evict_to_capacity(&mut self) -> usize {
        if self.entries.len() > self.capacity {
            self.evict_down_to(self.retained_len())
        } else {
            0
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn make_room(&mut self) {
        if self.entries.len() >= self.capacity {
            // The incoming entry takes one of the retained places
            self.evict_down_to(self.retained_len() - 1);
        }
    }

    fn evict_down_to(&mut self, keep: usize) -> usize {
        if self.entries.len() <= keep {
            return 0;
        }
        let mut by_age: Vec<(u64, K)> = self
            .entries
            .iter()
            .map(|(key, slot)| (slot.tick, key.clone()))
            .collect();
        by_age.sort_unstable_by_key(|(tick, _)| *tick);

        let count = self.entries.len() - keep;
        for (_, key) in by_age.into_iter().take(count) {
            self.entries.remove(&key);
        }
        self.stats.evictions += count as u64;
        count
    }
}

/// Mask cache key; strength is quantized to thousandths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaskKey {
    pub direction: Direction,
    pub strength_millis: u16,
    pub size: u32,
}

impl MaskKey {
    pub fn new(direction: Direction, strength: f32, size: u32) -> Self {
        Self {
            direction,
            strength_millis: (strength.clamp(0.0, 1.0) * 1000.0).round() as u16,
            size,
        }
    }

    /// The quantized strength this key stands for
    pub fn strength(&self) -> f32 {
        self.strength_millis as f32 / 1000.0
    }
}

/// Blended tile cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompositeKey {
    pub tile: TileTypeId,
    pub x: i32,
    pub y: i32,
    pub size: u32,
}

/// A blended tile together with the neighborhood it was computed from
#[derive(Debug, Clone)]
pub struct CompositeEntry {
    pub neighborhood: u64,
    pub image: Pixmap,
}

/// Counters of all three caches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlendCacheStats {
    pub masks: CacheStats,
    pub composites: CacheStats,
    pub backgrounds: CacheStats,
}

/// Cache-backed [`MaskSource`] bound to one frame's timestamp
pub struct MaskLookup<'a> {
    cache: &'a mut LruCache<MaskKey, Pixmap>,
    now: Instant,
}

impl MaskSource for MaskLookup<'_> {
    fn mask(&mut self, direction: Direction, strength: f32, size: u32) -> Result<&Pixmap, BlendError> {
        let key = MaskKey::new(direction, strength, size);
        self.cache.get_or_try_insert_with(key, self.now, || {
            generate_mask(direction, key.strength(), size)
        })
    }
}

/// The caches used by one renderer, with their invalidation and maintenance
/// rules.
///
/// Created with the renderer and disposed with it; nothing here is global.
#[derive(Debug)]
#[cfg_attr(feature = "bevy", derive(bevy::prelude::Resource))]
pub struct BlendCacheContext {
    masks: LruCache<MaskKey, Pixmap>,
    composites: LruCache<CompositeKey, CompositeEntry>,
    backgrounds: LruCache<(u32, u32), Pixmap>,
    ttl: Duration,
    sweep_interval: Duration,
    last_sweep: Option<Instant>,
    registry_revision: Option<u64>,
}

impl Default for BlendCacheContext {
    fn default() -> Self {
        Self::new(&CacheSettings::default())
    }
}

impl BlendCacheContext {
    pub fn new(settings: &CacheSettings) -> Self {
        Self {
            masks: LruCache::new(settings.mask_capacity, settings.retain_ratio),
            composites: LruCache::new(settings.composite_capacity, settings.retain_ratio),
            backgrounds: LruCache::new(settings.background_capacity, settings.retain_ratio),
            ttl: settings.ttl(),
            sweep_interval: settings.sweep_interval(),
            last_sweep: None,
            registry_revision: None,
        }
    }

    pub fn masks(&self) -> &LruCache<MaskKey, Pixmap> {
        &self.masks
    }

    pub fn composites(&self) -> &LruCache<CompositeKey, CompositeEntry> {
        &self.composites
    }

    pub fn backgrounds(&self) -> &LruCache<(u32, u32), Pixmap> {
        &self.backgrounds
    }

    pub fn stats(&self) -> BlendCacheStats {
        BlendCacheStats {
            masks: self.masks.stats(),
            composites: self.composites.stats(),
            backgrounds: self.backgrounds.stats(),
        }
    }

    /// Masks served from the mask cache, timestamped with `now`
    pub fn mask_source(&mut self, now: Instant) -> MaskLookup<'_> {
        MaskLookup {
            cache: &mut self.masks,
            now,
        }
    }

    /// The cached blend of the tile, if it was computed from the same
    /// neighborhood. A stale entry is dropped.
    pub fn composite(&mut self, key: &CompositeKey, neighborhood: u64, now: Instant) -> Option<&Pixmap> {
        if self
            .composites
            .peek(key)
            .is_some_and(|entry| entry.neighborhood != neighborhood)
        {
            self.composites.remove(key);
        }
        self.composites.get(key, now).map(|entry| &entry.image)
    }

    pub fn store_composite(&mut self, key: CompositeKey, neighborhood: u64, image: Pixmap, now: Instant) {
        self.composites
            .insert(key, CompositeEntry { neighborhood, image }, now);
    }

    /// The cached background of this exact size, rendering it on a miss
    pub fn background(
        &mut self,
        width: u32,
        height: u32,
        now: Instant,
        render: impl FnOnce() -> Result<Pixmap, BlendError>,
    ) -> Result<&Pixmap, BlendError> {
        self.backgrounds
            .get_or_try_insert_with((width, height), now, render)
    }

    /// Drop blended tiles whose 3x3 neighborhood contains `(x, y)`.
    ///
    /// Returns the number of entries dropped.
    pub fn on_tile_changed(&mut self, x: i32, y: i32) -> usize {
        let dropped = self
            .composites
            .retain(|key, _| key.x.abs_diff(x) > 1 || key.y.abs_diff(y) > 1);
        if dropped > 0 {
            debug!("Tile ({}, {}) changed, dropped {} blended tiles", x, y, dropped);
        }
        dropped
    }

    /// Clear blended tiles when the registry changed since the last call.
    ///
    /// Returns true when the cache was cleared.
    pub fn sync_registry(&mut self, revision: u64) -> bool {
        let changed = self
            .registry_revision
            .is_some_and(|previous| previous != revision);
        self.registry_revision = Some(revision);
        if changed {
            debug!(
                "Tile registry changed (revision {}), clearing {} blended tiles",
                revision,
                self.composites.len()
            );
            self.composites.clear();
        }
        changed
    }

    /// Run the time-to-live sweep if the sweep interval elapsed.
    ///
    /// Returns true when a sweep ran.
    pub fn maintain(&mut self, now: Instant) -> bool {
        let Some(last) = self.last_sweep else {
            self.last_sweep = Some(now);
            return false;
        };
        if now.saturating_duration_since(last) < self.sweep_interval {
            return false;
        }

        self.last_sweep = Some(now);
        let masks = self.masks.sweep_expired(now, self.ttl);
        let composites = self.composites.sweep_expired(now, self.ttl);
        let backgrounds = self.backgrounds.sweep_expired(now, self.ttl);
        if masks + composites + backgrounds > 0 {
            debug!(
                "Cache sweep expired {} masks, {} blended tiles, {} backgrounds",
                masks, composites, backgrounds
            );
        }
        true
    }

    pub fn clear(&mut self) {
        self.masks.clear();
        self.composites.clear();
        self.backgrounds.clear();
    }

    /// Release everything, logging the final counters
    pub fn dispose(mut self) -> BlendCacheStats {
        let stats = self.stats();
        info!(
            "Blend caches disposed: masks {}/{} hit/miss, blended tiles {}/{} hit/miss ({} evicted), backgrounds {}/{} hit/miss",
            stats.masks.hits,
            stats.masks.misses,
            stats.composites.hits,
            stats.composites.misses,
            stats.composites.evictions,
            stats.backgrounds.hits,
            stats.backgrounds.misses
        );
        self.clear();
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pixmap(size: u32) -> Pixmap {
        Pixmap::new(size, size).unwrap()
    }

    fn key(x: i32, y: i32) -> CompositeKey {
        CompositeKey {
            tile: "grass".into(),
            x,
            y,
            size: 32,
        }
    }

    #[test]
    fn test_lru_get_and_peek() {
        let now = Instant::now();
        let mut cache = LruCache::new(4, 0.8);
        cache.insert("a", 1, now);

        assert_eq!(cache.peek(&"a"), Some(&1));
        assert_eq!(cache.stats(), CacheStats::default());

        assert_eq!(cache.get(&"a", now), Some(&1));
        assert_eq!(cache.get(&"b", now), None);
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_lru_evicts_least_recent_to_retain_ratio() {
        let now = Instant::now();
        let mut cache = LruCache::new(10, 0.8);
        for i in 0..10 {
            cache.insert(i, i, now);
        }
        // Refresh the oldest entry so it survives
        cache.get(&0, now);

        cache.insert(10, 10, now);
        assert_eq!(cache.len(), 8);
        assert!(cache.contains(&0));
        assert!(cache.contains(&10));
        for evicted in 1..=3 {
            assert!(!cache.contains(&evicted));
        }
        assert_eq!(cache.stats().evictions, 3);
    }

    #[test]
    fn test_lru_never_exceeds_capacity() {
        let now = Instant::now();
        let mut cache = LruCache::new(5, 0.8);
        for i in 0..100 {
            cache.insert(i, (), now);
            assert!(cache.len() <= 5);
        }
        assert!(cache.contains(&99));
    }

    #[test]
    fn test_lru_replace_does_not_evict() {
        let now = Instant::now();
        let mut cache = LruCache::new(2, 0.5);
        cache.insert("a", 1, now);
        cache.insert("b", 2, now);
        assert_eq!(cache.insert("a", 3, now), Some(1));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_lru_sweep_expired() {
        let start = Instant::now();
        let mut cache = LruCache::new(8, 0.8);
        cache.insert("old", 1, start);
        cache.insert("fresh", 2, start + Duration::from_secs(50));

        let swept = cache.sweep_expired(start + Duration::from_secs(70), Duration::from_secs(60));
        assert_eq!(swept, 1);
        assert!(!cache.contains(&"old"));
        assert!(cache.contains(&"fresh"));
        assert_eq!(cache.stats().expired, 1);
    }

    #[test]
    fn test_lru_get_or_try_insert_with() {
        let now = Instant::now();
        let mut cache: LruCache<u32, String> = LruCache::new(4, 0.8);

        let failed: Result<&String, &str> = cache.get_or_try_insert_with(1, now, || Err("nope"));
        assert!(failed.is_err());
        assert!(cache.is_empty());

        let value = cache
            .get_or_try_insert_with(1, now, || Ok::<_, ()>("one".to_string()))
            .unwrap();
        assert_eq!(value, "one");
        let again = cache
            .get_or_try_insert_with(1, now, || Ok::<_, ()>("other".to_string()))
            .unwrap();
        assert_eq!(again, "one");
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn test_lru_failed_insert_keeps_full_cache() {
        let now = Instant::now();
        let mut cache: LruCache<u32, u32> = LruCache::new(5, 0.8);
        for i in 0..5 {
            cache.insert(i, i, now);
        }

        let failed: Result<&u32, &str> = cache.get_or_try_insert_with(9, now, || Err("nope"));
        assert!(failed.is_err());
        assert_eq!(cache.len(), 5);
        assert_eq!(cache.stats().evictions, 0);

        assert_eq!(cache.get_or_try_insert_with(9, now, || Ok::<_, ()>(9)), Ok(&9));
        assert!(cache.len() <= 5);
        assert!(cache.contains(&9));
        assert!(cache.stats().evictions > 0);
    }

    #[test]
    fn test_mask_key_quantizes_strength() {
        assert_eq!(
            MaskKey::new(Direction::North, 0.1, 32),
            MaskKey::new(Direction::North, 0.10004, 32)
        );
        assert_ne!(
            MaskKey::new(Direction::North, 0.1, 32),
            MaskKey::new(Direction::North, 0.2, 32)
        );
        assert_eq!(MaskKey::new(Direction::East, 1.7, 8).strength_millis, 1000);
    }

    #[test]
    fn test_masks_are_generated_once() {
        let now = Instant::now();
        let mut context = BlendCacheContext::default();

        let first = context.mask_source(now).mask(Direction::South, 0.3, 16).unwrap().clone();
        let second = context.mask_source(now).mask(Direction::South, 0.3, 16).unwrap().clone();
        assert_eq!(first.data(), second.data());
        assert_eq!(context.masks().len(), 1);
        assert_eq!(context.masks().stats().hits, 1);
        assert_eq!(context.masks().stats().misses, 1);
    }

    #[test]
    fn test_composite_requires_matching_neighborhood() {
        let now = Instant::now();
        let mut context = BlendCacheContext::default();
        context.store_composite(key(0, 0), 42, pixmap(4), now);

        assert!(context.composite(&key(0, 0), 42, now).is_some());
        assert!(context.composite(&key(0, 0), 43, now).is_none());
        // The stale entry is gone even for the old hash
        assert!(context.composite(&key(0, 0), 42, now).is_none());
    }

    #[test]
    fn test_tile_change_invalidates_neighborhood_only() {
        let now = Instant::now();
        let mut context = BlendCacheContext::default();
        for y in -2..=2 {
            for x in -2..=2 {
                context.store_composite(key(x, y), 0, pixmap(1), now);
            }
        }

        assert_eq!(context.on_tile_changed(0, 0), 9);
        assert_eq!(context.composites().len(), 16);
        for y in -1..=1 {
            for x in -1..=1 {
                assert!(context.composites().peek(&key(x, y)).is_none());
            }
        }
        assert!(context.composites().peek(&key(2, 0)).is_some());
        assert!(context.composites().peek(&key(-2, -2)).is_some());
    }

    #[test]
    fn test_tile_change_far_from_grid_edge_entry() {
        let now = Instant::now();
        let mut context = BlendCacheContext::default();
        context.store_composite(key(i32::MAX, 0), 0, pixmap(1), now);
        context.store_composite(key(i32::MIN, i32::MAX), 0, pixmap(1), now);

        assert_eq!(context.on_tile_changed(-5, 0), 0);
        assert_eq!(context.on_tile_changed(5, i32::MIN), 0);
        assert_eq!(context.composites().len(), 2);

        assert_eq!(context.on_tile_changed(i32::MAX - 1, 1), 1);
        assert!(context.composites().peek(&key(i32::MAX, 0)).is_none());
    }

    #[test]
    fn test_registry_revision_clears_composites() {
        let now = Instant::now();
        let mut context = BlendCacheContext::default();
        assert!(!context.sync_registry(3));

        context.store_composite(key(0, 0), 0, pixmap(1), now);
        context.mask_source(now).mask(Direction::West, 0.5, 8).unwrap();
        assert!(!context.sync_registry(3));
        assert_eq!(context.composites().len(), 1);

        assert!(context.sync_registry(4));
        assert!(context.composites().is_empty());
        assert_eq!(context.masks().len(), 1);
    }

    #[test]
    fn test_maintain_sweeps_on_interval() {
        let start = Instant::now();
        let settings = CacheSettings {
            ttl_secs: 60,
            sweep_interval_secs: 30,
            ..Default::default()
        };
        let mut context = BlendCacheContext::new(&settings);
        context.store_composite(key(0, 0), 0, pixmap(1), start);

        assert!(!context.maintain(start));
        assert!(!context.maintain(start + Duration::from_secs(10)));
        assert!(context.maintain(start + Duration::from_secs(30)));
        assert_eq!(context.composites().len(), 1);

        assert!(context.maintain(start + Duration::from_secs(90)));
        assert!(context.composites().is_empty());
    }

    #[test]
    fn test_background_cached_by_size() {
        let now = Instant::now();
        let mut context = BlendCacheContext::default();
        let mut renders = 0;

        for _ in 0..3 {
            context
                .background(64, 48, now, || {
                    renders += 1;
                    Ok(Pixmap::new(64, 48).unwrap())
                })
                .unwrap();
        }
        context
            .background(32, 32, now, || {
                renders += 1;
                Ok(pixmap(32))
            })
            .unwrap();

        assert_eq!(renders, 2);
        assert_eq!(context.backgrounds().len(), 2);
    }

    #[test]
    fn test_clear_and_dispose() {
        let now = Instant::now();
        let mut context = BlendCacheContext::default();
        context.store_composite(key(0, 0), 0, pixmap(1), now);
        context.composite(&key(0, 0), 0, now);
        context.clear();
        assert!(context.composites().is_empty());

        let stats = context.dispose();
        assert_eq!(stats.composites.hits, 1);
    }
}
