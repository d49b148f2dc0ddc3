use std::num::NonZeroUsize;

use lru::LruCache;

use crate::model::{CacheKey, CacheValue};

pub const DEFAULT_CAPACITY: usize = 32;

/// 已渲染封面的 LRU 缓存，只在 worker 线程内使用。
///
/// 键包含目标像素尺寸和面板位置，几何变化后自然失效，不需要 TTL。
pub struct ArtworkCache {
    entries: LruCache<CacheKey, CacheValue>,
}

impl ArtworkCache {
    /// `capacity` 为 0 时按 1 处理
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
        }
    }

    /// 命中时提升为最近使用
    pub fn get(&mut self, key: &CacheKey) -> Option<CacheValue> {
        self.entries.get(key).cloned()
    }

    /// 满时淘汰最久未使用的条目，返回被淘汰的键
    pub fn put(&mut self, key: CacheKey, value: CacheValue) -> Option<CacheKey> {
        match self.entries.push(key, value) {
            Some((evicted, _)) if !self.entries.contains(&evicted) => Some(evicted),
            _ => None,
        }
    }

    /// 不影响使用顺序
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains(key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }
}

impl Default for ArtworkCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
