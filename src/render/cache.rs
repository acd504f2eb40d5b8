use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::foundation::core::{FrameTime, stable_hash64};
use crate::render::image::MaskImage;

/// Cache key of one rendered mask.
///
/// The hash folds the owning node's hash together with the context age at
/// render time, so any edit to the tree produces a different key and stale
/// masks simply stop being hit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MaskKey {
    /// Combined node hash and context age.
    pub hash: u64,
    /// Frame the mask was rendered at.
    pub time: FrameTime,
    /// Mipmap level of the raster.
    pub mip_map_level: u32,
    /// View index.
    pub view: u32,
}

impl MaskKey {
    /// Key for a mask of `node_hash` at context age `age`.
    pub fn new(node_hash: u64, age: u64, time: FrameTime, mip_map_level: u32, view: u32) -> Self {
        let mut bytes = [0u8; 16];
        bytes[..8].copy_from_slice(&node_hash.to_le_bytes());
        bytes[8..].copy_from_slice(&age.to_le_bytes());
        Self {
            hash: stable_hash64(0, &bytes),
            time,
            mip_map_level,
            view,
        }
    }
}

/// Shared map of rendered masks, keyed by [`MaskKey`].
#[derive(Default)]
pub struct MaskCache {
    entries: Mutex<HashMap<MaskKey, Arc<MaskImage>>>,
}

impl MaskCache {
    /// An empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached image for `key`, if any.
    pub fn get(&self, key: &MaskKey) -> Option<Arc<MaskImage>> {
        self.entries.lock().expect("cache lock").get(key).cloned()
    }

    /// The cached image for `key`, or the image built by `create` freshly
    /// inserted. The flag reports whether the entry already existed.
    pub fn get_or_insert_with(
        &self,
        key: MaskKey,
        create: impl FnOnce() -> MaskImage,
    ) -> (Arc<MaskImage>, bool) {
        let mut entries = self.entries.lock().expect("cache lock");
        match entries.get(&key) {
            Some(img) => (img.clone(), true),
            None => {
                let img = Arc::new(create());
                entries.insert(key, img.clone());
                (img, false)
            }
        }
    }

    /// Drop the entry for `key`, if any.
    pub fn remove(&self, key: &MaskKey) {
        self.entries.lock().expect("cache lock").remove(key);
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.lock().expect("cache lock").clear();
    }

    /// Number of cached masks.
    pub fn len(&self) -> usize {
        self.entries.lock().expect("cache lock").len()
    }

    /// Whether the cache holds nothing.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
