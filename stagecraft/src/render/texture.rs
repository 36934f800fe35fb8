use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::math::Size;

/// Opaque handle used to reference textures owned by the rendering backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextureHandle(pub(crate) u32);

impl TextureHandle {
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the underlying integer ID.
    pub fn to_u32(self) -> u32 {
        self.0
    }
}

/// A texture handle together with its pixel size.
///
/// The size is needed to turn texture rects into UV coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Texture {
    pub handle: TextureHandle,
    pub size: Size,
}

impl Texture {
    pub fn new(handle: TextureHandle, size: Size) -> Self {
        Self { handle, size }
    }
}

/// Backend hook that turns a key (usually a path) into a texture.
///
/// Decoding and uploading pixels is the backend's job; the core only needs
/// the handle and the size.
pub trait TextureProvider {
    fn load_texture(&mut self, key: &str) -> anyhow::Result<Texture>;
}

/// Caches textures by key so each one is requested from the provider once.
#[derive(Debug, Default)]
pub struct TextureCache {
    textures: HashMap<String, Texture>,
}

impl TextureCache {
    pub fn new() -> Self {
        Self {
            textures: HashMap::new(),
        }
    }

    /// Load a texture through `provider`, caching it if already loaded.
    pub fn load_texture(
        &mut self,
        provider: &mut dyn TextureProvider,
        key: &str,
    ) -> anyhow::Result<Texture> {
        if let Some(texture) = self.textures.get(key) {
            return Ok(*texture);
        }

        let texture = provider.load_texture(key)?;
        log::debug!("cached texture {key:?} as {:?}", texture.handle);
        self.textures.insert(key.to_string(), texture);
        Ok(texture)
    }

    /// Register a texture created outside the provider.
    pub fn insert(&mut self, key: impl Into<String>, texture: Texture) {
        self.textures.insert(key.into(), texture);
    }

    pub fn get_texture(&self, key: &str) -> Option<Texture> {
        self.textures.get(key).copied()
    }

    pub fn has_texture(&self, key: &str) -> bool {
        self.textures.contains_key(key)
    }

    pub fn unload_texture(&mut self, key: &str) {
        self.textures.remove(key);
    }

    /// Clear all cached textures (they will be requested again on next access).
    pub fn clear(&mut self) {
        self.textures.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountingProvider {
        loads: u32,
    }

    impl TextureProvider for CountingProvider {
        fn load_texture(&mut self, key: &str) -> anyhow::Result<Texture> {
            if key.is_empty() {
                anyhow::bail!("empty texture key");
            }
            self.loads += 1;
            Ok(Texture::new(TextureHandle::new(self.loads), Size::new(64.0, 32.0)))
        }
    }

    #[test]
    fn cache_requests_each_key_once() {
        let mut provider = CountingProvider { loads: 0 };
        let mut cache = TextureCache::new();
        let first = cache.load_texture(&mut provider, "hero.png").unwrap();
        let second = cache.load_texture(&mut provider, "hero.png").unwrap();
        assert_eq!(first, second);
        assert_eq!(provider.loads, 1);
        assert!(cache.has_texture("hero.png"));
    }

    #[test]
    fn provider_errors_are_not_cached() {
        let mut provider = CountingProvider { loads: 0 };
        let mut cache = TextureCache::new();
        assert!(cache.load_texture(&mut provider, "").is_err());
        assert!(!cache.has_texture(""));
    }
}
