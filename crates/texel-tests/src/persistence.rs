//! Integration tests for the compressed copy: saving, heap limits.

use crate::common::{load, texels};
use texel_cache::{NodeState, TextureManager};
use texel_core::{CacheConfig, FormatKey, NeverFlush, TexelError, TextureHints};
use texel_gpu::HeadlessDevice;

#[test]
fn save_reproduces_loaded_file() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("wall.tga");
    let bytes: Vec<u8> = (0..5000u32).map(|i| (i * 7 % 256) as u8).collect();
    std::fs::write(&src, &bytes).unwrap();

    let mut cache = crate::common::cache(2);
    let id = cache
        .load(&src, FormatKey::Solid, TextureHints::NONE, false, NeverFlush::NONE)
        .unwrap();
    let out = dir.path().join("wall.out");
    cache.save_texture(id, &out).unwrap();

    assert_eq!(std::fs::read(&out).unwrap(), bytes);
    assert_eq!(cache.state(id), NodeState::CachedOut);
}

#[test]
fn save_reproduces_memory_texels() {
    let dir = tempfile::tempdir().unwrap();
    let mut cache = crate::common::cache(2);
    let id = load(&mut cache, 6);

    // Eviction must not lose the CPU copy.
    cache.acquire_resident(id).unwrap().unwrap();
    cache.evict_all();

    let out = dir.path().join("mem.raw");
    cache.save_texture(id, &out).unwrap();
    assert_eq!(std::fs::read(&out).unwrap(), texels(8, 6));
}

#[test]
fn save_of_stale_id_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let mut cache = crate::common::cache(2);
    let id = load(&mut cache, 1);
    cache.release(id).unwrap();

    let err = cache.save_texture(id, dir.path().join("x")).unwrap_err();
    assert!(matches!(err, TexelError::NotFound(_)));
    assert!(!err.is_fatal());
}

#[test]
fn full_blob_heap_leaves_node_unusable() {
    let config = CacheConfig {
        max_texture_bytes: 4096,
        blob_heap_bytes: 16,
        housekeeping_idle_turns: 1_000,
        ..CacheConfig::with_budget(8, 2)
    };
    let mut cache = TextureManager::new(config, HeadlessDevice::new()).unwrap();
    // Incompressible enough that the blob never fits in 16 bytes.
    let noise: Vec<u8> = (0..256u32).map(|i| (i.wrapping_mul(2654435761) >> 13) as u8).collect();
    let id = cache
        .load_from_memory(&noise, FormatKey::Solid, TextureHints::NONE, 8, 4)
        .unwrap();

    assert_eq!(cache.state(id), NodeState::CachedOut);
    assert_eq!(cache.acquire_resident(id).unwrap(), None);
    assert_eq!(cache.device().created_count(), 0);

    let stats = cache.stats();
    assert_eq!(stats.heap_failures, 1);
    assert_eq!(stats.unusable_acquires, 1);
    assert_eq!(stats.blob_heap_used, 0);
}

#[test]
fn exhausted_name_heap_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a-rather-long-texture-name.tga");
    std::fs::write(&path, texels(4, 1)).unwrap();

    let config = CacheConfig {
        max_texture_bytes: 4096,
        name_heap_bytes: 8,
        ..CacheConfig::with_budget(8, 2)
    };
    let mut cache = TextureManager::new(config, HeadlessDevice::new()).unwrap();
    let err = cache
        .load(&path, FormatKey::Solid, TextureHints::NONE, false, NeverFlush::NONE)
        .unwrap_err();

    assert!(matches!(err, TexelError::NameHeapExhausted { capacity: 8, .. }));
    assert!(err.is_fatal());
    assert!(cache.is_empty());
    assert_eq!(cache.stats().blob_heap_used, 0);
}

#[test]
fn raw_texels_reach_device_through_lock() {
    let mut cache = crate::common::cache(2);
    let pixels = texels(16, 3);
    let id = cache
        .load_from_memory(&pixels, FormatKey::Alpha, TextureHints::MIPMAP, 16, 4)
        .unwrap();

    let handle = cache.acquire_resident(id).unwrap().unwrap();
    let texture = cache.device().texture(handle).unwrap();
    assert_eq!(texture.origin, texel_gpu::TextureOrigin::Empty);
    assert_eq!(texture.width, 16);
    assert_eq!(texture.data, pixels);
    assert!(!texture.is_locked());
}
