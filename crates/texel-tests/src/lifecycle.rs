//! Integration tests for loading, sharing and releasing textures.

use crate::common::{cache, is_resident, load, texels};
use proptest::prelude::*;
use texel_cache::NodeState;
use texel_core::{FormatKey, NeverFlush, TexelError, TextureHints};

fn write_texture(dir: &tempfile::TempDir, name: &str, seed: u8) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, texels(8, seed)).unwrap();
    path
}

#[test]
fn repeated_loads_share_one_node() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_texture(&dir, "Rock.tga", 1);
    let mut cache = cache(4);

    let first = cache
        .load(&path, FormatKey::Solid, TextureHints::NONE, false, NeverFlush::NONE)
        .unwrap();
    for expected in 2..=5 {
        let again = cache
            .load(&path, FormatKey::Solid, TextureHints::NONE, false, NeverFlush::NONE)
            .unwrap();
        assert_eq!(again, first);
        assert_eq!(cache.ref_count(first), Some(expected));
    }
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.stats().raw_bytes, 256);
}

#[test]
fn name_match_ignores_case() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_texture(&dir, "rock.tga", 1);
    let mut cache = cache(4);

    let id = cache
        .load(&path, FormatKey::Solid, TextureHints::NONE, false, NeverFlush::NONE)
        .unwrap();
    let shouted = path.to_string_lossy().replace("rock.tga", "ROCK.TGA");
    assert_eq!(cache.find_loaded(&shouted), Some(id));
    assert_eq!(cache.ref_count(id), Some(1));
}

#[test]
fn unique_loads_never_match() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_texture(&dir, "decal.tga", 2);
    let mut cache = cache(4);

    let shared = cache
        .load(&path, FormatKey::Alpha, TextureHints::NONE, false, NeverFlush::NONE)
        .unwrap();
    let unique_a = cache
        .load(&path, FormatKey::Alpha, TextureHints::NONE, true, NeverFlush::NONE)
        .unwrap();
    let unique_b = cache
        .load(&path, FormatKey::Alpha, TextureHints::NONE, true, NeverFlush::NONE)
        .unwrap();
    assert_ne!(shared, unique_a);
    assert_ne!(unique_a, unique_b);

    // A later shared load still finds the shared node, not a unique one.
    let again = cache
        .load(&path, FormatKey::Alpha, TextureHints::NONE, false, NeverFlush::NONE)
        .unwrap();
    assert_eq!(again, shared);
    assert_eq!(cache.ref_count(unique_a), Some(1));
    assert_eq!(cache.len(), 3);
}

#[test]
fn unique_node_is_invisible_to_later_shared_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_texture(&dir, "face.tga", 3);
    let mut cache = cache(4);

    let unique = cache
        .load(&path, FormatKey::Solid, TextureHints::NONE, true, NeverFlush::NONE)
        .unwrap();
    assert_eq!(cache.find_loaded(&path.to_string_lossy()), None);
    let shared = cache
        .load(&path, FormatKey::Solid, TextureHints::NONE, false, NeverFlush::NONE)
        .unwrap();
    assert_ne!(unique, shared);
}

#[test]
fn missing_file_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let mut cache = cache(4);
    let err = cache
        .load(
            dir.path().join("nope.tga"),
            FormatKey::Solid,
            TextureHints::NONE,
            false,
            NeverFlush::NONE,
        )
        .unwrap_err();
    assert!(err.is_fatal());
    assert!(matches!(err, TexelError::SourceOpen { .. }));
}

#[test]
fn last_release_destroys_resident_node() {
    let mut cache = cache(4);
    let id = load(&mut cache, 1);
    cache.share(id).unwrap();
    cache.acquire_resident(id).unwrap().unwrap();

    cache.release(id).unwrap();
    assert!(is_resident(&cache, id));
    assert_eq!(cache.ref_count(id), Some(1));

    cache.release(id).unwrap();
    assert_eq!(cache.state(id), NodeState::Free);
    assert_eq!(cache.resident_count(), 0);
    assert_eq!(cache.device().live_count(), 0);
    assert_eq!(cache.stats().blob_heap_used, 0);
}

#[test]
fn release_of_stale_id_is_fatal() {
    let mut cache = cache(4);
    let id = load(&mut cache, 1);
    cache.release(id).unwrap();

    let err = cache.release(id).unwrap_err();
    assert!(matches!(err, TexelError::InvalidNode(stale) if stale == id));
    assert!(err.is_fatal());
    assert!(cache.share(id).is_err());
}

#[test]
fn release_by_device_handle() {
    let mut cache = cache(4);
    let a = load(&mut cache, 1);
    let b = load(&mut cache, 2);
    let handle = cache.acquire_resident(b).unwrap().unwrap();

    assert!(cache.release_by_handle(handle).unwrap());
    assert_eq!(cache.state(b), NodeState::Free);
    assert_eq!(cache.state(a), NodeState::CachedOut);
    assert!(!cache.release_by_handle(handle).unwrap());
}

#[test]
fn purge_spares_only_never_flush_nodes() {
    let dir = tempfile::tempdir().unwrap();
    let ui = write_texture(&dir, "ui.tga", 4);
    let font = write_texture(&dir, "font.tga", 5);
    let mut cache = cache(4);

    let plain = load(&mut cache, 1);
    cache.share(plain).unwrap();
    cache.acquire_resident(plain).unwrap().unwrap();
    let pinned = cache
        .load(&ui, FormatKey::Solid, TextureHints::NONE, false, NeverFlush::PINNED)
        .unwrap();
    // Any non-zero mask survives a purge, even without the pin bit.
    let kept = cache
        .load(&font, FormatKey::Gray8, TextureHints::NONE, false, NeverFlush(0b10))
        .unwrap();

    assert_eq!(cache.purge(), 1);
    assert_eq!(cache.state(plain), NodeState::Free);
    assert_eq!(cache.state(pinned), NodeState::CachedOut);
    assert_eq!(cache.state(kept), NodeState::CachedOut);
    assert_eq!(cache.device().live_count(), 0);
    assert_eq!(cache.len(), 2);
}

#[test]
fn full_table_is_fatal() {
    let config = texel_core::CacheConfig {
        max_texture_bytes: 4096,
        ..texel_core::CacheConfig::with_budget(3, 1)
    };
    let mut cache =
        texel_cache::TextureManager::new(config, texel_gpu::HeadlessDevice::new()).unwrap();
    for seed in 0..3 {
        cache
            .load_from_memory(&texels(4, seed), FormatKey::Solid, TextureHints::NONE, 4, 4)
            .unwrap();
    }

    let err = cache
        .load_from_memory(&texels(4, 9), FormatKey::Solid, TextureHints::NONE, 4, 4)
        .unwrap_err();
    assert!(matches!(err, TexelError::TableFull { capacity: 3 }));
}

proptest! {
    #[test]
    fn node_destroyed_exactly_when_releases_balance(shares in 0u32..20) {
        let mut cache = cache(2);
        let id = load(&mut cache, 1);
        for _ in 0..shares {
            prop_assert_eq!(cache.share(id).unwrap(), id);
        }

        for remaining in (1..=shares).rev() {
            cache.release(id).unwrap();
            prop_assert_eq!(cache.ref_count(id), Some(remaining));
        }
        cache.release(id).unwrap();
        prop_assert_eq!(cache.state(id), NodeState::Free);
        prop_assert!(cache.is_empty());
    }
}
