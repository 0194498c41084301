//! Integration tests for lazy materialization and eviction.

use crate::common::{advance, cache, is_resident, load, texels, Cache};
use proptest::prelude::*;
use texel_cache::{NodeState, TextureManager};
use texel_core::{CacheConfig, FormatKey, NeverFlush, NodeId, TextureHints};
use texel_gpu::HeadlessDevice;

#[test]
fn loaded_texture_stays_cached_out_until_acquired() {
    let mut cache = cache(4);
    let id = load(&mut cache, 1);

    assert_eq!(cache.state(id), NodeState::CachedOut);
    assert_eq!(cache.device().created_count(), 0);

    let handle = cache.acquire_resident(id).unwrap().unwrap();
    assert_eq!(cache.state(id), NodeState::Resident(handle));
    assert_eq!(cache.device().texture(handle).unwrap().data, texels(8, 1));
}

#[test]
fn third_texture_evicts_first_in_table_order() {
    let mut cache = cache(2);
    let a = load(&mut cache, 1);
    let b = load(&mut cache, 2);
    let c = load(&mut cache, 3);

    cache.acquire_resident(a).unwrap().unwrap();
    cache.acquire_resident(b).unwrap().unwrap();
    assert_eq!(cache.resident_count(), 2);

    advance(&mut cache, 1);
    cache.acquire_resident(c).unwrap().unwrap();

    assert_eq!(cache.state(a), NodeState::CachedOut);
    assert!(is_resident(&cache, b));
    assert!(is_resident(&cache, c));
    assert_eq!(cache.resident_count(), 2);
    assert_eq!(cache.device().live_count(), 2);
}

#[test]
fn nothing_touched_this_turn_is_evictable() {
    let mut cache = cache(2);
    let a = load(&mut cache, 1);
    let b = load(&mut cache, 2);
    let c = load(&mut cache, 3);

    cache.acquire_resident(a).unwrap().unwrap();
    cache.acquire_resident(b).unwrap().unwrap();

    // Same turn: every resident node is idle 0, which no tier accepts.
    assert_eq!(cache.acquire_resident(c).unwrap(), None);
    assert_eq!(cache.state(c), NodeState::CachedOut);
    assert_eq!(cache.stats().out_of_handles, 1);
}

/// Put `first` and `second` resident so that at the end `first` is idle
/// `first_idle` turns and `second` is idle `second_idle` turns.
fn age(cache: &mut Cache, first: NodeId, first_idle: u64, second: NodeId, second_idle: u64) {
    let (older, older_idle, newer, newer_idle) = if first_idle >= second_idle {
        (first, first_idle, second, second_idle)
    } else {
        (second, second_idle, first, first_idle)
    };
    cache.acquire_resident(older).unwrap().unwrap();
    advance(cache, older_idle - newer_idle);
    cache.acquire_resident(newer).unwrap().unwrap();
    advance(cache, newer_idle);
}

#[test]
fn eviction_prefers_table_order_over_idle_time() {
    // The more idle node comes first: it is evicted.
    let mut cache1 = cache(2);
    let a = load(&mut cache1, 1);
    let b = load(&mut cache1, 2);
    let c = load(&mut cache1, 3);
    age(&mut cache1, a, 200, b, 180);
    cache1.acquire_resident(c).unwrap().unwrap();
    assert_eq!(cache1.state(a), NodeState::CachedOut);
    assert!(is_resident(&cache1, b));

    // Same idle times, opposite table order: the less idle node goes.
    let mut cache2 = cache(2);
    let b = load(&mut cache2, 2);
    let a = load(&mut cache2, 1);
    let c = load(&mut cache2, 3);
    age(&mut cache2, a, 200, b, 180);
    cache2.acquire_resident(c).unwrap().unwrap();
    assert_eq!(cache2.state(b), NodeState::CachedOut);
    assert!(is_resident(&cache2, a));
}

#[test]
fn exempt_nodes_survive_pressure() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hud.tga");
    std::fs::write(&path, texels(8, 7)).unwrap();

    let mut cache = cache(2);
    let pinned = cache
        .load(&path, FormatKey::Solid, TextureHints::NONE, false, NeverFlush::PINNED)
        .unwrap();
    let unique = cache
        .load(&path, FormatKey::Keyed, TextureHints::NONE, true, NeverFlush::NONE)
        .unwrap();
    let other = load(&mut cache, 3);
    assert_ne!(pinned, unique);

    cache.acquire_resident(pinned).unwrap().unwrap();
    cache.acquire_resident(unique).unwrap().unwrap();
    advance(&mut cache, 500);

    assert_eq!(cache.acquire_resident(other).unwrap(), None);
    assert!(!cache.evict_one());
    assert!(is_resident(&cache, pinned));
    assert!(is_resident(&cache, unique));
    assert_eq!(cache.state(other), NodeState::CachedOut);
    assert_eq!(cache.stats().out_of_handles, 1);
}

#[test]
fn housekeeping_evicts_after_sixty_idle_turns() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sky.tga");
    std::fs::write(&path, texels(8, 5)).unwrap();

    let config = CacheConfig {
        max_texture_bytes: 64 * 1024,
        ..CacheConfig::with_budget(16, 8)
    };
    let mut cache = TextureManager::new(config, HeadlessDevice::new()).unwrap();
    let plain = cache
        .load_from_memory(&texels(8, 1), FormatKey::Solid, TextureHints::NONE, 8, 4)
        .unwrap();
    let pinned = cache
        .load(&path, FormatKey::Solid, TextureHints::NONE, false, NeverFlush::PINNED)
        .unwrap();
    let unique = cache
        .load(&path, FormatKey::Solid, TextureHints::NONE, true, NeverFlush::NONE)
        .unwrap();
    for id in [plain, pinned, unique] {
        cache.acquire_resident(id).unwrap().unwrap();
    }

    for _ in 0..60 {
        assert_eq!(cache.housekeeping(), 0);
    }
    assert!(is_resident(&cache, plain));

    assert_eq!(cache.housekeeping(), 1);
    assert_eq!(cache.state(plain), NodeState::CachedOut);
    assert!(is_resident(&cache, pinned));
    assert!(is_resident(&cache, unique));
    assert_eq!(cache.stats().housekeeping_evictions, 1);

    // Evicted data is still there.
    cache.acquire_resident(plain).unwrap().unwrap();
}

#[test]
fn stale_id_is_soft_on_acquire() {
    let mut cache = cache(2);
    let a = load(&mut cache, 1);
    cache.release(a).unwrap();
    let b = load(&mut cache, 2);

    assert_eq!(a.index(), b.index());
    assert_eq!(cache.acquire_resident(a).unwrap(), None);
    assert_eq!(cache.state(a), NodeState::Free);
    assert_eq!(cache.state(b), NodeState::CachedOut);
    assert_eq!(cache.stats().bad_handles, 1);
}

#[test]
fn device_failure_leaves_node_cached_out() {
    let mut cache = cache(2);
    let a = load(&mut cache, 1);
    cache.device_mut().set_fail_creates(true);

    assert_eq!(cache.acquire_resident(a).unwrap(), None);
    assert_eq!(cache.state(a), NodeState::CachedOut);
    assert_eq!(cache.stats().soft_failures(), 1);
}

#[derive(Debug, Clone)]
enum Op {
    Acquire(usize),
    Housekeeping,
    Release(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        6 => (0usize..12).prop_map(Op::Acquire),
        3 => Just(Op::Housekeeping),
        1 => (0usize..12).prop_map(Op::Release),
    ]
}

proptest! {
    #[test]
    fn resident_count_never_exceeds_budget(
        max_resident in 1usize..5,
        ops in proptest::collection::vec(op(), 1..200),
    ) {
        let config = CacheConfig {
            max_texture_bytes: 4096,
            housekeeping_idle_turns: 8,
            ..CacheConfig::with_budget(16, max_resident)
        };
        let mut cache = TextureManager::new(config, HeadlessDevice::new()).unwrap();
        let mut ids: Vec<_> = (0..12u8)
            .map(|seed| {
                cache
                    .load_from_memory(&texels(4, seed), FormatKey::Solid, TextureHints::NONE, 4, 4)
                    .ok()
            })
            .collect();

        for op in ops {
            match op {
                Op::Acquire(i) => {
                    if let Some(id) = ids[i] {
                        if let Some(handle) = cache.acquire_resident(id).unwrap() {
                            prop_assert_eq!(cache.state(id), NodeState::Resident(handle));
                        }
                    }
                }
                Op::Housekeeping => {
                    cache.housekeeping();
                }
                Op::Release(i) => {
                    if let Some(id) = ids[i].take() {
                        cache.release(id).unwrap();
                    }
                }
            }
            prop_assert!(cache.resident_count() <= max_resident);
            prop_assert_eq!(cache.device().live_count(), cache.resident_count());
        }
    }
}
