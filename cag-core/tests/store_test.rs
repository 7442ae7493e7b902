//! Persistent cache store behaviour across store instances

use cag_core::{CacheEntry, KvCacheStore};
use tempfile::tempdir;

#[test]
fn test_round_trip_across_instances() {
    let dir = tempdir().unwrap();
    let plain = vec![CacheEntry::new("alpha"), CacheEntry::new("")];
    let embedded = vec![
        CacheEntry::with_embedding("beta", vec![0.25, -1.5, 3.0e-7]),
        CacheEntry::with_embedding("gamma", Vec::new()),
    ];

    {
        let store = KvCacheStore::new(dir.path()).unwrap();
        store.save("plain", &plain).unwrap();
        store.save("embedded", &embedded).unwrap();
    }

    let store = KvCacheStore::new(dir.path()).unwrap();
    assert_eq!(store.load("plain").unwrap(), Some(plain));
    assert_eq!(store.load("embedded").unwrap(), Some(embedded));
}

#[test]
fn test_save_overwrites_instead_of_merging() {
    let dir = tempdir().unwrap();
    let store = KvCacheStore::new(dir.path()).unwrap();

    store
        .save("k", &[CacheEntry::new("one"), CacheEntry::new("two")])
        .unwrap();
    store.save("k", &[CacheEntry::new("three")]).unwrap();

    assert_eq!(store.load("k").unwrap(), Some(vec![CacheEntry::new("three")]));
}

#[test]
fn test_unknown_key_is_absent() {
    let dir = tempdir().unwrap();
    let store = KvCacheStore::new(dir.path()).unwrap();
    assert_eq!(store.load("unknown").unwrap(), None);
}

#[test]
fn test_keys_and_reset() {
    let dir = tempdir().unwrap();
    let store = KvCacheStore::new(dir.path()).unwrap();

    for key in ["zeta", "alpha/beta", "mid key"] {
        store.save(key, &[CacheEntry::new(key)]).unwrap();
    }
    // Unrelated files in the directory are left alone
    std::fs::write(dir.path().join("notes.txt"), "keep me").unwrap();

    assert_eq!(
        store.keys().unwrap(),
        vec!["alpha/beta".to_string(), "mid key".to_string(), "zeta".to_string()]
    );

    assert_eq!(store.reset().unwrap(), 3);
    assert!(store.keys().unwrap().is_empty());
    assert_eq!(store.load("zeta").unwrap(), None);
    assert!(dir.path().join("notes.txt").exists());
}

#[test]
fn test_creates_missing_directory() {
    let dir = tempdir().unwrap();
    let nested = dir.path().join("a").join("b");
    let store = KvCacheStore::new(&nested).unwrap();

    store.save("k", &[CacheEntry::new("x")]).unwrap();
    assert!(nested.is_dir());
    assert_eq!(store.cache_dir(), nested.as_path());
}
