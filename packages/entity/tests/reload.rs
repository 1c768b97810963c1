//! Cache freshness against real files.

use std::fs;
use std::sync::Arc;

use chrono::{Duration, Utc};
use loadstone_entity::{
    CachingLoader, EntityLoader, ManualClock, PropertiesDecoder, SourceLoader, TextDecoder,
};
use loadstone_source::{ByteSource, FileSystemSource, FixedTextSource, SourceChain};

#[test]
fn file_newer_than_entry_is_reloaded() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("motd.txt"), "first").unwrap();

    // Entries look as if they were loaded long before the file was written.
    let clock = Arc::new(ManualClock::new(Utc::now() - Duration::days(1)));
    let source = Arc::new(FileSystemSource::in_dir(dir.path(), ".txt"));
    let cache = CachingLoader::new(1_000, SourceLoader::new(source, TextDecoder))
        .with_clock(clock.clone());

    assert_eq!(*cache.load("motd").unwrap(), "first");

    fs::write(dir.path().join("motd.txt"), "second").unwrap();
    clock.advance_ms(500);
    assert_eq!(*cache.load("motd").unwrap(), "first");

    clock.advance_ms(1_000);
    assert_eq!(*cache.load("motd").unwrap(), "second");
    assert_eq!(cache.stats().loads, 2);
}

#[test]
fn file_older_than_entry_is_kept() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("motd.txt"), "first").unwrap();

    let clock = Arc::new(ManualClock::new(Utc::now() + Duration::days(1)));
    let source = Arc::new(FileSystemSource::in_dir(dir.path(), ".txt"));
    let cache = CachingLoader::new(1_000, SourceLoader::new(source, TextDecoder))
        .with_clock(clock.clone());

    let first = cache.load("motd").unwrap();
    fs::write(dir.path().join("motd.txt"), "second").unwrap();
    clock.advance_ms(5_000);

    let again = cache.load("motd").unwrap();
    assert!(Arc::ptr_eq(&first, &again));
    assert_eq!(cache.stats().revalidations, 1);
}

#[test]
fn chained_defaults_behind_local_overrides() {
    let dir = tempfile::tempdir().unwrap();
    let local: Arc<dyn ByteSource> = Arc::new(FileSystemSource::in_dir(dir.path(), ""));
    let defaults: Arc<dyn ByteSource> = Arc::new(
        FixedTextSource::new("defaults", "app.properties", "port=80\nhost=localhost").unwrap(),
    );
    let chain = SourceChain::new("config", vec![local, defaults]).unwrap();
    let loader = SourceLoader::new(Arc::new(chain), PropertiesDecoder).with_affixes("", ".properties");

    let props = loader.load("app").unwrap();
    assert_eq!(props.get("port"), Some("80"));

    fs::write(dir.path().join("app.properties"), "port=9090").unwrap();
    let props = loader.load("app").unwrap();
    assert_eq!(props.get("port"), Some("9090"));
    assert_eq!(props.get("host"), None);
}
