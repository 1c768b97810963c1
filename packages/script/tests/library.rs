//! Cached unit libraries backed by real files.

use std::fs;
use std::sync::Arc;

use chrono::{Duration, Utc};
use loadstone_entity::{CachingLoader, EntityLoader, ManualClock, Value};
use loadstone_script::{InstanceLoader, NativeCompiler};
use loadstone_source::{ErrorKind, FileSystemSource};

fn library(dir: &std::path::Path) -> InstanceLoader {
    let source = Arc::new(FileSystemSource::in_dir(dir, "").with_name("library"));
    InstanceLoader::new("units", source, Arc::new(NativeCompiler)).with_affixes("", ".unit")
}

#[test]
fn edits_are_picked_up_after_the_lifetime() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("fees")).unwrap();
    let file = dir.path().join("fees/flat.unit");
    fs::write(&file, "package fees\nunit flat { invoke { return 5 } }").unwrap();

    let clock = Arc::new(ManualClock::new(Utc::now() - Duration::days(1)));
    let units = CachingLoader::new(60_000, library(dir.path())).with_clock(clock.clone());

    let unit = units.load("fees/flat").unwrap();
    assert_eq!(unit.qualified_name(), "fees.flat");
    assert_eq!(unit.invoke(&mut Value::Null).unwrap(), Value::Integer(5));

    fs::write(&file, "package fees\nunit flat { invoke { return 7 } }").unwrap();
    clock.advance_ms(30_000);
    let same = units.load("fees/flat").unwrap();
    assert!(Arc::ptr_eq(&unit, &same));

    clock.advance_ms(60_000);
    let edited = units.load("fees/flat").unwrap();
    assert_eq!(edited.invoke(&mut Value::Null).unwrap(), Value::Integer(7));
    assert_eq!(units.stats().loads, 2);
}

#[test]
fn broken_edit_keeps_failing_until_fixed() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("calc.unit");
    fs::write(&file, "unit calc { invoke { return (1 + } }").unwrap();

    let units = CachingLoader::new(60_000, library(dir.path()));
    assert_eq!(units.load("calc").err().unwrap().kind(), ErrorKind::ParseFailure);
    assert!(units.is_empty());

    fs::write(&file, "unit calc { invoke { return 1 + 1 } }").unwrap();
    let unit = units.load("calc").unwrap();
    assert_eq!(unit.invoke(&mut Value::Null).unwrap(), Value::Integer(2));
    assert_eq!(units.stats().failures, 1);
}

#[test]
fn units_keep_no_state_between_invocations() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("tally.unit"),
        "unit tally {\n  invoke {\n    let n = int(ctx.n)\n    set n = n + 1\n    return ctx.n\n  }\n}",
    )
    .unwrap();

    let units = CachingLoader::new(60_000, library(dir.path()));
    let unit = units.load("tally").unwrap();

    let mut first = Value::from_json(serde_json::json!({"n": 1}));
    let mut second = Value::from_json(serde_json::json!({"n": 10}));
    assert_eq!(unit.invoke(&mut first).unwrap(), Value::Integer(2));
    assert_eq!(unit.invoke(&mut second).unwrap(), Value::Integer(11));
}
