//! Layered lookups across several directories and a bundled default.

use std::fs;
use std::sync::Arc;

use loadstone_source::{
    BundleSource, ByteSink, ByteSource, ErrorKind, FileSystemSource, SourceChain,
};

struct Layers {
    _dirs: Vec<tempfile::TempDir>,
    roots: Vec<std::path::PathBuf>,
    chain: SourceChain,
}

fn layers() -> Layers {
    let dirs: Vec<_> = (0..3).map(|_| tempfile::tempdir().unwrap()).collect();
    let roots: Vec<_> = dirs.iter().map(|d| d.path().to_path_buf()).collect();

    let mut children: Vec<Arc<dyn ByteSource>> = roots
        .iter()
        .enumerate()
        .map(|(i, root)| {
            Arc::new(FileSystemSource::in_dir(root, ".txt").with_name(format!("layer{}", i)))
                as Arc<dyn ByteSource>
        })
        .collect();
    children.push(Arc::new(
        BundleSource::new("builtin")
            .with_entry("greeting.txt", b"hello from the bundle".as_slice())
            .with_affixes("", ".txt"),
    ));

    let chain = SourceChain::new("layers", children).unwrap();
    Layers {
        _dirs: dirs,
        roots,
        chain,
    }
}

fn read(chain: &SourceChain, key: &str) -> String {
    String::from_utf8(chain.read_bytes(key).unwrap().to_vec()).unwrap()
}

#[test]
fn earliest_layer_wins() {
    let layers = layers();
    assert_eq!(read(&layers.chain, "greeting"), "hello from the bundle");

    fs::write(layers.roots[2].join("greeting.txt"), "third").unwrap();
    assert_eq!(read(&layers.chain, "greeting"), "third");

    fs::write(layers.roots[0].join("greeting.txt"), "first").unwrap();
    assert_eq!(read(&layers.chain, "greeting"), "first");

    fs::remove_file(layers.roots[0].join("greeting.txt")).unwrap();
    assert_eq!(read(&layers.chain, "greeting"), "third");
}

#[test]
fn nested_keys_resolve_in_subdirectories() {
    let layers = layers();
    let store = FileSystemSource::in_dir(&layers.roots[1], ".txt");
    store.write("mail/welcome", b"welcome aboard").unwrap();

    assert!(layers.roots[1].join("mail/welcome.txt").is_file());
    assert_eq!(read(&layers.chain, "mail/welcome"), "welcome aboard");
    assert!(layers.chain.last_modified("mail/welcome").is_some());
}

#[test]
fn miss_everywhere_lists_every_path() {
    let layers = layers();
    let err = layers.chain.read_bytes("absent").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let message = err.to_string();
    for root in &layers.roots {
        assert!(message.contains(&root.join("absent.txt").display().to_string()), "{}", message);
    }
}

#[test]
fn directory_is_not_a_resource() {
    let layers = layers();
    fs::create_dir(layers.roots[0].join("greeting.txt")).unwrap();

    // The directory in the first layer is skipped like a missing file.
    assert_eq!(read(&layers.chain, "greeting"), "hello from the bundle");
}
