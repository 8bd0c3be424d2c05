use merkledag_core::{
    Algorithm, ContentHasher, Dag, DagConfig, DirWrites, Error, FsStore, KvStore, ObjectKind,
    TypeTag,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_sample_tree(root: &Path) {
    fs::create_dir_all(root.join("docs/nested")).unwrap();
    fs::create_dir_all(root.join("empty")).unwrap();
    fs::write(root.join("readme.txt"), b"hello merkle dag").unwrap();
    fs::write(root.join("docs/a.txt"), b"shared content").unwrap();
    fs::write(root.join("docs/nested/b.txt"), b"shared content").unwrap();

    let big: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
    fs::write(root.join("big.bin"), big).unwrap();
}

fn small_blocks() -> DagConfig {
    DagConfig {
        block_size: 64 * 1024,
        dir_writes: DirWrites::Final,
    }
}

#[test]
fn add_and_materialize_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("source");
    write_sample_tree(&source);

    let store = FsStore::init(temp_dir.path().join("store"), Algorithm::Blake3).unwrap();
    let mut dag = Dag::with_hasher(store, ContentHasher::blake3(), small_blocks()).unwrap();

    let root = dag.add_path(&source).unwrap();

    let entries = dag.read_dir(&root).unwrap();
    let listing: Vec<(TypeTag, &str)> = entries
        .iter()
        .map(|(tag, link)| (*tag, link.name.as_str()))
        .collect();
    assert_eq!(
        listing,
        vec![
            (TypeTag::List, "big.bin"),
            (TypeTag::Tree, "docs"),
            (TypeTag::Tree, "empty"),
            (TypeTag::Blob, "readme.txt"),
        ]
    );
    assert_eq!(entries[0].1.size, 200_000);

    let restored = temp_dir.path().join("restored");
    dag.materialize(&root, &restored).unwrap();

    assert_eq!(
        fs::read(restored.join("readme.txt")).unwrap(),
        b"hello merkle dag"
    );
    assert_eq!(
        fs::read(restored.join("docs/nested/b.txt")).unwrap(),
        b"shared content"
    );
    assert_eq!(
        fs::read(restored.join("big.bin")).unwrap(),
        fs::read(source.join("big.bin")).unwrap()
    );
    assert!(restored.join("empty").is_dir());

    // Refuses to overwrite
    assert!(matches!(
        dag.materialize(&root, &restored),
        Err(Error::PathExists { .. })
    ));
}

#[test]
fn reopened_store_sees_previous_objects() {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("source");
    write_sample_tree(&source);
    let store_path = temp_dir.path().join("store");

    let first = {
        let store = FsStore::init(&store_path, Algorithm::Blake3).unwrap();
        let mut dag = Dag::with_hasher(store, ContentHasher::blake3(), small_blocks()).unwrap();
        dag.add_path(&source).unwrap()
    };

    let store = FsStore::open(&store_path).unwrap();
    assert!(store.has(&first).unwrap());

    let mut dag = Dag::with_hasher(store, ContentHasher::blake3(), small_blocks()).unwrap();
    let second = dag.add_path(&source).unwrap();

    assert_eq!(first, second);
    assert_eq!(dag.stats().objects_written, 0);
    assert!(dag.stats().dedup_hits > 0);
}

#[test]
fn single_file_root_is_a_blob() {
    let temp_dir = TempDir::new().unwrap();
    let file = temp_dir.path().join("note.txt");
    fs::write(&file, b"helloworld").unwrap();

    let store = FsStore::init(temp_dir.path().join("store"), Algorithm::Sha256).unwrap();
    let mut dag = Dag::with_hasher(store, ContentHasher::sha256(), DagConfig::default()).unwrap();

    let root = dag.add_path(&file).unwrap();
    let object = dag.get_object(&root).unwrap();
    assert_eq!(object.kind(), ObjectKind::Blob);
    assert_eq!(object.raw().unwrap(), b"helloworld");
}

#[test]
fn hasher_must_match_store_algorithm() {
    let temp_dir = TempDir::new().unwrap();
    let store = FsStore::init(temp_dir.path().join("store"), Algorithm::Sha256).unwrap();

    assert!(matches!(
        Dag::new(store),
        Err(Error::AlgorithmMismatch { .. })
    ));
}
