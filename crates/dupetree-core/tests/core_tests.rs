use dupetree_core::record::{display_lossy, read_records};
use dupetree_core::{
    ContentHash, FileTree, FingerprintStore, HashRecord, ParseMode, RecordWriter, ScanConfig,
    SizeRecord, TreeError,
};
use std::fs::File;
use std::io::{BufReader, LineWriter};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[test]
fn test_content_hash_serde_is_hex() {
    let hash = ContentHash::of(b"abc");
    let text = format!("{hash}");
    assert_eq!(text, "900150983cd24fb0d6963f7d28e17f72");
    assert_eq!(text.parse::<ContentHash>().unwrap(), hash);
}

#[test]
fn test_tree_single_root_after_many_inserts() {
    let mut tree = FileTree::new("/r");
    let h = ContentHash::of(b"x");
    for path in ["/r/a/b/1", "/r/a/2", "/r/c/3", "/r/a/b/d/4"] {
        tree.insert_file(Path::new(path), Some(1), Some(h)).unwrap();
    }

    // every non-root directory has a parent, and the parent lists it
    for dir in tree.dirs().skip(1) {
        let parent = dir.parent.expect("non-root dir has a parent");
        assert!(tree.dir(parent).subdirs.contains(&dir.id));
    }
    assert!(tree.dir(tree.root()).parent.is_none());
    assert_eq!(tree.files_recursive(tree.root()).count(), 4);
}

#[test]
fn test_record_files_round_trip_through_disk() {
    let temp = TempDir::new().unwrap();
    let hashes_path = temp.path().join("hashes.txt");
    let sizes_path = temp.path().join("sizes.txt");

    let h1 = ContentHash::of(b"one");
    let h2 = ContentHash::of(b"two");
    {
        let mut hashes = RecordWriter::new(LineWriter::new(File::create(&hashes_path).unwrap()));
        let mut sizes = RecordWriter::new(LineWriter::new(File::create(&sizes_path).unwrap()));
        hashes.append(&HashRecord::new(h1, "/r/a.txt")).unwrap();
        sizes.append(&SizeRecord::new(3, "/r/a.txt")).unwrap();
        hashes.append(&HashRecord::new(h2, "/r/sub/b.txt")).unwrap();
        sizes.append(&SizeRecord::new(3, "/r/sub/b.txt")).unwrap();
    }

    let hashes = read_records::<HashRecord>(
        BufReader::new(File::open(&hashes_path).unwrap()),
        ParseMode::Strict,
    )
    .unwrap();
    let sizes = read_records::<SizeRecord>(
        BufReader::new(File::open(&sizes_path).unwrap()),
        ParseMode::Strict,
    )
    .unwrap();

    let store = FingerprintStore::from_records(hashes.records, sizes.records);
    assert_eq!(store.len(), 2);
    assert_eq!(store.common_root(), Some(PathBuf::from("/r")));

    let outcome = store.to_tree(Path::new("/r"), ParseMode::Strict).unwrap();
    assert_eq!(outcome.tree.file_count(), 2);
    assert_eq!(outcome.tree.stats.total_size, 6);
    let b = outcome.tree.find_file(Path::new("/r/sub/b.txt")).unwrap();
    assert_eq!(outcome.tree.file(b).hash(), Some(h2));
}

#[test]
fn test_store_to_tree_under_wrong_root() {
    let store = FingerprintStore::from_records(
        vec![HashRecord::new(ContentHash::of(b"a"), "/r/a")],
        Vec::new(),
    );
    let result = store.to_tree(Path::new("/elsewhere"), ParseMode::Strict);
    assert!(matches!(result, Err(TreeError::PathMismatch { .. })));

    let outcome = store
        .to_tree(Path::new("/elsewhere"), ParseMode::Relaxed)
        .unwrap();
    assert_eq!(outcome.tree.file_count(), 0);
    assert_eq!(outcome.rejected_count(), 1);
}

#[test]
fn test_display_lossy_plain_path() {
    assert_eq!(display_lossy(Path::new("/a/b")), "/a/b");
}

#[test]
fn test_scan_config_serde_defaults() {
    let config: ScanConfig = serde_json::from_str(r#"{"root": "/data"}"#).unwrap();
    assert!(config.include_hidden);
    assert_eq!(config.hidden_marker, '.');
    assert_eq!(config.chunk_size, dupetree_core::DEFAULT_CHUNK_SIZE);
}
