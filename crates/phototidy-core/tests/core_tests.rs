use phototidy_core::{
    Attribute, CollisionPolicy, ContentHash, Extracted, FileEntry, OriginalSelection, Phase,
    Progress, TidyConfig,
};
use std::path::PathBuf;

#[test]
fn test_content_hash_creation_and_hex() {
    let bytes = [0xab; 32];
    let hash = ContentHash::new(bytes);

    let hex = hash.to_hex();
    assert_eq!(hex.len(), 64);
    assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
    assert!(hex.starts_with("ab"));

    assert_eq!(hash, ContentHash::new(bytes));
    assert_ne!(hash, ContentHash::new([0xcd; 32]));
}

#[test]
fn test_file_entry_ordering() {
    let mut entries = vec![
        FileEntry::new("/photos/b.jpg"),
        FileEntry::new("/photos/a/z.jpg"),
        FileEntry::new("/photos/a.jpg"),
    ];
    entries.sort();

    let paths: Vec<_> = entries.iter().map(|e| e.path().to_path_buf()).collect();
    assert_eq!(
        paths,
        vec![
            PathBuf::from("/photos/a/z.jpg"),
            PathBuf::from("/photos/a.jpg"),
            PathBuf::from("/photos/b.jpg"),
        ]
    );
}

#[test]
fn test_extracted_skipped() {
    let skipped = Extracted::new(FileEntry::new("/photos/locked.jpg"), None);
    assert!(skipped.is_skipped());

    let hashed = Extracted::new(
        FileEntry::new("/photos/ok.jpg"),
        Some(Attribute::Digest(ContentHash::new([1; 32]))),
    );
    assert!(!hashed.is_skipped());
}

#[test]
fn test_tidy_config_deserialize_defaults() {
    let config: TidyConfig = serde_json::from_str(
        r#"{
            "source_root": "/photos",
            "destination_root": "/sorted",
            "collision": "skip",
            "original_selection": "arrival-order"
        }"#,
    )
    .unwrap();

    assert_eq!(config.date_group_threshold, 5);
    assert_eq!(config.collision, CollisionPolicy::Skip);
    assert_eq!(config.original_selection, OriginalSelection::ArrivalOrder);
    assert!(config.include_hidden);
    assert!(config.validate().is_ok());
}

#[test]
fn test_tidy_config_validate_rejects_zero_threshold() {
    let mut config = TidyConfig::new("/photos", "/sorted");
    config.date_group_threshold = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_phase_display() {
    assert_eq!(Phase::Extracting.to_string(), "extracting attributes");
    assert_eq!(Phase::Relocating.to_string(), "relocating files");

    let p = Progress::new(Phase::Relocating, 3, 3, Some(PathBuf::from("/a.jpg")));
    assert!(p.is_finished());
}
