use phototidy_core::{CollisionPolicy, TidyConfig, TidyError};
use phototidy_ops::{BatchOutcome, Classification, Pipeline};
use phototidy_scan::{Attribute, AttributeExtractor, DigestExtractor};
use std::collections::HashSet;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tempfile::TempDir;

fn set_mtime(path: &Path, y: i32, m: u32, d: u32) {
    use chrono::{Local, TimeZone};
    let when: SystemTime = Local
        .with_ymd_and_hms(y, m, d, 12, 0, 0)
        .single()
        .unwrap()
        .into();
    File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(when)
        .unwrap();
}

fn files_under(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                stack.push(path);
            } else {
                files.push(path);
            }
        }
    }
    files.sort();
    files
}

/// Ten files, four of them redundant copies.
fn create_library(root: &Path) {
    fs::create_dir_all(root.join("2023/trip")).unwrap();
    fs::create_dir_all(root.join("phone")).unwrap();

    fs::write(root.join("2023/trip/IMG_0001.jpg"), "mountain").unwrap();
    fs::write(root.join("2023/trip/IMG_0002.jpg"), "lake").unwrap();
    fs::write(root.join("2023/trip/IMG_0003.jpg"), "forest").unwrap();
    fs::write(root.join("2023/cover.jpg"), "cover").unwrap();
    fs::write(root.join("phone/IMG_0001.jpg"), "mountain").unwrap();
    fs::write(root.join("phone/lake.jpg"), "lake").unwrap();
    fs::write(root.join("phone/lake copy.jpg"), "lake").unwrap();
    fs::write(root.join("phone/selfie.jpg"), "selfie").unwrap();
    fs::write(root.join("phone/IMG_0003.jpg"), "forest").unwrap();
    fs::write(root.join("notes.txt"), "not a photo").unwrap();
}

fn dedupe_config(source: &Path, quarantine: &Path) -> TidyConfig {
    TidyConfig::builder()
        .source_root(source)
        .destination_root(quarantine)
        .workers(4usize)
        .build()
        .unwrap()
}

/// Refuses to read one file, as if its permissions were revoked.
struct Refusing {
    inner: DigestExtractor,
    refused: &'static str,
}

impl AttributeExtractor for Refusing {
    fn extract(&self, path: &Path) -> Option<Attribute> {
        if path.ends_with(self.refused) {
            None
        } else {
            self.inner.extract(path)
        }
    }
}

#[test]
fn test_dedupe_conserves_files() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("library");
    let quarantine = temp.path().join("dupes");
    create_library(&source);

    let pipeline = Pipeline::new(dedupe_config(&source, &quarantine)).unwrap();
    let summary = pipeline.dedupe().unwrap();

    assert_eq!(summary.files_scanned, 10);
    assert_eq!(summary.classified, 4);
    assert_eq!(summary.outcome(), BatchOutcome::Clean);

    let remaining = files_under(&source);
    let quarantined = files_under(&quarantine);
    assert_eq!(remaining.len() + quarantined.len(), 10);
    assert_eq!(quarantined.len(), 4);

    // Every remaining file holds distinct content
    let contents: HashSet<String> = remaining
        .iter()
        .map(|p| fs::read_to_string(p).unwrap())
        .collect();
    assert_eq!(contents.len(), remaining.len());

    // Lowest path wins within each group
    assert!(source.join("2023/trip/IMG_0001.jpg").exists());
    assert!(!source.join("phone/IMG_0001.jpg").exists());
}

#[test]
fn test_same_name_duplicates_do_not_overwrite() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("library");
    let quarantine = temp.path().join("dupes");
    create_library(&source);
    // A third forest copy under a name already headed for quarantine
    fs::create_dir_all(source.join("old")).unwrap();
    fs::write(source.join("old/IMG_0003.jpg"), "forest").unwrap();

    let summary = Pipeline::new(dedupe_config(&source, &quarantine))
        .unwrap()
        .dedupe()
        .unwrap();

    assert!(summary.relocation.is_success());
    let names: HashSet<String> = files_under(&quarantine)
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert!(names.contains("IMG_0003.jpg"));
    assert!(names.contains("IMG_0003 (1).jpg"));
}

#[test]
fn test_rerun_finds_nothing() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("library");
    create_library(&source);
    // Quarantine inside the source tree must not be rescanned
    let quarantine = source.join("dupes");

    let pipeline = Pipeline::new(dedupe_config(&source, &quarantine)).unwrap();
    let first = pipeline.dedupe().unwrap();
    assert_eq!(first.relocation.succeeded(), 4);

    let second = pipeline.dedupe().unwrap();
    assert_eq!(second.outcome(), BatchOutcome::NothingToDo);
    assert_eq!(second.files_scanned, 6);
    match second.classification {
        Classification::Duplicates(report) => assert!(!report.has_duplicates()),
        Classification::Dates(_) => panic!("expected duplicate report"),
    }
    assert_eq!(files_under(&quarantine).len(), 4);
}

#[test]
fn test_unreadable_file_is_skipped() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("library");
    let quarantine = temp.path().join("dupes");
    create_library(&source);

    let extractor = Arc::new(Refusing {
        inner: DigestExtractor::new(),
        refused: "phone/IMG_0001.jpg",
    });
    let summary = Pipeline::new(dedupe_config(&source, &quarantine))
        .unwrap()
        .dedupe_with(extractor)
        .unwrap();

    assert_eq!(summary.skipped.len(), 1);
    assert!(summary.skipped[0].ends_with("phone/IMG_0001.jpg"));
    assert_eq!(summary.warnings.len(), 1);
    assert_eq!(summary.classified, 3);
    assert!(source.join("phone/IMG_0001.jpg").exists());
    assert_eq!(summary.outcome(), BatchOutcome::Clean);
}

#[test]
fn test_dry_run_moves_nothing() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("library");
    let quarantine = temp.path().join("dupes");
    create_library(&source);

    let mut config = dedupe_config(&source, &quarantine);
    config.dry_run = true;
    let summary = Pipeline::new(config).unwrap().dedupe().unwrap();

    assert_eq!(summary.relocation.succeeded(), 4);
    assert!(summary.relocation.dry_run);
    assert_eq!(files_under(&source).len(), 10);
    assert!(!quarantine.exists());
}

#[test]
fn test_unwritable_destination_is_fatal() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("library");
    create_library(&source);
    let blocker = temp.path().join("blocker");
    fs::write(&blocker, "file").unwrap();

    let pipeline = Pipeline::new(dedupe_config(&source, &blocker.join("dupes"))).unwrap();
    let err = pipeline.dedupe().unwrap_err();

    assert!(matches!(err, TidyError::DestinationNotWritable { .. }));
    assert_eq!(files_under(&source).len(), 10);
}

#[test]
fn test_missing_source_is_fatal() {
    let temp = TempDir::new().unwrap();
    let pipeline = Pipeline::new(dedupe_config(
        &temp.path().join("nowhere"),
        &temp.path().join("dupes"),
    ))
    .unwrap();

    assert!(matches!(
        pipeline.organize().unwrap_err(),
        TidyError::NotFound { .. }
    ));
}

#[test]
fn test_organize_into_dated_folders() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("inbox");
    let sorted = temp.path().join("sorted");
    fs::create_dir_all(&source).unwrap();

    for i in 0..5 {
        let p = source.join(format!("party_{i}.jpg"));
        fs::write(&p, format!("{i}")).unwrap();
        set_mtime(&p, 2024, 3, 17);
    }
    for (i, (y, m, d)) in [(2023, 1, 5), (2023, 8, 9), (2022, 2, 2)].iter().enumerate() {
        let p = source.join(format!("misc_{i}.jpg"));
        fs::write(&p, "same bytes are fine here").unwrap();
        set_mtime(&p, *y, *m, *d);
    }

    let config = TidyConfig::builder()
        .source_root(&source)
        .destination_root(&sorted)
        .date_group_threshold(5usize)
        .build()
        .unwrap();
    let summary = Pipeline::new(config).unwrap().organize().unwrap();

    assert_eq!(summary.outcome(), BatchOutcome::Clean);
    assert_eq!(files_under(&sorted.join("17.03.2024")).len(), 5);
    assert_eq!(files_under(&sorted.join("2023")).len(), 2);
    assert_eq!(files_under(&sorted.join("2022")).len(), 1);
    assert!(files_under(&source).is_empty());
}

#[test]
fn test_blocked_folder_fails_only_its_bucket() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("inbox");
    let sorted = temp.path().join("sorted");
    fs::create_dir_all(&source).unwrap();
    fs::create_dir_all(&sorted).unwrap();
    fs::write(sorted.join("2024"), "not a folder").unwrap();

    for (name, y) in [("a.jpg", 2024), ("b.jpg", 2024), ("c.jpg", 2021)] {
        let p = source.join(name);
        fs::write(&p, name).unwrap();
        set_mtime(&p, y, 6, 1);
    }

    let config = TidyConfig::builder()
        .source_root(&source)
        .destination_root(&sorted)
        .collision(CollisionPolicy::Skip)
        .build()
        .unwrap();
    let summary = Pipeline::new(config).unwrap().organize().unwrap();

    assert_eq!(summary.outcome(), BatchOutcome::PartialFailure { failed: 2 });
    assert!(source.join("a.jpg").exists());
    assert!(source.join("b.jpg").exists());
    assert!(sorted.join("2021/c.jpg").exists());
}

#[test]
fn test_progress_covers_both_phases() {
    use phototidy_core::Phase;

    let temp = TempDir::new().unwrap();
    let source = temp.path().join("library");
    create_library(&source);

    let pipeline = Pipeline::new(dedupe_config(&source, &temp.path().join("dupes"))).unwrap();
    let mut rx = pipeline.subscribe();
    pipeline.dedupe().unwrap();

    let events: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
    let extracting = events.iter().filter(|p| p.phase == Phase::Extracting).count();
    let relocating = events.iter().filter(|p| p.phase == Phase::Relocating).count();
    assert_eq!(extracting, 11);
    assert_eq!(relocating, 5);
}

#[test]
fn test_source_inside_destination_is_scanned() {
    let temp = TempDir::new().unwrap();
    let pictures = temp.path().join("Pictures");
    let inbox = pictures.join("inbox");
    fs::create_dir_all(&inbox).unwrap();
    for (name, d) in [("a.jpg", 1), ("b.jpg", 2), ("c.jpg", 3), ("d.jpg", 4)] {
        let p = inbox.join(name);
        fs::write(&p, name).unwrap();
        set_mtime(&p, 2020, 5, d);
    }

    let config = TidyConfig::builder()
        .source_root(&inbox)
        .destination_root(&pictures)
        .build()
        .unwrap();
    let summary = Pipeline::new(config).unwrap().organize().unwrap();

    assert_eq!(summary.files_scanned, 4);
    assert_eq!(summary.relocation.succeeded(), 4);
    assert_eq!(files_under(&pictures.join("2020")).len(), 4);
    assert!(files_under(&inbox).is_empty());
}

#[test]
fn test_dedupe_source_inside_quarantine_is_scanned() {
    let temp = TempDir::new().unwrap();
    let quarantine = temp.path().join("dupes");
    let source = quarantine.join("library");
    create_library(&source);

    let summary = Pipeline::new(dedupe_config(&source, &quarantine))
        .unwrap()
        .dedupe()
        .unwrap();

    assert_eq!(summary.files_scanned, 10);
    assert_eq!(summary.relocation.succeeded(), 4);
    assert_eq!(files_under(&source).len(), 6);
}
