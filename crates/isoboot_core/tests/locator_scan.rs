use isoboot_core::{locate, ArtifactFilter, ArtifactKind, LocateError, RootSet};
use std::fs;
use std::path::{Path, PathBuf};

fn touch(path: &Path) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, b"").unwrap();
}

fn file_names(entries: &[isoboot_core::ArtifactEntry]) -> Vec<String> {
    entries
        .iter()
        .map(|entry| entry.file_name().unwrap().to_string())
        .collect()
}

#[test]
fn scenario_keeps_libraries_and_resource_root_only() {
    let home = tempfile::tempdir().unwrap();
    touch(&home.path().join("extensions/a.jar"));
    touch(&home.path().join("extensions/b.jar"));
    touch(&home.path().join("extensions/bootstrap-client-x.jar"));
    fs::create_dir_all(home.path().join("config")).unwrap();

    let roots = RootSet::new(["extensions"], ["config"]);
    let entries = locate(home.path(), &roots, &ArtifactFilter::default()).unwrap();

    assert_eq!(entries.len(), 3);
    assert_eq!(file_names(&entries), vec!["a.jar", "b.jar", "config"]);
    assert_eq!(entries[0].kind(), ArtifactKind::Library);
    assert_eq!(entries[1].kind(), ArtifactKind::Library);
    assert_eq!(entries[2].kind(), ArtifactKind::ResourceRoot);
    assert!(entries.iter().all(|entry| entry.path().is_absolute()));
}

#[test]
fn returns_exactly_the_matching_files_for_any_mix() {
    for (matching, non_matching) in [(0, 0), (0, 3), (1, 0), (4, 2), (7, 5)] {
        let home = tempfile::tempdir().unwrap();
        let root = home.path().join("extensions");
        fs::create_dir_all(&root).unwrap();
        for index in 0..matching {
            touch(&root.join(format!("lib-{index}.jar")));
        }
        for index in 0..non_matching {
            let name = match index % 3 {
                0 => format!("notes-{index}.txt"),
                1 => format!("bootstrap-client-{index}.jar"),
                _ => format!("lib-{index}.jar.sha1"),
            };
            touch(&root.join(name));
        }

        let roots = RootSet::new(["extensions"], Vec::<PathBuf>::new());
        let entries = locate(home.path(), &roots, &ArtifactFilter::default()).unwrap();
        assert_eq!(
            entries.len(),
            matching,
            "matching={matching} non_matching={non_matching}"
        );
        assert!(entries
            .iter()
            .all(|entry| entry.kind() == ArtifactKind::Library));
    }
}

#[test]
fn missing_artifact_root_is_a_discovery_error() {
    let home = tempfile::tempdir().unwrap();
    fs::create_dir_all(home.path().join("extensions")).unwrap();

    let roots = RootSet::new(["extensions", "bootstrap-libs"], ["config"]);
    let err = locate(home.path(), &roots, &ArtifactFilter::default()).unwrap_err();
    match err {
        LocateError::ListRoot { root, .. } => {
            assert!(root.ends_with("bootstrap-libs"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn artifact_root_that_is_a_file_is_a_discovery_error() {
    let home = tempfile::tempdir().unwrap();
    touch(&home.path().join("extensions"));

    let roots = RootSet::new(["extensions"], Vec::<PathBuf>::new());
    let err = locate(home.path(), &roots, &ArtifactFilter::default()).unwrap_err();
    assert!(matches!(err, LocateError::ListRoot { .. }));
}

#[test]
fn directories_named_like_libraries_are_skipped() {
    let home = tempfile::tempdir().unwrap();
    touch(&home.path().join("extensions/real.jar"));
    fs::create_dir_all(home.path().join("extensions/exploded.jar")).unwrap();

    let roots = RootSet::new(["extensions"], Vec::<PathBuf>::new());
    let entries = locate(home.path(), &roots, &ArtifactFilter::default()).unwrap();
    assert_eq!(file_names(&entries), vec!["real.jar"]);
}

#[test]
fn resource_roots_are_added_even_when_missing() {
    let home = tempfile::tempdir().unwrap();
    fs::create_dir_all(home.path().join("extensions")).unwrap();

    let roots = RootSet::new(["extensions"], ["config", "config/logging"]);
    let entries = locate(home.path(), &roots, &ArtifactFilter::default()).unwrap();

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].path(), home.path().join("config"));
    assert_eq!(entries[1].path(), home.path().join("config/logging"));
    assert!(!entries[1].path().exists());
}

#[test]
fn roots_keep_priority_order_and_entries_sort_within_a_root() {
    let home = tempfile::tempdir().unwrap();
    touch(&home.path().join("extensions-private/zeta.jar"));
    touch(&home.path().join("extensions/beta.jar"));
    touch(&home.path().join("extensions/alpha.jar"));
    touch(&home.path().join("bootstrap-libs/boot.jar"));

    let entries = locate(home.path(), &RootSet::default(), &ArtifactFilter::default()).unwrap();
    assert_eq!(
        file_names(&entries),
        vec!["zeta.jar", "alpha.jar", "beta.jar", "boot.jar", "config", "logging"]
    );
    assert_eq!(entries[0].root(), Path::new("extensions-private"));
    assert_eq!(entries[3].root(), Path::new("bootstrap-libs"));
}

#[test]
fn custom_filter_applies_suffix_and_prefix() {
    let home = tempfile::tempdir().unwrap();
    touch(&home.path().join("plugins/libdaemon.so"));
    touch(&home.path().join("plugins/libcli-launcher.so"));
    touch(&home.path().join("plugins/daemon.jar"));

    let roots = RootSet::new(["plugins"], Vec::<PathBuf>::new());
    let filter = ArtifactFilter::new(".so", "libcli-");
    let entries = locate(home.path(), &roots, &filter).unwrap();
    assert_eq!(file_names(&entries), vec!["libdaemon.so"]);
}
