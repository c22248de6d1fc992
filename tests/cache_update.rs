//! Cache update tests
//!
//! Archives are built with the zip writer, fetched through `file://` URLs and
//! rendered with in-process formatters, so neither network nor pandoc is
//! needed.

mod common;

use std::fs;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use tldr_man::cache::DownloadError;
use tldr_man::{CacheSynchronizer, CancelToken, Error, Pandoc, SilentObserver, SyncObserver, SyncPhase, UpdateStats};

use common::*;

fn update(sandbox: &Sandbox) -> tldr_man::Result<UpdateStats> {
    CacheSynchronizer::new(&sandbox.config, Arc::new(EchoFormatter), CancelToken::new())
        .with_workers(2)
        .update(&mut SilentObserver)
}

fn first_archive(sandbox: &mut Sandbox) {
    sandbox.use_archive(
        "tldr-1.zip",
        &[
            ("pages/common/tar.md", TAR),
            ("pages/common/git-status.md", GIT_STATUS),
            ("pages/linux/ls.md", LS),
            ("pages.fr/common/tar.md", TAR_FR),
        ],
    );
}

// =============================================================================
// Statistics
// =============================================================================

#[test]
fn test_first_update_creates_everything() {
    let mut sandbox = Sandbox::new();
    first_archive(&mut sandbox);

    let stats = update(&sandbox).unwrap();

    assert_eq!(
        stats,
        UpdateStats {
            created: 4,
            updated: 0,
            unchanged: 0
        }
    );
    for artifact in [
        "pages/common/man1/tar.1",
        "pages/common/man1/git-status.1",
        "pages/linux/man1/ls.1",
        "pages.fr/common/man1/tar.1",
    ] {
        assert!(sandbox.artifact(artifact).is_file(), "{artifact} missing");
    }
    let tar = fs::read_to_string(sandbox.artifact("pages/common/man1/tar.1")).unwrap();
    assert!(tar.contains("tar - Archive utility."));
    assert!(tar.contains(": tar -cf *archive.tar* *file*"));
}

#[test]
fn test_second_update_classifies_changes() {
    let mut sandbox = Sandbox::new();
    first_archive(&mut sandbox);
    update(&sandbox).unwrap();

    sandbox.use_archive(
        "tldr-2.zip",
        &[
            ("pages/common/tar.md", TAR_V2),
            ("pages/common/git-status.md", GIT_STATUS),
            ("pages/common/cp.md", CP),
        ],
    );
    let stats = update(&sandbox).unwrap();

    assert_eq!(
        stats,
        UpdateStats {
            created: 1,
            updated: 1,
            unchanged: 1
        }
    );
    // Full replacement: pages dropped from the archive are gone.
    assert!(!sandbox.artifact("pages/linux/man1/ls.1").exists());
    assert!(!sandbox.artifact("pages.fr").exists());
    let tar = fs::read_to_string(sandbox.artifact("pages/common/man1/tar.1")).unwrap();
    assert!(tar.contains("Extract an archive:"));
}

#[test]
fn test_unchanged_page_only_counts_unchanged() {
    let mut sandbox = Sandbox::new();
    sandbox.use_archive("a.zip", &[("pages/common/git-status.md", GIT_STATUS)]);
    update(&sandbox).unwrap();

    let stats = update(&sandbox).unwrap();
    assert_eq!(
        stats,
        UpdateStats {
            created: 0,
            updated: 0,
            unchanged: 1
        }
    );
}

#[test]
fn test_legacy_english_directory_skipped() {
    let mut sandbox = Sandbox::new();
    sandbox.use_archive(
        "legacy.zip",
        &[
            ("pages/common/tar.md", TAR),
            ("pages.en/common/tar.md", TAR),
            ("pages.en/common/ls.md", LS),
            ("LICENSE.md", "license text"),
        ],
    );

    let stats = update(&sandbox).unwrap();

    assert_eq!(stats.total(), 1);
    assert!(!sandbox.artifact("pages.en").exists());
    assert!(sandbox.artifact("pages/common/man1/tar.1").is_file());
}

#[test]
fn test_observer_sees_phases_in_order() {
    #[derive(Default)]
    struct Recorder {
        phases: Vec<SyncPhase>,
        sections: Vec<String>,
        advanced: usize,
        finished: Option<UpdateStats>,
    }

    impl SyncObserver for Recorder {
        fn phase(&mut self, phase: SyncPhase) {
            self.phases.push(phase);
        }

        fn section_started(&mut self, locale: &str, section: &str, _documents: usize) {
            self.sections.push(format!("{locale}/{section}"));
        }

        fn section_advanced(&mut self) {
            self.advanced += 1;
        }

        fn finished(&mut self, stats: &UpdateStats) {
            self.finished = Some(*stats);
        }
    }

    let mut sandbox = Sandbox::new();
    first_archive(&mut sandbox);
    let mut recorder = Recorder::default();
    CacheSynchronizer::new(&sandbox.config, Arc::new(EchoFormatter), CancelToken::new())
        .update(&mut recorder)
        .unwrap();

    assert_eq!(
        recorder.phases,
        vec![
            SyncPhase::Preflight,
            SyncPhase::Downloading,
            SyncPhase::Extracting,
            SyncPhase::Rendering,
            SyncPhase::Staged,
            SyncPhase::Swapped,
            SyncPhase::Reported,
        ]
    );
    assert_eq!(
        recorder.sections,
        vec!["pages/common", "pages/linux", "pages.fr/common"]
    );
    assert_eq!(recorder.advanced, 4);
    assert_eq!(recorder.finished.map(|s| s.created), Some(4));
}

// =============================================================================
// Failures leave the previous cache untouched
// =============================================================================

#[test]
fn test_interrupted_update_leaves_cache_untouched() {
    let mut sandbox = Sandbox::new();
    first_archive(&mut sandbox);
    update(&sandbox).unwrap();
    let before = snapshot(sandbox.cache_root());

    sandbox.use_archive(
        "tldr-2.zip",
        &[
            ("pages/common/tar.md", TAR_V2),
            ("pages/common/cp.md", CP),
            ("pages/linux/ls.md", LS),
        ],
    );
    let token = CancelToken::new();
    let formatter = CancellingFormatter {
        token: token.clone(),
        after: 1,
        seen: AtomicUsize::new(0),
    };
    let err = CacheSynchronizer::new(&sandbox.config, Arc::new(formatter), token)
        .with_workers(2)
        .update(&mut SilentObserver)
        .unwrap_err();

    assert!(matches!(err, Error::Cancelled), "got {err:?}");
    assert_eq!(err.exit_code(), 130);
    assert_eq!(snapshot(sandbox.cache_root()), before);
    assert!(staging_leftovers(sandbox.config.cache_parent()).is_empty());
}

#[test]
fn test_interrupt_killing_formatter_reports_cancelled() {
    let mut sandbox = Sandbox::new();
    first_archive(&mut sandbox);
    update(&sandbox).unwrap();
    let before = snapshot(sandbox.cache_root());

    let token = CancelToken::new();
    let formatter = KilledFormatter {
        token: token.clone(),
    };
    let err = CacheSynchronizer::new(&sandbox.config, Arc::new(formatter), token)
        .with_workers(2)
        .update(&mut SilentObserver)
        .unwrap_err();

    assert!(matches!(err, Error::Cancelled), "got {err:?}");
    assert_eq!(err.exit_code(), 130);
    assert_eq!(snapshot(sandbox.cache_root()), before);
}

#[test]
fn test_failed_render_leaves_cache_untouched() {
    let mut sandbox = Sandbox::new();
    first_archive(&mut sandbox);
    update(&sandbox).unwrap();
    let before = snapshot(sandbox.cache_root());

    sandbox.use_archive(
        "tldr-2.zip",
        &[
            ("pages/common/tar.md", TAR_V2),
            ("pages/common/cp.md", CP),
        ],
    );
    let err = CacheSynchronizer::new(
        &sandbox.config,
        Arc::new(PoisonFormatter { poison: "cp -" }),
        CancelToken::new(),
    )
    .update(&mut SilentObserver)
    .unwrap_err();

    assert!(matches!(err, Error::RenderPage { ref page, .. } if page == "cp.md"), "got {err:?}");
    assert_eq!(snapshot(sandbox.cache_root()), before);
    assert!(staging_leftovers(sandbox.config.cache_parent()).is_empty());
}

#[test]
fn test_grammar_error_aborts_update() {
    let mut sandbox = Sandbox::new();
    first_archive(&mut sandbox);
    update(&sandbox).unwrap();
    let before = snapshot(sandbox.cache_root());

    sandbox.use_archive(
        "broken.zip",
        &[("pages/common/tar.md", "# tar\n\n- Create an archive:\n\n`tar -cf x`\n")],
    );
    let err = update(&sandbox).unwrap_err();

    assert!(matches!(err, Error::RenderPage { .. }), "got {err:?}");
    assert_eq!(snapshot(sandbox.cache_root()), before);
}

#[test]
fn test_foreign_content_blocks_update() {
    let mut sandbox = Sandbox::new();
    first_archive(&mut sandbox);
    let notes = sandbox.cache_root().join("notes");
    fs::create_dir_all(&notes).unwrap();
    fs::write(notes.join("todo.txt"), "keep me").unwrap();

    let err = update(&sandbox).unwrap_err();

    match err {
        Error::ForeignContent { offending, .. } => assert_eq!(offending, vec![notes.clone()]),
        other => panic!("expected ForeignContent, got {other:?}"),
    }
    assert_eq!(fs::read_to_string(notes.join("todo.txt")).unwrap(), "keep me");
}

#[test]
fn test_foreign_content_added_during_render_blocks_swap() {
    /// Drops a foreign directory into the cache once preflight has passed.
    struct Intruder {
        notes: std::path::PathBuf,
    }

    impl SyncObserver for Intruder {
        fn phase(&mut self, phase: SyncPhase) {
            if phase == SyncPhase::Rendering {
                fs::create_dir_all(&self.notes).unwrap();
                fs::write(self.notes.join("todo.txt"), "keep me").unwrap();
            }
        }
    }

    let mut sandbox = Sandbox::new();
    first_archive(&mut sandbox);
    update(&sandbox).unwrap();
    let before = snapshot(sandbox.cache_root());

    sandbox.use_archive("tldr-2.zip", &[("pages/common/tar.md", TAR_V2)]);
    let notes = sandbox.cache_root().join("notes");
    let mut intruder = Intruder {
        notes: notes.clone(),
    };
    let err = CacheSynchronizer::new(&sandbox.config, Arc::new(EchoFormatter), CancelToken::new())
        .with_workers(2)
        .update(&mut intruder)
        .unwrap_err();

    match err {
        Error::ForeignContent { offending, .. } => assert_eq!(offending, vec![notes.clone()]),
        other => panic!("expected ForeignContent, got {other:?}"),
    }
    assert_eq!(fs::read_to_string(notes.join("todo.txt")).unwrap(), "keep me");

    let mut after = snapshot(sandbox.cache_root());
    after.retain(|path, _| !path.starts_with("notes"));
    assert_eq!(after, before);
    assert!(staging_leftovers(sandbox.config.cache_parent()).is_empty());
}

#[test]
fn test_missing_formatter_fails_before_download() {
    let mut sandbox = Sandbox::new();
    sandbox.config.archive_url = "file:///nonexistent/tldr.zip".to_string();

    let err = CacheSynchronizer::new(
        &sandbox.config,
        Arc::new(Pandoc::new("tldr-man-no-such-formatter")),
        CancelToken::new(),
    )
    .update(&mut SilentObserver)
    .unwrap_err();

    assert!(matches!(err, Error::ToolMissing { .. }), "got {err:?}");
    assert_eq!(err.exit_code(), 127);
    assert!(!sandbox.cache_root().exists());
}

#[test]
fn test_corrupt_archive_is_bad_archive() {
    let mut sandbox = Sandbox::new();
    let path = sandbox.dir.path().join("not-a-zip.zip");
    fs::write(&path, "definitely not a zip file").unwrap();
    sandbox.config.archive_url = format!("file://{}", path.display());

    let err = update(&sandbox).unwrap_err();

    assert!(
        matches!(err, Error::Download(DownloadError::BadArchive { ref url, .. }) if *url == sandbox.config.archive_url),
        "got {err:?}"
    );
    assert!(!sandbox.cache_root().exists());
}

#[test]
fn test_unreachable_archive() {
    let mut sandbox = Sandbox::new();
    sandbox.config.archive_url = format!("file://{}", sandbox.dir.path().join("missing.zip").display());

    let err = update(&sandbox).unwrap_err();
    assert!(matches!(err, Error::Download(DownloadError::Connection { .. })), "got {err:?}");
}
