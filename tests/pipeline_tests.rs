#![cfg(unix)]

mod common;

use common::{fake_archive_tool, sample_app_asar, write_payload_tree};
use dmg_repack::candidate::{Candidate, Chooser};
use dmg_repack::config::ProjectLayout;
use dmg_repack::error::Result;
use dmg_repack::extract::{ArchiveTool, ContainerExtractor, ContainerLayout};
use dmg_repack::pipeline;

/// Fails the test if the policy falls back to interactive selection
struct NoPrompt;

impl Chooser for NoPrompt {
    async fn choose(&mut self, candidates: &[Candidate]) -> Result<usize> {
        panic!("chooser invoked with {} candidates", candidates.len());
    }
}

struct Fixture {
    _fixtures: tempfile::TempDir,
    root: tempfile::TempDir,
    extractor: ContainerExtractor,
}

impl Fixture {
    fn new(version: &str, containers: &[&str]) -> Self {
        let fixtures = tempfile::tempdir().unwrap();
        let payload = fixtures.path().join("payload");
        write_payload_tree(
            &payload,
            &format!("App {version}"),
            "App.app",
            &sample_app_asar("app", version),
        );
        let tool = fake_archive_tool(fixtures.path(), &payload, 2);

        let root = tempfile::tempdir().unwrap();
        let work = root.path().join("temp");
        std::fs::create_dir_all(&work).unwrap();
        for name in containers {
            std::fs::write(work.join(name), b"dmg").unwrap();
        }

        Self {
            _fixtures: fixtures,
            root,
            extractor: ContainerExtractor::with_tool(
                ArchiveTool::at(tool),
                ContainerLayout::for_app("App"),
            ),
        }
    }

    fn layout(&self) -> ProjectLayout {
        ProjectLayout::new(self.root.path())
    }
}

#[tokio::test]
async fn test_single_container_end_to_end() {
    let fixture = Fixture::new("2.1.0", &["App-universal-2.1.0.dmg"]);
    let layout = fixture.layout();

    let outcome = pipeline::extract(&layout, &fixture.extractor, None, &mut NoPrompt)
        .await
        .unwrap();

    let app = layout.app_dir();
    assert!(app.join("bootstrap.js").is_file());
    assert!(!app.join("package.json").exists());
    let backup: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(app.join("package.json.backup")).unwrap())
            .unwrap();
    assert_eq!(backup["version"], "2.1.0");

    assert_eq!(outcome.container.name, "App-universal-2.1.0.dmg");
    assert_eq!(outcome.version(), Some("2.1.0"));
    assert_eq!(outcome.app_dir, app);
    assert!(layout.work_dir().join("App-universal-2.1.0.dmg").is_file());
    assert!(!layout.work_dir().join("App 2.1.0").exists());
}

#[tokio::test]
async fn test_target_version_picks_among_cached_containers() {
    let fixture = Fixture::new(
        "2.0.0",
        &["App-universal-2.1.0.dmg", "App-universal-2.0.0.dmg", "App.dmg"],
    );

    let outcome = pipeline::extract(&fixture.layout(), &fixture.extractor, Some("2.0.0"), &mut NoPrompt)
        .await
        .unwrap();

    assert_eq!(outcome.container.name, "App-universal-2.0.0.dmg");
}

#[tokio::test]
async fn test_sync_version_after_extraction() {
    let fixture = Fixture::new("2.1.0", &["App-universal-2.1.0.dmg"]);
    let layout = fixture.layout();
    std::fs::write(
        layout.project_manifest(),
        r#"{"name":"app-linux","version":"0.0.1"}"#,
    )
    .unwrap();

    pipeline::extract(&layout, &fixture.extractor, None, &mut NoPrompt)
        .await
        .unwrap();
    let (version, previous) = pipeline::sync_version(&layout).unwrap();

    assert_eq!(version, "2.1.0");
    assert_eq!(previous.as_deref(), Some("0.0.1"));
    let project: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(layout.project_manifest()).unwrap()).unwrap();
    assert_eq!(project["version"], "2.1.0");
}

#[tokio::test]
async fn test_empty_work_dir_reports_no_candidates() {
    let fixture = Fixture::new("2.1.0", &[]);
    let err = pipeline::extract(&fixture.layout(), &fixture.extractor, None, &mut NoPrompt)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        dmg_repack::Error::Selection(dmg_repack::error::SelectionError::NoCandidates { .. })
    ));
}
