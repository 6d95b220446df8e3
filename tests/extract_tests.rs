#![cfg(unix)]

mod common;

use common::{AsarBuilder, fake_archive_tool, sample_app_asar, write_payload_tree};
use dmg_repack::error::Error;
use dmg_repack::extract::{ArchiveTool, ContainerExtractor, ContainerLayout};

#[tokio::test]
async fn test_tool_warning_with_payload_still_extracts() {
    let fixtures = tempfile::tempdir().unwrap();
    let payload = fixtures.path().join("payload");
    write_payload_tree(
        &payload,
        "Zalo 25.8.2",
        "Zalo.app",
        &sample_app_asar("zalo", "25.8.2"),
    );
    let tool = fake_archive_tool(fixtures.path(), &payload, 2);

    let root = tempfile::tempdir().unwrap();
    let scratch = root.path().join("temp");
    let output = root.path().join("app");
    std::fs::create_dir_all(&scratch).unwrap();
    let container = scratch.join("ZaloSetup-universal-25.8.2.dmg");
    std::fs::write(&container, b"dmg").unwrap();
    // Stale output from an earlier run is replaced
    std::fs::create_dir_all(output.join("stale")).unwrap();

    let extractor = ContainerExtractor::with_tool(ArchiveTool::at(tool), ContainerLayout::default());
    let stats = extractor
        .extract_embedded_archive(&container, &scratch, &output)
        .await
        .unwrap();

    assert_eq!(stats.files, 3);
    assert!(output.join("bootstrap.js").is_file());
    assert!(output.join("lib/main.js").is_file());
    assert!(!output.join("stale").exists());
    assert!(!scratch.join("Zalo 25.8.2").exists());
    assert!(container.is_file());
}

#[tokio::test]
async fn test_unpacked_files_resolved_beside_archive() {
    let fixtures = tempfile::tempdir().unwrap();
    let payload = fixtures.path().join("payload");
    let asar = AsarBuilder::new()
        .file("bootstrap.js", b"boot")
        .unpacked_file("native/addon.node", 6)
        .build();
    let resources = write_payload_tree(&payload, "Zalo", "Zalo.app", &asar);
    std::fs::create_dir_all(resources.join("app.asar.unpacked/native")).unwrap();
    std::fs::write(resources.join("app.asar.unpacked/native/addon.node"), b"NATIVE").unwrap();
    let tool = fake_archive_tool(fixtures.path(), &payload, 0);

    let root = tempfile::tempdir().unwrap();
    let scratch = root.path().join("temp");
    let output = root.path().join("app");
    std::fs::create_dir_all(&scratch).unwrap();
    let cwd_before = std::env::current_dir().unwrap();

    let extractor = ContainerExtractor::with_tool(ArchiveTool::at(tool), ContainerLayout::default());
    let stats = extractor
        .extract_embedded_archive(&scratch.join("Zalo.dmg"), &scratch, &output)
        .await
        .unwrap();

    assert_eq!(stats.unpacked, 1);
    assert_eq!(std::fs::read(output.join("native/addon.node")).unwrap(), b"NATIVE");
    assert_eq!(std::env::current_dir().unwrap(), cwd_before);
}

#[tokio::test]
async fn test_tool_failure_without_payload() {
    let fixtures = tempfile::tempdir().unwrap();
    let empty = fixtures.path().join("payload");
    std::fs::create_dir_all(&empty).unwrap();
    let tool = fake_archive_tool(fixtures.path(), &empty, 2);

    let root = tempfile::tempdir().unwrap();
    let scratch = root.path().join("temp");
    let output = root.path().join("app");

    let extractor = ContainerExtractor::with_tool(ArchiveTool::at(tool), ContainerLayout::default());
    let err = extractor
        .extract_embedded_archive(&scratch.join("Zalo.dmg"), &scratch, &output)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::PayloadNotFound { .. }));
    assert!(!err.recovery_suggestions().is_empty());
}

#[tokio::test]
async fn test_missing_tool_binary() {
    let root = tempfile::tempdir().unwrap();
    let scratch = root.path().join("temp");
    let extractor = ContainerExtractor::with_tool(
        ArchiveTool::at(root.path().join("no-such-7z")),
        ContainerLayout::default(),
    );
    let err = extractor
        .extract_embedded_archive(&scratch.join("Zalo.dmg"), &scratch, &root.path().join("app"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::CommandFailed { .. }));
}

#[tokio::test]
async fn test_leftover_volume_folder_is_not_extracted() {
    let fixtures = tempfile::tempdir().unwrap();
    let payload = fixtures.path().join("payload");
    write_payload_tree(
        &payload,
        "Zalo 25.8.2",
        "Zalo.app",
        &sample_app_asar("zalo", "25.8.2"),
    );
    let tool = fake_archive_tool(fixtures.path(), &payload, 2);

    let root = tempfile::tempdir().unwrap();
    let scratch = root.path().join("temp");
    let output = root.path().join("app");
    // An interrupted earlier run left an older volume behind; it sorts first
    write_payload_tree(
        &scratch,
        "Zalo 25.5.3",
        "Zalo.app",
        &sample_app_asar("zalo", "25.5.3"),
    );
    let container = scratch.join("ZaloSetup-universal-25.8.2.dmg");
    std::fs::write(&container, b"dmg").unwrap();

    let extractor = ContainerExtractor::with_tool(ArchiveTool::at(tool), ContainerLayout::default());
    extractor
        .extract_embedded_archive(&container, &scratch, &output)
        .await
        .unwrap();

    let manifest: serde_json::Value =
        serde_json::from_slice(&std::fs::read(output.join("package.json")).unwrap()).unwrap();
    assert_eq!(manifest["version"], "25.8.2");
    assert!(!scratch.join("Zalo 25.5.3").exists());
    assert!(container.is_file());
}
