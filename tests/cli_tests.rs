use assert_cmd::Command;
use predicates::prelude::*;

const SOURCE_VARS: &[&str] = &[
    "DMG_URL",
    "DMG_URL_TEMPLATE",
    "DMG_VERSION",
    "DMG_AUTO_DETECT",
    "DMG_LANDING_URL",
    "FORCE_DOWNLOAD",
    "CI",
    "GITHUB_OUTPUT",
];

fn dmg_repack() -> Command {
    let mut cmd = Command::cargo_bin("dmg_repack").unwrap();
    for var in SOURCE_VARS {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn test_help_lists_commands() {
    dmg_repack()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("download"))
        .stdout(predicate::str::contains("sync-version"));
}

#[test]
fn test_sync_version_without_extraction_fails() {
    let root = tempfile::tempdir().unwrap();
    dmg_repack()
        .args(["sync-version", "--root"])
        .arg(root.path())
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("app manifest backup not found"))
        .stdout(predicate::str::contains("dmg_repack extract"));
}

#[test]
fn test_sync_version_updates_project_manifest() {
    let root = tempfile::tempdir().unwrap();
    std::fs::create_dir(root.path().join("app")).unwrap();
    std::fs::write(
        root.path().join("app/package.json.backup"),
        r#"{"name":"zalo","version":"25.8.2"}"#,
    )
    .unwrap();
    std::fs::write(
        root.path().join("package.json"),
        r#"{"name":"zalo-linux","version":"1.0.0"}"#,
    )
    .unwrap();

    dmg_repack()
        .args(["sync-version", "--root"])
        .arg(root.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("25.8.2"));

    let project = std::fs::read_to_string(root.path().join("package.json")).unwrap();
    assert!(project.contains("\"version\": \"25.8.2\""));
}

#[test]
fn test_sanitize_manifest_writes_copy() {
    let root = tempfile::tempdir().unwrap();
    std::fs::create_dir(root.path().join("app")).unwrap();
    std::fs::write(
        root.path().join("app/package.json.backup"),
        r#"{"name":"zalo","version":"25.8.2","devDependencies":{"jest":"1"}}"#,
    )
    .unwrap();

    dmg_repack()
        .args(["sanitize-manifest", "--root"])
        .arg(root.path())
        .assert()
        .success();

    let sanitized =
        std::fs::read_to_string(root.path().join("app/package.json.original")).unwrap();
    assert!(!sanitized.contains("devDependencies"));
}

#[test]
fn test_locate_prints_app_dir() {
    let root = tempfile::tempdir().unwrap();
    let exe_dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(exe_dir.path().join("app")).unwrap();
    std::fs::write(exe_dir.path().join("app/bootstrap.js"), b"").unwrap();

    dmg_repack()
        .args(["locate", "--root"])
        .arg(root.path())
        .arg("--exe-dir")
        .arg(exe_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains(
            exe_dir.path().join("app").display().to_string(),
        ));
}

#[test]
fn test_locate_without_app_fails() {
    let root = tempfile::tempdir().unwrap();
    dmg_repack()
        .args(["locate", "--root"])
        .arg(root.path())
        .arg("--exe-dir")
        .arg(root.path())
        .assert()
        .failure()
        .code(1);
}

#[test]
fn test_download_uses_cached_file_without_network() {
    let root = tempfile::tempdir().unwrap();
    std::fs::create_dir(root.path().join("temp")).unwrap();
    let cached = root.path().join("temp/App-universal-2.1.0.dmg");
    std::fs::write(&cached, b"cached").unwrap();

    // Port 9 (discard) is never contacted because the file is cached
    dmg_repack()
        .args(["download", "--root"])
        .arg(root.path())
        .args(["--url", "http://127.0.0.1:9/mac/App-universal-2.1.0.dmg"])
        .assert()
        .success()
        .stdout(predicate::str::contains("FORCE_DOWNLOAD"));

    assert_eq!(std::fs::read(&cached).unwrap(), b"cached");
}

#[test]
fn test_invalid_timeout_rejected() {
    dmg_repack()
        .args(["download", "--timeout", "0"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Invalid arguments"));
}

#[test]
fn test_unknown_command_is_usage_error() {
    dmg_repack()
        .arg("repack-everything")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("repack-everything"));
}

#[test]
fn test_version_flag_exits_zero() {
    dmg_repack()
        .arg("--version")
        .assert()
        .code(0)
        .stdout(predicate::str::contains("dmg_repack"));
}
