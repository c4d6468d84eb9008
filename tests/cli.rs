//! CLI integration tests for stowage admin commands.
//!
//! Each test uses an isolated temp directory for the database, ensuring tests
//! can run in parallel safely.

#![allow(deprecated)] // Command::cargo_bin deprecation only affects custom build dirs

use std::path::Path;

use assert_cmd::Command;
use assert_fs::TempDir;
use predicates::prelude::*;
use stowage::store::{SqliteStore, Store};
use stowage::types::Capabilities;

struct TestContext {
    temp_dir: TempDir,
}

impl TestContext {
    fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("failed to create temp dir"),
        }
    }

    fn data_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    fn data_dir_str(&self) -> String {
        self.data_dir().to_string_lossy().to_string()
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("stowage").expect("failed to find binary");
        cmd.env("NO_COLOR", "1");
        cmd
    }

    fn init(&self) -> assert_cmd::assert::Assert {
        self.cmd()
            .args([
                "admin",
                "init",
                "--data-dir",
                &self.data_dir_str(),
                "--non-interactive",
            ])
            .assert()
    }

    fn create_user(&self, username: &str, capabilities: Option<&str>) -> assert_cmd::assert::Assert {
        let data_dir = self.data_dir_str();
        let mut args = vec![
            "admin",
            "user",
            "create",
            "--data-dir",
            &data_dir,
            "--username",
            username,
        ];
        if let Some(caps) = capabilities {
            args.extend(["--capabilities", caps]);
        }
        self.cmd().args(args).assert()
    }

    fn store(&self) -> SqliteStore {
        SqliteStore::new(self.data_dir().join("stowage.db")).expect("open store")
    }
}

#[test]
fn init_creates_database_and_admin_token() {
    let ctx = TestContext::new();

    ctx.init()
        .success()
        .stdout(predicate::str::contains("Admin token"));

    assert!(ctx.data_dir().join("stowage.db").exists());

    let token = std::fs::read_to_string(ctx.data_dir().join(".admin_token"))
        .expect("admin token file");
    assert!(token.starts_with("stowage_"));

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(ctx.data_dir().join(".admin_token"))
            .expect("token metadata")
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    assert!(ctx.store().has_admin_token().expect("query admin token"));
}

#[test]
fn init_twice_fails() {
    let ctx = TestContext::new();
    ctx.init().success();

    ctx.init()
        .failure()
        .stderr(predicate::str::contains("already initialized"));
}

#[test]
fn user_create_uses_default_capabilities() {
    let ctx = TestContext::new();
    ctx.init().success();

    ctx.create_user("alice", None)
        .success()
        .stdout(predicate::str::contains("Created user 'alice'"))
        .stdout(predicate::str::contains("stowage_"));

    let user = ctx
        .store()
        .get_user_by_username("alice")
        .expect("query user")
        .expect("user exists");
    assert_eq!(user.capabilities, Capabilities::default_user());
}

#[test]
fn user_create_with_explicit_capabilities() {
    let ctx = TestContext::new();
    ctx.init().success();

    ctx.create_user("bob", Some("upload:files,namespace:read-foreign"))
        .success();

    let user = ctx
        .store()
        .get_user_by_username("bob")
        .expect("query user")
        .expect("user exists");
    assert!(user.capabilities.has(Capabilities::UPLOAD_FILES));
    assert!(user.capabilities.has(Capabilities::READ_FOREIGN));
    assert!(!user.capabilities.has(Capabilities::UPLOAD_URLS));
}

#[test]
fn user_create_rejects_unknown_capability() {
    let ctx = TestContext::new();
    ctx.init().success();

    ctx.create_user("carol", Some("upload:everything"))
        .failure()
        .stderr(predicate::str::contains("Invalid capability"));
}

#[test]
fn user_create_rejects_duplicates_and_bad_names() {
    let ctx = TestContext::new();
    ctx.init().success();

    ctx.create_user("dave", None).success();
    ctx.create_user("dave", None)
        .failure()
        .stderr(predicate::str::contains("already exists"));

    ctx.create_user("not_allowed", None).failure();
}

#[test]
fn serve_requires_init() {
    let ctx = TestContext::new();

    ctx.cmd()
        .args(["serve", "--data-dir", &ctx.data_dir_str(), "--port", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Server not initialized"));
}

#[test]
fn serve_rejects_broken_config_file() {
    let ctx = TestContext::new();
    let config = ctx.data_dir().join("stowage.toml");
    std::fs::write(&config, "port = \"not a number\"").expect("write config");

    ctx.cmd()
        .args(["serve", "--config"])
        .arg(&config)
        .assert()
        .failure();
}
