use git_autoupdate::config::UpdateConfig;
use git_autoupdate::core::UpdateError;
use git_autoupdate::git::parse_repo_url;
use git_autoupdate::test_utils::{HttpStub, TestGit, init_test_logging};
use git_autoupdate::updater::{UpdateEvent, UpdateOutcome, Updater};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const REMOTE_MANIFEST: &str =
    r#"{"name": "app", "version": "1.1.0", "dependencies": {"left-pad": "^1.3.0"}}"#;

/// A remote repository at `<temp>/remote/acme/app`, an installed application
/// at `<temp>/app` and a raw-file stub serving the remote manifest.
///
/// The raw-file path of a `file://` repository is its whole filesystem path.
struct Environment {
    temp: TempDir,
    remote: TestGit,
    stub: HttpStub,
}

impl Environment {
    async fn new() -> Self {
        init_test_logging(None);
        let temp = TempDir::new().unwrap();

        let remote = TestGit::new(temp.path().join("remote/acme/app"));
        remote.init_on_branch("main").unwrap();
        remote.write_file("package.json", REMOTE_MANIFEST).unwrap();
        remote.write_file("index.js", "module.exports = '1.1.0';\n").unwrap();
        remote.write_file("lib/util.js", "module.exports = {};\n").unwrap();
        remote.write_file("config/local.json", "{\"env\": \"remote\"}\n").unwrap();
        remote.commit_all("Release 1.1.0").unwrap();

        let app_dir = temp.path().join("app");
        std::fs::create_dir_all(app_dir.join("config")).unwrap();
        std::fs::write(
            app_dir.join("package.json"),
            r#"{"name": "app", "version": "1.0.0", "dependencies": {"left-pad": "^1.3.0"}}"#,
        )
        .unwrap();
        std::fs::write(app_dir.join("index.js"), "module.exports = '1.0.0';\n").unwrap();
        std::fs::write(app_dir.join("config/local.json"), "{\"env\": \"production\"}\n").unwrap();
        std::fs::write(app_dir.join("notes.txt"), "kept\n").unwrap();

        let stub = HttpStub::start().await.unwrap();
        let env = Self { temp, remote, stub };
        env.serve_manifest("main");
        env
    }

    fn manifest_route(&self, branch: &str) -> String {
        let repo = parse_repo_url(&self.remote.file_url()).unwrap();
        format!("/{}/{branch}/package.json", repo.path)
    }

    fn serve_manifest(&self, branch: &str) {
        self.stub.route(&self.manifest_route(branch), 200, REMOTE_MANIFEST);
    }

    fn app_dir(&self) -> PathBuf {
        self.temp.path().join("app")
    }

    fn scratch_dir(&self) -> PathBuf {
        self.temp.path().join("scratch")
    }

    fn config(&self) -> UpdateConfig {
        UpdateConfig::new(self.remote.file_url())
            .with_app_dir(self.app_dir())
            .with_scratch_path(self.scratch_dir())
            .with_raw_base_url(self.stub.base_url())
            .with_ignore_paths(["config/local.json"])
    }

    fn read(&self, path: &str) -> String {
        std::fs::read_to_string(self.app_dir().join(path)).unwrap()
    }
}

fn drain(rx: &mut tokio::sync::mpsc::UnboundedReceiver<UpdateEvent>) -> Vec<&'static str> {
    let mut names = Vec::new();
    while let Ok(event) = rx.try_recv() {
        names.push(event.name());
    }
    names
}

fn exists(dir: &Path, path: &str) -> bool {
    dir.join(path).exists()
}

#[tokio::test]
async fn test_update_from_file_repository() {
    let env = Environment::new().await;
    let updater = Updater::new(env.config()).unwrap();
    let mut rx = updater.subscribe();

    let outcome = updater.run_update().await.unwrap();

    assert_eq!(
        outcome,
        UpdateOutcome::Updated {
            from: "1.0.0".to_string(),
            to: "1.1.0".to_string(),
            modules_reinstalled: false,
        }
    );
    assert_eq!(
        drain(&mut rx),
        vec![
            "out-of-date",
            "download-start",
            "download-end",
            "update-start",
            "modules-start",
            "modules-end",
            "end"
        ]
    );

    assert_eq!(env.read("index.js"), "module.exports = '1.1.0';\n");
    assert_eq!(env.read("lib/util.js"), "module.exports = {};\n");
    assert!(env.read("package.json").contains("1.1.0"));
    assert_eq!(env.read("config/local.json"), "{\"env\": \"production\"}\n");
    assert_eq!(env.read("notes.txt"), "kept\n");
    assert!(!exists(&env.app_dir(), ".git"));
    assert!(!env.scratch_dir().exists());

    let requests = env.stub.requests();
    assert_eq!(requests.len(), 2, "version check and dependency check");
    assert!(requests.iter().all(|r| r.path == env.manifest_route("main")));
    assert!(requests.iter().all(|r| r.authorization.is_none()));
}

#[tokio::test]
async fn test_second_run_is_up_to_date() {
    let env = Environment::new().await;
    let updater = Updater::new(env.config()).unwrap();

    assert!(updater.run_update().await.unwrap().is_updated());

    let mut rx = updater.subscribe();
    let outcome = updater.run_update().await.unwrap();
    assert_eq!(
        outcome,
        UpdateOutcome::UpToDate {
            local: "1.1.0".to_string()
        }
    );
    assert_eq!(drain(&mut rx), vec!["up-to-date", "end"]);
    assert!(!env.scratch_dir().exists());
}

#[tokio::test]
async fn test_update_into_testing_directory() {
    let env = Environment::new().await;
    let updater = Updater::new(env.config().with_testing(true)).unwrap();

    updater.run_update().await.unwrap();

    assert_eq!(env.read("testing/index.js"), "module.exports = '1.1.0';\n");
    assert!(!exists(&env.app_dir(), "testing/config/local.json"));
    assert!(!exists(&env.app_dir(), "testing/.git"));
    assert_eq!(env.read("index.js"), "module.exports = '1.0.0';\n");
}

#[tokio::test]
async fn test_update_from_other_branch() {
    let env = Environment::new().await;
    env.remote.create_branch("beta").unwrap();
    env.remote.write_file("index.js", "module.exports = 'beta';\n").unwrap();
    env.remote.commit_all("Beta build").unwrap();
    env.serve_manifest("beta");

    let updater = Updater::new(env.config().with_branch("beta")).unwrap();
    updater.run_update().await.unwrap();

    assert_eq!(env.read("index.js"), "module.exports = 'beta';\n");
}

#[tokio::test]
async fn test_missing_remote_manifest() {
    let env = Environment::new().await;
    let updater = Updater::new(env.config().with_branch("gone")).unwrap();

    let err = updater.run_update().await.unwrap_err();

    assert!(matches!(
        err.downcast_ref::<UpdateError>(),
        Some(UpdateError::RemoteNotFound { .. })
    ));
    assert_eq!(env.read("index.js"), "module.exports = '1.0.0';\n");
}

#[tokio::test]
async fn test_clone_of_missing_branch_fails_and_cleans_up() {
    let env = Environment::new().await;
    env.serve_manifest("gone");
    let updater = Updater::new(env.config().with_branch("gone")).unwrap();
    let mut rx = updater.subscribe();

    let err = updater.run_update().await.unwrap_err();

    assert!(matches!(
        err.downcast_ref::<UpdateError>(),
        Some(UpdateError::CloneFailed { .. })
    ));
    assert_eq!(drain(&mut rx), vec!["out-of-date", "download-start"]);
    assert!(!env.scratch_dir().exists());
    assert_eq!(env.read("index.js"), "module.exports = '1.0.0';\n");
}

#[tokio::test]
async fn test_token_sent_to_manifest_endpoint() {
    let env = Environment::new().await;
    let updater = Updater::new(env.config().with_access_token("s3cret")).unwrap();

    updater.run_update().await.unwrap();

    let requests = env.stub.requests();
    assert!(!requests.is_empty());
    for request in requests {
        assert_eq!(request.authorization.as_deref(), Some("token s3cret"));
    }
}

#[cfg(unix)]
#[tokio::test]
async fn test_dependency_drift_runs_install_command() {
    let env = Environment::new().await;
    std::fs::write(
        env.app_dir().join("package.json"),
        r#"{"name": "app", "version": "1.0.0", "dependencies": {}}"#,
    )
    .unwrap();
    let config = env.config().with_post_install_command("touch installed.marker");
    let updater = Updater::new(config).unwrap();

    let outcome = updater.run_update().await.unwrap();

    assert!(matches!(
        outcome,
        UpdateOutcome::Updated {
            modules_reinstalled: true,
            ..
        }
    ));
    assert!(exists(&env.app_dir(), "installed.marker"));
}

#[cfg(unix)]
#[tokio::test]
async fn test_failing_install_command() {
    let env = Environment::new().await;
    std::fs::write(
        env.app_dir().join("package.json"),
        r#"{"name": "app", "version": "1.0.0"}"#,
    )
    .unwrap();
    let updater = Updater::new(env.config().with_post_install_command("false")).unwrap();
    let mut rx = updater.subscribe();

    let err = updater.run_update().await.unwrap_err();

    assert!(matches!(
        err.downcast_ref::<UpdateError>(),
        Some(UpdateError::InstallCommandFailed { .. })
    ));
    assert!(!drain(&mut rx).contains(&"end"));
    assert_eq!(env.read("index.js"), "module.exports = '1.1.0';\n");
}
