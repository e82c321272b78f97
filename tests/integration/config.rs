use git_autoupdate::config::UpdateConfig;
use git_autoupdate::core::UpdateError;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

#[tokio::test]
async fn test_load_full_config() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("autoupdate.toml");
    std::fs::write(
        &path,
        r#"
repository = "https://github.com/acme/dashboard"
branch = "release"
scratch_path = "/var/tmp/dashboard-update"
ignore_paths = ["config/local.json", "data/", "config/local.json"]
testing = true
dev_mode_auto_detect = true
access_token = "ghp_secret"
post_install_command = "npm ci"
app_dir = "/srv/dashboard"
install_timeout_secs = 0
"#,
    )
    .unwrap();

    let config = UpdateConfig::load_from(&path).await.unwrap();

    assert_eq!(config.repository, "https://github.com/acme/dashboard");
    assert_eq!(config.branch, "release");
    assert_eq!(config.ignore_paths, vec!["config/local.json", "data", ".git"]);
    assert!(config.testing);
    assert!(!config.dev_mode);
    assert_eq!(config.install_command(), "npm ci");
    assert_eq!(config.install_timeout(), None);
    assert_eq!(config.scratch_dir(), PathBuf::from("/var/tmp/dashboard-update"));
    assert_eq!(config.destination_dir(), PathBuf::from("/srv/dashboard/testing"));
    assert!(!format!("{config:?}").contains("ghp_secret"));
}

#[tokio::test]
async fn test_load_minimal_config_uses_defaults() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("autoupdate.toml");
    std::fs::write(&path, "repository = \"git@github.com:acme/dashboard.git\"\n").unwrap();

    let config = UpdateConfig::load_from(&path).await.unwrap();

    assert_eq!(config.branch, "main");
    assert_eq!(config.manifest_file, "package.json");
    assert_eq!(config.ignore_paths, vec![".git"]);
    assert_eq!(config.install_command(), "npm install");
    assert_eq!(config.install_timeout(), Some(Duration::from_secs(600)));
    assert!(config.access_token.is_none());
}

#[tokio::test]
async fn test_load_invalid_configs() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("autoupdate.toml");

    for content in [
        "branch = \"main\"\n",
        "repository = \"\"\n",
        "repository = \"https://github.com/acme/app\"\nignore_paths = \"data\"\n",
        "repository = \"https://github.com/acme/app\"\npost_install_command = \"  \"\n",
        "repository = \"https://github.com/acme/app\"\napp_dir = \"/srv/app\"\nscratch_path = \"/srv\"\n",
    ] {
        std::fs::write(&path, content).unwrap();
        let err = UpdateConfig::load_from(&path).await.unwrap_err();
        assert!(
            matches!(err.downcast_ref::<UpdateError>(), Some(UpdateError::ConfigError { .. })),
            "expected config error for {content:?}, got {err:#}"
        );
    }
}

#[tokio::test]
async fn test_load_missing_file() {
    let temp = TempDir::new().unwrap();
    let err = UpdateConfig::load_from(&temp.path().join("absent.toml")).await.unwrap_err();
    assert!(format!("{err:#}").contains("Failed to read update config"));
}
