use assert_cmd::Command;
use predicates::prelude::*;

fn nvda_portable(work_dir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("nvda_portable").unwrap();
    cmd.env_remove("GITHUB_ENV")
        .env_remove("NVDA_PORTABLE_WORKDIR")
        .env_remove("NVDA_VERSION")
        .env_remove("NVDA_DOWNLOAD_URL")
        .env("APPDATA", work_dir.join("appdata"))
        .env("NO_COLOR", "1")
        .arg("--work-dir")
        .arg(work_dir);
    cmd
}

fn last_json_line(stdout: &[u8]) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(stdout);
    let line = stdout.lines().last().expect("stdout is empty");
    serde_json::from_str(line).expect("last line is JSON")
}

#[test]
fn unknown_task_lists_available_tasks() {
    let dir = tempfile::tempdir().unwrap();
    nvda_portable(dir.path())
        .arg("bogus_task")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Available tasks:"))
        .stderr(predicate::str::contains("get_nvda_info"));
}

#[test]
fn help_exits_zero() {
    let dir = tempfile::tempdir().unwrap();
    nvda_portable(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("package_nvda"));
}

#[test]
fn explicit_version_prints_json_result() {
    let dir = tempfile::tempdir().unwrap();
    let github_env = dir.path().join("github_env");

    let output = nvda_portable(dir.path())
        .args(["get_nvda_info", "2024.4.2", "--json", "--github-env"])
        .arg(&github_env)
        .output()
        .unwrap();

    assert!(output.status.success());
    let result = last_json_line(&output.stdout);
    assert_eq!(result["success"], true);
    assert_eq!(result["version"], "2024.4.2");
    assert_eq!(
        result["url"],
        "https://download.nvaccess.org/releases/2024.4.2/nvda_2024.4.2.exe"
    );

    assert!(dir.path().join(".nvda-portable").join("state.json").is_file());
    let env = std::fs::read_to_string(github_env).unwrap();
    assert!(env.contains("NVDA_VERSION=2024.4.2"));
}

#[test]
fn invalid_version_fails_with_resolution_error() {
    let dir = tempfile::tempdir().unwrap();

    let output = nvda_portable(dir.path())
        .args(["get_nvda_info", "latest", "--json"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let result = last_json_line(&output.stdout);
    assert_eq!(result["success"], false);
    assert_eq!(result["error_kind"], "ResolutionError");
    assert!(String::from_utf8_lossy(&output.stderr).contains("get_nvda_info failed"));
}

#[test]
fn missing_prerequisite_names_the_producing_task() {
    let dir = tempfile::tempdir().unwrap();
    nvda_portable(dir.path())
        .arg("download_nvda_installer")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("run `get_nvda_info` first"));
}

#[test]
fn missing_config_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let output = nvda_portable(dir.path())
        .args(["get_nvda_info", "2024.4.2", "--json", "--config"])
        .arg(dir.path().join("absent.toml"))
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(last_json_line(&output.stdout)["error_kind"], "ConfigError");
}

#[test]
fn fallback_is_announced_to_the_ci_runner() {
    let mut server = mockito::Server::new();
    let _listing = server.mock("GET", "/releases/").with_status(503).create();

    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("nvda-portable.toml");
    std::fs::write(
        &config,
        format!(
            "release_index_url = \"{}/releases/\"\n\n[http]\nattempts = 1\n",
            server.url()
        ),
    )
    .unwrap();
    let github_env = dir.path().join("github_env");

    let output = nvda_portable(dir.path())
        .args(["get_nvda_info", "--json", "--github-env"])
        .arg(&github_env)
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout
            .lines()
            .any(|line| line.starts_with("::warning title=NVDA version fallback::")),
        "{stdout}"
    );

    let result = last_json_line(&output.stdout);
    assert_eq!(result["success"], true);
    assert_eq!(result["source"], "fallback");
    assert_eq!(result["fallback"], true);
    assert_eq!(result["version"], "2024.4.2");

    let env = std::fs::read_to_string(github_env).unwrap();
    assert!(env.contains("NVDA_VERSION_FALLBACK=true"));
    let state =
        std::fs::read_to_string(dir.path().join(".nvda-portable").join("state.json")).unwrap();
    assert!(state.contains("NVDA_VERSION_FALLBACK"));
}

#[test]
fn no_fallback_flag_makes_discovery_failure_terminal() {
    let mut server = mockito::Server::new();
    let _listing = server.mock("GET", "/releases/").with_status(503).create();

    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("nvda-portable.toml"),
        format!(
            "release_index_url = \"{}/releases/\"\n\n[http]\nattempts = 1\n",
            server.url()
        ),
    )
    .unwrap();

    let output = nvda_portable(dir.path())
        .args(["get_nvda_info", "--json", "--no-fallback"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(!String::from_utf8_lossy(&output.stdout).contains("::warning"));
    assert_eq!(last_json_line(&output.stdout)["error_kind"], "ResolutionError");
}

#[test]
fn unusable_poll_backoff_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("custom.toml");
    std::fs::write(&config, "[timing]\npoll_backoff = nan\n").unwrap();

    let output = nvda_portable(dir.path())
        .args(["create_portable_copy", "--json", "--config"])
        .arg(&config)
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let result = last_json_line(&output.stdout);
    assert_eq!(result["error_kind"], "ConfigError");
    assert!(result["error"].as_str().unwrap().contains("poll backoff"));
}
