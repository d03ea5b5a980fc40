/// Integration tests for configuration loading
/// Tests that config files are read and layered under env vars and CLI flags
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

use cloudpush::cli;
use cloudpush::config::Config;
use cloudpush::error::SyncError;

fn write_config(dir: &TempDir, content: &str) -> PathBuf {
	let path = dir.path().join("cloudpush.toml");
	fs::write(&path, content).unwrap();
	path
}

fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
	pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

#[test]
fn test_file_env_cli_precedence() {
	let temp_dir = TempDir::new().expect("Failed to create temp dir");
	let path = write_config(
		&temp_dir,
		r#"
		user = "file-user"
		password = "file-pass"
		container = "file-box"
		directory = "/srv/file"
		workers = 3
		maxAttempts = 2
		contentType = "text/plain"
		"#,
	);

	let matches = cli::command()
		.try_get_matches_from([
			"cloudpush",
			"--config",
			path.to_str().unwrap(),
			"--container",
			"cli-box",
		])
		.unwrap();
	let vars = env(&[("CLOUDPUSH_CONTAINER", "env-box"), ("CLOUDPUSH_USER", "env-user")]);

	let config = Config::resolve_with(&matches, |k| vars.get(k).cloned()).unwrap();

	assert_eq!(config.user, "env-user");
	assert_eq!(config.password, "file-pass");
	assert_eq!(config.container, "cli-box");
	assert_eq!(config.directory, PathBuf::from("/srv/file"));
	assert_eq!(config.workers, 3);
	assert_eq!(config.max_attempts, 2);
	assert_eq!(config.content_type.as_deref(), Some("text/plain"));
}

#[test]
fn test_config_path_from_env() {
	let temp_dir = TempDir::new().unwrap();
	let path = write_config(
		&temp_dir,
		r#"
		user = "u"
		password = "p"
		container = "c"
		directory = "site"
		retryDelayMs = 500
		requestTimeoutSecs = 60
		"#,
	);

	let matches = cli::command().try_get_matches_from(["cloudpush"]).unwrap();
	let vars = env(&[("CLOUDPUSH_CONFIG", path.to_str().unwrap())]);

	let config = Config::resolve_with(&matches, |k| vars.get(k).cloned()).unwrap();

	assert_eq!(config.retry_delay(), Some(Duration::from_millis(500)));
	let options = config.swift_options();
	assert_eq!(options.container, "c");
	assert_eq!(options.request_timeout, Some(Duration::from_secs(60)));
	assert_eq!(config.credentials().user, "u");
}

#[test]
fn test_missing_config_file_is_invalid() {
	let temp_dir = TempDir::new().unwrap();
	let missing = temp_dir.path().join("absent.toml");

	let matches = cli::command()
		.try_get_matches_from(["cloudpush", "--config", missing.to_str().unwrap()])
		.unwrap();

	let err = Config::resolve_with(&matches, |_| None).unwrap_err();
	assert!(matches!(err, SyncError::InvalidConfig { .. }));
}

#[test]
fn test_malformed_config_file_is_invalid() {
	let temp_dir = TempDir::new().unwrap();
	let path = write_config(&temp_dir, "workers = \"many\"");

	let err = Config::load_file(&path).unwrap_err();
	assert!(err.to_string().contains("cloudpush.toml"));
}

#[test]
fn test_validation_runs_after_layering() {
	let temp_dir = TempDir::new().unwrap();
	let path = write_config(
		&temp_dir,
		r#"
		user = "u"
		password = "p"
		container = "c"
		directory = "site"
		"#,
	);

	let matches = cli::command()
		.try_get_matches_from(["cloudpush", "--config", path.to_str().unwrap(), "--attempts", "0"])
		.unwrap();

	let err = Config::resolve_with(&matches, |_| None).unwrap_err();
	assert!(err.to_string().contains("attempts"));
}

// vim: ts=4
