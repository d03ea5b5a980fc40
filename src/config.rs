//! Configuration for cloudpush
//!
//! The configuration follows a priority chain:
//! 1. Built-in defaults (Config::default())
//! 2. Config file (`--config PATH` or `CLOUDPUSH_CONFIG`, TOML)
//! 3. Environment variables (CLOUDPUSH_* prefix)
//! 4. CLI flags (highest priority)
//!
//! Resolution or validation failures are fatal and happen before any
//! storage request is made.

use clap::ArgMatches;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::dispatch::DEFAULT_WORKERS;
use crate::error::SyncError;
use crate::storage::swift::{Credentials, SwiftOptions, DEFAULT_AUTH_URL, DEFAULT_PAGE_SIZE};
use crate::task::DEFAULT_ATTEMPTS;

/// Prefix of every environment variable read by [`Config::apply_env`]
pub const ENV_PREFIX: &str = "CLOUDPUSH";

const MAX_ATTEMPTS_LIMIT: u32 = 100;

#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
	// ========================================================================
	// CREDENTIALS & TARGET
	// ========================================================================
	/// Storage account user name
	pub user: String,

	/// Storage account password (API key)
	pub password: String,

	/// Container the directory is mirrored into
	pub container: String,

	/// Local directory to upload
	pub directory: PathBuf,

	/// Authentication endpoint
	pub auth_url: String,

	// ========================================================================
	// PIPELINE
	// ========================================================================
	/// Concurrent upload workers, also caps concurrent removals
	pub workers: usize,

	/// Attempts per file before it is abandoned
	pub max_attempts: u32,

	/// Delay before a failed upload is queued again (0 = immediately)
	pub retry_delay_ms: u64,

	/// Content-Type sent with every upload; unset lets the service guess
	pub content_type: Option<String>,

	// ========================================================================
	// HTTP
	// ========================================================================
	pub connect_timeout_secs: u64,

	/// Whole-request timeout, unset for none
	pub request_timeout_secs: Option<u64>,

	/// Objects requested per listing page
	pub list_page_size: usize,
}

impl Default for Config {
	fn default() -> Self {
		Config {
			user: String::new(),
			password: String::new(),
			container: String::new(),
			directory: PathBuf::new(),
			auth_url: DEFAULT_AUTH_URL.to_string(),

			workers: DEFAULT_WORKERS,
			max_attempts: DEFAULT_ATTEMPTS,
			retry_delay_ms: 0,
			content_type: None,

			connect_timeout_secs: 30,
			request_timeout_secs: None,
			list_page_size: DEFAULT_PAGE_SIZE,
		}
	}
}

impl fmt::Debug for Config {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Config")
			.field("user", &self.user)
			.field("password", &"***")
			.field("container", &self.container)
			.field("directory", &self.directory)
			.field("auth_url", &self.auth_url)
			.field("workers", &self.workers)
			.field("max_attempts", &self.max_attempts)
			.field("retry_delay_ms", &self.retry_delay_ms)
			.field("content_type", &self.content_type)
			.field("connect_timeout_secs", &self.connect_timeout_secs)
			.field("request_timeout_secs", &self.request_timeout_secs)
			.field("list_page_size", &self.list_page_size)
			.finish()
	}
}

impl Config {
	/// Resolve the full priority chain from CLI matches and the process environment
	pub fn resolve(matches: &ArgMatches) -> Result<Config, SyncError> {
		Self::resolve_with(matches, |key| std::env::var(key).ok())
	}

	/// Same as [`Config::resolve`] with a custom environment lookup
	pub fn resolve_with<F>(matches: &ArgMatches, lookup: F) -> Result<Config, SyncError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let config_file = matches
			.get_one::<PathBuf>("config")
			.cloned()
			.or_else(|| non_empty(lookup(&env_key("CONFIG"))).map(PathBuf::from));

		let mut config = match config_file {
			Some(path) => Config::load_file(&path)?,
			None => Config::default(),
		};
		config.apply_env(&lookup)?;
		config.apply_matches(matches);
		config.validate()?;
		Ok(config)
	}

	/// Load a TOML config file; missing keys keep their defaults
	pub fn load_file(path: &Path) -> Result<Config, SyncError> {
		let content = std::fs::read_to_string(path).map_err(|e| SyncError::InvalidConfig {
			message: format!("cannot read {}: {}", path.display(), e),
		})?;
		toml::from_str(&content).map_err(|e| SyncError::InvalidConfig {
			message: format!("cannot parse {}: {}", path.display(), e),
		})
	}

	/// Override fields from `CLOUDPUSH_*` variables; empty values are ignored
	pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), SyncError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let get = |name: &str| non_empty(lookup(&env_key(name)));

		if let Some(v) = get("USER") {
			self.user = v;
		}
		if let Some(v) = get("PASSWORD") {
			self.password = v;
		}
		if let Some(v) = get("CONTAINER") {
			self.container = v;
		}
		if let Some(v) = get("DIR") {
			self.directory = PathBuf::from(v);
		}
		if let Some(v) = get("AUTH_URL") {
			self.auth_url = v;
		}
		if let Some(v) = get("WORKERS") {
			self.workers = parse_env("WORKERS", &v)?;
		}
		if let Some(v) = get("MAX_ATTEMPTS") {
			self.max_attempts = parse_env("MAX_ATTEMPTS", &v)?;
		}
		if let Some(v) = get("RETRY_DELAY_MS") {
			self.retry_delay_ms = parse_env("RETRY_DELAY_MS", &v)?;
		}
		if let Some(v) = get("CONTENT_TYPE") {
			self.content_type = Some(v);
		}
		Ok(())
	}

	/// Override fields from command-line flags that were given
	pub fn apply_matches(&mut self, matches: &ArgMatches) {
		if let Some(v) = matches.get_one::<String>("user") {
			self.user = v.clone();
		}
		if let Some(v) = matches.get_one::<String>("password") {
			self.password = v.clone();
		}
		if let Some(v) = matches.get_one::<String>("container") {
			self.container = v.clone();
		}
		if let Some(v) = matches.get_one::<PathBuf>("dir") {
			self.directory = v.clone();
		}
		if let Some(v) = matches.get_one::<String>("auth-url") {
			self.auth_url = v.clone();
		}
		if let Some(v) = matches.get_one::<usize>("workers") {
			self.workers = *v;
		}
		if let Some(v) = matches.get_one::<u32>("attempts") {
			self.max_attempts = *v;
		}
		if let Some(v) = matches.get_one::<u64>("retry-delay-ms") {
			self.retry_delay_ms = *v;
		}
		if let Some(v) = matches.get_one::<String>("content-type") {
			self.content_type = Some(v.clone());
		}
	}

	pub fn validate(&self) -> Result<(), SyncError> {
		require("user", &self.user, "USER")?;
		require("password", &self.password, "PASSWORD")?;
		require("container", &self.container, "CONTAINER")?;
		if self.directory.as_os_str().is_empty() {
			return Err(invalid(format!("dir is required (--dir or {})", env_key("DIR"))));
		}
		if self.workers == 0 {
			return Err(invalid("workers must be at least 1".to_string()));
		}
		if self.max_attempts == 0 || self.max_attempts > MAX_ATTEMPTS_LIMIT {
			return Err(invalid(format!(
				"attempts must be between 1 and {}, got {}",
				MAX_ATTEMPTS_LIMIT, self.max_attempts
			)));
		}
		if self.list_page_size == 0 || self.list_page_size > DEFAULT_PAGE_SIZE {
			return Err(invalid(format!(
				"listPageSize must be between 1 and {}, got {}",
				DEFAULT_PAGE_SIZE, self.list_page_size
			)));
		}
		if self.connect_timeout_secs == 0 {
			return Err(invalid("connectTimeoutSecs must be greater than 0".to_string()));
		}
		if self.request_timeout_secs == Some(0) {
			return Err(invalid("requestTimeoutSecs must be greater than 0".to_string()));
		}
		Ok(())
	}

	pub fn retry_delay(&self) -> Option<Duration> {
		if self.retry_delay_ms == 0 {
			None
		} else {
			Some(Duration::from_millis(self.retry_delay_ms))
		}
	}

	pub fn credentials(&self) -> Credentials {
		Credentials { user: self.user.clone(), password: self.password.clone() }
	}

	pub fn swift_options(&self) -> SwiftOptions {
		SwiftOptions {
			auth_url: self.auth_url.clone(),
			container: self.container.clone(),
			connect_timeout: Duration::from_secs(self.connect_timeout_secs),
			request_timeout: self.request_timeout_secs.map(Duration::from_secs),
			page_size: self.list_page_size,
		}
	}
}

fn env_key(name: &str) -> String {
	format!("{}_{}", ENV_PREFIX, name)
}

fn non_empty(value: Option<String>) -> Option<String> {
	value.filter(|v| !v.is_empty())
}

fn parse_env<T>(name: &str, value: &str) -> Result<T, SyncError>
where
	T: std::str::FromStr,
	T::Err: fmt::Display,
{
	value
		.parse()
		.map_err(|e| invalid(format!("{}={:?} is not valid: {}", env_key(name), value, e)))
}

fn require(field: &str, value: &str, env_name: &str) -> Result<(), SyncError> {
	if value.is_empty() {
		return Err(invalid(format!("{} is required (--{} or {})", field, field, env_key(env_name))));
	}
	Ok(())
}

fn invalid(message: String) -> SyncError {
	SyncError::InvalidConfig { message }
}


// vim: ts=4
