//! OpenStack Swift client (Selectel cloud storage flavour)
//!
//! Authentication uses the legacy v1 scheme: `GET {auth_url}` with
//! `X-Auth-User` / `X-Auth-Key` headers answers with `X-Auth-Token` and
//! `X-Storage-Url`. Every later request carries the token.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Client, Response, StatusCode, Url};
use serde::Deserialize;

use super::{ObjectStore, RemoteObject, StorageResult};
use crate::error::StorageError;
use crate::logging::*;

const AUTH_USER: &str = "X-Auth-User";
const AUTH_KEY: &str = "X-Auth-Key";
const AUTH_TOKEN: &str = "X-Auth-Token";
const STORAGE_URL: &str = "X-Storage-Url";

/// Selectel authentication endpoint
pub const DEFAULT_AUTH_URL: &str = "https://auth.selcdn.ru/";

/// Swift caps listings at 10000 entries per request
pub const DEFAULT_PAGE_SIZE: usize = 10_000;

#[derive(Clone)]
pub struct Credentials {
	pub user: String,
	pub password: String,
}

impl std::fmt::Debug for Credentials {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Credentials").field("user", &self.user).field("password", &"***").finish()
	}
}

#[derive(Debug, Clone)]
pub struct SwiftOptions {
	pub auth_url: String,
	pub container: String,
	pub connect_timeout: Duration,
	/// Whole-request timeout; `None` lets slow uploads run as long as they need
	pub request_timeout: Option<Duration>,
	pub page_size: usize,
}

impl SwiftOptions {
	pub fn new(container: impl Into<String>) -> Self {
		SwiftOptions {
			auth_url: DEFAULT_AUTH_URL.to_string(),
			container: container.into(),
			connect_timeout: Duration::from_secs(30),
			request_timeout: None,
			page_size: DEFAULT_PAGE_SIZE,
		}
	}
}

/// Authenticated handle on one Swift container
#[derive(Debug, Clone)]
pub struct SwiftStore {
	client: Client,
	storage_url: Url,
	token: String,
	container: String,
	page_size: usize,
}

impl SwiftStore {
	/// Authenticate and bind to `options.container`
	pub async fn connect(credentials: &Credentials, options: &SwiftOptions) -> StorageResult<Self> {
		let mut builder = Client::builder().connect_timeout(options.connect_timeout);
		if let Some(timeout) = options.request_timeout {
			builder = builder.timeout(timeout);
		}
		let client = builder.build()?;

		debug!("Authenticating as {} at {}", credentials.user, options.auth_url);
		let response = client
			.get(&options.auth_url)
			.header(AUTH_USER, &credentials.user)
			.header(AUTH_KEY, &credentials.password)
			.send()
			.await?;

		let status = response.status();
		if !status.is_success() {
			return Err(StorageError::Auth {
				message: format!("{} returned status {}", options.auth_url, status.as_u16()),
			});
		}

		let token = required_header(&response, AUTH_TOKEN)?;
		let storage_url = required_header(&response, STORAGE_URL)?;
		let storage_url = Url::parse(&storage_url).map_err(|e| StorageError::Auth {
			message: format!("invalid storage URL {}: {}", storage_url, e),
		})?;
		if storage_url.cannot_be_a_base() {
			return Err(StorageError::Auth { message: format!("invalid storage URL {}", storage_url) });
		}

		info!("Connected to {} as {}", storage_url, credentials.user);
		Ok(SwiftStore {
			client,
			storage_url,
			token,
			container: options.container.clone(),
			page_size: options.page_size.max(1),
		})
	}

	fn container_url(&self) -> StorageResult<Url> {
		let mut url = self.storage_url.clone();
		url.path_segments_mut()
			.map_err(|_| invalid_base(&self.storage_url))?
			.pop_if_empty()
			.push(&self.container);
		Ok(url)
	}

	fn object_url(&self, name: &str) -> StorageResult<Url> {
		let mut url = self.container_url()?;
		url.path_segments_mut().map_err(|_| invalid_base(&self.storage_url))?.extend(name.split('/'));
		Ok(url)
	}

	fn listing_url(&self, marker: Option<&str>) -> StorageResult<Url> {
		let mut url = self.container_url()?;
		{
			let mut query = url.query_pairs_mut();
			query.append_pair("format", "json");
			query.append_pair("limit", &self.page_size.to_string());
			if let Some(marker) = marker {
				query.append_pair("marker", marker);
			}
		}
		Ok(url)
	}
}

#[async_trait]
impl ObjectStore for SwiftStore {
	fn container(&self) -> &str {
		&self.container
	}

	async fn list_objects(&self) -> StorageResult<Vec<RemoteObject>> {
		let mut objects = Vec::new();
		let mut marker: Option<String> = None;

		loop {
			let url = self.listing_url(marker.as_deref())?;
			let response =
				self.client.get(url.clone()).header(AUTH_TOKEN, &self.token).send().await?;

			let status = response.status();
			if status == StatusCode::NO_CONTENT {
				break;
			}
			if !status.is_success() {
				return Err(status_error("GET", &url, status));
			}

			// The server may cap pages below the requested limit, so only an
			// empty page or a marker that stops moving ends the listing.
			let page = parse_listing(&response.bytes().await?)?;
			let next = match page.last() {
				Some(last) => last.name.clone(),
				None => break,
			};
			if marker.as_deref() == Some(next.as_str()) {
				break;
			}
			marker = Some(next);
			objects.extend(page);
			debug!("Listed {} objects from {}", objects.len(), self.container);
		}

		Ok(objects)
	}

	async fn remove(&self, object: &RemoteObject) -> StorageResult<()> {
		let url = self.object_url(&object.name)?;
		let response = self.client.delete(url.clone()).header(AUTH_TOKEN, &self.token).send().await?;

		let status = response.status();
		if status == StatusCode::NOT_FOUND {
			debug!("Object {} already gone", object.name);
			return Ok(());
		}
		if !status.is_success() {
			return Err(status_error("DELETE", &url, status));
		}
		Ok(())
	}

	async fn upload(
		&self,
		file: tokio::fs::File,
		name: &str,
		content_type: Option<&str>,
	) -> StorageResult<()> {
		let url = self.object_url(name)?;
		let length = file.metadata().await?.len();

		let mut request = self
			.client
			.put(url.clone())
			.header(AUTH_TOKEN, &self.token)
			.header(CONTENT_LENGTH, length);
		if let Some(content_type) = content_type {
			request = request.header(CONTENT_TYPE, content_type);
		}

		let response = request.body(reqwest::Body::from(file)).send().await?;
		let status = response.status();
		if !status.is_success() {
			return Err(status_error("PUT", &url, status));
		}
		Ok(())
	}
}

fn required_header(response: &Response, name: &str) -> StorageResult<String> {
	let value = response
		.headers()
		.get(name)
		.ok_or_else(|| StorageError::Auth { message: format!("response lacks {} header", name) })?;
	value
		.to_str()
		.map(str::to_string)
		.map_err(|e| StorageError::Auth { message: format!("unreadable {} header: {}", name, e) })
}

fn status_error(method: &'static str, url: &Url, status: StatusCode) -> StorageError {
	StorageError::Status { method, url: url.to_string(), status: status.as_u16() }
}

fn invalid_base(url: &Url) -> StorageError {
	StorageError::Rejected { message: format!("storage URL {} cannot carry a path", url) }
}

/// One element of a JSON container listing
///
/// Pseudo-directory entries (`{"subdir": ...}`) have no name and are skipped.
#[derive(Debug, Deserialize)]
struct ListingEntry {
	name: Option<String>,
	#[serde(default)]
	bytes: u64,
	#[serde(default)]
	content_type: Option<String>,
}

/// Decode a `format=json` listing body
pub fn parse_listing(body: &[u8]) -> StorageResult<Vec<RemoteObject>> {
	if body.iter().all(u8::is_ascii_whitespace) {
		return Ok(Vec::new());
	}
	let entries: Vec<ListingEntry> = serde_json::from_slice(body)?;
	Ok(entries
		.into_iter()
		.filter_map(|entry| {
			entry.name.map(|name| RemoteObject {
				name,
				bytes: entry.bytes,
				content_type: entry.content_type,
			})
		})
		.collect())
}


// vim: ts=4
