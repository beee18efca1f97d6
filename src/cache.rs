//! Whole-page response cache.
//!
//! Entries live until their TTL runs out or the cache is cleared. Writes to
//! the underlying data do not invalidate anything, so a cached page may be
//! stale for up to one TTL.

use std::time::Duration;

use axum::{
	body::{Body, Bytes},
	extract::{Request, State},
	http::{header, HeaderMap, HeaderValue, Method, StatusCode},
	middleware::Next,
	response::{IntoResponse, Response},
};
use moka::sync::Cache;
use tracing::{debug, instrument};

use crate::extract::CurrentUser;

/// Largest body that will be buffered for caching.
const MAX_BODY_BYTES: usize = 4 * 1024 * 1024;

/// Total size of every cached key and body.
const MAX_CACHE_BYTES: u64 = 64 * 1024 * 1024;

/// A rendered response, as stored in the cache.
#[derive(Debug, Clone)]
pub struct CachedResponse {
	pub status: StatusCode,
	pub headers: HeaderMap,
	pub body: Bytes,
}

impl IntoResponse for CachedResponse {
	fn into_response(self) -> Response {
		let mut response = Response::new(Body::from(self.body));

		*response.status_mut() = self.status;
		*response.headers_mut() = self.headers;

		response
	}
}

/// In-memory page cache shared by every request.
///
/// Bounded by [`MAX_CACHE_BYTES`]; expired entries are reclaimed by the
/// cache itself rather than on the next read.
#[derive(Clone)]
pub struct PageCache {
	entries: Cache<String, CachedResponse>,
	ttl: Duration,
}

impl PageCache {
	pub fn new(ttl: Duration) -> Self {
		let entries = Cache::builder()
			.max_capacity(MAX_CACHE_BYTES)
			.weigher(|key: &String, response: &CachedResponse| {
				u32::try_from(key.len() + response.body.len()).unwrap_or(u32::MAX)
			})
			.time_to_live(ttl)
			.build();

		Self { entries, ttl }
	}

	pub fn ttl(&self) -> Duration {
		self.ttl
	}

	pub fn get(&self, key: &str) -> Option<CachedResponse> {
		self.entries.get(key)
	}

	pub fn set(&self, key: impl Into<String>, response: CachedResponse) {
		self.entries.insert(key.into(), response);
	}

	/// Drops a single entry, returning whether it was present.
	pub fn expire(&self, key: &str) -> bool {
		self.entries.remove(key).is_some()
	}

	pub fn clear(&self) {
		self.entries.invalidate_all();
	}

	/// Number of live entries.
	pub fn len(&self) -> usize {
		self.entries.iter().count()
	}
}

/// The cache key for a request: path, page number and viewer.
///
/// Other query parameters do not change what is rendered, so they are left
/// out. The viewer is the signed-in user's id, never the raw cookie.
fn cache_key(request: &Request, user: &CurrentUser) -> String {
	let uri = request.uri();
	let page = uri
		.query()
		.and_then(|query| {
			url::form_urlencoded::parse(query.as_bytes())
				.find(|(name, _)| name == "page")
				.map(|(_, value)| value.into_owned())
		})
		.unwrap_or_default();
	let viewer = user
		.current_user()
		.map_or_else(|| "anonymous".to_owned(), |user| user.id.to_string());

	format!("{}?page={page}#{viewer}", uri.path())
}

/// Whether the client asked to skip any stored copy.
fn wants_fresh(request: &Request) -> bool {
	request
		.headers()
		.get_all(header::CACHE_CONTROL)
		.into_iter()
		.filter_map(|value| value.to_str().ok())
		.any(|value| value.contains("no-cache"))
}

/// Middleware that serves `GET` responses from the [`PageCache`].
///
/// Only `200 OK` responses are stored.
#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn cache_page(
	State(cache): State<PageCache>,
	user: CurrentUser,
	request: Request,
	next: Next,
) -> Response {
	if request.method() != Method::GET {
		return next.run(request).await;
	}

	let key = cache_key(&request, &user);

	if wants_fresh(&request) && cache.expire(&key) {
		debug!(outcome = "refresh", "dropped cached page");
	}

	if let Some(cached) = cache.get(&key) {
		debug!(outcome = "hit", "serving cached page");
		return cached.into_response();
	}

	debug!(outcome = "miss", "rendering page");

	let response = next.run(request).await;

	if response.status() != StatusCode::OK {
		return response;
	}

	let (mut parts, body) = response.into_parts();
	let body = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
		Ok(body) => body,
		Err(error) => {
			tracing::error!(%error, "failed to buffer response for caching");
			return StatusCode::INTERNAL_SERVER_ERROR.into_response();
		}
	};

	if let Ok(value) = HeaderValue::from_str(&format!("max-age={}", cache.ttl().as_secs())) {
		parts.headers.insert(header::CACHE_CONTROL, value);
	}

	cache.set(
		key,
		CachedResponse {
			status: parts.status,
			headers: parts.headers.clone(),
			body: body.clone(),
		},
	);

	Response::from_parts(parts, Body::from(body))
}
