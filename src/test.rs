//! Fixtures shared by the test modules.

use std::{str::FromStr, time::Duration};

use argon2::{Algorithm, Argon2, Params, Version};
use axum::body::Bytes;
use axum_test::TestServer;
use chrono::Utc;
use cookie::Cookie;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tempfile::TempDir;
use uuid::Uuid;

use crate::{
	cache::PageCache,
	media::MediaStorage,
	model::{Group, Post, User},
	session, AppState, Database,
};

/// A 2x1 transparent GIF.
pub const SMALL_GIF: &[u8] = &[
	0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x02, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
	0x00, 0xFF, 0xFF, 0xFF, 0x21, 0xF9, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x2C, 0x00, 0x00,
	0x00, 0x00, 0x02, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x0C, 0x0A, 0x00, 0x3B,
];

/// Marks the start of every post in a rendered feed.
pub const POST_CARD: &str = r#"<article class="post""#;

const BOUNDARY: &str = "blog-test-boundary";

/// A fresh in-memory database with the schema applied.
///
/// The pool holds a single connection that never expires, since every
/// in-memory connection would otherwise get its own empty database.
pub async fn database() -> Database {
	let options = SqliteConnectOptions::from_str("sqlite::memory:").unwrap();
	let database = SqlitePoolOptions::new()
		.max_connections(1)
		.idle_timeout(None)
		.max_lifetime(None)
		.connect_with(options)
		.await
		.unwrap();

	sqlx::migrate!().run(&database).await.unwrap();

	database
}

pub struct Harness {
	pub server: TestServer,
	pub database: Database,
	pub cache: PageCache,
	pub media: TempDir,
}

/// The whole application on top of a fresh database and media root.
pub async fn harness() -> Harness {
	let database = database().await;
	let media = tempfile::tempdir().unwrap();

	let state = AppState {
		database: database.clone(),
		// cheap parameters, hashes are only compared within a test
		hasher: Argon2::new(
			Algorithm::Argon2id,
			Version::V0x13,
			Params::new(1024, 1, 1, None).unwrap(),
		),
		cache: PageCache::new(Duration::from_secs(20)),
		media: MediaStorage::new(media.path()),
	};
	let cache = state.cache.clone();
	let server = TestServer::new(crate::route::routes(state)).unwrap();

	Harness {
		server,
		database,
		cache,
		media,
	}
}

async fn insert_user(database: &Database, username: &str, is_staff: bool) -> User {
	sqlx::query_as(
		r#"
			INSERT INTO "user" (id, username, email, password, is_staff, created_at)
			VALUES (?, ?, ?, ?, ?, ?)
			RETURNING *
		"#,
	)
	.bind(Uuid::new_v4())
	.bind(username)
	.bind(format!("{username}@example.com"))
	.bind(vec![0_u8; 32])
	.bind(is_staff)
	.bind(Utc::now())
	.fetch_one(database)
	.await
	.unwrap()
}

/// A user that can only log in through [`login`].
pub async fn create_user(database: &Database, username: &str) -> User {
	insert_user(database, username, false).await
}

pub async fn create_staff(database: &Database, username: &str) -> User {
	insert_user(database, username, true).await
}

pub async fn create_group(database: &Database, title: &str, slug: &str) -> Group {
	sqlx::query_as(
		r#"
			INSERT INTO "group" (title, slug, description) VALUES (?, ?, ?)
			RETURNING *
		"#,
	)
	.bind(title)
	.bind(slug)
	.bind(format!("All about {title}"))
	.fetch_one(database)
	.await
	.unwrap()
}

pub async fn create_post(
	database: &Database,
	author: &User,
	text: &str,
	group_id: Option<i64>,
) -> Post {
	sqlx::query_as(
		r#"
			INSERT INTO post (text, created_at, author_id, group_id) VALUES (?, ?, ?, ?)
			RETURNING *
		"#,
	)
	.bind(text)
	.bind(Utc::now())
	.bind(author.id)
	.bind(group_id)
	.fetch_one(database)
	.await
	.unwrap()
}

/// Opens a session for `user` and returns the cookie that carries it.
pub async fn login(database: &Database, user: &User) -> Cookie<'static> {
	let session_id = Uuid::new_v4();

	sqlx::query("INSERT INTO session (id, user_id, created_at) VALUES (?, ?, ?)")
		.bind(session_id)
		.bind(user.id)
		.bind(Utc::now())
		.execute(database)
		.await
		.unwrap();

	session::create_cookie(session_id)
}

/// A hand-built `multipart/form-data` body.
#[derive(Default)]
pub struct MultipartBody(Vec<u8>);

impl MultipartBody {
	pub fn content_type() -> String {
		format!("multipart/form-data; boundary={BOUNDARY}")
	}

	pub fn text(mut self, name: &str, value: &str) -> Self {
		self.0.extend_from_slice(
			format!(
				"--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
			)
			.as_bytes(),
		);
		self
	}

	pub fn file(mut self, name: &str, file_name: &str, data: &[u8]) -> Self {
		self.0.extend_from_slice(
			format!(
				"--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
			)
			.as_bytes(),
		);
		self.0.extend_from_slice(data);
		self.0.extend_from_slice(b"\r\n");
		self
	}

	pub fn finish(mut self) -> Bytes {
		self.0
			.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
		Bytes::from(self.0)
	}
}
