use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::Database;

/// A model representing a single user.
///
/// The `email` and `password` fields are never rendered.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
	pub id: Uuid,
	pub username: String,
	#[allow(dead_code)]
	pub email: String,
	/// argon2 and salted with `id`
	pub password: Vec<u8>,
	pub is_staff: bool,
	#[allow(dead_code)]
	pub created_at: DateTime<Utc>,
}

impl User {
	pub async fn by_username(
		database: &Database,
		username: &str,
	) -> Result<Option<Self>, sqlx::Error> {
		sqlx::query_as(r#"SELECT * FROM "user" WHERE username = ?"#)
			.bind(username)
			.fetch_optional(database)
			.await
	}
}

/// A community that posts can be filed under.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Group {
	pub id: i64,
	pub title: String,
	pub slug: String,
	pub description: String,
}

impl Group {
	pub async fn by_slug(database: &Database, slug: &str) -> Result<Option<Self>, sqlx::Error> {
		sqlx::query_as(r#"SELECT * FROM "group" WHERE slug = ?"#)
			.bind(slug)
			.fetch_optional(database)
			.await
	}

	pub async fn all(database: &Database) -> Result<Vec<Self>, sqlx::Error> {
		sqlx::query_as(r#"SELECT * FROM "group" ORDER BY title"#)
			.fetch_all(database)
			.await
	}
}

/// A post as stored, without any joined data.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Post {
	pub id: i64,
	pub text: String,
	pub created_at: DateTime<Utc>,
	pub author_id: Uuid,
	pub group_id: Option<i64>,
	pub image: Option<String>,
}

impl Post {
	pub async fn by_id(database: &Database, id: i64) -> Result<Option<Self>, sqlx::Error> {
		sqlx::query_as("SELECT * FROM post WHERE id = ?")
			.bind(id)
			.fetch_optional(database)
			.await
	}

	/// Only the author may change a post.
	pub fn is_editable_by(&self, user: &User) -> bool {
		self.author_id == user.id
	}

	/// The author or a staff member may remove a post.
	pub fn is_deletable_by(&self, user: &User) -> bool {
		self.is_editable_by(user) || user.is_staff
	}
}

/// A post joined with its author and group, as shown in feeds.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PostCard {
	pub id: i64,
	pub text: String,
	pub created_at: DateTime<Utc>,
	pub image: Option<String>,
	pub author_username: String,
	pub group_slug: Option<String>,
	pub group_title: Option<String>,
}

impl PostCard {
	pub fn published(&self) -> String {
		self.created_at.format("%d %b %Y %H:%M").to_string()
	}

	pub fn has_image(&self) -> bool {
		self.image.is_some()
	}

	pub fn image_path(&self) -> &str {
		self.image.as_deref().unwrap_or_default()
	}

	pub fn has_group(&self) -> bool {
		self.group_slug.is_some()
	}

	pub fn group_slug_str(&self) -> &str {
		self.group_slug.as_deref().unwrap_or_default()
	}

	pub fn group_title_str(&self) -> &str {
		self.group_title.as_deref().unwrap_or_default()
	}
}

/// A comment joined with its author.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CommentCard {
	pub id: i64,
	pub text: String,
	pub created_at: DateTime<Utc>,
	pub author_username: String,
}

impl CommentCard {
	pub fn published(&self) -> String {
		self.created_at.format("%d %b %Y %H:%M").to_string()
	}
}
