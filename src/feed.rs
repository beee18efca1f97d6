//! Paginated post listings for the index, group, profile and follow views.

use sqlx::{QueryBuilder, Sqlite};
use uuid::Uuid;

use crate::{model::PostCard, Database};

/// Number of posts on every feed page.
pub const PAGE_SIZE: i64 = 10;

const SELECT_CARDS: &str = r#"
	SELECT
		p.id, p.text, p.created_at, p.image,
		u.username AS author_username,
		g.slug AS group_slug,
		g.title AS group_title
	FROM post p
	JOIN "user" u ON u.id = p.author_id
	LEFT JOIN "group" g ON g.id = p.group_id
"#;

/// Which posts a feed shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
	All,
	Group(i64),
	Author(Uuid),
	/// Posts by every author the given user follows.
	Following(Uuid),
}

impl Scope {
	fn push_filter(self, builder: &mut QueryBuilder<'_, Sqlite>) {
		match self {
			Self::All => {}
			Self::Group(group_id) => {
				builder.push(" WHERE p.group_id = ").push_bind(group_id);
			}
			Self::Author(author_id) => {
				builder.push(" WHERE p.author_id = ").push_bind(author_id);
			}
			Self::Following(user_id) => {
				builder
					.push(" WHERE p.author_id IN (SELECT author_id FROM follow WHERE user_id = ")
					.push_bind(user_id)
					.push(")");
			}
		}
	}
}

/// A single page of a feed.
#[derive(Debug, Clone)]
pub struct Page<T> {
	pub items: Vec<T>,
	/// The page number (1-indexed).
	pub number: i64,
	pub num_pages: i64,
	/// Total number of items across all pages.
	pub count: i64,
}

impl<T> Page<T> {
	pub fn has_previous(&self) -> bool {
		self.number > 1
	}

	pub fn has_next(&self) -> bool {
		self.number < self.num_pages
	}

	pub fn previous_number(&self) -> i64 {
		self.number - 1
	}

	pub fn next_number(&self) -> i64 {
		self.number + 1
	}
}

/// Number of pages needed for `count` items. An empty feed still has
/// one (empty) page.
pub fn num_pages(count: i64) -> i64 {
	if count <= 0 {
		1
	} else {
		(count + PAGE_SIZE - 1) / PAGE_SIZE
	}
}

/// Resolves the requested page number against the page count.
///
/// A missing or non-numeric value yields the first page, and a number
/// out of range yields the last page.
pub fn resolve_page(requested: Option<&str>, num_pages: i64) -> i64 {
	let Some(requested) = requested else {
		return 1;
	};

	match requested.trim().parse::<i64>() {
		Ok(number) if (1..=num_pages).contains(&number) => number,
		Ok(_) => num_pages,
		Err(_) => 1,
	}
}

/// Counts every post in the scope.
pub async fn count(database: &Database, scope: Scope) -> Result<i64, sqlx::Error> {
	let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM post p");
	scope.push_filter(&mut builder);

	builder.build_query_scalar().fetch_one(database).await
}

/// Fetches one page of the scope's posts, newest first.
pub async fn page(
	database: &Database,
	scope: Scope,
	requested: Option<&str>,
) -> Result<Page<PostCard>, sqlx::Error> {
	let count = count(database, scope).await?;
	let num_pages = num_pages(count);
	let number = resolve_page(requested, num_pages);

	let mut builder = QueryBuilder::new(SELECT_CARDS);
	scope.push_filter(&mut builder);
	builder
		.push(" ORDER BY p.created_at DESC, p.id DESC LIMIT ")
		.push_bind(PAGE_SIZE)
		.push(" OFFSET ")
		.push_bind((number - 1) * PAGE_SIZE);

	let items = builder.build_query_as().fetch_all(database).await?;

	Ok(Page {
		items,
		number,
		num_pages,
		count,
	})
}

/// Fetches a single post card by id.
pub async fn card(database: &Database, id: i64) -> Result<Option<PostCard>, sqlx::Error> {
	let mut builder = QueryBuilder::new(SELECT_CARDS);
	builder.push(" WHERE p.id = ").push_bind(id);

	builder.build_query_as().fetch_optional(database).await
}
