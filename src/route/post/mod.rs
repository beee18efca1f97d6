use axum::{
	http::StatusCode,
	middleware,
	routing::{get, post},
	Router,
};

use crate::{cache, error, AppState};

pub mod model;
pub mod route;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("unknown post {0}")]
	UnknownPost(String),
	#[error("unknown group {0}")]
	UnknownGroup(String),
	#[error("unknown user {0}")]
	UnknownUser(String),
}

/// Feeds, post pages and the post forms.
///
/// Only the index goes through the page cache.
pub fn routes(state: AppState) -> Router<AppState> {
	use route::*;

	Router::new()
		.route(
			"/",
			get(index).route_layer(middleware::from_fn_with_state(state, cache::cache_page)),
		)
		.route("/group/:slug/", get(group_posts))
		.route("/profile/:username/", get(profile))
		.route("/create/", get(create_form).post(create_post))
		.route("/posts/:id/", get(post_detail))
		.route("/posts/:id/edit/", get(edit_form).post(edit_post))
		.route("/posts/:id/delete/", post(delete_post))
		.route(
			"/posts/:id/comment/",
			get(comment_redirect).post(add_comment),
		)
}

impl error::ErrorShape for Error {
	fn status(&self) -> StatusCode {
		match self {
			Self::UnknownPost(..) | Self::UnknownGroup(..) | Self::UnknownUser(..) => {
				StatusCode::NOT_FOUND
			}
		}
	}
}

impl From<Error> for crate::Error {
	fn from(error: Error) -> Self {
		Self::shaped(&error)
	}
}

#[cfg(test)]
mod test {
	use axum::http::{header, HeaderValue, StatusCode};
	use cookie::Cookie;

	use crate::{model::Post, test::*};

	async fn posts(database: &crate::Database) -> Vec<Post> {
		sqlx::query_as("SELECT * FROM post ORDER BY id")
			.fetch_all(database)
			.await
			.unwrap()
	}

	#[tokio::test]
	async fn test_create_post_with_image() {
		let harness = harness().await;
		let author = create_user(&harness.database, "leo").await;
		let group = create_group(&harness.database, "Writers", "writers").await;
		let cookie = login(&harness.database, &author).await;

		let body = MultipartBody::default()
			.text("text", "A post with a picture")
			.text("group", &group.id.to_string())
			.file("image", "small.gif", SMALL_GIF);

		let response = harness
			.server
			.post("/create/")
			.add_cookie(cookie)
			.content_type(&MultipartBody::content_type())
			.bytes(body.finish())
			.await;

		assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
		assert_eq!(response.header("location"), "/profile/leo/");

		let posts = posts(&harness.database).await;

		assert_eq!(posts.len(), 1);
		assert_eq!(posts[0].text, "A post with a picture");
		assert_eq!(posts[0].group_id, Some(group.id));
		assert_eq!(posts[0].image.as_deref(), Some("posts/small.gif"));
		assert!(harness.media.path().join("posts/small.gif").exists());
	}

	#[tokio::test]
	async fn test_create_rejects_invalid_form() {
		let harness = harness().await;
		let author = create_user(&harness.database, "leo").await;
		let cookie = login(&harness.database, &author).await;

		let body = MultipartBody::default()
			.text("text", "   ")
			.text("group", "999")
			.file("image", "notes.txt", b"not an image");

		let response = harness
			.server
			.post("/create/")
			.add_cookie(cookie)
			.content_type(&MultipartBody::content_type())
			.bytes(body.finish())
			.await;

		assert_eq!(response.status_code(), StatusCode::OK);

		let text = response.text();

		assert!(text.contains("This field is required."));
		assert!(text.contains("Select a valid choice."));
		assert!(text.contains("Upload a valid image."));
		assert!(posts(&harness.database).await.is_empty());
	}

	#[tokio::test]
	async fn test_edit_by_author_and_stranger() {
		let harness = harness().await;
		let author = create_user(&harness.database, "leo").await;
		let stranger = create_user(&harness.database, "mallory").await;
		let post = create_post(&harness.database, &author, "original", None).await;
		let path = format!("/posts/{}/edit/", post.id);

		let response = harness
			.server
			.post(&path)
			.add_cookie(login(&harness.database, &stranger).await)
			.content_type(&MultipartBody::content_type())
			.bytes(MultipartBody::default().text("text", "hijacked").finish())
			.await;

		assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
		assert_eq!(response.header("location"), format!("/posts/{}/", post.id));
		assert_eq!(posts(&harness.database).await[0].text, "original");

		let response = harness
			.server
			.post(&path)
			.add_cookie(login(&harness.database, &author).await)
			.content_type(&MultipartBody::content_type())
			.bytes(MultipartBody::default().text("text", "edited").finish())
			.await;

		assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
		assert_eq!(response.header("location"), format!("/posts/{}/", post.id));

		let posts = posts(&harness.database).await;

		assert_eq!(posts.len(), 1);
		assert_eq!(posts[0].text, "edited");
	}

	#[tokio::test]
	async fn test_edit_replaces_image() {
		let harness = harness().await;
		let author = create_user(&harness.database, "leo").await;
		let cookie = login(&harness.database, &author).await;

		harness
			.server
			.post("/create/")
			.add_cookie(cookie.clone())
			.content_type(&MultipartBody::content_type())
			.bytes(
				MultipartBody::default()
					.text("text", "pictured")
					.file("image", "first.gif", SMALL_GIF)
					.finish(),
			)
			.await;

		let post = posts(&harness.database).await.remove(0);

		harness
			.server
			.post(&format!("/posts/{}/edit/", post.id))
			.add_cookie(cookie)
			.content_type(&MultipartBody::content_type())
			.bytes(
				MultipartBody::default()
					.text("text", "pictured")
					.file("image", "second.gif", SMALL_GIF)
					.finish(),
			)
			.await;

		let post = posts(&harness.database).await.remove(0);

		assert_eq!(post.image.as_deref(), Some("posts/second.gif"));
		assert!(harness.media.path().join("posts/second.gif").exists());
		assert!(!harness.media.path().join("posts/first.gif").exists());
	}

	#[tokio::test]
	async fn test_group_pages() {
		let harness = harness().await;
		let author = create_user(&harness.database, "leo").await;
		let group = create_group(&harness.database, "Writers", "writers").await;

		for i in 0..13 {
			create_post(&harness.database, &author, &format!("post {i}"), Some(group.id)).await;
		}

		let first = harness.server.get("/group/writers/").await;
		let second = harness.server.get("/group/writers/?page=2").await;

		assert_eq!(first.status_code(), StatusCode::OK);
		assert_eq!(first.text().matches(POST_CARD).count(), 10);
		assert_eq!(second.text().matches(POST_CARD).count(), 3);
	}

	#[tokio::test]
	async fn test_index_newest_first() {
		let harness = harness().await;
		let author = create_user(&harness.database, "leo").await;

		create_post(&harness.database, &author, "older post", None).await;
		create_post(&harness.database, &author, "newest post", None).await;

		let text = harness.server.get("/").await.text();
		let newest = text.find("newest post").unwrap();
		let older = text.find("older post").unwrap();

		assert!(newest < older);
	}

	#[tokio::test]
	async fn test_index_is_cached_until_cleared() {
		let harness = harness().await;
		let author = create_user(&harness.database, "leo").await;

		create_post(&harness.database, &author, "before the cache", None).await;

		let first = harness.server.get("/").await;

		create_post(&harness.database, &author, "after the cache", None).await;

		let second = harness.server.get("/").await;

		assert_eq!(first.text(), second.text());
		assert!(!second.text().contains("after the cache"));
		assert_eq!(second.header("cache-control"), "max-age=20");

		harness.cache.clear();

		let third = harness.server.get("/").await;

		assert_ne!(first.text(), third.text());
		assert!(third.text().contains("after the cache"));
	}

	#[tokio::test]
	async fn test_index_cache_is_shared_across_junk_queries_and_cookies() {
		let harness = harness().await;

		for i in 0..5 {
			harness
				.server
				.get(&format!("/?utm_source={i}"))
				.add_cookie(Cookie::new("session", format!("forged-{i}")))
				.await;
		}

		assert_eq!(harness.cache.len(), 1);

		harness.server.get("/?page=2").await;

		assert_eq!(harness.cache.len(), 2);
	}

	#[tokio::test]
	async fn test_no_cache_request_refreshes_index() {
		let harness = harness().await;
		let author = create_user(&harness.database, "leo").await;

		harness.server.get("/").await;
		create_post(&harness.database, &author, "fresh post", None).await;

		assert!(!harness.server.get("/").await.text().contains("fresh post"));

		let refreshed = harness
			.server
			.get("/")
			.add_header(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"))
			.await;

		assert!(refreshed.text().contains("fresh post"));
		assert!(harness.server.get("/").await.text().contains("fresh post"));
	}

	#[tokio::test]
	async fn test_profile_and_detail_show_post_count() {
		let harness = harness().await;
		let author = create_user(&harness.database, "leo").await;
		let other = create_user(&harness.database, "mia").await;

		create_post(&harness.database, &other, "not counted", None).await;

		let mut last = None;
		for i in 0..3 {
			last = Some(create_post(&harness.database, &author, &format!("post {i}"), None).await);
		}

		let profile = harness.server.get("/profile/leo/").await;

		assert_eq!(profile.status_code(), StatusCode::OK);
		assert!(profile.text().contains("Posts: 3"));

		let detail = harness
			.server
			.get(&format!("/posts/{}/", last.unwrap().id))
			.await;

		assert!(detail.text().contains("Posts by this author: 3"));
	}

	#[tokio::test]
	async fn test_failed_insert_leaves_no_image_behind() {
		let harness = harness().await;
		let author = create_user(&harness.database, "leo").await;
		let cookie = login(&harness.database, &author).await;

		sqlx::query(
			"CREATE TRIGGER reject_posts BEFORE INSERT ON post BEGIN SELECT RAISE(ABORT, 'rejected'); END",
		)
		.execute(&harness.database)
		.await
		.unwrap();

		let response = harness
			.server
			.post("/create/")
			.add_cookie(cookie)
			.content_type(&MultipartBody::content_type())
			.bytes(
				MultipartBody::default()
					.text("text", "never saved")
					.file("image", "small.gif", SMALL_GIF)
					.finish(),
			)
			.await;

		assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
		assert!(posts(&harness.database).await.is_empty());

		let stored = std::fs::read_dir(harness.media.path().join("posts"))
			.unwrap()
			.count();

		assert_eq!(stored, 0);
	}

	#[tokio::test]
	async fn test_anonymous_is_sent_to_login() {
		let harness = harness().await;

		for (path, next) in [
			("/create/", "%2Fcreate%2F"),
			("/follow/", "%2Ffollow%2F"),
			("/posts/1/edit/", "%2Fposts%2F1%2Fedit%2F"),
			("/posts/1/comment/", "%2Fposts%2F1%2Fcomment%2F"),
		] {
			let response = harness.server.get(path).await;

			assert_eq!(response.status_code(), StatusCode::SEE_OTHER, "{path}");
			assert_eq!(
				response.header("location"),
				format!("/auth/login/?next={next}")
			);
		}
	}

	#[tokio::test]
	async fn test_unknown_objects_are_not_found() {
		let harness = harness().await;

		for path in ["/group/nope/", "/profile/nobody/", "/posts/999/", "/posts/abc/"] {
			let response = harness.server.get(path).await;

			assert_eq!(response.status_code(), StatusCode::NOT_FOUND, "{path}");
		}
	}

	#[tokio::test]
	async fn test_comments() {
		let harness = harness().await;
		let author = create_user(&harness.database, "leo").await;
		let reader = create_user(&harness.database, "reader").await;
		let post = create_post(&harness.database, &author, "discuss", None).await;
		let cookie = login(&harness.database, &reader).await;
		let path = format!("/posts/{}/comment/", post.id);

		let response = harness
			.server
			.post(&path)
			.add_cookie(cookie.clone())
			.form(&[("text", "Nice post")])
			.await;

		assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
		assert_eq!(response.header("location"), format!("/posts/{}/", post.id));

		harness
			.server
			.post(&path)
			.add_cookie(cookie)
			.form(&[("text", "  ")])
			.await;

		let comments: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comment")
			.fetch_one(&harness.database)
			.await
			.unwrap();

		assert_eq!(comments, 1);

		let detail = harness.server.get(&format!("/posts/{}/", post.id)).await;

		assert!(detail.text().contains("Nice post"));
	}

	#[tokio::test]
	async fn test_delete_by_stranger_and_staff() {
		let harness = harness().await;
		let author = create_user(&harness.database, "leo").await;
		let stranger = create_user(&harness.database, "mallory").await;
		let staff = create_staff(&harness.database, "admin").await;
		let post = create_post(&harness.database, &author, "short lived", None).await;
		let path = format!("/posts/{}/delete/", post.id);

		let response = harness
			.server
			.post(&path)
			.add_cookie(login(&harness.database, &stranger).await)
			.await;

		assert_eq!(response.header("location"), format!("/posts/{}/", post.id));
		assert_eq!(posts(&harness.database).await.len(), 1);

		let response = harness
			.server
			.post(&path)
			.add_cookie(login(&harness.database, &staff).await)
			.await;

		assert_eq!(response.header("location"), "/profile/leo/");
		assert!(posts(&harness.database).await.is_empty());
	}
}
