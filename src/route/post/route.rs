use axum::{
	extract::{Path, Query, State},
	response::{Html, IntoResponse, Redirect, Response},
};
use chrono::Utc;
use validator::Validate;

use crate::{
	extract::{CurrentUser, Form, Session},
	feed::{self, Scope},
	follow,
	media::MediaStorage,
	model::{CommentCard, Group, Post, User},
	route::model::PageQuery,
	view::{
		self, Chrome, FormErrors, GroupOption, GroupTemplate, IndexTemplate, PostDetailTemplate,
		PostFormTemplate, ProfileTemplate,
	},
	AppState, Database,
};

use super::{model, Error};

fn detail_url(post_id: i64) -> String {
	format!("/posts/{post_id}/")
}

fn profile_url(username: &str) -> String {
	format!("/profile/{username}/")
}

/// Looks up a post by the raw id from the path. Ids that are not
/// numbers are as unknown as ids that do not exist.
async fn find_post(database: &Database, raw_id: &str) -> Result<Post, crate::Error> {
	let Ok(post_id) = raw_id.parse() else {
		return Err(Error::UnknownPost(raw_id.to_owned()).into());
	};

	Ok(Post::by_id(database, post_id)
		.await?
		.ok_or_else(|| Error::UnknownPost(raw_id.to_owned()))?)
}

/// Validates a submitted post form, returning the chosen group and any
/// errors to show next to the fields.
async fn check_form(
	database: &Database,
	form: &model::PostForm,
) -> Result<(Option<i64>, FormErrors), crate::Error> {
	let mut errors = form
		.validate()
		.map_or_else(FormErrors::from, |()| FormErrors::default());

	let mut group_id = None;

	if let Some(raw) = form.group.as_deref() {
		group_id = match raw.parse::<i64>() {
			Ok(id) => group_exists(database, id).await?.then_some(id),
			Err(_) => None,
		};

		if group_id.is_none() {
			errors.add(
				"group",
				"Select a valid choice. That choice is not one of the available choices.",
			);
		}
	}

	if form.image.as_ref().is_some_and(|image| !image.is_image()) {
		errors.add(
			"image",
			"Upload a valid image. The file you uploaded was either not an image or a corrupted image.",
		);
	}

	Ok((group_id, errors))
}

/// Removes an image stored for a write that never reached the database.
async fn discard_image(media: &MediaStorage, stored: Option<&str>) {
	if let Some(path) = stored {
		if let Err(error) = media.delete(path).await {
			tracing::warn!(%error, path, "failed to remove orphaned image");
		}
	}
}

async fn group_exists(database: &Database, group_id: i64) -> Result<bool, sqlx::Error> {
	sqlx::query_scalar(r#"SELECT EXISTS (SELECT 1 FROM "group" WHERE id = ?)"#)
		.bind(group_id)
		.fetch_one(database)
		.await
}

/// The latest posts across the whole site.
pub async fn index(
	State(database): State<Database>,
	user: CurrentUser,
	Query(query): Query<PageQuery>,
) -> Result<Html<String>, crate::Error> {
	let page = feed::page(&database, Scope::All, query.page.as_deref()).await?;

	view::render(&IndexTemplate {
		chrome: Chrome::new(user.current_user()),
		page,
	})
}

/// The posts filed under a single group.
pub async fn group_posts(
	State(database): State<Database>,
	user: CurrentUser,
	Path(slug): Path<String>,
	Query(query): Query<PageQuery>,
) -> Result<Html<String>, crate::Error> {
	let group = Group::by_slug(&database, &slug)
		.await?
		.ok_or(Error::UnknownGroup(slug))?;
	let page = feed::page(&database, Scope::Group(group.id), query.page.as_deref()).await?;

	view::render(&GroupTemplate {
		chrome: Chrome::new(user.current_user()),
		group,
		page,
	})
}

/// An author's posts, with a follow button for other signed-in users.
pub async fn profile(
	State(database): State<Database>,
	user: CurrentUser,
	Path(username): Path<String>,
	Query(query): Query<PageQuery>,
) -> Result<Html<String>, crate::Error> {
	let author = User::by_username(&database, &username)
		.await?
		.ok_or(Error::UnknownUser(username))?;
	let page = feed::page(&database, Scope::Author(author.id), query.page.as_deref()).await?;

	let viewer = user.current_user();
	let can_follow = viewer.is_some_and(|viewer| viewer.id != author.id);
	let following = match viewer {
		Some(viewer) if can_follow => follow::is_following(&database, viewer.id, author.id).await?,
		_ => false,
	};

	view::render(&ProfileTemplate {
		chrome: Chrome::new(viewer),
		author: author.username,
		post_count: page.count,
		page,
		can_follow,
		following,
	})
}

pub async fn post_detail(
	State(database): State<Database>,
	user: CurrentUser,
	Path(raw_id): Path<String>,
) -> Result<Html<String>, crate::Error> {
	let post = find_post(&database, &raw_id).await?;
	let card = feed::card(&database, post.id)
		.await?
		.ok_or(Error::UnknownPost(raw_id))?;

	let comments = sqlx::query_as::<_, CommentCard>(
		r#"
			SELECT c.id, c.text, c.created_at, u.username AS author_username
			FROM comment c
			JOIN "user" u ON u.id = c.author_id
			WHERE c.post_id = ?
			ORDER BY c.created_at, c.id
		"#,
	)
	.bind(post.id)
	.fetch_all(&database)
	.await?;

	let author_post_count = feed::count(&database, Scope::Author(post.author_id)).await?;
	let viewer = user.current_user();

	view::render(&PostDetailTemplate {
		chrome: Chrome::new(viewer),
		post: card,
		author_post_count,
		comments,
		can_edit: viewer.is_some_and(|viewer| post.is_editable_by(viewer)),
		can_delete: viewer.is_some_and(|viewer| post.is_deletable_by(viewer)),
	})
}

pub async fn create_form(
	State(database): State<Database>,
	session: Session,
) -> Result<Html<String>, crate::Error> {
	let groups = Group::all(&database).await?;

	view::render(&PostFormTemplate {
		chrome: Chrome::new(Some(&session.user)),
		action: "/create/".into(),
		is_edit: false,
		text: String::new(),
		groups: GroupOption::list(groups, None),
		image: String::new(),
		errors: FormErrors::default(),
	})
}

/// Publishes a new post and sends the author to their profile.
pub async fn create_post(
	State(state): State<AppState>,
	session: Session,
	form: model::PostForm,
) -> Result<Response, crate::Error> {
	let (group_id, errors) = check_form(&state.database, &form).await?;

	if !errors.is_empty() {
		let groups = Group::all(&state.database).await?;

		return Ok(view::render(&PostFormTemplate {
			chrome: Chrome::new(Some(&session.user)),
			action: "/create/".into(),
			is_edit: false,
			text: form.text,
			groups: GroupOption::list(groups, group_id),
			image: String::new(),
			errors,
		})?
		.into_response());
	}

	let image = match &form.image {
		Some(upload) => Some(state.media.store_post_image(upload).await?),
		None => None,
	};

	let inserted = sqlx::query_scalar(
		r#"
			INSERT INTO post (text, created_at, author_id, group_id, image)
			VALUES (?, ?, ?, ?, ?)
			RETURNING id
		"#,
	)
	.bind(&form.text)
	.bind(Utc::now())
	.bind(session.user.id)
	.bind(group_id)
	.bind(&image)
	.fetch_one(&state.database)
	.await;

	let post_id: i64 = match inserted {
		Ok(id) => id,
		Err(err) => {
			discard_image(&state.media, image.as_deref()).await;

			return Err(err.into());
		}
	};

	tracing::info!(post_id, author = %session.user.username, "created post");

	Ok(Redirect::to(&profile_url(&session.user.username)).into_response())
}

pub async fn edit_form(
	State(database): State<Database>,
	session: Session,
	Path(raw_id): Path<String>,
) -> Result<Response, crate::Error> {
	let post = find_post(&database, &raw_id).await?;

	if !post.is_editable_by(&session.user) {
		return Ok(Redirect::to(&detail_url(post.id)).into_response());
	}

	let groups = Group::all(&database).await?;

	Ok(view::render(&PostFormTemplate {
		chrome: Chrome::new(Some(&session.user)),
		action: format!("/posts/{}/edit/", post.id),
		is_edit: true,
		text: post.text,
		groups: GroupOption::list(groups, post.group_id),
		image: post.image.unwrap_or_default(),
		errors: FormErrors::default(),
	})?
	.into_response())
}

/// Updates a post in place. Only the author gets this far; anyone else is
/// quietly sent back to the post.
pub async fn edit_post(
	State(state): State<AppState>,
	session: Session,
	Path(raw_id): Path<String>,
	form: model::PostForm,
) -> Result<Response, crate::Error> {
	let post = find_post(&state.database, &raw_id).await?;

	if !post.is_editable_by(&session.user) {
		return Ok(Redirect::to(&detail_url(post.id)).into_response());
	}

	let (group_id, errors) = check_form(&state.database, &form).await?;

	if !errors.is_empty() {
		let groups = Group::all(&state.database).await?;

		return Ok(view::render(&PostFormTemplate {
			chrome: Chrome::new(Some(&session.user)),
			action: format!("/posts/{}/edit/", post.id),
			is_edit: true,
			text: form.text,
			groups: GroupOption::list(groups, group_id),
			image: post.image.unwrap_or_default(),
			errors,
		})?
		.into_response());
	}

	let stored = match &form.image {
		Some(upload) => Some(state.media.store_post_image(upload).await?),
		None => None,
	};
	let image = stored.clone().or_else(|| post.image.clone());

	let updated = sqlx::query("UPDATE post SET text = ?, group_id = ?, image = ? WHERE id = ?")
		.bind(&form.text)
		.bind(group_id)
		.bind(&image)
		.bind(post.id)
		.execute(&state.database)
		.await;

	if let Err(err) = updated {
		discard_image(&state.media, stored.as_deref()).await;

		return Err(err.into());
	}

	// the previous file is unreferenced once a new one is stored
	if let Some(previous) = post.image.as_deref() {
		if image.as_deref() != Some(previous) {
			state.media.delete(previous).await?;
		}
	}

	Ok(Redirect::to(&detail_url(post.id)).into_response())
}

/// Removes a post, its comments and its image.
pub async fn delete_post(
	State(state): State<AppState>,
	session: Session,
	Path(raw_id): Path<String>,
) -> Result<Redirect, crate::Error> {
	let post = find_post(&state.database, &raw_id).await?;

	if !post.is_deletable_by(&session.user) {
		return Ok(Redirect::to(&detail_url(post.id)));
	}

	let author: String = sqlx::query_scalar(r#"SELECT username FROM "user" WHERE id = ?"#)
		.bind(post.author_id)
		.fetch_one(&state.database)
		.await?;

	sqlx::query("DELETE FROM post WHERE id = ?")
		.bind(post.id)
		.execute(&state.database)
		.await?;

	if let Some(image) = post.image.as_deref() {
		state.media.delete(image).await?;
	}

	tracing::info!(post_id = post.id, by = %session.user.username, "deleted post");

	Ok(Redirect::to(&profile_url(&author)))
}

/// Adds a comment to a post. Blank comments are dropped, and the client
/// always lands back on the post.
pub async fn add_comment(
	State(database): State<Database>,
	session: Session,
	Path(raw_id): Path<String>,
	Form { input, errors }: Form<model::CommentInput>,
) -> Result<Redirect, crate::Error> {
	let post = find_post(&database, &raw_id).await?;

	if errors.is_empty() {
		sqlx::query(
			"INSERT INTO comment (text, created_at, author_id, post_id) VALUES (?, ?, ?, ?)",
		)
		.bind(&input.text)
		.bind(Utc::now())
		.bind(session.user.id)
		.bind(post.id)
		.execute(&database)
		.await?;
	} else {
		tracing::debug!(post_id = post.id, "discarded blank comment");
	}

	Ok(Redirect::to(&detail_url(post.id)))
}

pub async fn comment_redirect(
	State(database): State<Database>,
	_: Session,
	Path(raw_id): Path<String>,
) -> Result<Redirect, crate::Error> {
	let post = find_post(&database, &raw_id).await?;

	Ok(Redirect::to(&detail_url(post.id)))
}
