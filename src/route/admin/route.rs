use axum::{
	extract::State,
	response::{Html, IntoResponse, Redirect, Response},
};

use crate::{
	cache::PageCache,
	extract::{Form, Session},
	model::User,
	view::{self, Chrome, FormErrors, GroupFormTemplate},
	Database,
};

use super::{model, Error};

fn require_staff(session: &Session) -> Result<&User, Error> {
	if session.user.is_staff {
		Ok(&session.user)
	} else {
		Err(Error::Forbidden(session.user.username.clone()))
	}
}

pub async fn group_form(session: Session) -> Result<Html<String>, crate::Error> {
	let user = require_staff(&session)?;

	view::render(&GroupFormTemplate {
		chrome: Chrome::new(Some(user)),
		title: String::new(),
		slug: String::new(),
		description: String::new(),
		errors: FormErrors::default(),
	})
}

/// Creates a group and shows its (empty) feed.
pub async fn create_group(
	State(database): State<Database>,
	session: Session,
	Form { input, mut errors }: Form<model::GroupInput>,
) -> Result<Response, crate::Error> {
	let user = require_staff(&session)?;
	let slug = input.slug();

	if errors.is_empty() && slug.is_empty() {
		errors.add("slug", "Enter a valid slug.");
	}

	if errors.is_empty() {
		let inserted =
			sqlx::query(r#"INSERT INTO "group" (title, slug, description) VALUES (?, ?, ?)"#)
				.bind(input.title.trim())
				.bind(&slug)
				.bind(&input.description)
				.execute(&database)
				.await;

		match inserted {
			Err(sqlx::Error::Database(error)) if error.is_unique_violation() => {
				errors.add("slug", Error::SlugTaken(slug).to_string());
			}
			inserted => {
				inserted?;
				tracing::info!(%slug, by = %user.username, "created group");

				return Ok(Redirect::to(&format!("/group/{slug}/")).into_response());
			}
		}
	}

	Ok(view::render(&GroupFormTemplate {
		chrome: Chrome::new(Some(user)),
		title: input.title,
		slug: input.slug,
		description: input.description,
		errors,
	})?
	.into_response())
}

/// Drops every cached page, so the next request renders fresh.
pub async fn clear_cache(
	State(cache): State<PageCache>,
	session: Session,
) -> Result<Redirect, crate::Error> {
	let user = require_staff(&session)?;
	let entries = cache.len();

	cache.clear();
	tracing::info!(entries, by = %user.username, "cleared page cache");

	Ok(Redirect::to("/"))
}
