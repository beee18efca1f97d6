use axum::{
	extract::{Path, Query, State},
	response::{Html, Redirect},
};

use crate::{
	extract::Session,
	feed::{self, Scope},
	follow::{self, FollowOutcome},
	model::User,
	route::model::PageQuery,
	view::{self, Chrome, FollowTemplate},
	Database,
};

use super::Error;

async fn find_author(database: &Database, username: String) -> Result<User, crate::Error> {
	Ok(User::by_username(database, &username)
		.await?
		.ok_or(Error::UnknownUser(username))?)
}

/// Posts by every author the signed-in user follows.
pub async fn follow_index(
	State(database): State<Database>,
	session: Session,
	Query(query): Query<PageQuery>,
) -> Result<Html<String>, crate::Error> {
	let page = feed::page(
		&database,
		Scope::Following(session.user.id),
		query.page.as_deref(),
	)
	.await?;

	view::render(&FollowTemplate {
		chrome: Chrome::new(Some(&session.user)),
		page,
	})
}

pub async fn profile_follow(
	State(database): State<Database>,
	session: Session,
	Path(username): Path<String>,
) -> Result<Redirect, crate::Error> {
	let author = find_author(&database, username).await?;
	let outcome = follow::follow(&database, &session.user, &author).await?;

	if outcome == FollowOutcome::Created {
		tracing::info!(follower = %session.user.username, author = %author.username, "followed author");
	}

	Ok(Redirect::to(&format!("/profile/{}/", author.username)))
}

pub async fn profile_unfollow(
	State(database): State<Database>,
	session: Session,
	Path(username): Path<String>,
) -> Result<Redirect, crate::Error> {
	let author = find_author(&database, username).await?;

	if follow::unfollow(&database, &session.user, &author).await? {
		tracing::info!(follower = %session.user.username, author = %author.username, "unfollowed author");
	}

	Ok(Redirect::to(&format!("/profile/{}/", author.username)))
}
