use axum::{http::StatusCode, routing::get, Router};

use crate::{error, AppState};

pub mod route;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("unknown user {0}")]
	UnknownUser(String),
}

pub fn routes() -> Router<AppState> {
	use route::*;

	Router::new()
		.route("/follow/", get(follow_index))
		.route("/profile/:username/follow/", get(profile_follow))
		.route("/profile/:username/unfollow/", get(profile_unfollow))
}

impl error::ErrorShape for Error {
	fn status(&self) -> StatusCode {
		match self {
			Self::UnknownUser(..) => StatusCode::NOT_FOUND,
		}
	}
}

impl From<Error> for crate::Error {
	fn from(error: Error) -> Self {
		Self::shaped(&error)
	}
}
