use axum::{
	http::StatusCode,
	routing::{get, post},
	Router,
};

use crate::{error, AppState};

pub mod model;
pub mod route;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("{0} is not a staff member")]
	Forbidden(String),
	#[error("A group with the slug \"{0}\" already exists.")]
	SlugTaken(String),
}

/// Staff-only pages.
pub fn routes() -> Router<AppState> {
	use route::*;

	Router::new()
		.route("/groups/", get(group_form).post(create_group))
		.route("/cache/clear/", post(clear_cache))
}

impl error::ErrorShape for Error {
	fn status(&self) -> StatusCode {
		match self {
			Self::Forbidden(..) => StatusCode::FORBIDDEN,
			Self::SlugTaken(..) => StatusCode::CONFLICT,
		}
	}
}

impl From<Error> for crate::Error {
	fn from(error: Error) -> Self {
		Self::shaped(&error)
	}
}
