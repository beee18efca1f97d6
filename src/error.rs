use axum::{
	extract::{multipart::MultipartError, rejection::FormRejection},
	http::StatusCode,
	response::{IntoResponse, Redirect, Response},
};

use crate::{media, view};

/// Implemented by the error types of each route module, describing
/// how the error is surfaced to the client.
pub trait ErrorShape: std::error::Error {
	fn status(&self) -> StatusCode;
}

/// Error type for the application.
///
/// The Display trait is not sent to the client, so it can show
/// sensitive information.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("{message}")]
	Route { status: StatusCode, message: String },
	#[error("login required for {0}")]
	LoginRequired(String),
	#[error("form error: {0}")]
	Form(#[from] FormRejection),
	#[error("database error: {0}")]
	Database(#[from] sqlx::Error),
	#[error("template error: {0}")]
	Template(#[from] askama::Error),
	#[error("multipart error: {0}")]
	Multipart(#[from] MultipartError),
	#[error("media error: {0}")]
	Media(#[from] media::Error),
}

impl Error {
	/// Converts a route module error into an application error,
	/// keeping its status.
	pub fn shaped<E: ErrorShape>(error: &E) -> Self {
		Self::Route {
			status: error.status(),
			message: error.to_string(),
		}
	}
}

impl IntoResponse for Error {
	fn into_response(self) -> Response {
		match self {
			Self::LoginRequired(next) => Redirect::to(&view::login_url(&next)).into_response(),
			Self::Form(rejection) => {
				tracing::debug!(%rejection, "rejected form");

				view::error_page(rejection.status())
			}
			Self::Multipart(error) => {
				tracing::debug!(%error, "rejected multipart body");

				view::error_page(error.status())
			}
			Self::Route { status, message } => {
				if status.is_server_error() {
					tracing::error!(%status, %message, "route error");
				} else {
					tracing::debug!(%status, %message, "route error");
				}

				view::error_page(status)
			}
			error => {
				tracing::error!(%error, "internal error");

				view::error_page(StatusCode::INTERNAL_SERVER_ERROR)
			}
		}
	}
}
