pub mod admin;
pub mod auth;
pub mod follow;
pub mod model;
pub mod post;

use axum::{http::StatusCode, response::Response, Router};
use tower_http::services::ServeDir;

use crate::{view, AppState};

/// Builds the full application router.
pub fn routes(state: AppState) -> Router {
	Router::new()
		.merge(post::routes(state.clone()))
		.merge(follow::routes())
		.nest("/auth", auth::routes())
		.nest("/admin", admin::routes())
		.nest_service("/media", ServeDir::new(state.media.root()))
		.fallback(not_found)
		.with_state(state)
}

async fn not_found() -> Response {
	view::error_page(StatusCode::NOT_FOUND)
}
