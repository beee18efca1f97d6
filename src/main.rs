#![warn(clippy::pedantic)]

mod cache;
mod config;
mod error;
mod extract;
mod feed;
mod follow;
mod media;
mod model;
mod route;
mod session;
#[cfg(test)]
mod test;
mod view;

use std::str::FromStr;

use argon2::Argon2;
use axum::{extract::Request, http::HeaderName};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tower::ServiceBuilder;
use tower_http::{
	compression::CompressionLayer,
	request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
	trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use error::Error;

pub type Database = sqlx::SqlitePool;
pub type AppState = State;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// The shared application state.
///
/// This should contain all shared dependencies that handlers need to access,
/// such as a database connection pool, a hash configuration (if it's expensive to create),
/// or a cache.
///
/// For dependencies only used by a single handler, you can combine states instead.
#[derive(Clone, axum::extract::FromRef)]
pub struct State {
	pub database: Database,
	pub hasher: Argon2<'static>,
	pub cache: cache::PageCache,
	pub media: media::MediaStorage,
}

/// Anything that can stop the server from starting.
#[derive(Debug, thiserror::Error)]
enum StartupError {
	#[error("configuration error: {0}")]
	Config(#[from] config::Error),
	#[error("database error: {0}")]
	Database(#[from] sqlx::Error),
	#[error("migration error: {0}")]
	Migrate(#[from] sqlx::migrate::MigrateError),
	#[error("io error: {0}")]
	Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> Result<(), StartupError> {
	tracing_subscriber::registry()
		.with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
		.with(tracing_subscriber::fmt::layer())
		.init();
	dotenvy::dotenv().ok();

	let config = config::Config::from_env()?;

	let options = SqliteConnectOptions::from_str(&config.database_url)?.create_if_missing(true);
	let database = SqlitePoolOptions::new().connect_with(options).await?;

	sqlx::migrate!().run(&database).await?;
	tokio::fs::create_dir_all(&config.media_root).await?;

	let state = State {
		database,
		hasher: Argon2::default(),
		cache: cache::PageCache::new(config.cache_ttl),
		media: media::MediaStorage::new(&config.media_root),
	};

	let request_id = HeaderName::from_static(REQUEST_ID_HEADER);
	let app = route::routes(state).layer(
		ServiceBuilder::new()
			.layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
			.layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
				let request_id = request
					.headers()
					.get(REQUEST_ID_HEADER)
					.and_then(|value| value.to_str().ok())
					.unwrap_or_default();

				tracing::info_span!(
					"request",
					method = %request.method(),
					uri = %request.uri(),
					request_id,
				)
			}))
			.layer(PropagateRequestIdLayer::new(request_id))
			.layer(CompressionLayer::new()),
	);

	let listener = tokio::net::TcpListener::bind((config.host, config.port)).await?;

	tracing::info!(
		host = %config.host,
		port = config.port,
		media_root = %config.media_root.display(),
		cache_ttl_secs = config.cache_ttl.as_secs(),
		"listening"
	);

	axum::serve(listener, app).await?;

	Ok(())
}
