use axum::{
	extract::{FromRef, FromRequestParts, OriginalUri},
	http::request,
};
use uuid::Uuid;

use crate::{model::User, session, Database};

/// Looks up the session cookie and the user it belongs to.
///
/// A missing, malformed or unknown cookie is treated as anonymous.
async fn resolve<S>(parts: &request::Parts, state: &S) -> Result<Option<Session>, crate::Error>
where
	Database: FromRef<S>,
{
	let Some(session_id) =
		session::cookie_value(&parts.headers).and_then(|value| Uuid::parse_str(&value).ok())
	else {
		return Ok(None);
	};

	let database = Database::from_ref(state);
	let user = sqlx::query_as::<_, User>(
		r#"
			SELECT * FROM "user" WHERE id = (
				SELECT user_id FROM session WHERE id = ?
			)
		"#,
	)
	.bind(session_id)
	.fetch_optional(&database)
	.await?;

	Ok(user.map(|user| Session {
		id: session_id,
		user,
	}))
}

/// The path (and query) the client originally asked for.
fn requested_path(parts: &request::Parts) -> String {
	let uri = parts
		.extensions
		.get::<OriginalUri>()
		.map_or(&parts.uri, |original| &original.0);

	uri.path_and_query()
		.map_or_else(|| uri.path().to_owned(), ToString::to_string)
}

/// Extracts the session and related user from the request.
///
/// If there is no valid session, the client is redirected to the login
/// page with the requested path as `next`.
///
/// ```rust
/// async fn route(session: Session) {
///   println!("{:?}", session.user);
/// }
/// ```
#[derive(Debug)]
pub struct Session {
	pub id: Uuid,
	pub user: User,
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Session
where
	Database: FromRef<S>,
	S: Sync + Send,
{
	type Rejection = crate::Error;

	async fn from_request_parts(
		parts: &mut request::Parts,
		state: &S,
	) -> Result<Self, Self::Rejection> {
		resolve(parts, state)
			.await?
			.ok_or_else(|| crate::Error::LoginRequired(requested_path(parts)))
	}
}

/// The user behind the request, if any.
///
/// Unlike [`Session`], this never rejects an anonymous request.
#[derive(Debug)]
pub struct CurrentUser(Option<User>);

impl CurrentUser {
	pub fn anonymous() -> Self {
		Self(None)
	}

	pub fn current_user(&self) -> Option<&User> {
		self.0.as_ref()
	}
}

impl From<User> for CurrentUser {
	fn from(user: User) -> Self {
		Self(Some(user))
	}
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
	Database: FromRef<S>,
	S: Sync + Send,
{
	type Rejection = crate::Error;

	async fn from_request_parts(
		parts: &mut request::Parts,
		state: &S,
	) -> Result<Self, Self::Rejection> {
		Ok(Self(resolve(parts, state).await?.map(|session| session.user)))
	}
}
