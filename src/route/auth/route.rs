use argon2::Argon2;
use axum::{
	extract::{Query, State},
	http::header,
	response::{Html, IntoResponse, Redirect, Response},
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
	extract::{CurrentUser, Form, Session},
	model::User,
	session,
	view::{self, Chrome, FormErrors, LoginTemplate, SignupTemplate},
	AppState, Database,
};

use super::{model, Error};

pub const KEY_LENGTH: usize = 32;

/// Hashes a password with Argon2, using the user's id as a salt.
/// Since this is only used for logging in and creating a new password,
/// the scope of this function can remain in here with no issues.
pub fn hash_password(
	hasher: &Argon2,
	password: &str,
	id: &Uuid,
) -> Result<[u8; KEY_LENGTH], argon2::Error> {
	let mut hash = [0; KEY_LENGTH];

	hasher.hash_password_into(password.as_bytes(), id.as_bytes(), &mut hash)?;
	Ok(hash)
}

/// Opens a new session for the user and returns its id.
async fn start_session<'c, E>(executor: E, user_id: Uuid) -> Result<Uuid, sqlx::Error>
where
	E: sqlx::Executor<'c, Database = sqlx::Sqlite>,
{
	let session_id = Uuid::new_v4();

	sqlx::query("INSERT INTO session (id, user_id, created_at) VALUES (?, ?, ?)")
		.bind(session_id)
		.bind(user_id)
		.bind(Utc::now())
		.execute(executor)
		.await?;

	Ok(session_id)
}

fn with_session_cookie(session_id: Uuid, to: &str) -> Response {
	let cookie = session::create_cookie(session_id);

	([(header::SET_COOKIE, cookie.to_string())], Redirect::to(to)).into_response()
}

pub async fn signup_form(user: CurrentUser) -> Result<Html<String>, crate::Error> {
	view::render(&SignupTemplate {
		chrome: Chrome::new(user.current_user()),
		username: String::new(),
		email: String::new(),
		errors: FormErrors::default(),
	})
}

/// Creates an account and logs straight into it.
pub async fn signup(
	State(state): State<AppState>,
	user: CurrentUser,
	Form { input, mut errors }: Form<model::SignupInput>,
) -> Result<Response, crate::Error> {
	if errors.is_empty() {
		let user_id = Uuid::new_v4();
		let hashed = hash_password(&state.hasher, &input.password, &user_id).map_err(Error::Argon)?;

		let mut tx = state.database.begin().await?;

		let inserted = sqlx::query(
			r#"
				INSERT INTO "user" (id, username, email, password, created_at)
				VALUES (?, ?, ?, ?, ?)
			"#,
		)
		.bind(user_id)
		.bind(&input.username)
		.bind(&input.email)
		.bind(&hashed[..])
		.bind(Utc::now())
		.execute(&mut *tx)
		.await;

		match inserted {
			Err(sqlx::Error::Database(error)) if error.is_unique_violation() => {
				errors.add("username", Error::UsernameTaken.to_string());
			}
			inserted => {
				inserted?;

				let session_id = start_session(&mut *tx, user_id).await?;

				tx.commit().await?;
				tracing::info!(username = %input.username, "registered user");

				return Ok(with_session_cookie(session_id, "/"));
			}
		}
	}

	Ok(view::render(&SignupTemplate {
		chrome: Chrome::new(user.current_user()),
		username: input.username,
		email: input.email,
		errors,
	})?
	.into_response())
}

pub async fn login_form(
	user: CurrentUser,
	Query(query): Query<model::NextQuery>,
) -> Result<Html<String>, crate::Error> {
	view::render(&LoginTemplate {
		chrome: Chrome::new(user.current_user()),
		username: String::new(),
		next: query.next,
		errors: FormErrors::default(),
	})
}

/// Checks the credentials, returning the user they belong to.
async fn authenticate(
	database: &Database,
	hasher: &Argon2<'_>,
	input: &model::LoginInput,
) -> Result<Option<User>, crate::Error> {
	let Some(user) = User::by_username(database, &input.username).await? else {
		return Ok(None);
	};

	let hashed = hash_password(hasher, &input.password, &user.id).map_err(Error::Argon)?;

	Ok((user.password == hashed).then_some(user))
}

/// Logs in and returns to `next` when it points back into the site.
pub async fn login(
	State(state): State<AppState>,
	user: CurrentUser,
	Form { input, mut errors }: Form<model::LoginInput>,
) -> Result<Response, crate::Error> {
	if errors.is_empty() {
		match authenticate(&state.database, &state.hasher, &input).await? {
			Some(user) => {
				let session_id = start_session(&state.database, user.id).await?;
				let next = view::local_redirect(&input.next).unwrap_or_else(|| "/".to_owned());

				tracing::info!(username = %user.username, "logged in");

				return Ok(with_session_cookie(session_id, &next));
			}
			None => errors.add("__all__", Error::InvalidUsernameOrPassword.to_string()),
		}
	}

	Ok(view::render(&LoginTemplate {
		chrome: Chrome::new(user.current_user()),
		username: input.username,
		next: input.next,
		errors,
	})?
	.into_response())
}

/// Ends the current session, if there is one.
pub async fn logout(
	State(database): State<Database>,
	session: Option<Session>,
) -> Result<Response, crate::Error> {
	if let Some(session) = session {
		sqlx::query("DELETE FROM session WHERE id = ?")
			.bind(session.id)
			.execute(&database)
			.await?;
	}

	// Clear the session cookie
	Ok((
		[(header::SET_COOKIE, session::clear_cookie().to_string())],
		Redirect::to("/"),
	)
		.into_response())
}
