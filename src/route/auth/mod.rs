use axum::{http::StatusCode, routing::get, Router};

use crate::{error, AppState};

pub mod model;
pub mod route;

/// An error that can occur during authentication.
///
/// Note that the messages are presented to the client, so they should not contain
/// sensitive information.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Please enter a correct username and password.")]
	InvalidUsernameOrPassword,
	#[error("password validation error")]
	Argon(#[from] argon2::Error),
	#[error("A user with that username already exists.")]
	UsernameTaken,
}

pub fn routes() -> Router<AppState> {
	use route::*;

	Router::new()
		.route("/signup/", get(signup_form).post(signup))
		.route("/login/", get(login_form).post(login))
		.route("/logout/", get(logout))
}

impl error::ErrorShape for Error {
	fn status(&self) -> StatusCode {
		match self {
			Self::InvalidUsernameOrPassword => StatusCode::UNAUTHORIZED,
			Self::Argon(..) => StatusCode::INTERNAL_SERVER_ERROR,
			Self::UsernameTaken => StatusCode::CONFLICT,
		}
	}
}

impl From<Error> for crate::Error {
	fn from(error: Error) -> Self {
		Self::shaped(&error)
	}
}

#[cfg(test)]
mod test {
	use axum::http::StatusCode;

	use crate::test::*;

	#[tokio::test]
	async fn test_signup_flow() {
		let harness = harness().await;

		let response = harness
			.server
			.post("/auth/signup/")
			.form(&[
				("username", "john"),
				("email", "john@smith.com"),
				("password", "hunter2hunter"),
			])
			.await;

		assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
		assert_eq!(response.header("location"), "/");
		assert!(response
			.header("set-cookie")
			.to_str()
			.unwrap()
			.contains("session="));

		let response = harness
			.server
			.post("/auth/login/")
			.form(&[
				("username", "john"),
				("password", "hunter2hunter"),
				("next", "/create/"),
			])
			.await;

		assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
		assert_eq!(response.header("location"), "/create/");

		let cookie = response.cookie("session");
		let page = harness.server.get("/create/").add_cookie(cookie.clone()).await;

		assert_eq!(page.status_code(), StatusCode::OK);
		assert!(page.text().contains("john"));

		let response = harness.server.get("/auth/logout/").add_cookie(cookie.clone()).await;

		assert_eq!(response.status_code(), StatusCode::SEE_OTHER);
		assert_eq!(response.cookie("session").value(), "");

		let page = harness.server.get("/create/").add_cookie(cookie).await;

		assert_eq!(page.status_code(), StatusCode::SEE_OTHER);
	}

	#[tokio::test]
	async fn test_signup_rejects_taken_and_invalid() {
		let harness = harness().await;

		create_user(&harness.database, "john").await;

		let response = harness
			.server
			.post("/auth/signup/")
			.form(&[
				("username", "john"),
				("email", "john@smith.com"),
				("password", "hunter2hunter"),
			])
			.await;

		assert_eq!(response.status_code(), StatusCode::OK);
		assert!(response.text().contains("already exists"));

		let response = harness
			.server
			.post("/auth/signup/")
			.form(&[
				("username", "j!"),
				("email", "not-an-email"),
				("password", "short"),
			])
			.await;

		let text = response.text();

		assert!(text.contains("3 to 16 characters"));
		assert!(text.contains("Enter a valid email address."));
		assert!(text.contains("8 to 128 characters"));
	}

	#[tokio::test]
	async fn test_login_rejects_bad_credentials_and_foreign_next() {
		let harness = harness().await;

		harness
			.server
			.post("/auth/signup/")
			.form(&[
				("username", "john"),
				("email", "john@smith.com"),
				("password", "hunter2hunter"),
			])
			.await;

		let response = harness
			.server
			.post("/auth/login/")
			.form(&[("username", "john"), ("password", "wrong-password")])
			.await;

		assert_eq!(response.status_code(), StatusCode::OK);
		assert!(response
			.text()
			.contains("Please enter a correct username and password."));

		let response = harness
			.server
			.post("/auth/login/")
			.form(&[
				("username", "john"),
				("password", "hunter2hunter"),
				("next", "//evil.example/"),
			])
			.await;

		assert_eq!(response.header("location"), "/");
	}

	#[tokio::test]
	async fn test_login_ignores_next_with_control_characters() {
		let harness = harness().await;

		harness
			.server
			.post("/auth/signup/")
			.form(&[
				("username", "john"),
				("email", "john@smith.com"),
				("password", "hunter2hunter"),
			])
			.await;

		for next in ["/\t/evil.example/", "/\r\nX-Injected: yes", "/\u{0}"] {
			let response = harness
				.server
				.post("/auth/login/")
				.form(&[
					("username", "john"),
					("password", "hunter2hunter"),
					("next", next),
				])
				.await;

			assert_eq!(response.status_code(), StatusCode::SEE_OTHER, "{next:?}");
			assert_eq!(response.header("location"), "/", "{next:?}");
		}
	}
}
