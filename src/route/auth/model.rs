use serde::Deserialize;
use validator::{Validate, ValidationError};

fn validate_username(username: &str) -> Result<(), ValidationError> {
	if username.chars().any(|c| !c.is_alphanumeric()) {
		let mut error = ValidationError::new("username");
		error.message = Some("Usernames may only contain letters and digits.".into());

		return Err(error);
	}

	Ok(())
}

#[derive(Debug, Deserialize, Validate)]
pub struct SignupInput {
	/// The username that is displayed to the public.
	#[validate(
		length(min = 3, max = 16, message = "Usernames are 3 to 16 characters long."),
		custom(function = "validate_username")
	)]
	pub username: String,
	#[validate(email(message = "Enter a valid email address."))]
	pub email: String,
	#[validate(length(min = 8, max = 128, message = "Passwords are 8 to 128 characters long."))]
	pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginInput {
	#[validate(length(min = 1, message = "This field is required."))]
	pub username: String,
	#[validate(length(min = 1, message = "This field is required."))]
	pub password: String,
	/// Where to go once logged in.
	#[serde(default)]
	pub next: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
	#[serde(default)]
	pub next: String,
}
