mod session;

pub use session::{CurrentUser, Session};

use axum::extract::{FromRequest, Request};
use serde::de;

use crate::{error::Error, view::FormErrors};

/// Extractor that deserializes a url-encoded form and validates it.
///
/// Validation failures do not reject the request: they are handed to the
/// handler in `errors` so the form can be rendered again.
///
/// ```rust
/// async fn route(Form { input, errors }: Form<Login>) {
///   // ...
/// }
/// ```
pub struct Form<T> {
	pub input: T,
	pub errors: FormErrors,
}

#[axum::async_trait]
impl<T, S> FromRequest<S> for Form<T>
where
	T: de::DeserializeOwned + validator::Validate,
	S: Send + Sync,
{
	type Rejection = Error;

	async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
		let input = axum::Form::<T>::from_request(req, state).await?.0;
		let errors = input.validate().map_or_else(FormErrors::from, |()| FormErrors::default());

		Ok(Self { input, errors })
	}
}
