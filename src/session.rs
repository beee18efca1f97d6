use uuid::Uuid;

pub const COOKIE_NAME: &str = "session";

/// Creates a session cookie with no expiry
pub fn create_cookie(session_id: Uuid) -> cookie::Cookie<'static> {
	cookie::Cookie::build((COOKIE_NAME, session_id.to_string()))
		.secure(!cfg!(debug_assertions))
		.http_only(true)
		.same_site(cookie::SameSite::Lax)
		.path("/")
		.into()
}

/// Creates an empty session cookie used to invalidate a previous one
pub fn clear_cookie() -> cookie::Cookie<'static> {
	cookie::Cookie::build(COOKIE_NAME)
		.http_only(true)
		.path("/")
		.max_age(cookie::time::Duration::ZERO)
		.into()
}

/// Returns the raw session cookie value, if the request carries one.
pub fn cookie_value(headers: &axum::http::HeaderMap) -> Option<String> {
	headers
		.get_all(axum::http::header::COOKIE)
		.into_iter()
		.filter_map(|value| value.to_str().ok())
		.flat_map(cookie::Cookie::split_parse)
		.filter_map(Result::ok)
		.find(|cookie| cookie.name() == COOKIE_NAME)
		.map(|cookie| cookie.value().to_owned())
}
