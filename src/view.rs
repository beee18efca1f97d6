//! Page templates and the helpers used to render them.

use std::collections::HashMap;

use askama::Template;
use axum::{
	http::StatusCode,
	response::{Html, IntoResponse, Response},
};
use chrono::Datelike;
use url::{Position, Url};

use crate::{
	error::Error,
	feed::Page,
	model::{CommentCard, Group, PostCard, User},
};

pub const LOGIN_PATH: &str = "/auth/login/";

/// Stand-in origin that relative `next` paths are resolved against.
const SITE_ORIGIN: &str = "http://localhost/";

/// Data shared by every page layout: who is looking, and the footer year.
#[derive(Debug, Clone)]
pub struct Chrome {
	pub viewer: String,
	pub is_authenticated: bool,
	pub is_staff: bool,
	pub year: i32,
}

impl Chrome {
	pub fn new(user: Option<&User>) -> Self {
		Self {
			viewer: user.map(|u| u.username.clone()).unwrap_or_default(),
			is_authenticated: user.is_some(),
			is_staff: user.is_some_and(|u| u.is_staff),
			year: chrono::Utc::now().year(),
		}
	}

	pub fn anonymous() -> Self {
		Self::new(None)
	}
}

/// Validation messages keyed by form field.
#[derive(Debug, Default, Clone)]
pub struct FormErrors(HashMap<String, Vec<String>>);

impl FormErrors {
	pub fn add(&mut self, field: &str, message: impl Into<String>) {
		self.0.entry(field.into()).or_default().push(message.into());
	}

	pub fn field(&self, name: &str) -> &[String] {
		self.0.get(name).map_or(&[][..], Vec::as_slice)
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl From<validator::ValidationErrors> for FormErrors {
	fn from(errors: validator::ValidationErrors) -> Self {
		let mut form = Self::default();

		for (field, errors) in errors.field_errors() {
			for error in errors {
				let message = error
					.message
					.as_ref()
					.map_or_else(|| error.code.to_string(), ToString::to_string);

				form.add(&field.to_string(), message);
			}
		}

		form
	}
}

/// A `<select>` entry for a group.
#[derive(Debug, Clone)]
pub struct GroupOption {
	pub id: i64,
	pub title: String,
	pub selected: bool,
}

impl GroupOption {
	pub fn list(groups: Vec<Group>, selected: Option<i64>) -> Vec<Self> {
		groups
			.into_iter()
			.map(|group| Self {
				selected: selected == Some(group.id),
				id: group.id,
				title: group.title,
			})
			.collect()
	}
}

#[derive(Template)]
#[template(path = "posts/index.html")]
pub struct IndexTemplate {
	pub chrome: Chrome,
	pub page: Page<PostCard>,
}

#[derive(Template)]
#[template(path = "posts/group_list.html")]
pub struct GroupTemplate {
	pub chrome: Chrome,
	pub group: Group,
	pub page: Page<PostCard>,
}

#[derive(Template)]
#[template(path = "posts/profile.html")]
pub struct ProfileTemplate {
	pub chrome: Chrome,
	pub author: String,
	pub post_count: i64,
	pub page: Page<PostCard>,
	/// The viewer is signed in and is not the author.
	pub can_follow: bool,
	pub following: bool,
}

#[derive(Template)]
#[template(path = "posts/post_detail.html")]
pub struct PostDetailTemplate {
	pub chrome: Chrome,
	pub post: PostCard,
	pub author_post_count: i64,
	pub comments: Vec<CommentCard>,
	pub can_edit: bool,
	pub can_delete: bool,
}

#[derive(Template)]
#[template(path = "posts/follow.html")]
pub struct FollowTemplate {
	pub chrome: Chrome,
	pub page: Page<PostCard>,
}

#[derive(Template)]
#[template(path = "posts/post_form.html")]
pub struct PostFormTemplate {
	pub chrome: Chrome,
	pub action: String,
	pub is_edit: bool,
	pub text: String,
	pub groups: Vec<GroupOption>,
	pub image: String,
	pub errors: FormErrors,
}

#[derive(Template)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
	pub chrome: Chrome,
	pub username: String,
	pub next: String,
	pub errors: FormErrors,
}

#[derive(Template)]
#[template(path = "auth/signup.html")]
pub struct SignupTemplate {
	pub chrome: Chrome,
	pub username: String,
	pub email: String,
	pub errors: FormErrors,
}

#[derive(Template)]
#[template(path = "admin/group_form.html")]
pub struct GroupFormTemplate {
	pub chrome: Chrome,
	pub title: String,
	pub slug: String,
	pub description: String,
	pub errors: FormErrors,
}

#[derive(Template)]
#[template(path = "core/404.html")]
pub struct NotFoundTemplate {
	pub chrome: Chrome,
}

#[derive(Template)]
#[template(path = "core/error.html")]
pub struct ErrorTemplate {
	pub chrome: Chrome,
	pub status: u16,
	pub reason: String,
}

pub fn render<T: Template>(template: &T) -> Result<Html<String>, Error> {
	Ok(Html(template.render()?))
}

/// Renders the error page for a status, falling back to plain text
/// if the template itself fails.
pub fn error_page(status: StatusCode) -> Response {
	let chrome = Chrome::anonymous();
	let rendered = if status == StatusCode::NOT_FOUND {
		NotFoundTemplate { chrome }.render()
	} else {
		ErrorTemplate {
			chrome,
			status: status.as_u16(),
			reason: status.canonical_reason().unwrap_or("Error").into(),
		}
		.render()
	};

	match rendered {
		Ok(html) => (status, Html(html)).into_response(),
		Err(error) => {
			tracing::error!(%error, "failed to render error page");

			(status, status.to_string()).into_response()
		}
	}
}

/// Builds the login URL that returns to `next` once signed in.
pub fn login_url(next: &str) -> String {
	let query = url::form_urlencoded::Serializer::new(String::new())
		.append_pair("next", next)
		.finish();

	format!("{LOGIN_PATH}?{query}")
}

/// Resolves `next` to a path on this site, percent-encoded and safe to
/// put in a `Location` header. Anything that could leave the site is
/// rejected.
pub fn local_redirect(next: &str) -> Option<String> {
	if !next.starts_with('/')
		|| next.starts_with("//")
		|| next.chars().any(|c| c.is_control() || c == '\\')
	{
		return None;
	}

	let base = Url::parse(SITE_ORIGIN).ok()?;
	let resolved = base.join(next).ok()?;

	(resolved.origin() == base.origin()).then(|| resolved[Position::BeforePath..].to_owned())
}
