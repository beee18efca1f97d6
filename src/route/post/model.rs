use axum::extract::{FromRequest, Multipart, Request};
use serde::Deserialize;
use validator::Validate;

use crate::{media::Upload, route::model::not_blank};

/// The post form, submitted as `multipart/form-data`.
///
/// An empty `group` means "no group", and an empty file input means
/// "no image".
#[derive(Debug, Validate)]
pub struct PostForm {
	#[validate(custom(function = "not_blank"))]
	pub text: String,
	pub group: Option<String>,
	pub image: Option<Upload>,
}

#[axum::async_trait]
impl<S> FromRequest<S> for PostForm
where
	S: Send + Sync,
{
	type Rejection = crate::Error;

	async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
		let mut multipart = Multipart::from_request(req, state)
			.await
			.map_err(|rejection| crate::Error::Route {
				status: rejection.status(),
				message: rejection.body_text(),
			})?;

		let mut form = Self {
			text: String::new(),
			group: None,
			image: None,
		};

		while let Some(field) = multipart.next_field().await? {
			let name = field.name().unwrap_or_default().to_owned();

			match name.as_str() {
				"text" => form.text = field.text().await?,
				"group" => {
					let group = field.text().await?;

					form.group = Some(group).filter(|group| !group.trim().is_empty());
				}
				"image" => {
					let file_name = field.file_name().unwrap_or_default().to_owned();
					let data = field.bytes().await?;

					if !data.is_empty() {
						form.image = Some(Upload { file_name, data });
					}
				}
				_ => {}
			}
		}

		Ok(form)
	}
}

#[derive(Debug, Deserialize, Validate)]
pub struct CommentInput {
	#[validate(custom(function = "not_blank"))]
	pub text: String,
}
