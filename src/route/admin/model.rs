use serde::Deserialize;
use validator::Validate;

use crate::route::model::not_blank;

#[derive(Debug, Deserialize, Validate)]
pub struct GroupInput {
	#[validate(
		custom(function = "not_blank"),
		length(max = 200, message = "Titles are at most 200 characters long.")
	)]
	pub title: String,
	/// Derived from the title when left blank.
	#[serde(default)]
	#[validate(length(max = 50, message = "Slugs are at most 50 characters long."))]
	pub slug: String,
	#[serde(default)]
	pub description: String,
}

impl GroupInput {
	/// The slug to store: the given one, or the title's, made URL-safe.
	pub fn slug(&self) -> String {
		if self.slug.trim().is_empty() {
			slug::slugify(&self.title)
		} else {
			slug::slugify(&self.slug)
		}
	}
}
