use serde::Deserialize;
use validator::ValidationError;

/// The `?page=` parameter shared by every feed.
///
/// It is kept as a string so that junk values fall back to the first page
/// instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
	pub page: Option<String>,
}

/// Rejects text that is empty once surrounding whitespace is removed.
pub fn not_blank(text: &str) -> Result<(), ValidationError> {
	if text.trim().is_empty() {
		let mut error = ValidationError::new("blank");
		error.message = Some("This field is required.".into());

		return Err(error);
	}

	Ok(())
}

#[cfg(test)]
mod test {
	#[test]
	fn test_not_blank() {
		assert!(super::not_blank("hello").is_ok());
		assert!(super::not_blank(" \n\t").is_err());
		assert!(super::not_blank("").is_err());
	}
}
