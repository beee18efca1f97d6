//! Filesystem storage for uploaded post images.

use std::{
	io::ErrorKind,
	path::{Component, Path, PathBuf},
};

use axum::body::Bytes;
use slug::slugify;
use tokio::{
	fs::{self, File, OpenOptions},
	io::AsyncWriteExt,
};
use uuid::Uuid;

/// Directory, relative to the media root, that post images are stored in.
pub const POST_IMAGE_DIR: &str = "posts";

const STORE_ATTEMPTS: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("invalid stored path")]
	InvalidPath,
	#[error("no free name for {0}")]
	NameTaken(String),
	#[error(transparent)]
	Io(#[from] std::io::Error),
}

/// An image received from a form, not yet written to disk.
#[derive(Debug)]
pub struct Upload {
	pub file_name: String,
	pub data: Bytes,
}

impl Upload {
	/// Whether the payload carries a recognisable image header.
	pub fn is_image(&self) -> bool {
		imagesize::blob_size(&self.data).is_ok()
	}
}

#[derive(Debug, Clone)]
pub struct MediaStorage {
	root: PathBuf,
}

impl MediaStorage {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self { root: root.into() }
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	/// Writes the upload under [`POST_IMAGE_DIR`] and returns its path
	/// relative to the media root, e.g. `posts/small.gif`.
	///
	/// Files are created exclusively, so an existing image is never
	/// overwritten. A taken name gets a short random suffix instead.
	pub async fn store_post_image(&self, upload: &Upload) -> Result<String, Error> {
		let directory = self.root.join(POST_IMAGE_DIR);
		fs::create_dir_all(&directory).await?;

		let file_name = sanitize_filename(&upload.file_name);
		let (stem, extension) = split_extension(&file_name);

		for attempt in 0..STORE_ATTEMPTS {
			let stored_path = if attempt == 0 {
				format!("{POST_IMAGE_DIR}/{file_name}")
			} else {
				let suffix = Uuid::new_v4().simple().to_string();

				match extension {
					Some(ext) => format!("{POST_IMAGE_DIR}/{stem}_{}.{ext}", &suffix[..7]),
					None => format!("{POST_IMAGE_DIR}/{stem}_{}", &suffix[..7]),
				}
			};
			let path = self.resolve(&stored_path)?;

			let mut file = match OpenOptions::new()
				.write(true)
				.create_new(true)
				.open(&path)
				.await
			{
				Ok(file) => file,
				Err(err) if err.kind() == ErrorKind::AlreadyExists => continue,
				Err(err) => return Err(err.into()),
			};

			if let Err(err) = write_all(&mut file, &upload.data).await {
				drop(file);
				fs::remove_file(&path).await.ok();

				return Err(err.into());
			}

			tracing::debug!(path = %stored_path, bytes = upload.data.len(), "stored post image");

			return Ok(stored_path);
		}

		Err(Error::NameTaken(file_name))
	}

	/// Removes a stored file. Missing files are treated as success.
	pub async fn delete(&self, stored_path: &str) -> Result<(), Error> {
		match fs::remove_file(self.resolve(stored_path)?).await {
			Ok(()) => Ok(()),
			Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(err) => Err(err.into()),
		}
	}

	fn resolve(&self, stored_path: &str) -> Result<PathBuf, Error> {
		let relative = Path::new(stored_path);

		if relative.is_absolute()
			|| relative
				.components()
				.any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
		{
			return Err(Error::InvalidPath);
		}

		Ok(self.root.join(relative))
	}
}

async fn write_all(file: &mut File, data: &[u8]) -> std::io::Result<()> {
	file.write_all(data).await?;
	file.flush().await
}

fn split_extension(file_name: &str) -> (&str, Option<&str>) {
	match file_name.rsplit_once('.') {
		Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
		_ => (file_name, None),
	}
}

fn sanitize_filename(original: &str) -> String {
	let path = Path::new(original);
	let stem = path
		.file_stem()
		.and_then(|value| value.to_str())
		.unwrap_or("upload");

	let mut base = slugify(stem);
	if base.is_empty() {
		base = "upload".into();
	}

	let extension = path
		.extension()
		.and_then(|value| value.to_str())
		.map(str::to_ascii_lowercase)
		.filter(|value| !value.is_empty());

	match extension {
		Some(ext) => format!("{base}.{ext}"),
		None => base,
	}
}
