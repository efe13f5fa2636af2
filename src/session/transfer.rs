//! Binary transfers: media downloads and multipart uploads.

// std
use std::{
	fs::{self, File},
	io::{self, Write},
};
// crates.io
use rand::{Rng, distr::Alphanumeric};
use reqwest::{
	header::{ACCEPT, AUTHORIZATION},
	multipart::{Form, Part},
};
use tokio::task;
// self
use crate::{
	_prelude::*,
	http::{JSON_CONTENT_TYPE, ResponseMetadata},
	obs::{self, OpKind},
	session::{Session, execute},
};

/// Multipart upload description that can be rebuilt for every retry.
#[derive(Clone, Debug, Default)]
pub struct UploadForm {
	parts: Vec<(String, FormPart)>,
}
impl UploadForm {
	/// Creates an empty form.
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds a text field, such as the JSON `product` reference of a media file.
	pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.parts.push((name.into(), FormPart::Text(value.into())));

		self
	}

	/// Adds a file part from memory.
	pub fn file(
		mut self,
		name: impl Into<String>,
		file_name: impl Into<String>,
		bytes: impl Into<Vec<u8>>,
	) -> Self {
		let part = FormPart::File { file_name: file_name.into(), bytes: bytes.into() };

		self.parts.push((name.into(), part));

		self
	}

	/// Adds a file part read from `path`; the part is named after the file.
	pub fn file_from_path(self, name: impl Into<String>, path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		let bytes = fs::read(path)
			.map_err(|source| Error::Filesystem { path: path.to_path_buf(), source })?;
		let file_name = path
			.file_name()
			.map(|name| name.to_string_lossy().into_owned())
			.unwrap_or_else(|| "file".into());

		Ok(self.file(name, file_name, bytes))
	}

	/// Number of parts.
	pub fn len(&self) -> usize {
		self.parts.len()
	}

	/// Returns `true` when the form has no parts.
	pub fn is_empty(&self) -> bool {
		self.parts.is_empty()
	}

	fn to_form(&self) -> Form {
		self.parts.iter().fold(Form::new(), |form, (name, part)| match part {
			FormPart::Text(value) => form.text(name.clone(), value.clone()),
			FormPart::File { file_name, bytes } =>
				form.part(name.clone(), Part::bytes(bytes.clone()).file_name(file_name.clone())),
		})
	}
}

#[derive(Clone)]
enum FormPart {
	Text(String),
	File { file_name: String, bytes: Vec<u8> },
}
impl Debug for FormPart {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			FormPart::Text(value) => f.debug_tuple("Text").field(value).finish(),
			FormPart::File { file_name, bytes } => f
				.debug_struct("File")
				.field("file_name", file_name)
				.field("len", &bytes.len())
				.finish(),
		}
	}
}

impl Session {
	/// Downloads `url` (absolute, or relative to the base URL) into `destination`.
	///
	/// Parent directories are created as needed. The body is written to a hidden sibling of
	/// `destination`, synced, and renamed over it, so a failed download never leaves a partial
	/// file and never touches a previous copy. A 404 yields [`Error::NotFound`].
	pub async fn download(
		&self,
		url: &str,
		destination: impl AsRef<Path>,
	) -> Result<ResponseMetadata> {
		let destination = destination.as_ref();

		obs::observe(OpKind::Download, "download", async move {
			let token = self.tokens.ensure_valid().await?;
			let target = self.config.resolve(url)?;
			let bearer = format!("Bearer {}", token.expose());
			let raw = self
				.http
				.dispatch(OpKind::Download, |client| {
					client.get(target.clone()).header(AUTHORIZATION, &bearer)
				})
				.await?;

			if raw.metadata.status == StatusCode::NOT_FOUND.as_u16() {
				return Err(Error::NotFound { url: target.to_string() });
			}
			if !raw.metadata.is_success() {
				return Err(execute::request_error(raw.metadata.status, &raw.body));
			}

			persist_on_blocking_pool(destination.to_path_buf(), raw.body).await?;

			Ok(raw.metadata)
		})
		.await
	}

	/// Sends `form` as a multipart `POST` and returns the `Location` of the created resource.
	pub async fn upload(&self, path: &str, form: &UploadForm) -> Result<Option<String>> {
		obs::observe(OpKind::Upload, "upload", async move {
			let token = self.tokens.ensure_valid().await?;
			let url = self.config.resolve(path)?;
			let bearer = format!("Bearer {}", token.expose());
			let raw = self
				.http
				.dispatch(OpKind::Upload, |client| {
					client
						.post(url.clone())
						.header(AUTHORIZATION, &bearer)
						.header(ACCEPT, JSON_CONTENT_TYPE)
						.multipart(form.to_form())
				})
				.await?;
			let response = execute::into_api_response(raw)?;

			Ok(response.metadata.location().map(ToOwned::to_owned))
		})
		.await
	}
}

/// Runs [`persist`] on tokio's blocking pool.
async fn persist_on_blocking_pool(destination: PathBuf, bytes: Vec<u8>) -> Result<()> {
	let path = destination.clone();

	task::spawn_blocking(move || persist(&destination, &bytes))
		.await
		.map_err(|e| Error::Filesystem { path, source: io::Error::other(e) })?
}

fn persist(destination: &Path, bytes: &[u8]) -> Result<()> {
	let file_name = destination.file_name().ok_or_else(|| Error::Filesystem {
		path: destination.to_path_buf(),
		source: io::Error::new(io::ErrorKind::InvalidInput, "Destination has no file name."),
	})?;

	if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
		fs::create_dir_all(parent)
			.map_err(|source| Error::Filesystem { path: parent.to_path_buf(), source })?;
	}

	let suffix = rand::rng()
		.sample_iter(Alphanumeric)
		.take(8)
		.map(char::from)
		.collect::<String>();
	let tmp_path =
		destination.with_file_name(format!(".{}.{suffix}.part", file_name.to_string_lossy()));
	let result = write_synced(&tmp_path, bytes).and_then(|()| {
		fs::rename(&tmp_path, destination)
			.map_err(|source| Error::Filesystem { path: destination.to_path_buf(), source })
	});

	if result.is_err() {
		let _ = fs::remove_file(&tmp_path);
	}

	result
}

fn write_synced(path: &Path, bytes: &[u8]) -> Result<()> {
	let to_error = |source| Error::Filesystem { path: path.to_path_buf(), source };
	let mut file = File::create(path).map_err(to_error)?;

	file.write_all(bytes).map_err(to_error)?;
	file.sync_all().map_err(to_error)
}

#[cfg(test)]
mod tests {
	// std
	use std::{env, process};
	// self
	use super::*;

	fn temp_dir(label: &str) -> PathBuf {
		env::temp_dir().join(format!(
			"pim_session_{label}_{}_{}",
			process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		))
	}

	#[test]
	fn persist_creates_parents_and_leaves_no_temp_files() {
		let dir = temp_dir("persist");
		let destination = dir.join("nested/media/shoe.jpg");

		persist(&destination, b"jpeg").expect("Persist should succeed.");

		assert_eq!(fs::read(&destination).expect("Destination should exist."), b"jpeg");
		assert_eq!(
			fs::read_dir(destination.parent().expect("Destination has a parent."))
				.expect("Parent should be readable.")
				.count(),
			1
		);

		fs::remove_dir_all(&dir).expect("Failed to clean up the persist fixture.");
	}

	#[test]
	fn persist_replaces_existing_files() {
		let dir = temp_dir("replace");
		let destination = dir.join("a.txt");

		persist(&destination, b"old").expect("First persist should succeed.");
		persist(&destination, b"new").expect("Second persist should succeed.");

		assert_eq!(fs::read(&destination).expect("Destination should exist."), b"new");

		fs::remove_dir_all(&dir).expect("Failed to clean up the replace fixture.");
	}

	#[tokio::test]
	async fn blocking_pool_persists_and_reports_filesystem_errors() {
		let dir = temp_dir("blocking");
		let destination = dir.join("media").join("shoe.jpg");

		persist_on_blocking_pool(destination.clone(), b"jpeg".to_vec())
			.await
			.expect("Persist on the blocking pool should succeed.");

		assert_eq!(fs::read(&destination).expect("Destination should exist."), b"jpeg");

		let err = persist_on_blocking_pool(dir.join(".."), b"jpeg".to_vec())
			.await
			.expect_err("A destination without a file name should fail.");

		assert!(matches!(err, Error::Filesystem { .. }));

		fs::remove_dir_all(&dir).expect("Failed to clean up the blocking fixture.");
	}

	#[test]
	fn forms_rebuild_from_their_parts() {
		let form = UploadForm::new()
			.text("product", r#"{"identifier":"shoe","attribute":"image"}"#)
			.file("file", "shoe.jpg", b"jpeg".to_vec());

		assert_eq!(form.len(), 2);
		assert!(!form.to_form().boundary().is_empty());
		assert!(format!("{form:?}").contains("len: 4"));
	}
}
