mod common;

// std
use std::fs;
// crates.io
use httpmock::prelude::*;
// self
use common::*;
use pim_session::{error::Error, session::UploadForm};

#[tokio::test]
async fn download_writes_into_nested_directories() {
	let server = MockServer::start_async().await;
	let _grant = mock_password_grant(&server, "access-1", 3600).await;
	let media = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/api/rest/v1/media-files/a/b/shoe.jpg/download")
				.header("authorization", "Bearer access-1");
			then.status(200).header("content-type", "image/jpeg").body("jpeg-bytes");
		})
		.await;
	let session = build_test_session(&server);
	let dir = temp_dir("download");
	let destination = dir.join("media").join("a").join("shoe.jpg");
	let metadata = session
		.download(&server.url("/api/rest/v1/media-files/a/b/shoe.jpg/download"), &destination)
		.await
		.expect("Download should succeed.");

	assert_eq!(metadata.status, 200);
	assert_eq!(fs::read(&destination).expect("Downloaded file should exist."), b"jpeg-bytes");
	assert_eq!(
		fs::read_dir(destination.parent().expect("Destination should have a parent."))
			.expect("Parent directory should be readable.")
			.count(),
		1,
		"No temporary file should remain."
	);

	media.assert_async().await;

	let _ = fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn missing_media_leaves_existing_files_untouched() {
	let server = MockServer::start_async().await;
	let _grant = mock_password_grant(&server, "access-1", 3600).await;
	let media = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/rest/v1/media-files/gone.jpg/download");
			then.status(404);
		})
		.await;
	let session = build_test_session(&server);
	let dir = temp_dir("not_found");
	let fresh = dir.join("fresh").join("gone.jpg");
	let existing = dir.join("existing.jpg");

	fs::create_dir_all(&dir).expect("Scratch directory should be created.");
	fs::write(&existing, b"previous").expect("Existing file should be written.");

	let err = session
		.download("api/rest/v1/media-files/gone.jpg/download", &fresh)
		.await
		.expect_err("Missing media should fail.");

	assert!(matches!(err, Error::NotFound { ref url } if url.ends_with("/gone.jpg/download")));
	assert!(!fresh.exists());

	let err = session
		.download("api/rest/v1/media-files/gone.jpg/download", &existing)
		.await
		.expect_err("Missing media should fail.");

	assert!(matches!(err, Error::NotFound { .. }));
	assert_eq!(fs::read(&existing).expect("Existing file should remain."), b"previous");

	media.assert_calls_async(2).await;

	let _ = fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn upload_returns_the_created_location() {
	let server = MockServer::start_async().await;
	let _grant = mock_password_grant(&server, "access-1", 3600).await;
	let location = server.url("/api/rest/v1/media-files/1/2/shoe.jpg");
	let upload = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/api/rest/v1/media-files")
				.header("authorization", "Bearer access-1")
				.header_exists("content-type");
			then.status(201).header("location", location.clone());
		})
		.await;
	let session = build_test_session(&server);
	let product = r#"{"identifier":"shoe-1","attribute":"image","scope":null,"locale":null}"#;
	let form = UploadForm::new()
		.text("product", product)
		.file("file", "shoe.jpg", b"jpeg-bytes".to_vec());
	let created = session
		.upload("api/rest/v1/media-files", &form)
		.await
		.expect("Upload should succeed.");

	assert_eq!(form.len(), 2);
	assert_eq!(created.as_deref(), Some(location.as_str()));

	upload.assert_async().await;
}

#[tokio::test]
async fn rejected_uploads_surface_the_error_envelope() {
	let server = MockServer::start_async().await;
	let _grant = mock_password_grant(&server, "access-1", 3600).await;
	let upload = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/rest/v1/media-files");
			then.status(400)
				.header("content-type", "application/json")
				.body("{\"code\":400,\"message\":\"Property \\\"product\\\" is required.\"}");
		})
		.await;
	let session = build_test_session(&server);
	let form = UploadForm::new().file("file", "shoe.jpg", b"jpeg-bytes".to_vec());
	let err = session
		.upload("api/rest/v1/media-files", &form)
		.await
		.expect_err("Upload without product should fail.");

	match err {
		Error::Request(err) => {
			assert_eq!(err.code, 400);
			assert_eq!(err.message, "Property \"product\" is required.");
		},
		other => panic!("Unexpected error: {other:?}."),
	}

	upload.assert_async().await;
}
