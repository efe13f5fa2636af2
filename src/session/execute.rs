//! JSON request execution and typed conveniences built on it.

// crates.io
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
// self
use crate::{
	_prelude::*,
	error::{DecodeError, ErrorEnvelope, RequestError},
	http::{JSON_CONTENT_TYPE, RawResponse, ResponseMetadata},
	obs::{self, OpKind},
	page::Page,
	query::QueryOptions,
	session::Session,
};

/// Successful response: raw body plus the metadata of the final attempt.
#[derive(Clone, Debug)]
pub struct ApiResponse {
	/// Status, headers, and retry bookkeeping.
	pub metadata: ResponseMetadata,
	/// Raw response body.
	pub body: Vec<u8>,
}
impl ApiResponse {
	/// Decodes the body as JSON, reporting the path of the first malformed field.
	pub fn json<T>(&self) -> Result<T>
	where
		T: DeserializeOwned,
	{
		decode_json(&self.body, Some(self.metadata.status))
	}

	/// Returns `true` when the body is empty (e.g. `204 No Content`).
	pub fn is_empty(&self) -> bool {
		self.body.is_empty()
	}
}

impl Session {
	/// Sends one JSON request and normalizes the response.
	///
	/// The token is validated first, `options` replace same-named keys of `path`'s query, and
	/// every physical attempt is paced by the limiter. Only 429 responses are retried.
	pub async fn execute(
		&self,
		method: Method,
		path: &str,
		options: Option<&QueryOptions>,
		body: Option<&JsonValue>,
	) -> Result<ApiResponse> {
		obs::observe(OpKind::Request, "execute", async move {
			let token = self.tokens.ensure_valid().await?;
			let mut url = self.config.resolve(path)?;

			if let Some(options) = options {
				options.apply_to(&mut url);
			}

			let bearer = format!("Bearer {}", token.expose());
			let body = body.map(JsonValue::to_string);
			let raw = self
				.http
				.dispatch(OpKind::Request, |client| {
					let request = client
						.request(method.clone(), url.clone())
						.header(AUTHORIZATION, &bearer)
						.header(ACCEPT, JSON_CONTENT_TYPE);

					match &body {
						Some(body) =>
							request.header(CONTENT_TYPE, JSON_CONTENT_TYPE).body(body.clone()),
						None => request,
					}
				})
				.await?;

			into_api_response(raw)
		})
		.await
	}

	/// `GET`s `path` and decodes the JSON body.
	pub async fn get<T>(&self, path: &str, options: Option<&QueryOptions>) -> Result<T>
	where
		T: DeserializeOwned,
	{
		self.execute(Method::GET, path, options, None).await?.json()
	}

	/// `POST`s `body` as JSON; created resources are reported through the `Location` header.
	pub async fn post<B>(&self, path: &str, body: &B) -> Result<ResponseMetadata>
	where
		B: ?Sized + Serialize,
	{
		let body = serde_json::to_value(body).map_err(|source| Error::Encode { source })?;

		Ok(self.execute(Method::POST, path, None, Some(&body)).await?.metadata)
	}

	/// `PATCH`es `body` as JSON.
	pub async fn patch<B>(&self, path: &str, body: &B) -> Result<ResponseMetadata>
	where
		B: ?Sized + Serialize,
	{
		let body = serde_json::to_value(body).map_err(|source| Error::Encode { source })?;

		Ok(self.execute(Method::PATCH, path, None, Some(&body)).await?.metadata)
	}

	/// Fetches one page of a list endpoint.
	pub async fn list_page<T>(&self, path: &str, options: Option<&QueryOptions>) -> Result<Page<T>>
	where
		T: DeserializeOwned,
	{
		self.get(path, options).await
	}

	/// Fetches every page of a list endpoint by following `_links.next`.
	pub async fn list_all<T>(&self, path: &str, options: Option<&QueryOptions>) -> Result<Vec<T>>
	where
		T: DeserializeOwned,
	{
		let mut current = options.cloned().unwrap_or_default();
		let mut items = Vec::new();

		loop {
			let page = self.list_page::<T>(path, Some(&current)).await?;

			items.extend(page.items);

			match page.links.next_options() {
				Some(next) if !next.is_empty() && next != current => current = next,
				_ => break,
			}
		}

		Ok(items)
	}
}

pub(crate) fn into_api_response(raw: RawResponse) -> Result<ApiResponse> {
	if raw.metadata.is_success() {
		Ok(ApiResponse { metadata: raw.metadata, body: raw.body })
	} else {
		Err(request_error(raw.metadata.status, &raw.body))
	}
}

/// Converts a non-success response into [`Error::Request`] (or [`Error::Decode`] when the
/// error body is not an error envelope). A final 429 is always an [`Error::Request`].
pub(crate) fn request_error(status: u16, body: &[u8]) -> Error {
	let code = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

	if body.iter().all(u8::is_ascii_whitespace) {
		return RequestError::from_status(code).into();
	}

	match decode_json::<ErrorEnvelope>(body, Some(status)) {
		Ok(envelope) => RequestError::from_envelope(code, envelope).into(),
		// Proxy throttling pages.
		Err(_) if code == StatusCode::TOO_MANY_REQUESTS => RequestError::from_status(code).into(),
		Err(e) => e,
	}
}

fn decode_json<T>(body: &[u8], status: Option<u16>) -> Result<T>
where
	T: DeserializeOwned,
{
	let mut de = serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(&mut de)
		.map_err(|source| DecodeError::Body { source, status }.into())
}
