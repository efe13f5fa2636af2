//! Session-level error types shared by the token manager, the executor, and the decoder.

// self
use crate::{_prelude::*, value::ValueEnvelope};

/// Session-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Token grant or refresh failure.
	#[error(transparent)]
	Auth(#[from] AuthError),
	/// Transport failure (DNS, TCP, TLS, timeout).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Upstream answered with a non-success status.
	#[error(transparent)]
	Request(#[from] RequestError),
	/// A response body or an attribute value could not be interpreted.
	#[error(transparent)]
	Decode(#[from] DecodeError),

	/// Download target does not exist upstream.
	#[error("Resource was not found: {url}.")]
	NotFound {
		/// Absolute URL that answered with 404.
		url: String,
	},
	/// Caller supplied query options of an unsupported shape.
	#[error("Query options are invalid: {reason}.")]
	InvalidOptions {
		/// What made the options unusable.
		reason: String,
	},
	/// Request body could not be serialized.
	#[error("Request body could not be serialized.")]
	Encode {
		/// Underlying serializer failure.
		#[source]
		source: serde_json::Error,
	},
	/// Local filesystem failure while storing a download.
	#[error("Filesystem operation failed on {}.", path.display())]
	Filesystem {
		/// Path being created, written, or renamed.
		path: PathBuf,
		/// Underlying IO failure.
		#[source]
		source: std::io::Error,
	},
}
impl Error {
	/// Returns the upstream code when the error is a [`RequestError`].
	pub fn request_code(&self) -> Option<u16> {
		match self {
			Self::Request(err) => Some(err.code),
			_ => None,
		}
	}
}

/// Configuration and validation failures raised while building a session.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Base URL cannot anchor relative API paths.
	#[error("Base URL `{url}` is unusable: {reason}.")]
	InvalidBaseUrl {
		/// Offending URL.
		url: String,
		/// Why the URL was rejected.
		reason: &'static str,
	},
	/// Request path could not be resolved against the base URL.
	#[error("Path `{path}` cannot be resolved against the base URL.")]
	InvalidPath {
		/// Offending path.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// A credential field is empty.
	#[error("Credential `{field}` must not be empty.")]
	MissingCredential {
		/// Name of the empty field.
		field: &'static str,
	},
	/// Rate limit allows no events or uses a zero period.
	#[error("Rate limit must allow at least one event per non-zero period.")]
	InvalidRateLimit,
	/// Retry wait bounds are inverted.
	#[error("Retry wait minimum {min:?} exceeds the maximum {max:?}.")]
	InvalidRetryWait {
		/// Configured minimum wait.
		min: StdDuration,
		/// Configured maximum wait.
		max: StdDuration,
	},
	/// Timeout of zero would fail every call.
	#[error("Request timeout must be positive.")]
	ZeroTimeout,
	/// User agent is not a valid header value.
	#[error("User agent `{user_agent}` is not a valid header value.")]
	InvalidUserAgent {
		/// Offending user agent.
		user_agent: String,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Token grant and refresh failures.
///
/// The type is cheap to clone so a single failed exchange can be reported to every caller
/// that was waiting on it.
#[derive(Clone, Debug, ThisError)]
pub enum AuthError {
	/// Token endpoint refused the grant.
	#[error("Token endpoint rejected the grant with status {status}: {message}.")]
	Rejected {
		/// HTTP status returned by the token endpoint.
		status: u16,
		/// Upstream message or canonical reason.
		message: String,
	},
	/// Grant response omitted a required field.
	#[error("Token endpoint response is missing `{field}`.")]
	IncompleteResponse {
		/// Missing field name.
		field: &'static str,
	},
	/// Grant response reported a non-positive lifetime.
	#[error("The expires_in value must be positive.")]
	NonPositiveExpiresIn,
	/// Refresh was requested without a refresh token on hand.
	#[error("Session holds no refresh token.")]
	MissingRefreshToken,
	/// Grant response was not valid JSON for the expected shape.
	#[error("Token endpoint returned malformed JSON at `{path}`: {message}.")]
	MalformedResponse {
		/// JSON path of the offending field.
		path: String,
		/// Parser message.
		message: String,
	},
	/// Token endpoint could not be reached.
	#[error("Token endpoint could not be reached.")]
	Transport {
		/// Transport failure shared by every waiter.
		#[source]
		source: Arc<TransportError>,
	},
}
impl From<TransportError> for AuthError {
	fn from(e: TransportError) -> Self {
		Self::Transport { source: Arc::new(e) }
	}
}

/// Transport-level failures (network, timeout).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the PIM API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Request exceeded the session timeout.
	#[error("Request to the PIM API timed out.")]
	Timeout {
		/// Transport-specific timeout error.
		#[source]
		source: BoxError,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Returns `true` when the failure was a timeout.
	pub fn is_timeout(&self) -> bool {
		matches!(self, Self::Timeout { .. })
	}
}
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::Timeout { source: Box::new(e) } } else { Self::network(e) }
	}
}

/// Non-success response with the parsed upstream message.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Request failed with code {code}: {message}.")]
pub struct RequestError {
	/// Upstream error code (the HTTP status when the body carries none).
	pub code: u16,
	/// Human-readable message, including every violation for validation failures.
	pub message: String,
	/// Field-level validation failures in upstream order.
	pub violations: Vec<Violation>,
}
impl RequestError {
	/// Builds an error from a decoded [`ErrorEnvelope`].
	///
	/// Validation failures (code 422) with violations join every
	/// `Attribute '<attribute>', property '<property>': <message>` entry with `; `
	/// behind the envelope's own message.
	pub fn from_envelope(status: StatusCode, envelope: ErrorEnvelope) -> Self {
		let code = u16::try_from(envelope.code)
			.ok()
			.filter(|code| *code != 0)
			.unwrap_or_else(|| status.as_u16());
		let message = if code == 422 && !envelope.errors.is_empty() {
			let details = envelope
				.errors
				.iter()
				.map(|v| {
					format!("Attribute '{}', property '{}': {}", v.attribute, v.property, v.message)
				})
				.collect::<Vec<_>>()
				.join("; ");

			format!("{}: {details}", envelope.message)
		} else if envelope.message.is_empty() {
			canonical_reason(status)
		} else {
			envelope.message
		};

		Self { code, message, violations: envelope.errors }
	}

	/// Builds an error for a response that carried no body.
	pub fn from_status(status: StatusCode) -> Self {
		Self { code: status.as_u16(), message: canonical_reason(status), violations: Vec::new() }
	}
}

/// Error body returned by the PIM API on 4xx/5xx responses.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ErrorEnvelope {
	/// Upstream error code, usually mirroring the HTTP status.
	pub code: i64,
	/// Top-level message.
	pub message: String,
	/// Validation failures (always present for 422).
	pub errors: Vec<Violation>,
}

/// One field-level validation failure.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Violation {
	/// Attribute code the violation refers to.
	pub attribute: String,
	/// Property of the payload that failed validation.
	pub property: String,
	/// Upstream explanation.
	pub message: String,
	/// Locale of the offending value, if any.
	pub locale: Option<String>,
	/// Scope (channel) of the offending value, if any.
	pub scope: Option<String>,
}

/// Failures while interpreting response bodies or attribute values.
#[derive(Debug, ThisError)]
pub enum DecodeError {
	/// Response body is not valid JSON for the expected type.
	#[error("Response body is malformed JSON.")]
	Body {
		/// Structured parsing failure with the offending JSON path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Attribute value envelope matches none of the known value shapes.
	#[error("Attribute value has an unsupported shape: {reason}.")]
	Value {
		/// Which check failed.
		reason: String,
		/// The envelope that failed to decode.
		envelope: Box<ValueEnvelope>,
	},
	/// A value inside a product value map failed to decode.
	#[error("Value of attribute `{attribute}` could not be decoded.")]
	Attribute {
		/// Attribute code owning the value.
		attribute: String,
		/// Underlying decode failure.
		#[source]
		source: Box<DecodeError>,
	},
}

fn canonical_reason(status: StatusCode) -> String {
	status.canonical_reason().unwrap_or("Unknown status").to_owned()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn violation(attribute: &str, property: &str, message: &str) -> Violation {
		Violation {
			attribute: attribute.into(),
			property: property.into(),
			message: message.into(),
			..Default::default()
		}
	}

	#[test]
	fn validation_failures_list_every_violation() {
		let envelope = ErrorEnvelope {
			code: 422,
			message: "Validation failed.".into(),
			errors: vec![
				violation("sku", "identifier", "This value is already used."),
				violation("weight", "data", "This value should be a number."),
			],
		};
		let err = RequestError::from_envelope(StatusCode::UNPROCESSABLE_ENTITY, envelope);

		assert_eq!(err.code, 422);
		assert_eq!(
			err.message,
			"Validation failed.: Attribute 'sku', property 'identifier': This value is already used.; \
			Attribute 'weight', property 'data': This value should be a number."
		);
		assert_eq!(err.violations.len(), 2);
	}

	#[test]
	fn plain_failures_keep_the_envelope_message() {
		let envelope =
			ErrorEnvelope { code: 403, message: "Access forbidden.".into(), errors: Vec::new() };
		let err = RequestError::from_envelope(StatusCode::FORBIDDEN, envelope);

		assert_eq!(err.code, 403);
		assert_eq!(err.message, "Access forbidden.");
	}

	#[test]
	fn missing_code_and_message_fall_back_to_status() {
		let err = RequestError::from_envelope(StatusCode::BAD_GATEWAY, ErrorEnvelope::default());

		assert_eq!(err.code, 502);
		assert_eq!(err.message, "Bad Gateway");
		assert_eq!(RequestError::from_status(StatusCode::TOO_MANY_REQUESTS).code, 429);
	}

	#[test]
	fn auth_errors_clone_with_shared_transport_source() {
		let err = AuthError::from(TransportError::network(std::io::Error::other("reset")));
		let cloned = err.clone();

		match (err, cloned) {
			(AuthError::Transport { source: a }, AuthError::Transport { source: b }) =>
				assert!(Arc::ptr_eq(&a, &b)),
			other => panic!("Unexpected variants: {other:?}."),
		}
	}
}
