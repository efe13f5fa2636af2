//! Query-string options merged into request URLs.
//!
//! Options come from three places: an explicit key/value mapping, a [`Queryable`] value with
//! named fields and a defined string conversion, or any [`Serialize`] value whose shape is a
//! flat object of scalars and scalar lists. Keys present in the options replace keys of the
//! same name already carried by the request path.

// self
use crate::_prelude::*;

/// Ordered multi-value query mapping.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryOptions(BTreeMap<String, Vec<String>>);
impl QueryOptions {
	/// Creates an empty mapping.
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends a value and returns the mapping, for chained construction.
	pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.append(key, value);

		self
	}

	/// Replaces every value of `key` with `value`.
	pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
		self.0.insert(key.into(), vec![value.into()]);
	}

	/// Adds `value` behind the existing values of `key`.
	pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
		self.0.entry(key.into()).or_default().push(value.into());
	}

	/// Removes `key` and returns its values.
	pub fn remove(&mut self, key: &str) -> Option<Vec<String>> {
		self.0.remove(key)
	}

	/// First value of `key`.
	pub fn get(&self, key: &str) -> Option<&str> {
		self.0.get(key)?.first().map(String::as_str)
	}

	/// Every value of `key`.
	pub fn get_all(&self, key: &str) -> &[String] {
		self.0.get(key).map(Vec::as_slice).unwrap_or_default()
	}

	/// Iterates over `(key, value)` pairs in key order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.0.iter().flat_map(|(key, values)| {
			values.iter().map(move |value| (key.as_str(), value.as_str()))
		})
	}

	/// Returns `true` when no key is set.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Parses an `application/x-www-form-urlencoded` query string.
	pub fn from_query_string(query: &str) -> Self {
		url::form_urlencoded::parse(query.trim_start_matches('?').as_bytes())
			.fold(Self::new(), |options, (key, value)| options.with(key, value))
	}

	/// Collects the query of `url`.
	pub fn from_url(url: &Url) -> Self {
		url.query().map(Self::from_query_string).unwrap_or_default()
	}

	/// Collects the pairs exposed by a [`Queryable`] value.
	pub fn from_queryable<Q>(value: &Q) -> Self
	where
		Q: ?Sized + Queryable,
	{
		value.query_pairs().into_iter().fold(Self::new(), |options, (key, value)| {
			options.with(key, value)
		})
	}

	/// Converts a serializable value shaped as a flat object of scalars or scalar lists.
	///
	/// `null` fields are skipped; nested objects, nested lists, and non-object values are
	/// rejected with [`Error::InvalidOptions`].
	pub fn from_serialize<T>(value: &T) -> Result<Self>
	where
		T: ?Sized + Serialize,
	{
		let value = serde_json::to_value(value)
			.map_err(|e| Error::InvalidOptions { reason: e.to_string() })?;
		let JsonValue::Object(fields) = value else {
			return Err(Error::InvalidOptions {
				reason: format!("expected a flat object, found {}", json_kind(&value)),
			});
		};
		let mut options = Self::new();

		for (key, field) in fields {
			match field {
				JsonValue::Null => {},
				JsonValue::Array(items) =>
					for item in items {
						if let Some(text) = scalar(&key, &item)? {
							options.append(key.clone(), text);
						}
					},
				other =>
					if let Some(text) = scalar(&key, &other)? {
						options.append(key.clone(), text);
					},
			}
		}

		Ok(options)
	}

	/// Writes the options into `url`, replacing same-named keys already present.
	pub fn apply_to(&self, url: &mut Url) {
		if self.is_empty() {
			return;
		}

		let kept = url
			.query_pairs()
			.filter(|(key, _)| !self.0.contains_key(key.as_ref()))
			.map(|(key, value)| (key.into_owned(), value.into_owned()))
			.collect::<Vec<_>>();

		url.query_pairs_mut()
			.clear()
			.extend_pairs(kept)
			.extend_pairs(self.iter());
	}
}
impl<K, V> FromIterator<(K, V)> for QueryOptions
where
	K: Into<String>,
	V: Into<String>,
{
	fn from_iter<I>(iter: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
	{
		iter.into_iter().fold(Self::new(), |options, (key, value)| options.with(key, value))
	}
}

/// Value with a finite set of named fields that render into query parameters.
pub trait Queryable {
	/// Returns the `(name, value)` pairs of every set field, repeating names for lists.
	fn query_pairs(&self) -> Vec<(&'static str, String)>;
}

/// Pagination strategy of list endpoints.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaginationType {
	/// Offset pagination with `page`.
	#[default]
	Page,
	/// Cursor pagination with `search_after`.
	SearchAfter,
}
impl PaginationType {
	/// Returns the wire value.
	pub const fn as_str(self) -> &'static str {
		match self {
			PaginationType::Page => "page",
			PaginationType::SearchAfter => "search_after",
		}
	}
}

/// Common parameters accepted by list endpoints.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListOptions {
	/// One-based page number.
	pub page: Option<u32>,
	/// Items per page.
	pub limit: Option<u32>,
	/// Ask upstream to report the total item count.
	pub with_count: Option<bool>,
	/// JSON-encoded search filter.
	pub search: Option<String>,
	/// Channel used to filter values.
	pub scope: Option<String>,
	/// Locales used to filter values.
	pub locales: Vec<String>,
	/// Attribute codes used to filter values.
	pub attributes: Vec<String>,
	/// Pagination strategy.
	pub pagination_type: Option<PaginationType>,
	/// Cursor for search-after pagination.
	pub search_after: Option<String>,
	/// Include quality scores in product payloads.
	pub with_quality_scores: Option<bool>,
	/// Include completenesses in product payloads.
	pub with_completenesses: Option<bool>,
}
impl Queryable for ListOptions {
	fn query_pairs(&self) -> Vec<(&'static str, String)> {
		let mut pairs = Vec::new();

		if let Some(page) = self.page {
			pairs.push(("page", page.to_string()));
		}
		if let Some(limit) = self.limit {
			pairs.push(("limit", limit.to_string()));
		}
		if let Some(with_count) = self.with_count {
			pairs.push(("with_count", with_count.to_string()));
		}
		if let Some(search) = &self.search {
			pairs.push(("search", search.clone()));
		}
		if let Some(scope) = &self.scope {
			pairs.push(("scope", scope.clone()));
		}
		if !self.locales.is_empty() {
			pairs.push(("locales", self.locales.join(",")));
		}
		if !self.attributes.is_empty() {
			pairs.push(("attributes", self.attributes.join(",")));
		}
		if let Some(pagination_type) = self.pagination_type {
			pairs.push(("pagination_type", pagination_type.as_str().to_owned()));
		}
		if let Some(search_after) = &self.search_after {
			pairs.push(("search_after", search_after.clone()));
		}
		if let Some(with_quality_scores) = self.with_quality_scores {
			pairs.push(("with_quality_scores", with_quality_scores.to_string()));
		}
		if let Some(with_completenesses) = self.with_completenesses {
			pairs.push(("with_completenesses", with_completenesses.to_string()));
		}

		pairs
	}
}

fn scalar(key: &str, value: &JsonValue) -> Result<Option<String>> {
	match value {
		JsonValue::Null => Ok(None),
		JsonValue::Bool(flag) => Ok(Some(flag.to_string())),
		JsonValue::Number(number) => Ok(Some(number.to_string())),
		JsonValue::String(text) => Ok(Some(text.clone())),
		other => Err(Error::InvalidOptions {
			reason: format!("field `{key}` holds {}, expected a scalar", json_kind(other)),
		}),
	}
}

fn json_kind(value: &JsonValue) -> &'static str {
	match value {
		JsonValue::Null => "null",
		JsonValue::Bool(_) => "a boolean",
		JsonValue::Number(_) => "a number",
		JsonValue::String(_) => "a string",
		JsonValue::Array(_) => "an array",
		JsonValue::Object(_) => "an object",
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[derive(Serialize)]
	struct Filter {
		limit: u32,
		with_count: bool,
		locales: Vec<&'static str>,
		scope: Option<&'static str>,
	}

	#[test]
	fn options_replace_path_keys() {
		let mut url = Url::parse("https://pim.test/api/rest/v1/products?limit=10&page=2")
			.expect("URL fixture should parse.");

		QueryOptions::new().with("limit", "100").with("with_count", "true").apply_to(&mut url);

		let options = QueryOptions::from_url(&url);

		assert_eq!(options.get("limit"), Some("100"));
		assert_eq!(options.get("page"), Some("2"));
		assert_eq!(options.get("with_count"), Some("true"));
		assert_eq!(options.get_all("limit").len(), 1);
	}

	#[test]
	fn serializable_flat_objects_convert() {
		let options = QueryOptions::from_serialize(&Filter {
			limit: 50,
			with_count: false,
			locales: vec!["en_US", "fr_FR"],
			scope: None,
		})
		.expect("Flat struct should convert.");

		assert_eq!(options.get("limit"), Some("50"));
		assert_eq!(options.get("with_count"), Some("false"));
		assert_eq!(options.get_all("locales"), ["en_US", "fr_FR"]);
		assert_eq!(options.get("scope"), None);
	}

	#[test]
	fn unsupported_shapes_are_rejected() {
		assert!(matches!(
			QueryOptions::from_serialize(&vec![1, 2, 3]),
			Err(Error::InvalidOptions { .. })
		));
		assert!(matches!(
			QueryOptions::from_serialize(&serde_json::json!({"search": {"sku": []}})),
			Err(Error::InvalidOptions { .. })
		));
		assert!(matches!(
			QueryOptions::from_serialize(&serde_json::json!({"ids": [[1]]})),
			Err(Error::InvalidOptions { .. })
		));
	}

	#[test]
	fn list_options_render_set_fields_only() {
		let options = QueryOptions::from_queryable(&ListOptions {
			limit: Some(100),
			locales: vec!["en_US".into(), "de_DE".into()],
			pagination_type: Some(PaginationType::SearchAfter),
			..Default::default()
		});

		assert_eq!(
			options.iter().collect::<Vec<_>>(),
			[("limit", "100"), ("locales", "en_US,de_DE"), ("pagination_type", "search_after")]
		);
	}

	#[test]
	fn query_strings_round_trip_encoding() {
		let options = QueryOptions::from_query_string(
			"?search=%7B%22enabled%22%3A%5B%7B%22operator%22%3A%22%3D%22%7D%5D%7D&page=3",
		);

		assert_eq!(options.get("search"), Some(r#"{"enabled":[{"operator":"="}]}"#));
		assert_eq!(options.get("page"), Some("3"));
	}
}
