//! Envelope classification.
//!
//! Precedence is fixed and the first match wins: a `_links` member makes the value a media
//! value, otherwise a `linked_data` member makes it a select value, otherwise the shape of
//! `data` decides. Shapes outside that table are rejected with the envelope attached.

// self
use crate::{
	_prelude::*,
	error::DecodeError,
	page::Links,
	value::{
		AttributeValue, LinkedOption, MediaRef, Metric, Price, ValueData, ValueEnvelope, ValueMap,
	},
};

impl ValueEnvelope {
	/// Classifies the envelope into a typed value.
	pub fn decode(&self) -> Result<AttributeValue, DecodeError> {
		let data = if let Some(links) = &self.links {
			self.decode_media(links)?
		} else if let Some(linked_data) = &self.linked_data {
			self.decode_select(linked_data)?
		} else {
			self.decode_plain()?
		};

		Ok(AttributeValue { locale: self.locale.clone(), scope: self.scope.clone(), data })
	}

	fn decode_media(&self, links: &JsonValue) -> Result<ValueData, DecodeError> {
		match &self.data {
			JsonValue::Null | JsonValue::String(_) => Ok(ValueData::Media {
				path: self.data.as_str().map(ToOwned::to_owned),
				links: self.parse(links, "media links")?,
			}),
			JsonValue::Array(paths) => {
				let JsonValue::Array(bundles) = links else {
					return Err(self.reject("media collection links must be an array"));
				};

				if paths.len() != bundles.len() {
					return Err(self.reject(format!(
						"media collection has {} paths but {} link bundles",
						paths.len(),
						bundles.len()
					)));
				}

				paths
					.iter()
					.zip(bundles)
					.map(|(path, bundle)| {
						let path = path
							.as_str()
							.ok_or_else(|| self.reject("media collection paths must be strings"))?;

						Ok(MediaRef {
							path: path.to_owned(),
							links: self.parse::<Links>(bundle, "media links")?,
						})
					})
					.collect::<Result<Vec<_>, _>>()
					.map(ValueData::MediaCollection)
			},
			other => Err(self.reject(format!("media data cannot be {}", kind_of(other)))),
		}
	}

	fn decode_select(&self, linked_data: &JsonValue) -> Result<ValueData, DecodeError> {
		match &self.data {
			JsonValue::Null | JsonValue::String(_) => Ok(ValueData::SimpleSelect {
				code: self.data.as_str().map(ToOwned::to_owned),
				option: self.parse::<LinkedOption>(linked_data, "linked option")?,
			}),
			JsonValue::Array(_) => Ok(ValueData::MultiSelect {
				codes: self.parse(&self.data, "multi select codes")?,
				options: self.parse(linked_data, "linked options")?,
			}),
			other => Err(self.reject(format!("select data cannot be {}", kind_of(other)))),
		}
	}

	fn decode_plain(&self) -> Result<ValueData, DecodeError> {
		match &self.data {
			JsonValue::Null => Ok(ValueData::Text(None)),
			JsonValue::String(text) => Ok(ValueData::Text(Some(text.clone()))),
			JsonValue::Bool(flag) => Ok(ValueData::Boolean(*flag)),
			JsonValue::Number(number) => number
				.as_i64()
				.map(ValueData::Number)
				.ok_or_else(|| self.reject(format!("number {number} is not a 64-bit integer"))),
			JsonValue::Object(fields) if fields.contains_key("unit") =>
				self.parse::<Metric>(&self.data, "metric").map(ValueData::Metric),
			JsonValue::Array(items) if items.iter().all(JsonValue::is_string) =>
				self.parse(&self.data, "text collection").map(ValueData::TextCollection),
			JsonValue::Array(items) => match items.first() {
				Some(JsonValue::Object(first)) if first.contains_key("currency") =>
					self.parse::<Price>(&self.data, "price").map(ValueData::Price),
				Some(JsonValue::Object(_)) => self.parse(&self.data, "table").map(ValueData::Table),
				_ => Err(self.reject("arrays must hold only strings or only objects")),
			},
			JsonValue::Object(_) => Err(self.reject("objects without a unit are not values")),
		}
	}

	fn parse<T>(&self, value: &JsonValue, what: &str) -> Result<T, DecodeError>
	where
		T: DeserializeOwned,
	{
		T::deserialize(value).map_err(|e| self.reject(format!("malformed {what}: {e}")))
	}

	fn reject(&self, reason: impl Into<String>) -> DecodeError {
		DecodeError::Value { reason: reason.into(), envelope: Box::new(self.clone()) }
	}
}

/// Decodes every value of a product `values` map, keeping attribute codes and value order.
pub fn decode_values(
	values: &ValueMap,
) -> Result<BTreeMap<String, Vec<AttributeValue>>, DecodeError> {
	values
		.iter()
		.map(|(attribute, envelopes)| {
			envelopes
				.iter()
				.map(ValueEnvelope::decode)
				.collect::<Result<Vec<_>, _>>()
				.map(|decoded| (attribute.clone(), decoded))
				.map_err(|e| DecodeError::Attribute {
					attribute: attribute.clone(),
					source: Box::new(e),
				})
		})
		.collect()
}

fn kind_of(value: &JsonValue) -> &'static str {
	match value {
		JsonValue::Null => "null",
		JsonValue::Bool(_) => "a boolean",
		JsonValue::Number(_) => "a number",
		JsonValue::String(_) => "a string",
		JsonValue::Array(_) => "an array",
		JsonValue::Object(_) => "an object",
	}
}
