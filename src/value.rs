//! Typed attribute values.
//!
//! Product and product-model payloads carry their attribute values as generic
//! [`ValueEnvelope`]s whose `data` shape depends on the attribute type. Decoding classifies
//! an envelope into one of eleven [`ValueData`] variants; [`AttributeValue::encode`] turns a
//! typed value back into the envelope it came from.

mod decode;

pub use decode::*;

// crates.io
use serde_json::{Map as JsonMap, json};
// self
use crate::{_prelude::*, page::Links};

/// Product `values` map: attribute code to every locale/scope value of that attribute.
pub type ValueMap = BTreeMap<String, Vec<ValueEnvelope>>;

/// Generic wire form of one attribute value.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ValueEnvelope {
	/// Locale code for localizable attributes.
	#[serde(default)]
	pub locale: Option<String>,
	/// Channel code for scopable attributes.
	#[serde(default)]
	pub scope: Option<String>,
	/// Raw value.
	#[serde(default)]
	pub data: JsonValue,
	/// Media link bundle(s), present for media attributes.
	#[serde(rename = "_links", default, skip_serializing_if = "Option::is_none")]
	pub links: Option<JsonValue>,
	/// Linked option data, present for select attributes.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub linked_data: Option<JsonValue>,
}

/// Decoded value with its locale and scope.
#[derive(Clone, Debug, PartialEq)]
pub struct AttributeValue {
	/// Locale code for localizable attributes.
	pub locale: Option<String>,
	/// Channel code for scopable attributes.
	pub scope: Option<String>,
	/// Typed value.
	pub data: ValueData,
}
impl AttributeValue {
	/// Returns `true` when the value carries a non-empty locale.
	pub fn is_localized(&self) -> bool {
		self.locale.as_deref().is_some_and(|locale| !locale.is_empty())
	}

	/// Variant label of the value.
	pub fn kind(&self) -> ValueKind {
		self.data.kind()
	}

	/// Produces the envelope this value decodes from.
	pub fn encode(&self) -> ValueEnvelope {
		let (data, links, linked_data) = match &self.data {
			ValueData::Text(text) => (json!(text), None, None),
			ValueData::TextCollection(items) => (json!(items), None, None),
			ValueData::Number(number) => (json!(number), None, None),
			ValueData::Metric(metric) =>
				(json!({ "amount": metric.amount, "unit": metric.unit }), None, None),
			ValueData::Price(price) => (json!(price.0), None, None),
			ValueData::Boolean(flag) => (json!(flag), None, None),
			ValueData::SimpleSelect { code, option } => (json!(code), None, Some(json!(option))),
			ValueData::MultiSelect { codes, options } =>
				(json!(codes), None, Some(json!(options))),
			ValueData::Table(rows) => (json!(rows), None, None),
			ValueData::Media { path, links } => (json!(path), Some(json!(links)), None),
			ValueData::MediaCollection(items) => {
				let paths = items.iter().map(|item| item.path.as_str()).collect::<Vec<_>>();
				let links = items.iter().map(|item| &item.links).collect::<Vec<_>>();

				(json!(paths), Some(json!(links)), None)
			},
		};

		ValueEnvelope {
			locale: self.locale.clone(),
			scope: self.scope.clone(),
			data,
			links,
			linked_data,
		}
	}
}

/// The eleven attribute value shapes.
#[derive(Clone, Debug, PartialEq)]
pub enum ValueData {
	/// Text, text area, date, identifier, or reference data code. `None` for an empty value.
	Text(Option<String>),
	/// List of strings without linked option data.
	TextCollection(Vec<String>),
	/// Integer number. Decimal numbers arrive as strings and decode as [`ValueData::Text`].
	Number(i64),
	/// Measured amount with its unit.
	Metric(Metric),
	/// One amount per currency, in upstream order.
	Price(Price),
	/// Yes/no value.
	Boolean(bool),
	/// Single option with its linked data.
	SimpleSelect {
		/// Option code, `None` for an empty value.
		code: Option<String>,
		/// Linked option data.
		option: LinkedOption,
	},
	/// Several options keyed by code.
	MultiSelect {
		/// Option codes in upstream order.
		codes: Vec<String>,
		/// Linked data per option code.
		options: BTreeMap<String, LinkedOption>,
	},
	/// Table rows kept verbatim.
	Table(Vec<JsonMap<String, JsonValue>>),
	/// One media file.
	Media {
		/// Media file path, `None` for an empty value.
		path: Option<String>,
		/// Links of the media file.
		links: Links,
	},
	/// Several media files.
	MediaCollection(Vec<MediaRef>),
}
impl ValueData {
	/// Variant label.
	pub fn kind(&self) -> ValueKind {
		match self {
			ValueData::Text(_) => ValueKind::Text,
			ValueData::TextCollection(_) => ValueKind::TextCollection,
			ValueData::Number(_) => ValueKind::Number,
			ValueData::Metric(_) => ValueKind::Metric,
			ValueData::Price(_) => ValueKind::Price,
			ValueData::Boolean(_) => ValueKind::Boolean,
			ValueData::SimpleSelect { .. } => ValueKind::SimpleSelect,
			ValueData::MultiSelect { .. } => ValueKind::MultiSelect,
			ValueData::Table(_) => ValueKind::Table,
			ValueData::Media { .. } => ValueKind::Media,
			ValueData::MediaCollection(_) => ValueKind::MediaCollection,
		}
	}

	/// Download URLs of media values; empty for every other variant.
	pub fn download_urls(&self) -> Vec<&str> {
		match self {
			ValueData::Media { links, .. } => links.download_url().into_iter().collect(),
			ValueData::MediaCollection(items) =>
				items.iter().filter_map(|item| item.links.download_url()).collect(),
			_ => Vec::new(),
		}
	}
}

/// Stable labels of the value variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
	/// [`ValueData::Text`].
	Text,
	/// [`ValueData::TextCollection`].
	TextCollection,
	/// [`ValueData::Number`].
	Number,
	/// [`ValueData::Metric`].
	Metric,
	/// [`ValueData::Price`].
	Price,
	/// [`ValueData::Boolean`].
	Boolean,
	/// [`ValueData::SimpleSelect`].
	SimpleSelect,
	/// [`ValueData::MultiSelect`].
	MultiSelect,
	/// [`ValueData::Table`].
	Table,
	/// [`ValueData::Media`].
	Media,
	/// [`ValueData::MediaCollection`].
	MediaCollection,
}
impl ValueKind {
	/// Returns a stable label suitable for logs or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			ValueKind::Text => "string",
			ValueKind::TextCollection => "string_collection",
			ValueKind::Number => "number",
			ValueKind::Metric => "metric",
			ValueKind::Price => "price",
			ValueKind::Boolean => "boolean",
			ValueKind::SimpleSelect => "simple_select",
			ValueKind::MultiSelect => "multi_select",
			ValueKind::Table => "table",
			ValueKind::Media => "media_link",
			ValueKind::MediaCollection => "media_set",
		}
	}
}
impl Display for ValueKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Amount of a metric or price: an integer, or a decimal kept as its exact string.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Amount {
	/// Integer amount.
	Integer(i64),
	/// Decimal amount such as `"12.5000"`.
	Decimal(String),
}
impl Display for Amount {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Amount::Integer(value) => write!(f, "{value}"),
			Amount::Decimal(value) => f.write_str(value),
		}
	}
}

/// Measured amount with its unit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metric {
	/// Amount, `None` when upstream sent no amount.
	#[serde(default)]
	pub amount: Option<Amount>,
	/// Unit code such as `KILOGRAM`.
	pub unit: String,
}
impl Metric {
	/// Amount, if any.
	pub fn amount(&self) -> Option<&Amount> {
		self.amount.as_ref()
	}

	/// Unit code.
	pub fn unit(&self) -> &str {
		&self.unit
	}
}

/// One price per currency.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(pub Vec<PriceEntry>);
impl Price {
	/// Amount for `currency`, if that currency is priced.
	pub fn amount_for(&self, currency: &str) -> Option<&Amount> {
		self.0.iter().find(|entry| entry.currency == currency)?.amount.as_ref()
	}

	/// Entries in upstream order.
	pub fn entries(&self) -> &[PriceEntry] {
		&self.0
	}
}

/// Amount in one currency.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceEntry {
	/// Amount, `None` when the currency is not priced.
	#[serde(default)]
	pub amount: Option<Amount>,
	/// Currency code such as `EUR`.
	pub currency: String,
}

/// Linked data of a select option.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkedOption {
	/// Attribute code the option belongs to.
	pub attribute: String,
	/// Option code.
	pub code: String,
	/// Labels per locale.
	pub labels: BTreeMap<String, Option<String>>,
}

/// One entry of a media collection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaRef {
	/// Media file path.
	pub path: String,
	/// Links of the media file.
	pub links: Links,
}
