//! Hypermedia links and paginated list envelopes.

// self
use crate::{_prelude::*, query::QueryOptions};

/// A single hypermedia link.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
	/// Absolute target URL.
	pub href: String,
}

/// `_links` bundle attached to list pages and media values.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Links {
	/// The resource itself.
	#[serde(rename = "self", skip_serializing_if = "Option::is_none")]
	pub self_link: Option<Link>,
	/// First page of a listing.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub first: Option<Link>,
	/// Previous page of a listing.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub previous: Option<Link>,
	/// Next page of a listing; absent on the last page.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub next: Option<Link>,
	/// Binary content of a media file.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub download: Option<Link>,
	/// Links with other relation names, kept verbatim.
	#[serde(flatten)]
	pub other: BTreeMap<String, Link>,
}
impl Links {
	/// Returns `true` when a next page exists.
	pub fn has_next(&self) -> bool {
		self.next.is_some()
	}

	/// Query options of the next page, taken from the `next` link.
	pub fn next_options(&self) -> Option<QueryOptions> {
		let (_, query) = self.next.as_ref()?.href.split_once('?')?;

		Some(QueryOptions::from_query_string(query))
	}

	/// Download URL of a media file.
	pub fn download_url(&self) -> Option<&str> {
		self.download.as_ref().map(|link| link.href.as_str())
	}
}

/// One page of a list endpoint (`{_links, current_page, _embedded: {items}}`).
#[derive(Clone, Debug, PartialEq)]
pub struct Page<T> {
	/// Navigation links.
	pub links: Links,
	/// Page number for offset pagination.
	pub current_page: Option<u32>,
	/// Total item count, when requested with `with_count`.
	pub items_count: Option<u64>,
	/// Items of this page.
	pub items: Vec<T>,
}
impl<T> Page<T> {
	/// Returns `true` when a next page exists.
	pub fn has_next(&self) -> bool {
		self.links.has_next()
	}
}
impl<'de, T> Deserialize<'de> for Page<T>
where
	T: Deserialize<'de>,
{
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: serde::Deserializer<'de>,
	{
		let raw = RawPage::<T>::deserialize(deserializer)?;

		Ok(Self {
			links: raw.links,
			current_page: raw.current_page,
			items_count: raw.items_count,
			items: raw.embedded.items,
		})
	}
}

#[derive(Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct RawPage<T> {
	#[serde(rename = "_links", default)]
	links: Links,
	#[serde(default)]
	current_page: Option<u32>,
	#[serde(default)]
	items_count: Option<u64>,
	#[serde(rename = "_embedded", default)]
	embedded: RawItems<T>,
}

#[derive(Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct RawItems<T> {
	#[serde(default)]
	items: Vec<T>,
}
impl<T> Default for RawItems<T> {
	fn default() -> Self {
		Self { items: Vec::new() }
	}
}
