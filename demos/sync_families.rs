//! Connects a session to a mocked PIM, pages through every family, and decodes the typed
//! attribute values of one product.

// std
use std::time::Duration;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use serde::Deserialize;
use serde_json::json;
// self
use pim_session::{
	auth::Credentials,
	config::{PimVersion, SessionConfig},
	query::{ListOptions, QueryOptions},
	rate_limit::RateLimit,
	reqwest::Client,
	session::Session,
	url::Url,
	value::{ValueMap, decode_values},
};

#[derive(Debug, Deserialize)]
struct Family {
	code: String,
}

#[derive(Debug, Deserialize)]
struct Product {
	identifier: String,
	values: ValueMap,
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/oauth/v1/token");
			then.status(200).header("content-type", "application/json").json_body(json!({
				"access_token": "demo-access",
				"refresh_token": "demo-refresh",
				"expires_in": 3600,
				"token_type": "bearer"
			}));
		})
		.await;
	let next = server.url("/api/rest/v1/families?page=2&limit=2");
	let _first_page = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/rest/v1/families").query_param("page", "1");
			then.status(200).json_body(json!({
				"_links": { "next": { "href": next } },
				"current_page": 1,
				"_embedded": { "items": [{ "code": "shoes" }, { "code": "shirts" }] }
			}));
		})
		.await;
	let _second_page = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/rest/v1/families").query_param("page", "2");
			then.status(200).json_body(json!({
				"_links": {},
				"current_page": 2,
				"_embedded": { "items": [{ "code": "hats" }] }
			}));
		})
		.await;
	let _product = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/rest/v1/products/shoe-1");
			then.status(200).json_body(json!({
				"identifier": "shoe-1",
				"values": {
					"name": [{ "locale": "en_US", "scope": null, "data": "Trail shoe" }],
					"weight": [{
						"locale": null,
						"scope": null,
						"data": { "amount": "1.2500", "unit": "KILOGRAM" }
					}],
					"price": [{
						"locale": null,
						"scope": "ecommerce",
						"data": [{ "amount": "89.90", "currency": "EUR" }]
					}]
				}
			}));
		})
		.await;
	let config = SessionConfig::builder(Url::parse(&server.base_url())?)
		.version(PimVersion::V6)
		.rate_limit(RateLimit::new(10, Duration::from_secs(1)))
		.retry_count(3)
		.build()?;
	let credentials = Credentials::new("demo-client", "demo-secret", "admin", "admin")?;
	let client = Client::builder()
		.danger_accept_invalid_certs(true)
		.danger_accept_invalid_hostnames(true)
		.build()?;
	let session = Session::with_http_client(config, credentials, client)?;

	session.tokens().ensure_valid().await?;

	let options = QueryOptions::from_queryable(&ListOptions {
		page: Some(1),
		limit: Some(2),
		..Default::default()
	});
	let families = session.list_all::<Family>("api/rest/v1/families", Some(&options)).await?;

	for family in &families {
		println!("Family {}.", family.code);
	}

	let product = session.get::<Product>("api/rest/v1/products/shoe-1", None).await?;

	for (attribute, values) in decode_values(&product.values)? {
		for value in values {
			println!(
				"Product {} attribute {attribute} ({}): {:?}.",
				product.identifier,
				value.kind(),
				value.data
			);
		}
	}

	token_mock.assert_async().await;

	Ok(())
}
