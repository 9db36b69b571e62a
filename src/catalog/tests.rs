use super::*;
use crate::config::{CatalogConfig, Config};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn sample_product() -> Value {
    json!({
        "id": 7,
        "name": "Clarifying Gel Cleanser",
        "description": "A foaming gel cleanser for daily use",
        "keyBenefits": ["Unclogs pores", "Controls shine"],
        "activeContent": "Salicylic Acid 2%",
        "howToUse": "Massage onto damp skin morning and evening",
        "price": 19.5
    })
}

fn test_config(base_dir: &std::path::Path, products_url: &str) -> Config {
    Config {
        catalog: CatalogConfig {
            products_url: products_url.to_string(),
            timeout_seconds: 5,
        },
        base_dir: base_dir.to_path_buf(),
        ..Config::default()
    }
}

#[test]
fn embedding_text_orders_and_labels_fields() {
    let product = CatalogProduct::from_json(&sample_product()).expect("should parse product");
    let text = product.embedding_text();

    let name_pos = text.find("Product Name: Clarifying Gel Cleanser");
    let benefits_pos = text.find("Key Benefits: Unclogs pores, Controls shine");
    let description_pos = text.find("Detailed Description: A foaming gel cleanser");
    let price_pos = text.find("Price: 19.5");

    assert!(name_pos.is_some());
    assert!(benefits_pos.is_some());
    assert!(description_pos.is_some());
    assert!(price_pos.is_some());

    // Fixed feature order: name before benefits before description
    assert!(name_pos < benefits_pos);
    assert!(benefits_pos < description_pos);
}

#[test]
fn embedding_text_skips_missing_and_empty_fields() {
    let payload = json!({
        "id": 1,
        "name": "Bare Minimum Serum",
        "description": "",
        "howToUse": null
    });
    let text = embedding_text_from_payload(&payload);

    assert_eq!(text, "Product Name: Bare Minimum Serum");
    assert!(!text.contains("Detailed Description"));
    assert!(!text.contains("How to Use"));
}

#[test]
fn embedding_text_is_deterministic() {
    let payload = sample_product();
    assert_eq!(
        embedding_text_from_payload(&payload),
        embedding_text_from_payload(&payload)
    );
}

#[test]
fn product_requires_id_and_name() {
    assert!(CatalogProduct::from_json(&json!({"name": "No Id"})).is_none());
    assert!(CatalogProduct::from_json(&json!({"id": 3})).is_none());
    assert!(CatalogProduct::from_json(&json!({"id": 3, "name": "Ok"})).is_some());
}

#[tokio::test(flavor = "multi_thread")]
async fn fetch_parses_wrapped_catalog_and_writes_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/products"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"products": [sample_product()]})),
        )
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = test_config(temp_dir.path(), &format!("{}/products", server.uri()));
    let client = CatalogClient::new(&config);

    let products = tokio::task::spawn_blocking(move || client.fetch_products())
        .await
        .expect("task should join")
        .expect("fetch should succeed");

    assert_eq!(products.len(), 1);
    assert_eq!(products[0].id, 7);
    assert_eq!(products[0].name, "Clarifying Gel Cleanser");
    assert!(config.catalog_cache_path().exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn fetch_falls_back_to_cache_when_upstream_is_down() {
    let temp_dir = TempDir::new().expect("should create temp dir");

    // Seed the cache, pointing at a server we then drop.
    {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/products"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"products": [sample_product()]})),
            )
            .mount(&server)
            .await;

        let config = test_config(temp_dir.path(), &format!("{}/products", server.uri()));
        let client = CatalogClient::new(&config);
        tokio::task::spawn_blocking(move || client.fetch_products())
            .await
            .expect("task should join")
            .expect("initial fetch should succeed");
    }

    // Unreachable port: the fetch must serve the cached copy.
    let config = test_config(temp_dir.path(), "http://127.0.0.1:9/products");
    let client = CatalogClient::new(&config);
    let products = tokio::task::spawn_blocking(move || client.fetch_products())
        .await
        .expect("task should join")
        .expect("cache fallback should succeed");

    assert_eq!(products.len(), 1);
    assert_eq!(products[0].name, "Clarifying Gel Cleanser");
}

#[tokio::test(flavor = "multi_thread")]
async fn fetch_without_cache_or_upstream_errors() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = test_config(temp_dir.path(), "http://127.0.0.1:9/products");
    let client = CatalogClient::new(&config);

    let result = tokio::task::spawn_blocking(move || client.fetch_products())
        .await
        .expect("task should join");

    assert!(result.is_err());
}

#[test]
fn bare_array_catalog_accepted() {
    let raw = json!([sample_product()]);
    let products = parse_catalog(&raw).expect("should parse bare array");
    assert_eq!(products.len(), 1);
}
