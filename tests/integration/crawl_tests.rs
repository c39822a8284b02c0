//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock retailer servers and test
//! the full crawl cycle end-to-end.

use schap::config::{
    load_config_with_hash, Config, CrawlerConfig, NavigationMode, OnDocumentError, OutputConfig,
    RetailerConfig, UserAgentConfig,
};
use schap::crawler::{run_crawl, Coordinator};
use schap::output::{load_statistics, MemorySink};
use schap::storage::{RunStatus, SqliteStorage, Storage};
use schap::{Confidence, Measure, SchapError, TagKind};
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing at the mock server
fn create_test_config(base_url: &str, navigation: NavigationMode, db_path: &str) -> Config {
    Config {
        crawler: CrawlerConfig {
            rate_limit_ms: 0,
            retry_delay_ms: 0,
            retry_backoff: 1.0,
            max_retry_delay_ms: 0,
            max_attempts: None,
            cache: false,
            cache_path: "./cache.db".to_string(),
            on_document_error: OnDocumentError::Fail,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        retailer: RetailerConfig {
            name: "testshop".to_string(),
            navigation,
            root_url: format!("{}/", base_url),
            submenu_url: Some(format!("{}/api/menu?categoryId={{id}}", base_url)),
            feed_url: format!("{}/api/articles?categoryId={{id}}", base_url),
            default_brand: "huismerk".to_string(),
        },
        output: OutputConfig {
            database_path: db_path.to_string(),
        },
    }
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body)
        .insert_header("content-type", "text/html")
}

fn json(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body)
        .insert_header("content-type", "application/json")
}

async fn mount_feed(server: &MockServer, category_id: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/api/articles"))
        .and(query_param("categoryId", category_id))
        .respond_with(response)
        .mount(server)
        .await;
}

/// Mounts a small markup shop: two categories, one of which has a feed
async fn mount_markup_shop(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<!DOCTYPE html>
            <html><head><title>Shop</title><script>if (a < b) { go(); }</script></head><body>
            <div id="header-mainnav">
                <ul><li class="categoryItem"><a href="/aanbiedingen"><span class="title">Aanbiedingen</span></a></li></ul>
            </div>
            <ul class="categories">
                <li class="categoryItem active"><a href="/zuivel"><span class="title">
                    Zuivel  &amp; eieren
                </span></a></li>
                <li class="categoryItem"><a href="/dranken"><span class="title">Dranken</span></a></li>
            </ul>
            </body></html>"#,
        ))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/zuivel"))
        .respond_with(html(
            r#"<html><body><form><input type="hidden" name="CategoryName" value="31"></form></body></html>"#,
        ))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/dranken"))
        .respond_with(html(
            r#"<html><body><form><input type="hidden" name="CategoryName" value="32"/></form></body></html>"#,
        ))
        .mount(server)
        .await;

    mount_feed(
        server,
        "31",
        json(
            r#"{"articles": [
                {"articleNumber": "1001", "name": "Halfvolle melk", "brand": {"name": "-------"},
                 "salePrice": 1.19, "unitSize": "1 l", "imageUrl": "https://img.example/1001.png"},
                {"articleNumber": 1002, "name": "Eieren", "brand": {"name": "Kipster"},
                 "salePrice": "3.49", "unitSize": "10 stuks", "sticker": "25% korting"},
                {"articleNumber": "1003", "name": "Kwark", "brand": {"name": "Melkan"},
                 "salePrice": 2.00, "unitSize": "een emmer"}
            ]}"#,
        ),
    )
    .await;

    mount_feed(server, "32", json(r#"{"articles": []}"#)).await;
}

#[tokio::test]
async fn test_markup_crawl_into_database() {
    let mock_server = MockServer::start().await;
    mount_markup_shop(&mock_server).await;

    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("catalog.db");
    let config = create_test_config(
        &mock_server.uri(),
        NavigationMode::Markup,
        db_path.to_str().unwrap(),
    );

    let stats = run_crawl(config, "test_hash", false).await.unwrap();

    assert_eq!(stats.categories_discovered, 2);
    assert_eq!(stats.products_emitted, 3);
    assert_eq!(stats.low_confidence_products, 1);
    assert_eq!(stats.pages_fetched, 5);
    assert_eq!(stats.fetch_errors, 0);

    let storage = SqliteStorage::new(&db_path).unwrap();
    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.config_hash, "test_hash");
    assert_eq!(run.statistics, stats);

    let categories = storage.get_categories(run.id).unwrap();
    let names: Vec<_> = categories.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Zuivel & eieren", "Dranken"]);
    assert_eq!(categories[0].url, format!("{}/zuivel", mock_server.uri()));

    let products = storage.get_products(run.id).unwrap();
    assert_eq!(products.len(), 3);

    let milk = &products[0];
    assert_eq!(milk.product.identifier, "1001");
    assert_eq!(milk.product.name, "huismerk halfvolle melk");
    assert_eq!(milk.product.price, 119);
    assert_eq!(milk.product.orig_price, 119);
    assert_eq!(milk.product.volume, 1000);
    assert_eq!(milk.product.volume_measure, Measure::Millilitres);
    assert_eq!(milk.product.tags[0].value, "Zuivel & eieren");
    assert_eq!(milk.product.tags[0].kind, TagKind::Category);
    assert_eq!(milk.product.tags[1].value, "huismerk");
    assert_eq!(milk.image_uri.as_deref(), Some("https://img.example/1001.png"));
    assert_eq!(
        milk.source_uri,
        format!("{}/api/articles?categoryId=31", mock_server.uri())
    );

    let eggs = &products[1];
    assert_eq!(eggs.product.identifier, "1002");
    assert_eq!(eggs.product.volume, 10);
    assert_eq!(eggs.product.volume_measure, Measure::Units);
    assert_eq!(eggs.product.orig_price, 349);
    assert_eq!(eggs.product.price, 262);
    assert_eq!(eggs.confidence, Confidence::Neutral);

    let quark = &products[2];
    assert_eq!(quark.confidence, Confidence::Low);
    assert_eq!(quark.problems.len(), 1);
    assert_eq!(quark.problems[0].field, "unit");
    assert_eq!(quark.product.volume, 1);

    let summary = load_statistics(&storage).unwrap();
    assert_eq!(summary.products, 3);
    assert_eq!(summary.low_confidence_products, 1);
    assert_eq!(summary.problem_summary, vec![("unit".to_string(), 1)]);
}

#[tokio::test]
async fn test_menu_api_crawl() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(json(
            r#"{"rootWebshopCategories": [
                {"id": 10, "name": "Vers", "hasChildren": true},
                {"id": 20, "name": "Huishouden", "hasChildren": false}
            ]}"#,
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/menu"))
        .and(query_param("categoryId", "10"))
        .respond_with(json(
            r#"{"childrenWebshopCategories": [
                {"id": 11, "name": "Groente", "hasChildren": false},
                {"id": 20, "name": "Huishouden", "hasChildren": false}
            ]}"#,
        ))
        .mount(&mock_server)
        .await;

    mount_feed(&mock_server, "10", json("{}")).await;
    mount_feed(&mock_server, "20", json(r#"{"articles": []}"#)).await;
    mount_feed(
        &mock_server,
        "11",
        json(
            r#"{"articles": [{
                "articleNumber": "77", "name": "Tomaten", "brand": {"name": "Coop"},
                "salePrice": 2.49, "originalPrice": 2.99,
                "volume": "500", "volumeMeasure": {"name": "GRAM"},
                "mixMatched": true, "mixMatchButtonType": "QUANTITY_FIXED_PRICE",
                "mixMatchDiscount": 4.0, "mixMatchItemQuantity": 2
            }]}"#,
        ),
    )
    .await;

    let config = create_test_config(&mock_server.uri(), NavigationMode::MenuApi, ":memory:");
    let mut coordinator = Coordinator::new(config, MemorySink::new()).unwrap();
    let stats = coordinator.run().await.unwrap();
    let sink = coordinator.into_sink();

    let ids: Vec<_> = sink.categories.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![10, 20, 11]);
    assert_eq!(stats.pages_fetched, 5);

    assert_eq!(sink.products.len(), 1);
    let tomatoes = &sink.products[0];
    assert_eq!(tomatoes.product.name, "coop tomaten");
    assert_eq!(tomatoes.product.tags[0].value, "Groente");
    assert_eq!(tomatoes.product.volume, 500_000);
    assert_eq!(tomatoes.product.volume_measure, Measure::Milligrams);
    assert_eq!(tomatoes.product.price, 200);
    assert_eq!(tomatoes.product.orig_price, 299);
    assert_eq!(tomatoes.product.discount_amount, 2);
    assert_eq!(tomatoes.confidence, Confidence::Neutral);
}

#[tokio::test]
async fn test_odd_supplier_values_are_stored_with_low_confidence() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(json(
            r#"{"rootWebshopCategories": [{"id": 40, "name": "Bouwmarkt", "hasChildren": false}]}"#,
        ))
        .mount(&mock_server)
        .await;

    mount_feed(
        &mock_server,
        "40",
        json(
            r#"{"articles": [
                {"articleNumber": "401", "name": "Zand", "salePrice": 5.00,
                 "unitSize": "10000000000000 kg"},
                {"articleNumber": "402", "name": "Tegels", "salePrice": 12.00,
                 "unitSize": 500, "mixMatched": true, "mixMatchButtonType": "PERCENT",
                 "mixMatchDiscount": 50, "mixMatchItemQuantity": -1},
                {"articleNumber": "403", "name": "Verf", "salePrice": 20.00,
                 "unitSize": "2,5 L", "mixMatched": true, "mixMatchButtonType": "PERCENT",
                 "mixMatchDiscount": 50, "mixMatchItemQuantity": "2"}
            ]}"#,
        ),
    )
    .await;

    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("catalog.db");
    let config = create_test_config(
        &mock_server.uri(),
        NavigationMode::MenuApi,
        db_path.to_str().unwrap(),
    );

    let stats = run_crawl(config, "hash", false).await.unwrap();
    assert_eq!(stats.products_emitted, 3);
    assert_eq!(stats.malformed_articles, 0);
    assert_eq!(stats.low_confidence_products, 2);

    let storage = SqliteStorage::new(&db_path).unwrap();
    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);

    let products = storage.get_products(run.id).unwrap();
    let sand = &products[0];
    assert_eq!(sand.product.volume, 1);
    assert_eq!(sand.problems[0].value, "10000000000000 kg");

    let tiles = &products[1];
    let fields: Vec<_> = tiles.problems.iter().map(|p| p.field.as_str()).collect();
    assert_eq!(fields, vec!["mixMatchItemQuantity", "unit"]);
    assert_eq!(tiles.product.price, 1200);

    let paint = &products[2];
    assert_eq!(paint.confidence, Confidence::Neutral);
    assert_eq!(paint.product.price, 1000);
    assert_eq!(paint.product.discount_amount, 2);
    assert_eq!(paint.product.volume, 2_500);
}

#[tokio::test]
async fn test_server_error_is_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(json(
            r#"{"rootWebshopCategories": [{"id": 1, "name": "Kaas", "hasChildren": false}]}"#,
        ))
        .mount(&mock_server)
        .await;

    mount_feed(&mock_server, "1", json(r#"{"articles": []}"#)).await;

    let config = create_test_config(&mock_server.uri(), NavigationMode::MenuApi, ":memory:");
    let mut coordinator = Coordinator::new(config, MemorySink::new()).unwrap();
    let stats = coordinator.run().await.unwrap();

    assert_eq!(stats.fetch_errors, 2);
    assert_eq!(stats.abandoned_fetches, 0);
    assert_eq!(stats.pages_fetched, 2);
    assert_eq!(coordinator.sink().categories.len(), 1);
}

#[tokio::test]
async fn test_bounded_retries_abandon_fetch() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(json(
            r#"{"rootWebshopCategories": [
                {"id": 1, "name": "Kaas", "hasChildren": false},
                {"id": 2, "name": "Vis", "hasChildren": false}
            ]}"#,
        ))
        .mount(&mock_server)
        .await;

    mount_feed(&mock_server, "1", ResponseTemplate::new(503)).await;
    mount_feed(
        &mock_server,
        "2",
        json(r#"{"articles": [{"articleNumber": "5", "name": "Zalm", "salePrice": 4.99, "unitSize": "125 g"}]}"#),
    )
    .await;

    let mut config = create_test_config(&mock_server.uri(), NavigationMode::MenuApi, ":memory:");
    config.crawler.max_attempts = Some(3);

    let mut coordinator = Coordinator::new(config, MemorySink::new()).unwrap();
    let stats = coordinator.run().await.unwrap();

    assert_eq!(stats.fetch_errors, 3);
    assert_eq!(stats.abandoned_fetches, 1);
    assert_eq!(stats.products_emitted, 1);
}

#[tokio::test]
async fn test_malformed_feed_policy() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(json(
            r#"{"rootWebshopCategories": [
                {"id": 1, "name": "Kaas", "hasChildren": false},
                {"id": 2, "name": "Vis", "hasChildren": false}
            ]}"#,
        ))
        .mount(&mock_server)
        .await;
    mount_feed(&mock_server, "1", html("<html>onderhoud</html>")).await;
    mount_feed(
        &mock_server,
        "2",
        json(r#"{"articles": [{"articleNumber": "5", "name": "Zalm", "salePrice": 4.99}]}"#),
    )
    .await;

    // Skipping keeps the rest of the crawl
    let mut config = create_test_config(&mock_server.uri(), NavigationMode::MenuApi, ":memory:");
    config.crawler.on_document_error = OnDocumentError::SkipAndLog;
    let mut coordinator = Coordinator::new(config, MemorySink::new()).unwrap();
    let stats = coordinator.run().await.unwrap();
    assert_eq!(stats.documents_abandoned, 1);
    assert_eq!(stats.products_emitted, 1);

    // Failing aborts the crawl at the malformed feed
    let config = create_test_config(&mock_server.uri(), NavigationMode::MenuApi, ":memory:");
    let mut coordinator = Coordinator::new(config, MemorySink::new()).unwrap();
    let result = coordinator.run().await;
    match result {
        Err(SchapError::Document { uri, .. }) => {
            assert!(uri.ends_with("/api/articles?categoryId=1"));
        }
        other => panic!("Expected a document error, got {:?}", other.map(|_| ())),
    }
    assert!(coordinator.sink().products.is_empty());
}

#[tokio::test]
async fn test_failed_crawl_marks_run_failed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html("<ul><li class=\"categoryItem\"><a href=\"/x\">X</li></ul>"))
        .mount(&mock_server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("catalog.db");
    let config = create_test_config(
        &mock_server.uri(),
        NavigationMode::Markup,
        db_path.to_str().unwrap(),
    );

    let result = run_crawl(config, "test_hash", false).await;
    assert!(result.is_err());

    let storage = SqliteStorage::new(&db_path).unwrap();
    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Failed);
    assert_eq!(run.statistics.pages_fetched, 1);
}

#[tokio::test]
async fn test_cache_serves_second_crawl() {
    let mock_server = MockServer::start().await;
    mount_markup_shop(&mock_server).await;

    let temp_dir = TempDir::new().unwrap();
    let mut config = create_test_config(&mock_server.uri(), NavigationMode::Markup, ":memory:");
    config.crawler.cache = true;
    config.crawler.cache_path = temp_dir
        .path()
        .join("cache.db")
        .to_str()
        .unwrap()
        .to_string();

    let mut first = Coordinator::new(config.clone(), MemorySink::new()).unwrap();
    let first_stats = first.run().await.unwrap();
    assert_eq!(first_stats.pages_fetched, 5);
    assert_eq!(first_stats.cache_hits, 0);

    let mut second = Coordinator::new(config, MemorySink::new()).unwrap();
    let second_stats = second.run().await.unwrap();
    assert_eq!(second_stats.pages_fetched, 0);
    assert_eq!(second_stats.cache_hits, 5);
    assert_eq!(
        second.sink().products.len(),
        first.sink().products.len()
    );

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 5);
}

#[tokio::test]
async fn test_fresh_crawl_clears_cache() {
    let mock_server = MockServer::start().await;
    mount_markup_shop(&mock_server).await;

    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("catalog.db");
    let mut config = create_test_config(
        &mock_server.uri(),
        NavigationMode::Markup,
        db_path.to_str().unwrap(),
    );
    config.crawler.cache = true;
    config.crawler.cache_path = temp_dir
        .path()
        .join("cache.db")
        .to_str()
        .unwrap()
        .to_string();

    run_crawl(config.clone(), "hash", false).await.unwrap();
    let stats = run_crawl(config, "hash", true).await.unwrap();

    assert_eq!(stats.cache_hits, 0);
    assert_eq!(stats.pages_fetched, 5);
}

#[tokio::test]
async fn test_download_image() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/img/1001.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(vec![0x89, b'P', b'N', b'G'])
                .insert_header("content-type", "image/png"),
        )
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), NavigationMode::Markup, ":memory:");
    let mut coordinator = Coordinator::new(config, MemorySink::new()).unwrap();

    let bytes = coordinator
        .download_image(&format!("{}/img/1001.png", mock_server.uri()))
        .await
        .unwrap();
    assert_eq!(bytes, vec![0x89, b'P', b'N', b'G']);
}

#[tokio::test]
async fn test_crawl_from_config_file() {
    let mock_server = MockServer::start().await;
    mount_markup_shop(&mock_server).await;

    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("catalog.db");
    let config_path = temp_dir.path().join("schap.toml");
    let base = mock_server.uri();
    std::fs::write(
        &config_path,
        format!(
            r#"
[crawler]
rate-limit-ms = 0
retry-delay-ms = 0
max-retry-delay-ms = 0

[user-agent]
crawler-name = "TestBot"
crawler-version = "1.0"
contact-url = "https://example.com/contact"
contact-email = "test@example.com"

[retailer]
name = "testshop"
root-url = "{base}/"
feed-url = "{base}/api/articles?categoryId={{id}}"
default-brand = "huismerk"

[output]
database-path = "{db}"
"#,
            base = base,
            db = db_path.display()
        ),
    )
    .unwrap();

    let (config, hash) = load_config_with_hash(Path::new(&config_path)).unwrap();
    assert_eq!(config.retailer.navigation, NavigationMode::Markup);

    let stats = run_crawl(config, &hash, false).await.unwrap();
    assert_eq!(stats.products_emitted, 3);

    let storage = SqliteStorage::new(&db_path).unwrap();
    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.config_hash, hash);
    assert_eq!(run.config_hash.len(), 64);
}
