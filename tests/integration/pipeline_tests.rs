//! Integration tests for the extraction pipeline
//!
//! These tests use wiremock to serve search-results pages and run the full
//! fetch → parse → extract → paginate → write cycle end-to-end.

use hotel_harvest::config::{Config, PaginationMode};
use hotel_harvest::output::{read_csv_records, write_records, OutputFormat};
use hotel_harvest::{FetchErrorKind, Pipeline, StopReason};
use tokio::sync::watch;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

/// Creates a test configuration with no delay and fast retries
fn create_test_config() -> Config {
    let mut config = Config::default();
    config.scraper.delay_seconds = 0.0;
    config.scraper.timeout_seconds = 5;
    config.scraper.max_retries = 1;
    config.scraper.backoff_base_ms = 1;
    config.scraper.max_backoff_ms = 2;
    config
}

/// One listing card in the current search-results markup
fn card(name: &str) -> String {
    format!(
        r#"<div data-testid="property-card">
            <div data-testid="title">{name}</div>
            <span data-testid="address">Le Marais, Paris</span>
            <div data-testid="review-score"><div aria-hidden="true">8,5</div></div>
            <div class="fff1944c52 fb14de7f14 eaa8455879">1,234 reviews</div>
            <span data-testid="price-and-discounted-price">€ 212</span>
        </div>"#
    )
}

/// A results page with `count` cards, optionally showing a next-page button
fn results_page(page: u32, count: u32, has_next: bool) -> String {
    let cards: String = (1..=count)
        .map(|i| card(&format!("Hotel {}-{}", page, i)))
        .collect();
    let next = if has_next {
        r#"<button aria-label="Next page">Next</button>"#
    } else {
        ""
    };
    format!(
        "<html><head><title>Paris hotels</title></head><body>{}{}</body></html>",
        cards, next
    )
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body)
        .insert_header("content-type", "text/html; charset=utf-8")
}

async fn mount_page(server: &MockServer, offset: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/searchresults.html"))
        .and(query_param("offset", offset))
        .respond_with(response)
        .mount(server)
        .await;
}

fn start_url(server: &MockServer) -> String {
    format!("{}/searchresults.html?ss=Paris&offset=0", server.uri())
}

#[tokio::test]
async fn test_paginates_until_empty_page() {
    let server = MockServer::start().await;
    mount_page(&server, "0", html(results_page(1, 10, true))).await;
    mount_page(&server, "25", html(results_page(2, 10, true))).await;
    mount_page(&server, "50", html(results_page(3, 0, true))).await;

    let pipeline = Pipeline::new(&create_test_config()).unwrap();
    let result = pipeline.run(&start_url(&server)).await.unwrap();

    assert_eq!(result.records.len(), 20);
    assert_eq!(result.pages_fetched, 2);
    assert_eq!(result.pages_requested, 3);
    assert_eq!(result.stop_reason, StopReason::NormalDone);
    assert!(result.error.is_none());
    assert_eq!(result.extraction_failures, 0);

    // Page order, then listing order within the page
    assert_eq!(result.records[0].name.as_deref(), Some("Hotel 1-1"));
    assert_eq!(result.records[9].name.as_deref(), Some("Hotel 1-10"));
    assert_eq!(result.records[10].name.as_deref(), Some("Hotel 2-1"));

    let record = &result.records[0];
    assert_eq!(record.location.as_deref(), Some("Le Marais, Paris"));
    assert_eq!(record.review_score, Some(8.5));
    assert_eq!(record.review_count, Some(1234));
    assert_eq!(record.price.as_deref(), Some("€ 212"));
}

#[tokio::test]
async fn test_fetch_failure_keeps_earlier_records() {
    let server = MockServer::start().await;
    mount_page(&server, "0", html(results_page(1, 5, true))).await;
    Mock::given(method("GET"))
        .and(path("/searchresults.html"))
        .and(query_param("offset", "25"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let pipeline = Pipeline::new(&create_test_config()).unwrap();
    let result = pipeline.run(&start_url(&server)).await.unwrap();

    assert_eq!(result.records.len(), 5);
    assert_eq!(result.stop_reason, StopReason::FetchFailed);
    assert!(result.any_page_fetched());

    let error = result.error.as_ref().unwrap();
    assert_eq!(error.kind, FetchErrorKind::HttpStatus(500));
    assert_eq!(error.attempts, 2);
    assert!(error.url.contains("offset=25"));

    // The partial result is still written
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("booking_hotels.csv");
    write_records(&result.records, &out, OutputFormat::Csv).unwrap();
    assert_eq!(read_csv_records(&out).unwrap(), result.records);
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let pipeline = Pipeline::new(&create_test_config()).unwrap();
    let result = pipeline.run(&start_url(&server)).await.unwrap();

    assert!(result.records.is_empty());
    assert!(!result.any_page_fetched());
    assert_eq!(result.stop_reason, StopReason::FetchFailed);
    assert_eq!(
        result.error.as_ref().map(|e| e.kind),
        Some(FetchErrorKind::HttpStatus(404))
    );
}

#[tokio::test]
async fn test_max_pages_stops_run() {
    let server = MockServer::start().await;
    mount_page(&server, "0", html(results_page(1, 3, true))).await;
    mount_page(&server, "25", html(results_page(2, 3, true))).await;
    Mock::given(method("GET"))
        .and(query_param("offset", "50"))
        .respond_with(html(results_page(3, 3, true)))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = create_test_config();
    config.scraper.max_pages = Some(2);

    let result = Pipeline::new(&config)
        .unwrap()
        .run(&start_url(&server))
        .await
        .unwrap();

    assert_eq!(result.records.len(), 6);
    assert_eq!(result.pages_fetched, 2);
    assert_eq!(result.stop_reason, StopReason::MaxPagesReached);
}

#[tokio::test]
async fn test_missing_next_control_ends_run() {
    let server = MockServer::start().await;
    mount_page(&server, "0", html(results_page(1, 4, false))).await;
    Mock::given(method("GET"))
        .and(query_param("offset", "25"))
        .respond_with(html(results_page(2, 4, false)))
        .expect(0)
        .mount(&server)
        .await;

    let result = Pipeline::new(&create_test_config())
        .unwrap()
        .run(&start_url(&server))
        .await
        .unwrap();

    assert_eq!(result.records.len(), 4);
    assert_eq!(result.stop_reason, StopReason::NormalDone);
}

#[tokio::test]
async fn test_link_pagination_follows_href() {
    let server = MockServer::start().await;
    let first = format!(
        "<html><body>{}{}<a rel=\"next\" href=\"/results/page-2\">Next</a></body></html>",
        card("Hotel A"),
        card("Hotel B")
    );
    let second = format!("<html><body>{}</body></html>", card("Hotel C"));

    Mock::given(method("GET"))
        .and(path("/results/page-1"))
        .respond_with(html(first))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/results/page-2"))
        .respond_with(html(second))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = create_test_config();
    config.pagination.mode = PaginationMode::Link;

    let result = Pipeline::new(&config)
        .unwrap()
        .run(&format!("{}/results/page-1", server.uri()))
        .await
        .unwrap();

    let names: Vec<_> = result
        .records
        .iter()
        .filter_map(|r| r.name.as_deref())
        .collect();
    assert_eq!(names, vec!["Hotel A", "Hotel B", "Hotel C"]);
    assert_eq!(result.pages_fetched, 2);
    assert_eq!(result.stop_reason, StopReason::NormalDone);
}

#[tokio::test]
async fn test_empty_first_page_writes_header_only() {
    let server = MockServer::start().await;
    mount_page(&server, "0", html(results_page(1, 0, false))).await;

    let result = Pipeline::new(&create_test_config())
        .unwrap()
        .run(&start_url(&server))
        .await
        .unwrap();

    assert!(result.records.is_empty());
    assert_eq!(result.pages_fetched, 0);
    assert!(result.any_page_fetched());
    assert_eq!(result.stop_reason, StopReason::NormalDone);

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("booking_hotels.csv");
    write_records(&result.records, &out, OutputFormat::Csv).unwrap();
    assert_eq!(
        std::fs::read_to_string(&out).unwrap(),
        "Hotel Name,Location,Review Score,Number of Reviews,Price\n"
    );
}

#[tokio::test]
async fn test_non_markup_body_counts_parse_failure() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "0",
        ResponseTemplate::new(200)
            .set_body_string(r#"{"captcha": true}"#)
            .insert_header("content-type", "application/json"),
    )
    .await;

    let result = Pipeline::new(&create_test_config())
        .unwrap()
        .run(&start_url(&server))
        .await
        .unwrap();

    assert_eq!(result.parse_failures, 1);
    assert!(result.records.is_empty());
    assert_eq!(result.stop_reason, StopReason::NormalDone);
    assert!(result.pages[0].parse_error.is_some());
}

#[tokio::test]
async fn test_partial_cards_keep_other_fields() {
    let server = MockServer::start().await;
    let body = r#"<html><body>
        <div data-testid="property-card">
            <div data-testid="title">No Price Inn</div>
            <span data-testid="address">Montmartre, Paris</span>
            <div data-testid="review-score"><div aria-hidden="true">7.9</div></div>
        </div>
    </body></html>"#;
    mount_page(&server, "0", html(body.to_string())).await;

    let result = Pipeline::new(&create_test_config())
        .unwrap()
        .run(&start_url(&server))
        .await
        .unwrap();

    assert_eq!(result.records.len(), 1);
    let record = &result.records[0];
    assert_eq!(record.name.as_deref(), Some("No Price Inn"));
    assert_eq!(record.review_score, Some(7.9));
    assert_eq!(record.review_count, None);
    assert_eq!(record.price, None);
    assert_eq!(result.extraction_failures, 2);

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("hotels.json");
    write_records(&result.records, &out, OutputFormat::Json).unwrap();
    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert!(value[0]["price"].is_null());
}

#[tokio::test]
async fn test_stop_requested_mid_run_keeps_collected_records() {
    let server = MockServer::start().await;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Serving the first page raises the stop flag, as a Ctrl+C during the
    // fetch would.
    let first = html(results_page(1, 3, true));
    Mock::given(method("GET"))
        .and(path("/searchresults.html"))
        .and(query_param("offset", "0"))
        .respond_with(move |_: &Request| {
            let _ = shutdown_tx.send(true);
            first.clone()
        })
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("offset", "25"))
        .respond_with(html(results_page(2, 3, true)))
        .expect(0)
        .mount(&server)
        .await;

    let result = Pipeline::new(&create_test_config())
        .unwrap()
        .with_shutdown(shutdown_rx)
        .run(&start_url(&server))
        .await
        .unwrap();

    assert_eq!(result.stop_reason, StopReason::Cancelled);
    assert_eq!(result.records.len(), 3);
    assert_eq!(result.pages_fetched, 1);
    assert!(result.error.is_none());
}

#[tokio::test]
async fn test_run_deadline_stops_between_pages() {
    let server = MockServer::start().await;
    mount_page(&server, "0", html(results_page(1, 2, true))).await;
    Mock::given(method("GET"))
        .and(query_param("offset", "25"))
        .respond_with(html(results_page(2, 2, true)))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = create_test_config();
    config.scraper.max_run_seconds = Some(1);
    config.scraper.delay_seconds = 1.2;

    let result = Pipeline::new(&config)
        .unwrap()
        .run(&start_url(&server))
        .await
        .unwrap();

    assert_eq!(result.stop_reason, StopReason::DeadlineReached);
    assert_eq!(result.records.len(), 2);
    assert_eq!(result.pages_requested, 1);
    assert!(!result.stop_reason.is_failure());
}
