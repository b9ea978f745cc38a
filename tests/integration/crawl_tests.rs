//! Integration tests for the crawler
//!
//! These tests use wiremock to serve newest-tags listing pages and run
//! whole crawls against them.

use chrono::{DateTime, Duration, Utc};
use std::time::Duration as StdDuration;
use tagwatch::crawler::PageFetcher;
use tagwatch::{CacheStore, ParseError, StopReason, TagCrawler, TagWatchError};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Builds one tag cell; `hours_ago` becomes a relative creation time
fn cell(name: &str, posts: u32, hours_ago: i64, description: Option<&str>) -> String {
    let description = description
        .map(|text| format!(r#"<div class="flex--item fc-medium mb12 v-truncate4">{}</div>"#, text))
        .unwrap_or_default();

    format!(
        r#"<div class="s-card js-tag-cell d-flex fd-column">
            <div class="d-flex jc-space-between ai-center mb12">
                <div class="flex--item"><a href="/questions/tagged/{name}" class="post-tag" rel="tag">{name}</a></div>
            </div>
            {description}
            <div class="mt-auto d-flex jc-space-between fs-caption fc-black-400">
                <div class="flex--item">{posts} questions</div>
                <div class="flex--item s-anchors s-anchors__inherit">created {hours_ago} hours ago</div>
            </div>
        </div>"#
    )
}

fn listing(cells: &[String]) -> String {
    format!(
        r#"<!DOCTYPE html><html><head><title>Newest Tags</title></head><body>
        <div id="mainbar-full"><div id="tags-browser" class="d-grid grid__4 lg:grid__3 md:grid__2 sm:grid__1 g12">
        {}
        </div></div></body></html>"#,
        cells.concat()
    )
}

/// Mounts a listing page that must be requested exactly `times` times
async fn mount_page(server: &MockServer, page: u32, body: String, times: u64) {
    Mock::given(method("GET"))
        .and(path("/tags"))
        .and(query_param("tab", "new"))
        .and(query_param("page", page.to_string()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html; charset=utf-8"),
        )
        .expect(times)
        .mount(server)
        .await;
}

/// Fails the test (on server drop) if this page is ever requested
async fn forbid_page(server: &MockServer, page: u32) {
    Mock::given(method("GET"))
        .and(path("/tags"))
        .and(query_param("page", page.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing(&[])))
        .expect(0)
        .mount(server)
        .await;
}

fn site_of(server: &MockServer) -> String {
    server.address().to_string()
}

fn crawler(store: CacheStore) -> TagCrawler {
    TagCrawler::new(
        PageFetcher::new(reqwest::Client::new()).insecure(),
        store,
        StdDuration::from_millis(10),
    )
}

fn one_day_ago() -> DateTime<Utc> {
    Utc::now() - Duration::hours(24)
}

fn sorted_names(tags: &tagwatch::SiteCache) -> Vec<String> {
    tags.names().into_iter().map(str::to_string).collect()
}

#[tokio::test]
async fn test_crawl_stops_when_second_page_crosses_cutoff() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        1,
        listing(&[
            cell("alpha", 3, 1, Some("First tag")),
            cell("bravo", 1, 2, None),
            cell("charlie", 0, 3, None),
        ]),
        1,
    )
    .await;
    mount_page(
        &server,
        2,
        listing(&[
            cell("delta", 2, 5, Some("Still inside the window")),
            cell("echo", 4, 30, None),
            cell("foxtrot", 9, 31, None),
        ]),
        1,
    )
    .await;
    forbid_page(&server, 3).await;

    let store = CacheStore::new();
    let report = crawler(store.clone())
        .crawl_new_tags(&site_of(&server), one_day_ago())
        .await
        .expect("crawl should succeed");

    assert_eq!(report.stop, StopReason::CutoffReached);
    assert_eq!(report.pages_fetched, 2);
    assert_eq!(report.new_tags, 4);
    assert_eq!(
        sorted_names(&report.tags),
        vec!["alpha", "bravo", "charlie", "delta"]
    );

    let alpha = report.tags.get("alpha").unwrap();
    assert_eq!(alpha.description, "First tag");
    assert_eq!(alpha.post_count, 3);
    assert_eq!(alpha.link, "/questions/tagged/alpha");
    assert_eq!(report.tags.get("bravo").unwrap().description, "");

    // The store holds the same result the report returned
    assert_eq!(store.snapshot(&site_of(&server)).await, report.tags);
}

#[tokio::test]
async fn test_old_first_cell_on_second_page_adds_nothing_from_it() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        1,
        listing(&[cell("alpha", 1, 1, None), cell("bravo", 1, 2, None)]),
        1,
    )
    .await;
    mount_page(
        &server,
        2,
        listing(&[cell("charlie", 1, 48, None), cell("delta", 1, 50, None)]),
        1,
    )
    .await;
    forbid_page(&server, 3).await;

    let report = crawler(CacheStore::new())
        .crawl_new_tags(&site_of(&server), one_day_ago())
        .await
        .unwrap();

    assert_eq!(report.pages_fetched, 2);
    assert_eq!(report.stop, StopReason::CutoffReached);
    assert_eq!(sorted_names(&report.tags), vec!["alpha", "bravo"]);
}

#[tokio::test]
async fn test_transport_failure_keeps_earlier_pages() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        1,
        listing(&[cell("alpha", 1, 1, None), cell("bravo", 1, 2, None)]),
        1,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/tags"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;
    forbid_page(&server, 3).await;

    let report = crawler(CacheStore::new())
        .crawl_new_tags(&site_of(&server), one_day_ago())
        .await
        .expect("transport failures are not errors");

    assert_eq!(report.stop, StopReason::FetchFailed);
    assert_eq!(report.pages_fetched, 1);
    assert_eq!(sorted_names(&report.tags), vec!["alpha", "bravo"]);
}

#[tokio::test]
async fn test_empty_page_ends_crawl() {
    let server = MockServer::start().await;

    mount_page(&server, 1, listing(&[cell("alpha", 1, 1, None)]), 1).await;
    mount_page(&server, 2, listing(&[]), 1).await;
    forbid_page(&server, 3).await;

    let report = crawler(CacheStore::new())
        .crawl_new_tags(&site_of(&server), one_day_ago())
        .await
        .unwrap();

    assert_eq!(report.stop, StopReason::EmptyPage);
    assert_eq!(report.pages_fetched, 2);
    assert_eq!(sorted_names(&report.tags), vec!["alpha"]);
}

#[tokio::test]
async fn test_missing_container_ends_crawl() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        1,
        "<html><body><h1>Page not found</h1></body></html>".to_string(),
        1,
    )
    .await;
    forbid_page(&server, 2).await;

    let report = crawler(CacheStore::new())
        .crawl_new_tags(&site_of(&server), one_day_ago())
        .await
        .unwrap();

    assert_eq!(report.stop, StopReason::MissingContainer);
    assert!(report.tags.is_empty());
}

#[tokio::test]
async fn test_malformed_cell_fails_crawl_but_keeps_earlier_pages() {
    let server = MockServer::start().await;
    let broken = r#"<div class="s-card js-tag-cell"><div><span>renamed</span></div><div><div>1 question</div><div>created 1 hour ago</div></div></div>"#;

    mount_page(&server, 1, listing(&[cell("alpha", 1, 1, None)]), 1).await;
    mount_page(
        &server,
        2,
        listing(&[cell("bravo", 1, 2, None), broken.to_string()]),
        1,
    )
    .await;
    forbid_page(&server, 3).await;

    let store = CacheStore::new();
    let result = crawler(store.clone())
        .crawl_new_tags(&site_of(&server), one_day_ago())
        .await;

    match result {
        Err(TagWatchError::Parse(ParseError::MalformedCell { page, index, .. })) => {
            assert_eq!(page, 2);
            assert_eq!(index, 1);
        }
        other => panic!("expected a malformed cell error, got {:?}", other),
    }

    // Page 1 was merged before the failure; the broken page was not
    let partial = store.snapshot(&site_of(&server)).await;
    assert_eq!(sorted_names(&partial), vec!["alpha"]);
}

#[tokio::test]
async fn test_sites_do_not_share_caches() {
    let first = MockServer::start().await;
    let second = MockServer::start().await;

    mount_page(&first, 1, listing(&[cell("rust", 1, 1, None), cell("old", 1, 40, None)]), 1).await;
    mount_page(&second, 1, listing(&[cell("bash", 1, 1, None), cell("old", 1, 40, None)]), 1).await;

    let store = CacheStore::new();
    let crawler = crawler(store.clone());

    let a = crawler
        .crawl_new_tags(&site_of(&first), one_day_ago())
        .await
        .unwrap();
    let b = crawler
        .crawl_new_tags(&site_of(&second), one_day_ago())
        .await
        .unwrap();

    assert_eq!(sorted_names(&a.tags), vec!["rust"]);
    assert_eq!(sorted_names(&b.tags), vec!["bash"]);

    // The first site's cache is untouched by the second crawl
    assert_eq!(
        sorted_names(&store.snapshot(&site_of(&first)).await),
        vec!["rust"]
    );
    assert_eq!(store.sites().len(), 2);
}

#[tokio::test]
async fn test_cache_survives_between_crawls() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        1,
        listing(&[cell("alpha", 1, 1, None), cell("old", 1, 40, None)]),
        3,
    )
    .await;

    let store = CacheStore::new();
    let crawler = crawler(store.clone());
    let site = site_of(&server);

    let first = crawler.crawl_new_tags(&site, one_day_ago()).await.unwrap();
    let second = crawler.crawl_new_tags(&site, one_day_ago()).await.unwrap();

    assert_eq!(first.new_tags, 1);
    assert_eq!(second.new_tags, 0);
    assert_eq!(sorted_names(&first.tags), sorted_names(&second.tags));

    // A narrower window stops on the first cell but keeps the earlier finds
    let narrow = Utc::now() - Duration::minutes(5);
    let third = crawler.crawl_new_tags(&site, narrow).await.unwrap();
    assert_eq!(third.new_tags, 0);
    assert_eq!(third.stop, StopReason::CutoffReached);
    assert_eq!(sorted_names(&third.tags), vec!["alpha"]);
    assert!(third.tags.created_since(narrow).is_empty());
}

#[tokio::test]
async fn test_concurrent_crawls_of_same_site_are_serialized() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        1,
        listing(&[cell("alpha", 1, 1, None), cell("bravo", 1, 2, None)]),
        2,
    )
    .await;
    mount_page(
        &server,
        2,
        listing(&[cell("charlie", 1, 3, None), cell("old", 1, 40, None)]),
        2,
    )
    .await;

    let store = CacheStore::new();
    let crawler = crawler(store.clone());
    let site = site_of(&server);

    let (a, b) = tokio::join!(
        crawler.crawl_new_tags(&site, one_day_ago()),
        crawler.crawl_new_tags(&site, one_day_ago()),
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    // One crawl added everything, the other found it already cached
    assert_eq!(a.new_tags + b.new_tags, 3);
    assert_eq!(a.tags, b.tags);
    assert_eq!(sorted_names(&a.tags), vec!["alpha", "bravo", "charlie"]);
}

#[tokio::test]
async fn test_cancellation_during_delay_keeps_fetched_pages() {
    let server = MockServer::start().await;

    mount_page(&server, 1, listing(&[cell("alpha", 1, 1, None)]), 1).await;
    forbid_page(&server, 2).await;

    let token = CancellationToken::new();
    let crawler = TagCrawler::new(
        PageFetcher::new(reqwest::Client::new()).insecure(),
        CacheStore::new(),
        StdDuration::from_secs(30),
    )
    .with_cancellation(token.clone());

    tokio::spawn(async move {
        tokio::time::sleep(StdDuration::from_millis(200)).await;
        token.cancel();
    });

    let report = tokio::time::timeout(
        StdDuration::from_secs(10),
        crawler.crawl_new_tags(&site_of(&server), one_day_ago()),
    )
    .await
    .expect("cancellation should cut the delay short")
    .unwrap();

    assert_eq!(report.stop, StopReason::Cancelled);
    assert_eq!(report.pages_fetched, 1);
    assert_eq!(sorted_names(&report.tags), vec!["alpha"]);
}

#[tokio::test]
async fn test_polite_delay_is_waited_between_pages() {
    let server = MockServer::start().await;

    mount_page(&server, 1, listing(&[cell("alpha", 1, 1, None)]), 1).await;
    mount_page(&server, 2, listing(&[cell("bravo", 1, 2, None)]), 1).await;
    mount_page(
        &server,
        3,
        listing(&[cell("charlie", 1, 3, None), cell("old", 1, 40, None)]),
        1,
    )
    .await;

    let delay = StdDuration::from_millis(200);
    let crawler = TagCrawler::new(
        PageFetcher::new(reqwest::Client::new()).insecure(),
        CacheStore::new(),
        delay,
    );

    let started = std::time::Instant::now();
    let report = crawler
        .crawl_new_tags(&site_of(&server), one_day_ago())
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert_eq!(report.pages_fetched, 3);
    assert_eq!(report.stop, StopReason::CutoffReached);
    // Two gaps between three pages, none after the last
    assert!(
        elapsed >= delay * 2,
        "three pages took {:?}, expected at least {:?}",
        elapsed,
        delay * 2
    );
}
