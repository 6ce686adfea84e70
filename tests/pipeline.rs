//! Integration tests for the full cycle: fetch, queue, publish, mark posted.
//!
//! Each test serves its feed from a wiremock server and uses its own
//! in-memory SQLite database. Posting goes through a recording poster,
//! except for the last test which drives the real pod client.

use std::cell::RefCell;

use clap::Parser;
use pod_feeder::config::{Cli, FileConfig, Settings};
use pod_feeder::pipeline::{run_cycle, CycleReport};
use pod_feeder::publish::{Audience, PodClient, PostError, Poster};
use pod_feeder::storage::Store;
use pretty_assertions::assert_eq;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const HELLO_RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:content="http://purl.org/rss/1.0/modules/content/">
<channel>
  <title>Example</title>
  <link>https://x/</link>
  <description>Example feed</description>
  <item>
    <guid>g1</guid>
    <title>Hello</title>
    <link>https://x/1</link>
    <content:encoded><![CDATA[<p>Hi</p>]]></content:encoded>
  </item>
</channel>
</rss>"#;

/// Records every message; fails any message containing one of `fail_on`.
#[derive(Default)]
struct RecordingPoster {
    sent: RefCell<Vec<String>>,
    fail_on: Vec<String>,
}

impl RecordingPoster {
    fn failing_on(needle: &str) -> Self {
        Self {
            fail_on: vec![needle.to_string()],
            ..Default::default()
        }
    }

    fn sent(&self) -> Vec<String> {
        self.sent.borrow().clone()
    }
}

impl Poster for RecordingPoster {
    async fn post(&self, message: &str, _audience: &Audience) -> Result<(), PostError> {
        if self.fail_on.iter().any(|needle| message.contains(needle)) {
            return Err(PostError::HttpStatus(500));
        }
        self.sent.borrow_mut().push(message.to_string());
        Ok(())
    }
}

struct Item<'a> {
    guid: &'a str,
    title: &'a str,
    hours_ago: i64,
}

/// RSS with one entry per item, published `hours_ago` before now.
fn rss(items: &[Item<'_>]) -> String {
    let now = chrono::Utc::now();
    let entries: String = items
        .iter()
        .map(|i| {
            let published = now - chrono::Duration::hours(i.hours_ago);
            format!(
                "<item><guid>{}</guid><title>{}</title><link>https://example.com/{}</link><pubDate>{}</pubDate></item>",
                i.guid,
                i.title,
                i.guid,
                published.to_rfc2822()
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0"?><rss version="2.0"><channel><title>T</title><link>https://example.com/</link><description>D</description>{}</channel></rss>"#,
        entries
    )
}

async fn serve_feed(body: String) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;
    server
}

fn settings(feed_server: &MockServer, extra: &[&str]) -> Settings {
    settings_with_pod(feed_server, "https://pod.example", extra)
}

fn settings_with_pod(feed_server: &MockServer, pod_url: &str, extra: &[&str]) -> Settings {
    let feed_url = format!("{}/feed", feed_server.uri());
    let mut args = vec![
        "pod-feeder",
        "--feed-id",
        "test-feed",
        "--feed-url",
        feed_url.as_str(),
        "--pod-url",
        pod_url,
        "--access-token",
        "token",
    ];
    args.extend_from_slice(extra);
    Settings::resolve(Cli::try_parse_from(args).unwrap(), FileConfig::default()).unwrap()
}

async fn test_store() -> Store {
    Store::open(":memory:").await.unwrap()
}

#[tokio::test]
async fn test_end_to_end_body_post() {
    let server = serve_feed(HELLO_RSS.to_string()).await;
    let store = test_store().await;
    let client = reqwest::Client::new();
    let poster = RecordingPoster::default();
    let settings = settings(&server, &["--body", "--no-branding"]);

    let report = run_cycle(&store, &client, &settings, Some(&poster))
        .await
        .unwrap();

    assert_eq!(
        report,
        CycleReport {
            fetched: 1,
            queued: 1,
            published: 1,
            failed: 0
        }
    );
    assert_eq!(poster.sent(), vec!["### [Hello](https://x/1)\n\nHi\n\n".to_string()]);
    assert!(store.get("g1").await.unwrap().unwrap().posted);
}

#[tokio::test]
async fn test_end_to_end_with_branding_footer() {
    let server = serve_feed(HELLO_RSS.to_string()).await;
    let store = test_store().await;
    let poster = RecordingPoster::default();
    let settings = settings(&server, &["--body"]);

    run_cycle(&store, &reqwest::Client::new(), &settings, Some(&poster))
        .await
        .unwrap();

    assert_eq!(
        poster.sent(),
        vec!["### [Hello](https://x/1)\n\nHi\n\nposted by pod-feeder".to_string()]
    );
}

#[tokio::test]
async fn test_second_run_does_not_repost() {
    let server = serve_feed(HELLO_RSS.to_string()).await;
    let store = test_store().await;
    let client = reqwest::Client::new();
    let poster = RecordingPoster::default();
    let settings = settings(&server, &[]);

    run_cycle(&store, &client, &settings, Some(&poster)).await.unwrap();
    let second = run_cycle(&store, &client, &settings, Some(&poster))
        .await
        .unwrap();

    assert_eq!(second.queued, 0);
    assert_eq!(second.published, 0);
    assert_eq!(poster.sent().len(), 1);
}

#[tokio::test]
async fn test_failed_post_does_not_block_batch_and_is_retried() {
    let body = rss(&[
        Item { guid: "a", title: "Broken", hours_ago: 3 },
        Item { guid: "b", title: "Fine", hours_ago: 2 },
    ]);
    let server = serve_feed(body).await;
    let store = test_store().await;
    let client = reqwest::Client::new();
    let settings = settings(&server, &[]);

    let flaky = RecordingPoster::failing_on("Broken");
    let first = run_cycle(&store, &client, &settings, Some(&flaky)).await.unwrap();
    assert_eq!(first.published, 1);
    assert_eq!(first.failed, 1);
    assert!(!store.get("a").await.unwrap().unwrap().posted);
    assert!(store.get("b").await.unwrap().unwrap().posted);

    let healthy = RecordingPoster::default();
    let second = run_cycle(&store, &client, &settings, Some(&healthy)).await.unwrap();
    assert_eq!(second.published, 1);
    assert!(healthy.sent()[0].starts_with("### [Broken](https://example.com/a)"));
    assert!(store.get("a").await.unwrap().unwrap().posted);
}

#[tokio::test]
async fn test_publishes_oldest_first_within_limit() {
    let body = rss(&[
        Item { guid: "new", title: "Newest", hours_ago: 1 },
        Item { guid: "old", title: "Oldest", hours_ago: 5 },
        Item { guid: "mid", title: "Middle", hours_ago: 3 },
    ]);
    let server = serve_feed(body).await;
    let store = test_store().await;
    let client = reqwest::Client::new();
    let poster = RecordingPoster::default();
    let settings = settings(&server, &["--limit", "2"]);

    let report = run_cycle(&store, &client, &settings, Some(&poster)).await.unwrap();
    assert_eq!(report.queued, 3);
    assert_eq!(report.published, 2);

    let titles: Vec<String> = poster
        .sent()
        .iter()
        .map(|m| m.lines().next().unwrap().to_string())
        .collect();
    assert_eq!(
        titles,
        vec![
            "### [Oldest](https://example.com/old)".to_string(),
            "### [Middle](https://example.com/mid)".to_string()
        ]
    );
    assert!(!store.get("new").await.unwrap().unwrap().posted);
}

#[tokio::test]
async fn test_items_past_retry_horizon_are_never_posted() {
    let body = rss(&[
        Item { guid: "stale", title: "Stale", hours_ago: 100 },
        Item { guid: "recent", title: "Recent", hours_ago: 1 },
    ]);
    let server = serve_feed(body).await;
    let store = test_store().await;
    let poster = RecordingPoster::default();
    let settings = settings(&server, &["--timeout", "72"]);

    let report = run_cycle(&store, &reqwest::Client::new(), &settings, Some(&poster))
        .await
        .unwrap();

    assert_eq!(report.queued, 2);
    assert_eq!(report.published, 1);
    let stale = store.get("stale").await.unwrap().unwrap();
    assert!(!stale.posted);
}

#[tokio::test]
async fn test_fetch_only_queues_without_posting() {
    let server = serve_feed(HELLO_RSS.to_string()).await;
    let store = test_store().await;
    let client = reqwest::Client::new();
    let settings = settings(&server, &["--body"]);

    let report = run_cycle::<RecordingPoster>(&store, &client, &settings, None)
        .await
        .unwrap();
    assert_eq!(report.queued, 1);
    assert_eq!(report.published, 0);
    assert!(!store.get("g1").await.unwrap().unwrap().posted);

    let poster = RecordingPoster::default();
    let report = run_cycle(&store, &client, &settings, Some(&poster)).await.unwrap();
    assert_eq!(report.queued, 0);
    assert_eq!(report.published, 1);
}

#[tokio::test]
async fn test_fetch_failure_persists_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let store = test_store().await;
    let poster = RecordingPoster::default();
    let settings = settings(&server, &[]);

    let result = run_cycle(&store, &reqwest::Client::new(), &settings, Some(&poster)).await;
    assert!(result.is_err());
    assert!(poster.sent().is_empty());

    let pending = store.select_pending("test-feed", 3600, None).await.unwrap();
    assert!(pending.is_empty());
}

#[tokio::test]
async fn test_tags_reach_the_post() {
    let body = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>T</title><link>https://example.com/</link><description>D</description>
  <item>
    <guid>t1</guid><title>Tagged</title><link>https://example.com/t1</link>
    <category>Tech News</category><category>Uncategorized</category><category>Spam</category>
  </item>
</channel></rss>"#;
    let server = serve_feed(body.to_string()).await;
    let store = test_store().await;
    let poster = RecordingPoster::default();
    let settings = settings(
        &server,
        &[
            "--category-tags",
            "--auto-tag",
            "Feed Bot",
            "--ignore-tag",
            "spam",
            "--no-branding",
        ],
    );

    run_cycle(&store, &reqwest::Client::new(), &settings, Some(&poster))
        .await
        .unwrap();

    assert_eq!(
        poster.sent(),
        vec!["### [Tagged](https://example.com/t1)\n\n#technews #feedbot\n".to_string()]
    );
}

#[tokio::test]
async fn test_real_pod_client_delivery() {
    let feed_server = serve_feed(HELLO_RSS.to_string()).await;
    let pod_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/posts"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&pod_server)
        .await;

    let store = test_store().await;
    let client = reqwest::Client::new();
    let pod_url = pod_server.uri();
    let settings = settings_with_pod(&feed_server, &pod_url, &["--summary"]);
    let credentials = match &settings.run_mode {
        pod_feeder::config::RunMode::Publish(credentials) => credentials,
        pod_feeder::config::RunMode::FetchOnly => panic!("expected publish mode"),
    };
    let pod = PodClient::new(client.clone(), credentials).unwrap();

    let report = run_cycle(&store, &client, &settings, Some(&pod)).await.unwrap();
    assert_eq!(report.published, 1);

    let requests = pod_server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["public"], true);
    assert_eq!(
        body["body"],
        "### [Hello](https://x/1)\n\nposted by pod-feeder"
    );
}
