//! End-to-end run against mocked archive endpoints.

use tempfile::TempDir;
use tokio::sync::watch;
use waymirror::config::Config;
use waymirror::mirror::MirrorRunner;
use waymirror::MirrorError;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(server: &MockServer, output_dir: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.mirror.domain = "example.com".to_string();
    config.mirror.output_dir = output_dir.to_string_lossy().into_owned();
    config.mirror.start_date = Some("20040101".to_string());
    config.mirror.end_date = Some("20040301".to_string());
    config.cache.enabled = false;
    config.network.cdx_url = format!("{}/cdx", server.uri());
    config.network.replay_url = format!("{}/web/", server.uri());
    config.network.threads = 2;
    config
}

#[tokio::test]
async fn full_run_produces_mirror_tree() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();
    let root = out.path().join("mirror");

    let cdx_body = serde_json::json!([
        ["timestamp", "original", "statuscode", "mimetype", "digest"],
        ["20040115000000", "http://example.com/", "200", "text/html", "AAA"],
        ["20040120000000", "http://example.com/page.html", "200", "text/html", "BBB"]
    ])
    .to_string();
    Mock::given(method("GET"))
        .and(path("/cdx"))
        .respond_with(ResponseTemplate::new(200).set_body_string(cdx_body))
        .expect(1)
        .mount(&server)
        .await;

    // Home page references the same image twice; only one download happens.
    let home = r#"<html><body>
        <img src="/logo.png">
        <img src="/logo.png">
        <a href="http://other.org/elsewhere">away</a>
        </body></html>"#;
    Mock::given(method("GET"))
        .and(path_regex(r"^/web/20040115000000id_/http://example\.com/$"))
        .respond_with(ResponseTemplate::new(200).set_body_string(home))
        .expect(1)
        .mount(&server)
        .await;

    let page = r#"<html><head>
        <link rel="stylesheet" href="/site.css">
        </head><body>hello</body></html>"#;
    Mock::given(method("GET"))
        .and(path_regex(
            r"^/web/20040120000000id_/http://example\.com/page\.html$",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_string(page))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path_regex(
            r"^/web/20040115000000id_/http://example\.com/logo\.png$",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0x89, 0x50, 0x4e, 0x47]))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path_regex(
            r"^/web/20040120000000id_/http://example\.com/site\.css$",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_string("body { color: red }"))
        .expect(1)
        .mount(&server)
        .await;

    let (_tx, rx) = watch::channel(false);
    let outcome = MirrorRunner::new(test_config(&server, &root), rx)
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.pages_saved, 2);
    assert_eq!(outcome.pages_total, 2);
    assert_eq!(outcome.resources_saved, 2);
    assert_eq!(outcome.resources_total, 2);
    assert_eq!(outcome.index.urls, 2);
    assert_eq!(outcome.index.pages, 2);

    // Output tree
    assert!(root.join("index.html").is_file());
    assert!(root.join("html/20040115000000_index.html").is_file());
    assert!(root.join("html/20040120000000_page.html").is_file());
    assert!(root.join("metadata/20040115000000_index.html.json").is_file());
    assert!(root
        .join("resources/images/20040115000000_logo.png")
        .is_file());
    assert!(root
        .join("resources/css/20040120000000_site.css")
        .is_file());

    // Both occurrences rewritten, foreign link untouched
    let home_out = std::fs::read_to_string(root.join("html/20040115000000_index.html")).unwrap();
    assert_eq!(
        home_out
            .matches("../resources/images/20040115000000_logo.png")
            .count(),
        2
    );
    assert!(home_out.contains("http://other.org/elsewhere"));

    let index = std::fs::read_to_string(root.join("index.html")).unwrap();
    assert!(index.contains("Mirror of example.com"));
    assert!(index.contains("html/20040115000000_index.html"));

    server.verify().await;
}

#[tokio::test]
async fn empty_catalog_is_a_fatal_error() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/cdx"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .mount(&server)
        .await;

    let (_tx, rx) = watch::channel(false);
    let err = MirrorRunner::new(test_config(&server, &out.path().join("mirror")), rx)
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, MirrorError::NoCaptures(domain) if domain == "example.com"));
}

#[tokio::test]
async fn shutdown_signal_skips_remaining_work() {
    let server = MockServer::start().await;
    let out = TempDir::new().unwrap();

    let cdx_body = serde_json::json!([
        ["timestamp", "original", "statuscode", "mimetype", "digest"],
        ["20040115000000", "http://example.com/", "200", "text/html", "AAA"]
    ])
    .to_string();
    Mock::given(method("GET"))
        .and(path("/cdx"))
        .respond_with(ResponseTemplate::new(200).set_body_string(cdx_body))
        .mount(&server)
        .await;

    // Signal already raised: pages are dispatched but none gets fetched.
    let (tx, rx) = watch::channel(false);
    tx.send(true).unwrap();

    let outcome = MirrorRunner::new(test_config(&server, &out.path().join("mirror")), rx)
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.pages_saved, 0);
    assert_eq!(outcome.pages_total, 1);
    assert_eq!(outcome.resources_total, 0);
}
