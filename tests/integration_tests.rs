use assert_cmd::Command;
use predicates::prelude::*;
use wiremock::{
    matchers::{method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

static INDEX_URL_ENV_VAR: &str = "WAYBACK_URLS_INDEX_URL";
static CDX_PATH: &str = "/cdx/search/cdx";
static CDX_HEADER: &str =
    r#"["urlkey","timestamp","original","mimetype","statuscode","digest","length"]"#;

lazy_static::lazy_static! {
    static ref BIN_UNDER_TEST: escargot::CargoRun = escargot::CargoBuild::new()
        .bin("wayback_urls")
        .current_release()
        .run()
        .expect("failed to create `cargo run` command");
}

fn bin() -> Command {
    Command::from_std(BIN_UNDER_TEST.command())
}

fn cdx_body(rows: &[(&str, &str)]) -> String {
    let mut body = format!("[{}", CDX_HEADER);
    for (timestamp, original) in rows {
        body.push_str(&format!(
            r#",["key","{}","{}","text/html","200","DIGEST","100"]"#,
            timestamp, original
        ));
    }
    body.push(']');
    body
}

fn index_url(server: &MockServer) -> String {
    format!("{}{}", server.uri(), CDX_PATH)
}

async fn mount_domain(server: &MockServer, url_pattern: &str, rows: &[(&str, &str)]) {
    Mock::given(method("GET"))
        .and(path(CDX_PATH))
        .and(query_param("url", url_pattern))
        .respond_with(ResponseTemplate::new(200).set_body_string(cdx_body(rows)))
        .mount(server)
        .await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_single_domain_prints_unique_urls() {
    let server = MockServer::start().await;
    mount_domain(
        &server,
        "*.example.com/*",
        &[
            ("20200101000000", "http://example.com/"),
            ("20200102000000", "http://www.example.com/login"),
            ("20200103000000", "http://example.com/"),
        ],
    )
    .await;

    bin()
        .arg("example.com")
        .env(INDEX_URL_ENV_VAR, index_url(&server))
        .assert()
        .success()
        .stdout("http://example.com/\nhttp://www.example.com/login\n");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_domains_from_stdin_are_processed_in_order() {
    let server = MockServer::start().await;
    mount_domain(
        &server,
        "*.a.example/*",
        &[("20200101000000", "http://a.example/shared")],
    )
    .await;
    mount_domain(
        &server,
        "*.b.example/*",
        &[
            ("20200101000000", "http://a.example/shared"),
            ("20200101000000", "http://b.example/only"),
        ],
    )
    .await;

    bin()
        .env(INDEX_URL_ENV_VAR, index_url(&server))
        .write_stdin("a.example\n\nb.example\n")
        .assert()
        .success()
        .stdout("http://a.example/shared\nhttp://a.example/shared\nhttp://b.example/only\n");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_no_subs_queries_bare_domain_and_filters_subdomains() {
    let server = MockServer::start().await;
    mount_domain(
        &server,
        "example.com/*",
        &[
            ("20200101000000", "http://example.com/a"),
            ("20200101000000", "http://sub.example.com/b"),
        ],
    )
    .await;

    bin()
        .args(&["--no-subs", "example.com"])
        .env(INDEX_URL_ENV_VAR, index_url(&server))
        .assert()
        .success()
        .stdout("http://example.com/a\n");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_dates_flag_prefixes_snapshot_time() {
    let server = MockServer::start().await;
    mount_domain(
        &server,
        "*.example.com/*",
        &[("20200102030405", "http://example.com/")],
    )
    .await;

    bin()
        .args(&["--dates", "example.com"])
        .env(INDEX_URL_ENV_VAR, index_url(&server))
        .assert()
        .success()
        .stdout("2020-01-02T03:04:05Z http://example.com/\n");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_max_days_fetches_everything_without_panicking() {
    let server = MockServer::start().await;
    mount_domain(
        &server,
        "*.example.com/*",
        &[("20200101000000", "http://example.com/")],
    )
    .await;

    bin()
        .args(&["--days", "4294967295", "example.com"])
        .env(INDEX_URL_ENV_VAR, index_url(&server))
        .assert()
        .success()
        .stdout("http://example.com/\n");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_get_versions_prints_snapshot_urls() {
    let server = MockServer::start().await;
    mount_domain(
        &server,
        "http://example.com/",
        &[("20210101000000", "http://example.com/")],
    )
    .await;

    bin()
        .arg("--get-versions")
        .env(INDEX_URL_ENV_VAR, index_url(&server))
        .write_stdin("http://example.com/\n")
        .assert()
        .success()
        .stdout("http://web.archive.org/web/20210101000000/http://example.com/\n");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_failed_index_request_prints_nothing_and_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    bin()
        .arg("example.com")
        .env(INDEX_URL_ENV_VAR, index_url(&server))
        .env_remove("RUST_LOG")
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("unbounded query for example.com failed"));
}

#[test]
fn test_completions_flag_prints_script() {
    bin()
        .args(&["--completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("wayback_urls"));
}

#[test]
#[cfg_attr(not(feature = "large_tests"), ignore)]
fn test_live_index_returns_urls_for_example_com() {
    bin()
        .args(&["--no-subs", "example.com"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}
