//! End-to-end worker pool tests against a mock HTTP server.
//!
//! The GSS side uses the in-memory static provider so the negotiated
//! `Authorization` values are deterministic and assertable per request.

use std::sync::Arc;
use std::time::Duration;

use spnego_fetch::{AuthError, Config, Error, SpnegoFetcher, StaticGssProvider};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// base64("tok")
const NEGOTIATE_TOK: &str = "Negotiate dG9r";

struct TestEnv {
    _auth_dir: tempfile::TempDir,
    output_dir: tempfile::TempDir,
    config: Config,
}

fn test_env(server: &MockServer) -> TestEnv {
    let auth_dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(auth_dir.path().join("krb5.ini"), "[libdefaults]\n").expect("krb5.ini");
    std::fs::write(auth_dir.path().join("login.conf"), "anotherentry {};\n").expect("login.conf");

    let output_dir = tempfile::tempdir().expect("tempdir");

    let addr = server.address();
    let mut config = Config::for_host(addr.ip().to_string());
    config.target.port = addr.port();
    config.fetch.workers = 2;
    config.fetch.poll_timeout = Duration::from_millis(50);
    config.fetch.output_dir = output_dir.path().to_path_buf();
    config.login.realm_config = auth_dir.path().join("krb5.ini");
    config.login.login_config = auth_dir.path().join("login.conf");
    config.retry.initial_delay = Duration::from_millis(10);
    config.retry.max_delay = Duration::from_millis(50);
    config.retry.jitter = false;

    TestEnv {
        _auth_dir: auth_dir,
        output_dir,
        config,
    }
}

#[tokio::test]
async fn two_items_one_blank_yield_exactly_two_authorized_gets() {
    let server = MockServer::start().await;
    let env = test_env(&server);

    Mock::given(method("GET"))
        .and(path("/a.txt"))
        .and(header("Authorization", NEGOTIATE_TOK))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"alpha".to_vec()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b.txt"))
        .and(header("Authorization", NEGOTIATE_TOK))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"bravo".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let provider = Arc::new(StaticGssProvider::new(b"tok".to_vec()));
    let fetcher = SpnegoFetcher::new(env.config.clone(), provider)
        .await
        .expect("startup");

    let report = fetcher
        .run(vec!["a.txt".into(), "".into(), "b.txt".into()])
        .await
        .expect("run");

    assert_eq!(report.fetched, 2);
    assert_eq!(report.skipped_blank, 1);
    assert_eq!(report.workers, 2);

    // The blank entry never generated a third request
    let requests = server.received_requests().await.expect("requests");
    assert_eq!(requests.len(), 2);

    let alpha = std::fs::read(env.output_dir.path().join("a.txt")).expect("a.txt");
    assert_eq!(alpha, b"alpha");
    let bravo = std::fs::read(env.output_dir.path().join("b.txt")).expect("b.txt");
    assert_eq!(bravo, b"bravo");
}

#[tokio::test]
async fn per_item_failure_surfaces_after_siblings_complete() {
    let server = MockServer::start().await;
    let env = test_env(&server);

    // a.txt is missing on the server; b.txt fetches fine
    Mock::given(method("GET"))
        .and(path("/a.txt"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"bravo".to_vec()))
        .mount(&server)
        .await;

    let provider = Arc::new(StaticGssProvider::new(b"tok".to_vec()));
    let fetcher = SpnegoFetcher::new(env.config.clone(), provider)
        .await
        .expect("startup");

    let err = fetcher
        .run(vec!["a.txt".into(), "b.txt".into()])
        .await
        .expect_err("run should surface the 404");

    match err {
        Error::Fetch { resource, status } => {
            assert_eq!(resource, "a.txt");
            assert_eq!(status, 404);
        }
        other => panic!("expected Fetch error, got: {other:?}"),
    }

    // The sibling worker still ran to completion and persisted its item
    let bravo = std::fs::read(env.output_dir.path().join("b.txt")).expect("b.txt");
    assert_eq!(bravo, b"bravo");
}

#[tokio::test]
async fn mechanism_fallback_still_authorizes_requests() {
    let server = MockServer::start().await;
    let env = test_env(&server);

    Mock::given(method("GET"))
        .and(path("/a.txt"))
        .and(header("Authorization", NEGOTIATE_TOK))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"alpha".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let provider = Arc::new(StaticGssProvider::new(b"tok".to_vec()).with_spnego_rejected());
    let counters = provider.counters();
    let fetcher = SpnegoFetcher::new(env.config.clone(), provider)
        .await
        .expect("startup");

    let report = fetcher.run(vec!["a.txt".into()]).await.expect("run");
    assert_eq!(report.fetched, 1);

    // Every context the fallback created was disposed by the time we joined
    assert_eq!(counters.created(), counters.disposed());
}

#[tokio::test]
async fn transient_server_error_is_retried() {
    let server = MockServer::start().await;
    let env = test_env(&server);

    // First attempt hits a 503, the retry succeeds
    Mock::given(method("GET"))
        .and(path("/a.txt"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/a.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"alpha".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let provider = Arc::new(StaticGssProvider::new(b"tok".to_vec()));
    let fetcher = SpnegoFetcher::new(env.config.clone(), provider)
        .await
        .expect("startup");

    let report = fetcher.run(vec!["a.txt".into()]).await.expect("run");
    assert_eq!(report.fetched, 1);

    let alpha = std::fs::read(env.output_dir.path().join("a.txt")).expect("a.txt");
    assert_eq!(alpha, b"alpha");
}

#[tokio::test]
async fn login_failure_aborts_before_any_worker_starts() {
    let server = MockServer::start().await;
    let env = test_env(&server);

    let provider =
        Arc::new(StaticGssProvider::new(b"tok".to_vec()).with_login_failure("KDC unreachable"));

    let err = SpnegoFetcher::new(env.config.clone(), provider)
        .await
        .expect_err("startup must fail");
    assert!(matches!(
        err,
        Error::Auth(AuthError::LoginFailed { .. })
    ));

    // Startup failed before any fetch could happen
    let requests = server.received_requests().await.expect("requests");
    assert!(requests.is_empty());
}

#[tokio::test]
async fn run_from_file_reads_the_configured_list() {
    let server = MockServer::start().await;
    let mut env = test_env(&server);

    let list_dir = tempfile::tempdir().expect("tempdir");
    let list_path = list_dir.path().join("filenames.txt");
    std::fs::write(&list_path, "a.txt\n\nb.txt\n").expect("list");
    env.config.fetch.file_list = list_path;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"data".to_vec()))
        .mount(&server)
        .await;

    let provider = Arc::new(StaticGssProvider::new(b"tok".to_vec()));
    let fetcher = SpnegoFetcher::new(env.config.clone(), provider)
        .await
        .expect("startup");

    let report = fetcher.run_from_file().await.expect("run");
    assert_eq!(report.fetched, 2);
    assert_eq!(report.skipped_blank, 1);
}

#[tokio::test]
async fn many_items_are_each_fetched_exactly_once() {
    let server = MockServer::start().await;
    let mut env = test_env(&server);
    env.config.fetch.workers = 5;

    Mock::given(method("GET"))
        .and(header("Authorization", NEGOTIATE_TOK))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"data".to_vec()))
        .mount(&server)
        .await;

    let names: Vec<String> = (0..40).map(|i| format!("file-{i}.bin")).collect();

    let provider = Arc::new(StaticGssProvider::new(b"tok".to_vec()));
    let fetcher = SpnegoFetcher::new(env.config.clone(), provider)
        .await
        .expect("startup");

    let report = fetcher.run(names.clone()).await.expect("run");
    assert_eq!(report.fetched, 40);

    let requests = server.received_requests().await.expect("requests");
    assert_eq!(requests.len(), 40, "exactly one GET per item");

    let mut paths: Vec<String> = requests
        .iter()
        .map(|r| r.url.path().trim_start_matches('/').to_string())
        .collect();
    paths.sort();
    let mut expected = names;
    expected.sort();
    assert_eq!(paths, expected);

    for name in &expected {
        assert!(
            env.output_dir.path().join(name).exists(),
            "{name} should be persisted"
        );
    }
}
