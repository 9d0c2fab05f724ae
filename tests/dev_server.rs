// tests/dev_server.rs

mod common;
use crate::common::builders::ConfigFileBuilder;
use crate::common::fixtures::write_file;
use crate::common::{init_tracing, with_timeout};

use std::error::Error;

use axum_test::TestServer;
use tempfile::tempdir;

use assetdag::dag::RunSummary;
use assetdag::errors::AssetdagError;
use assetdag::server::{
    inject_client, router, DevServer, LiveReload, ServerState, CLIENT_PATH,
};

type TestResult = Result<(), Box<dyn Error>>;

const TAG: &str = "<script src=\"/__livereload.js\"></script>";

fn build_summary(targets: &[&str], failed: &[&str]) -> RunSummary {
    RunSummary {
        run_id: 1,
        targets: targets.iter().map(|t| t.to_string()).collect(),
        succeeded: vec!["clean".to_string()],
        recovered: Vec::new(),
        failed: failed.iter().map(|t| t.to_string()).collect(),
    }
}

#[test]
fn client_goes_before_the_last_closing_body() {
    let html = "<body><pre>&lt;/body&gt;</pre><p>x</p></BODY>\n";
    assert_eq!(
        inject_client(html),
        format!("<body><pre>&lt;/body&gt;</pre><p>x</p>{TAG}</BODY>\n")
    );
    assert_eq!(inject_client("<p>fragment</p>"), format!("<p>fragment</p>{TAG}"));
}

#[tokio::test]
async fn pages_get_the_client_and_assets_are_served_plain() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    write_file(dir.path(), "index.html", "<html><body><p>home</p></body></html>")?;
    write_file(dir.path(), "about/index.html", "<body>about</body>")?;
    write_file(dir.path(), "css/style.css", "body{color:red}")?;

    let server = TestServer::new(router(dir.path().to_path_buf(), LiveReload::new()))?;

    let home = server.get("/").await;
    home.assert_status_ok();
    assert!(home.text().contains(&format!("<p>home</p>{TAG}</body>")));

    let page = server.get("/index.html").await;
    assert!(page.text().contains(TAG));

    let nested = server.get("/about/").await;
    assert!(nested.text().contains(&format!("about{TAG}")));

    let css = server.get("/css/style.css").await;
    css.assert_status_ok();
    assert_eq!(css.text(), "body{color:red}");

    let client = server.get(CLIENT_PATH).await;
    client.assert_status_ok();
    assert!(client.text().contains("EventSource"));

    Ok(())
}

#[tokio::test]
async fn missing_files_are_not_found() -> TestResult {
    let dir = tempdir()?;
    write_file(dir.path(), "index.html", "<body></body>")?;

    let server = TestServer::new(router(dir.path().to_path_buf(), LiveReload::new()))?;

    server
        .get("/missing.html")
        .expect_failure()
        .await
        .assert_status_not_found();
    server
        .get("/img/missing.png")
        .expect_failure()
        .await
        .assert_status_not_found();
    Ok(())
}

#[tokio::test]
async fn start_requires_a_completed_build() -> TestResult {
    let cfg = ConfigFileBuilder::new().with_port(0).build_unchecked();
    let mut server = DevServer::new(&cfg, LiveReload::new());

    let not_build = server.start(&build_summary(&["js"], &[])).await;
    assert!(matches!(not_build, Err(AssetdagError::BuildIncomplete(_))));

    let failed = server.start(&build_summary(&["build"], &["sass", "html"])).await;
    assert!(matches!(failed, Err(AssetdagError::BuildIncomplete(_))));

    assert_eq!(server.state(), ServerState::Idle);
    Ok(())
}

#[tokio::test]
async fn start_and_stop_cycle() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    let cfg = ConfigFileBuilder::new()
        .rooted_at(dir.path())
        .with_port(0)
        .build_unchecked();
    let mut server = DevServer::new(&cfg, LiveReload::new());

    let summary = build_summary(&["build"], &[]);
    let addr = with_timeout(server.start(&summary)).await?;
    assert_eq!(server.state(), ServerState::Serving { addr });

    // Starting again is a no-op.
    assert_eq!(with_timeout(server.start(&summary)).await?, addr);

    with_timeout(server.stop()).await;
    assert_eq!(server.state(), ServerState::Idle);
    Ok(())
}
