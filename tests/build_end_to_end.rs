// tests/build_end_to_end.rs

mod common;
use crate::common::builders::ConfigFileBuilder;
use crate::common::fixtures::{write_file, write_reference_site};
use crate::common::{init_tracing, with_timeout};

use std::collections::BTreeMap;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::tempdir;

use assetdag::config::ConfigFile;
use assetdag::dag::RunSummary;
use assetdag::fs::RealFileSystem;
use assetdag::notifier::{NoticeKind, RecordingNotifier};
use assetdag::registry::TaskRegistry;
use assetdag::run_once;
use assetdag::server::LiveReload;
use assetdag::tasks::TaskContext;

type TestResult = Result<(), Box<dyn Error>>;

async fn build(cfg: &ConfigFile, target: &str) -> Result<(Vec<RunSummary>, Arc<RecordingNotifier>), Box<dyn Error>> {
    let registry = TaskRegistry::standard(cfg)?;
    registry.validate()?;

    let notifier = Arc::new(RecordingNotifier::new());
    let ctx = TaskContext::new(Arc::new(RealFileSystem), LiveReload::new(), notifier.clone());

    let summaries = with_timeout(run_once(cfg, Arc::new(registry), ctx, target)).await?;
    Ok((summaries, notifier))
}

/// Every file under `root`, keyed by its root-relative path.
fn snapshot(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    let mut files = BTreeMap::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                stack.push(path);
            } else {
                let rel = path.strip_prefix(root).unwrap().to_path_buf();
                files.insert(rel, fs::read(&path).unwrap());
            }
        }
    }
    files
}

#[tokio::test(flavor = "multi_thread")]
async fn build_produces_the_complete_tree() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    write_reference_site(dir.path())?;
    write_file(dir.path(), "build/stale.txt", "left over")?;
    let cfg = ConfigFileBuilder::new().rooted_at(dir.path()).build();

    let (summaries, notifier) = build(&cfg, "build").await?;
    assert_eq!(summaries.len(), 1);
    assert!(summaries[0].is_clean(), "{:?}", summaries[0]);
    assert!(notifier.notices().is_empty());

    let out = dir.path().join("build");
    for rel in [
        "readme.md",
        "index.html",
        "css/style.css",
        "css/style.css.map",
        "css/style.min.css",
        "js/script.js",
        "js/script-min.js",
        "img/logo.png",
        "img/icon.svg",
        "fonts/open.woff",
        "fonts/open/open.woff2",
    ] {
        assert!(out.join(rel).is_file(), "missing build/{rel}");
    }
    assert!(!out.join("stale.txt").exists());
    assert!(!out.join("img/nested").exists());
    assert!(!out.join("html").exists());

    assert_eq!(fs::read_to_string(out.join("readme.md"))?, "# build output\n");

    let page = fs::read_to_string(out.join("index.html"))?;
    assert!(page.contains("<h1>Home</h1>"));
    assert!(!page.contains("<!--DEV"));
    assert!(!page.contains("@@"));

    let css = fs::read_to_string(out.join("css/style.css"))?;
    assert!(css.ends_with("/*# sourceMappingURL=style.css.map */\n"));

    let js = fs::read_to_string(out.join("js/script.js"))?;
    assert!(js.contains("function greet"));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn rebuilding_is_byte_identical() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    write_reference_site(dir.path())?;
    let cfg = ConfigFileBuilder::new().rooted_at(dir.path()).build();

    build(&cfg, "build").await?;
    let first = snapshot(&dir.path().join("build"));

    build(&cfg, "build").await?;
    let second = snapshot(&dir.path().join("build"));

    assert_eq!(first.keys().collect::<Vec<_>>(), second.keys().collect::<Vec<_>>());
    assert!(first == second, "rebuild changed output");
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn content_error_is_reported_and_the_build_completes() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    write_reference_site(dir.path())?;
    write_file(dir.path(), "src/sass/style.scss", "body { color: ; \n")?;
    let cfg = ConfigFileBuilder::new().rooted_at(dir.path()).build();

    let (summaries, notifier) = build(&cfg, "build").await?;
    let summary = &summaries[0];
    assert!(summary.completed());
    assert_eq!(summary.recovered, vec!["sass"]);
    assert!(summary.succeeded.contains(&"html".to_string()));

    let notices = notifier.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].kind, NoticeKind::Content);
    assert_eq!(notices[0].title, "Error in sass");

    let out = dir.path().join("build");
    assert!(out.join("index.html").is_file());
    assert!(!out.join("css/style.css").exists());
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn single_task_runs_without_clean() -> TestResult {
    let dir = tempdir()?;
    write_reference_site(dir.path())?;
    write_file(dir.path(), "build/stale.txt", "left over")?;
    let cfg = ConfigFileBuilder::new().rooted_at(dir.path()).build();

    let (summaries, _) = build(&cfg, "copy").await?;
    assert_eq!(summaries[0].succeeded, vec!["copy"]);

    let out = dir.path().join("build");
    assert!(out.join("fonts/open.woff").is_file());
    assert!(out.join("stale.txt").is_file());
    Ok(())
}
