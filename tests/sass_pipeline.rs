// tests/sass_pipeline.rs

mod common;
use crate::common::builders::ConfigFileBuilder;
use crate::common::fixtures::{STYLE_SCSS, VARIABLES_SCSS};
use crate::common::{init_tracing, mock_context, site_root};

use std::error::Error;
use std::path::Path;

use assetdag::fs::mock::MockFileSystem;
use assetdag::fs::FileSystem;
use assetdag::server::ReloadEvent;
use assetdag::tasks::sass::{compile_scss, process_css, COMPILED_NAME};
use assetdag::tasks::{SassTask, Task};

type TestResult = Result<(), Box<dyn Error>>;

fn browsers() -> Vec<String> {
    vec!["last 2 versions".to_string()]
}

fn position(haystack: &str, needle: &str) -> usize {
    haystack
        .find(needle)
        .unwrap_or_else(|| panic!("{needle} not found in:\n{haystack}"))
}

fn style_fs() -> MockFileSystem {
    let fs = MockFileSystem::new();
    fs.add_file("/site/src/sass/style.scss", STYLE_SCSS);
    fs.add_file("/site/src/sass/_variables.scss", VARIABLES_SCSS);
    fs
}

#[test]
fn compile_resolves_partials_through_the_filesystem() -> TestResult {
    let fs = style_fs();
    let css = compile_scss(&fs, STYLE_SCSS, Path::new("/site/src/sass"))?;
    assert!(css.contains("#333333"));
    assert!(!css.contains("$main"));
    Ok(())
}

#[test]
fn media_queries_are_merged_and_sorted_mobile_first() -> TestResult {
    let css = "\
@media (min-width: 768px) { .wide { color: red; } }
.narrow { color: blue; }
@media print { .paper { color: black; } }
@media (min-width: 480px) { .medium { color: green; } }
@media (min-width: 768px) { .wider { color: black; } }
";
    let out = process_css(css, "style.css", &browsers(), true)?;

    assert_eq!(out.css.matches("@media").count(), 3);
    assert!(position(&out.css, ".narrow") < position(&out.css, ".paper"));
    assert!(position(&out.css, ".paper") < position(&out.css, ".medium"));
    assert!(position(&out.css, ".medium") < position(&out.css, ".wide"));
    assert!(position(&out.css, ".wide") < position(&out.css, ".wider"));
    Ok(())
}

#[test]
fn unsorted_packing_keeps_first_appearance_order() -> TestResult {
    let css = "\
@media (min-width: 768px) { .wide { color: red; } }
.narrow { color: blue; }
@media (min-width: 480px) { .medium { color: green; } }
@media (min-width: 768px) { .wider { color: black; } }
";
    let out = process_css(css, "style.css", &browsers(), false)?;

    assert_eq!(out.css.matches("@media").count(), 2);
    assert!(position(&out.css, ".narrow") < position(&out.css, ".wide"));
    assert!(position(&out.css, ".wider") < position(&out.css, ".medium"));
    Ok(())
}

#[test]
fn processed_css_carries_map_reference_and_minified_copy() -> TestResult {
    let out = process_css(
        "a { user-select: none; }\n.b { color: #ff0000; }\n",
        "style.css",
        &browsers(),
        true,
    )?;

    assert!(out.css.ends_with("\n/*# sourceMappingURL=style.css.map */\n"));
    assert!(out.css.contains("-webkit-user-select"));
    assert!(!out.minified.contains("sourceMappingURL"));
    assert!(out.minified.len() < out.css.len());

    let map: serde_json::Value = serde_json::from_str(&out.map)?;
    assert_eq!(map["version"], 3);
    assert!(map["sources"].to_string().contains("style.css"));
    Ok(())
}

#[test]
fn unknown_browser_query_is_an_infrastructure_error() {
    let err = process_css("a{color:red}", "style.css", &["no such browser 9000".to_string()], true)
        .unwrap_err();
    assert!(!err.is_content());
    assert_eq!(err.stage(), "autoprefixer");
}

#[test]
fn sass_task_writes_all_outputs_and_streams_css() -> TestResult {
    init_tracing();

    let fs = style_fs();
    let cfg = ConfigFileBuilder::new().rooted_at(site_root()).build();
    let (ctx, _) = mock_context(&fs);
    let mut events = ctx.live.subscribe();

    SassTask::new(&cfg).run(&ctx)?;

    let css = fs.read_to_string(Path::new("/site/build/css/style.css"))?;
    let min = fs.read_to_string(Path::new("/site/build/css/style.min.css"))?;
    assert!(fs.exists(Path::new("/site/build/css/style.css.map")));
    assert!(css.contains("sourceMappingURL=style.css.map"));
    assert!(min.len() < css.len());

    // Packed: one block per distinct query, 480px before 768px.
    assert_eq!(css.matches("@media").count(), 2);
    assert!(position(&css, ".narrow") < position(&css, ".medium"));
    assert!(position(&css, ".medium") < position(&css, ".wide"));

    assert_eq!(
        events.try_recv()?,
        ReloadEvent::Stream {
            path: "css/style.css".to_string()
        }
    );
    Ok(())
}

#[test]
fn sass_syntax_error_writes_nothing() {
    let fs = MockFileSystem::new();
    fs.add_file("/site/src/sass/style.scss", "body { color: ; \n");
    let cfg = ConfigFileBuilder::new().rooted_at(site_root()).build();
    let (ctx, _) = mock_context(&fs);

    let err = SassTask::new(&cfg).run(&ctx).unwrap_err();
    assert!(err.is_content());
    assert_eq!(err.stage(), "sass");
    assert!(!fs.exists(Path::new("/site/build/css")));
}

#[test]
fn missing_partial_is_a_content_error() {
    let fs = MockFileSystem::new();
    fs.add_file("/site/src/sass/style.scss", "@import \"nowhere\";\n");
    let cfg = ConfigFileBuilder::new().rooted_at(site_root()).build();
    let (ctx, _) = mock_context(&fs);

    let err = SassTask::new(&cfg).run(&ctx).unwrap_err();
    assert!(err.is_content());
}

#[test]
fn source_map_declares_the_compiled_stylesheet() -> TestResult {
    let fs = style_fs();
    let cfg = ConfigFileBuilder::new().rooted_at(site_root()).build();
    let (ctx, _) = mock_context(&fs);

    SassTask::new(&cfg).run(&ctx)?;

    let map = fs.read_to_string(Path::new("/site/build/css/style.css.map"))?;
    let map: serde_json::Value = serde_json::from_str(&map)?;
    assert_eq!(map["sources"], serde_json::json!([COMPILED_NAME]));

    // The declared content is the compiler output: variables resolved,
    // partials inlined, no `.scss` sources listed.
    let content = map["sourcesContent"][0].as_str().unwrap();
    assert_eq!(content, compile_scss(&fs, STYLE_SCSS, Path::new("/site/src/sass"))?);
    assert!(!content.contains("$main"));
    assert!(!map["sources"].to_string().contains(".scss"));
    Ok(())
}
