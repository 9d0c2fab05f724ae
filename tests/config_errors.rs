// tests/config_errors.rs

mod common;
use crate::common::init_tracing;

use std::error::Error;
use std::fs;

use tempfile::tempdir;

use assetdag::config::{load_and_validate, load_or_default};
use assetdag::errors::AssetdagError;
use assetdag::registry::TaskRegistry;
use assetdag::types::TriggerWhileRunningBehaviour;

type TestResult = Result<(), Box<dyn Error>>;

fn load_str(toml: &str) -> Result<assetdag::config::ConfigFile, AssetdagError> {
    let dir = tempdir()?;
    let path = dir.path().join("Assetdag.toml");
    fs::write(&path, toml)?;
    load_and_validate(&path)
}

fn config_error_containing(toml: &str, needle: &str) {
    match load_str(toml) {
        Err(AssetdagError::ConfigError(msg)) => {
            assert!(msg.contains(needle), "message {msg:?} lacks {needle:?}")
        }
        other => panic!("expected ConfigError containing {needle:?}, got {other:?}"),
    }
}

#[test]
fn empty_file_gives_the_classic_layout() -> TestResult {
    init_tracing();

    let dir = tempdir()?;
    let path = dir.path().join("Assetdag.toml");
    fs::write(&path, "")?;
    let cfg = load_and_validate(&path)?;

    assert_eq!(cfg.source_root(), dir.path().join("src"));
    assert_eq!(cfg.build_root(), dir.path().join("build"));
    assert_eq!(cfg.paths.preserve, vec!["readme.md"]);
    assert_eq!(cfg.server.port, 3010);
    assert_eq!(cfg.watch.queue_length, 1);
    assert_eq!(
        cfg.watch.triggered_while_running_behaviour,
        TriggerWhileRunningBehaviour::Queue
    );
    assert_eq!(cfg.watch_bindings().len(), 4);
    Ok(())
}

#[test]
fn full_file_overrides_defaults() -> TestResult {
    let cfg = load_str(
        r#"
[paths]
source = "assets"
build = "public"
preserve = ["CNAME"]

[server]
port = 8080

[watch]
triggered_while_running_behaviour = "cancel"
queue_length = 3
use_hash = false

[[watch.binding]]
task = "sass"
patterns = ["styles/**/*.scss"]
reload = false
"#,
    )?;

    assert!(cfg.source_root().ends_with("assets"));
    assert!(cfg.build_root().ends_with("public"));
    assert_eq!(cfg.server.port, 8080);
    assert_eq!(
        cfg.watch.triggered_while_running_behaviour,
        TriggerWhileRunningBehaviour::Cancel
    );
    assert!(!cfg.watch.use_hash);

    let bindings = cfg.watch_bindings();
    assert_eq!(bindings.len(), 1);
    assert_eq!(bindings[0].target_name(), "watch:sass");
    assert!(!bindings[0].reload);
    Ok(())
}

#[test]
fn invalid_values_are_config_errors() {
    config_error_containing("[server]\nport = 0\n", "port");
    config_error_containing("[watch]\nqueue_length = 0\n", "queue_length");
    config_error_containing("[paths]\nsource = \"site\"\nbuild = \"site/\"\n", "must differ");
    config_error_containing("[paths]\npreserve = [\"../etc\"]\n", "preserve");
    config_error_containing("[img]\npng_level = 9\n", "png_level");
    config_error_containing("[img]\npng_quality = [80, 60]\n", "png_quality");
    config_error_containing("[img]\npng_quality = [0, 101]\n", "png_quality");
    config_error_containing("[js]\noutput = \"a.js\"\nminified = \"a.js\"\n", "[js]");
    config_error_containing(
        "[[watch.binding]]\ntask = \"js\"\npatterns = []\n",
        "at least one pattern",
    );
    config_error_containing(
        "[[watch.binding]]\ntask = \"js\"\npatterns = [\"js/[\"]\n",
        "watch binding for 'js'",
    );
    config_error_containing(
        "[[watch.binding]]\ntask = \"js\"\npatterns = [\"a\"]\n\n[[watch.binding]]\ntask = \"js\"\npatterns = [\"b\"]\n",
        "bound more than once",
    );
}

#[test]
fn overlapping_source_and_build_roots_are_rejected() {
    init_tracing();

    config_error_containing("[paths]\nbuild = \".\"\n", "contains the source tree");
    config_error_containing("[paths]\nbuild = \"./\"\n", "contains the source tree");
    config_error_containing(
        "[paths]\nsource = \"./src\"\nbuild = \"src\"\n",
        "must differ",
    );
    config_error_containing(
        "[paths]\nsource = \"src\"\nbuild = \"src/../src/\"\n",
        "must differ",
    );
    config_error_containing("[paths]\nbuild = \"src/build\"\n", "inside the source tree");
    config_error_containing(
        "[paths]\nsource = \"site/src\"\nbuild = \"site\"\n",
        "contains the source tree",
    );
    // Climbing out of the config directory is only visible once anchored.
    config_error_containing("[paths]\nbuild = \"..\"\n", "contains the source tree");
}

#[test]
fn sibling_roots_are_accepted() -> TestResult {
    let cfg = load_str("[paths]\nsource = \"./assets/\"\nbuild = \"../public\"\n")?;
    assert!(cfg.build_root().ends_with("../public"));

    let cfg = load_str("[paths]\nsource = \"src\"\nbuild = \"srcbuild\"\n")?;
    assert!(cfg.build_root().ends_with("srcbuild"));
    Ok(())
}

#[test]
fn clean_cannot_be_pointed_at_the_project_root() -> TestResult {
    let dir = tempdir()?;
    fs::create_dir_all(dir.path().join("src/sass"))?;
    fs::write(dir.path().join("src/sass/style.scss"), "a { color: red; }")?;
    let path = dir.path().join("Assetdag.toml");
    fs::write(&path, "[paths]\nbuild = \".\"\n")?;

    assert!(matches!(
        load_or_default(Some(&path)),
        Err(AssetdagError::ConfigError(_))
    ));
    assert!(dir.path().join("src/sass/style.scss").is_file());
    Ok(())
}

#[test]
fn binding_reload_is_off_unless_requested() -> TestResult {
    let cfg = load_str(
        r#"
[[watch.binding]]
task = "sass"
patterns = ["sass/**/*.scss"]

[[watch.binding]]
task = "html"
patterns = ["**/*.html"]
reload = true
"#,
    )?;

    let bindings = cfg.watch_bindings();
    assert!(!bindings[0].reload);
    assert!(bindings[1].reload);

    let registry = TaskRegistry::standard(&cfg)?;
    let sass = registry.plan("watch:sass")?;
    assert_eq!(sass.steps().collect::<Vec<_>>(), vec!["sass"]);
    Ok(())
}

#[test]
fn unknown_behaviour_is_a_toml_error() {
    let result = load_str("[watch]\ntriggered_while_running_behaviour = \"restart\"\n");
    assert!(matches!(result, Err(AssetdagError::TomlError(_))));
}

#[test]
fn explicit_missing_path_is_an_io_error() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("nope.toml");
    assert!(matches!(
        load_or_default(Some(&missing)),
        Err(AssetdagError::IoError(_))
    ));
}
