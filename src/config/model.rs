// src/config/model.rs

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::types::TriggerWhileRunningBehaviour;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [paths]
/// source = "src"
/// build = "build"
///
/// [server]
/// port = 3010
///
/// [[watch.binding]]
/// task = "html"
/// patterns = ["**/*.html"]
/// ```
///
/// All sections are optional and have defaults matching the classic
/// `src/` → `build/` layout.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub paths: PathsSection,

    #[serde(default)]
    pub sass: SassSection,

    #[serde(default)]
    pub js: JsSection,

    #[serde(default)]
    pub img: ImgSection,

    #[serde(default)]
    pub fonts: FontsSection,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub watch: WatchSection,
}

/// Validated configuration. Immutable once built; tasks receive the parts
/// they need at construction time.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub paths: PathsSection,
    pub sass: SassSection,
    pub js: JsSection,
    pub img: ImgSection,
    pub fonts: FontsSection,
    pub server: ServerSection,
    pub watch: WatchSection,
    /// Directory that relative `paths` entries are resolved against.
    base_dir: PathBuf,
}

impl ConfigFile {
    /// Build a config without running validation. Prefer `TryFrom`.
    pub fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            paths: raw.paths,
            sass: raw.sass,
            js: raw.js,
            img: raw.img,
            fonts: raw.fonts,
            server: raw.server,
            watch: raw.watch,
            base_dir: PathBuf::from("."),
        }
    }

    /// Re-anchor relative paths on `dir` (usually the config file's directory).
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = dir.into();
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Absolute (or base-relative) source tree root.
    pub fn source_root(&self) -> PathBuf {
        self.base_dir.join(&self.paths.source)
    }

    /// Absolute (or base-relative) build tree root.
    pub fn build_root(&self) -> PathBuf {
        self.base_dir.join(&self.paths.build)
    }

    /// Effective watch bindings: configured ones, or the four defaults.
    pub fn watch_bindings(&self) -> Vec<WatchBindingConfig> {
        if self.watch.binding.is_empty() {
            default_bindings(&self.img)
        } else {
            self.watch.binding.clone()
        }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        ConfigFile::new_unchecked(RawConfigFile::default())
    }
}

/// `[paths]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct PathsSection {
    #[serde(default = "default_source")]
    pub source: String,

    #[serde(default = "default_build")]
    pub build: String,

    /// Build-relative paths that `clean` never deletes.
    #[serde(default = "default_preserve")]
    pub preserve: Vec<String>,
}

fn default_source() -> String {
    "src".to_string()
}

fn default_build() -> String {
    "build".to_string()
}

fn default_preserve() -> Vec<String> {
    vec!["readme.md".to_string()]
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            source: default_source(),
            build: default_build(),
            preserve: default_preserve(),
        }
    }
}

/// `[sass]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct SassSection {
    /// Entry stylesheet, relative to the source root.
    #[serde(default = "default_sass_entry")]
    pub entry: String,

    /// Browserslist queries used for vendor prefixing.
    #[serde(default = "default_browsers")]
    pub browsers: Vec<String>,

    /// Order merged media queries mobile-first by `min-width`.
    #[serde(default = "default_true")]
    pub sort_media_queries: bool,
}

fn default_sass_entry() -> String {
    "sass/style.scss".to_string()
}

fn default_browsers() -> Vec<String> {
    vec![
        "last 2 versions".to_string(),
        "last 7 Chrome versions".to_string(),
        "last 10 Opera versions".to_string(),
        "last 7 Firefox versions".to_string(),
    ]
}

fn default_true() -> bool {
    true
}

impl Default for SassSection {
    fn default() -> Self {
        Self {
            entry: default_sass_entry(),
            browsers: default_browsers(),
            sort_media_queries: true,
        }
    }
}

/// `[js]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct JsSection {
    #[serde(default = "default_js_entry")]
    pub entry: String,

    /// Name of the concatenated output inside `<build>/js/`.
    #[serde(default = "default_js_output")]
    pub output: String,

    /// Name of the minified output inside `<build>/js/`.
    #[serde(default = "default_js_minified")]
    pub minified: String,
}

fn default_js_entry() -> String {
    "js/script.js".to_string()
}

fn default_js_output() -> String {
    "script.js".to_string()
}

fn default_js_minified() -> String {
    "script-min.js".to_string()
}

impl Default for JsSection {
    fn default() -> Self {
        Self {
            entry: default_js_entry(),
            output: default_js_output(),
            minified: default_js_minified(),
        }
    }
}

/// `[img]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ImgSection {
    #[serde(default = "default_img_extensions")]
    pub extensions: Vec<String>,

    /// File names inside `img/` that `img:opt` leaves alone.
    #[serde(default = "default_optimize_exclude")]
    pub optimize_exclude: Vec<String>,

    /// oxipng preset, 0..=6.
    #[serde(default = "default_png_level")]
    pub png_level: u8,

    /// Lossy palette quantization before recompression.
    #[serde(default = "default_true")]
    pub png_quantize: bool,

    /// `[min, max]` quantization quality, 0..=100. Below `min` the image is
    /// left to lossless recompression.
    #[serde(default = "default_png_quality")]
    pub png_quality: [u8; 2],
}

fn default_img_extensions() -> Vec<String> {
    ["gif", "png", "jpg", "jpeg", "svg"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_optimize_exclude() -> Vec<String> {
    vec!["sprite-svg.svg".to_string()]
}

fn default_png_level() -> u8 {
    2
}

fn default_png_quality() -> [u8; 2] {
    [0, 100]
}

impl Default for ImgSection {
    fn default() -> Self {
        Self {
            extensions: default_img_extensions(),
            optimize_exclude: default_optimize_exclude(),
            png_level: default_png_level(),
            png_quantize: true,
            png_quality: default_png_quality(),
        }
    }
}

impl ImgSection {
    /// Glob (relative to the source root) selecting top-level images.
    pub fn source_glob(&self) -> String {
        format!("img/*.{{{}}}", self.extensions.join(","))
    }
}

/// `[fonts]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct FontsSection {
    #[serde(default = "default_font_extensions")]
    pub extensions: Vec<String>,
}

fn default_font_extensions() -> Vec<String> {
    vec!["woff".to_string(), "woff2".to_string()]
}

impl Default for FontsSection {
    fn default() -> Self {
        Self {
            extensions: default_font_extensions(),
        }
    }
}

impl FontsSection {
    /// Glob (relative to the source root) selecting font files recursively.
    pub fn source_glob(&self) -> String {
        format!("fonts/**/*.{{{}}}", self.extensions.join(","))
    }
}

/// `[server]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Page announced when the server starts.
    #[serde(default = "default_start_path")]
    pub start_path: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3010
}

fn default_start_path() -> String {
    "index.html".to_string()
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            start_path: default_start_path(),
        }
    }
}

/// `[watch]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchSection {
    /// `"queue"`, `"cancel"` or `"drop"`.
    #[serde(default)]
    pub triggered_while_running_behaviour: TriggerWhileRunningBehaviour,

    /// Maximum number of queued batches to remember.
    #[serde(default = "default_queue_length")]
    pub queue_length: usize,

    /// Skip change events whose file content hash did not change.
    #[serde(default = "default_true")]
    pub use_hash: bool,

    /// `[[watch.binding]]` entries. Empty means "use the defaults".
    #[serde(default)]
    pub binding: Vec<WatchBindingConfig>,
}

fn default_queue_length() -> usize {
    1
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            triggered_while_running_behaviour: TriggerWhileRunningBehaviour::default(),
            queue_length: default_queue_length(),
            use_hash: true,
            binding: Vec::new(),
        }
    }
}

/// One `[[watch.binding]]` entry.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct WatchBindingConfig {
    /// Registered task to re-run.
    pub task: String,

    /// Globs relative to the source root.
    pub patterns: Vec<String>,

    #[serde(default)]
    pub exclude: Vec<String>,

    /// Push a full browser reload after the task finishes. Off unless set,
    /// so a custom sass binding keeps relying on the streamed stylesheet.
    #[serde(default)]
    pub reload: bool,
}

impl WatchBindingConfig {
    pub fn new(task: &str, patterns: &[&str], reload: bool) -> Self {
        Self {
            task: task.to_string(),
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
            exclude: Vec::new(),
            reload,
        }
    }

    /// Name of the composite registered for this binding.
    pub fn target_name(&self) -> String {
        format!("watch:{}", self.task)
    }
}

/// HTML, styles, images and scripts. Styles do not reload: the sass
/// pipeline streams the new stylesheet itself.
///
/// The image binding watches exactly what the `img` task copies.
pub fn default_bindings(img: &ImgSection) -> Vec<WatchBindingConfig> {
    let images = img.source_glob();
    vec![
        WatchBindingConfig::new("html", &["**/*.html"], true),
        WatchBindingConfig::new("sass", &["sass/**/*.scss"], false),
        WatchBindingConfig::new("img", &[images.as_str()], true),
        WatchBindingConfig::new("js", &["js/**/*.js"], true),
    ]
}
