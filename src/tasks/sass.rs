// src/tasks/sass.rs

//! Stylesheet pipeline: includes, SCSS compilation, vendor prefixing for the
//! configured browser matrix, media query packing, source map and a minified
//! copy.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use lightningcss::rules::{CssRule, CssRuleList};
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use lightningcss::traits::ToCss;
use parcel_sourcemap::SourceMap;
use regex::Regex;
use tracing::info;

use crate::config::ConfigFile;
use crate::fs::FileSystem;
use crate::tasks::include::resolve_includes;
use crate::tasks::{StageError, StageResultExt, Task, TaskContext};

const STAGE: &str = "sass";
const CSS_NAME: &str = "style.css";
const MAP_NAME: &str = "style.css.map";
const MIN_NAME: &str = "style.min.css";
/// Source named in the map: the compiler's output before prefixing and
/// media query packing. grass does not emit SCSS-level mappings.
pub const COMPILED_NAME: &str = "style.compiled.css";

/// Lower width bound, in either `min-width: N` or range (`width >= N`) form.
static MIN_WIDTH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:min-width:\s*|\bwidth\s*>=?\s*)([0-9]*\.?[0-9]+)")
        .expect("min-width pattern is valid")
});

#[derive(Debug, Clone)]
pub struct SassTask {
    entry: PathBuf,
    dest_dir: PathBuf,
    browsers: Vec<String>,
    sort_media_queries: bool,
}

impl SassTask {
    pub fn new(cfg: &ConfigFile) -> Self {
        Self {
            entry: cfg.source_root().join(&cfg.sass.entry),
            dest_dir: cfg.build_root().join("css"),
            browsers: cfg.sass.browsers.clone(),
            sort_media_queries: cfg.sass.sort_media_queries,
        }
    }
}

/// Everything the pipeline writes, computed before the first write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CssOutput {
    /// Readable stylesheet ending with a `sourceMappingURL` comment.
    pub css: String,
    pub map: String,
    pub minified: String,
}

/// Lets grass resolve `@import`/`@use` through our [`FileSystem`].
#[derive(Debug)]
struct SassFs<'a>(&'a dyn FileSystem);

impl grass::Fs for SassFs<'_> {
    fn is_dir(&self, path: &Path) -> bool {
        self.0.is_dir(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.0.is_file(path)
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.0
            .read(path)
            .map_err(|e| io::Error::new(io::ErrorKind::NotFound, format!("{e:#}")))
    }
}

/// Compile SCSS source. Imports resolve against `load_dir`.
pub fn compile_scss(fs: &dyn FileSystem, source: &str, load_dir: &Path) -> Result<String, StageError> {
    let sass_fs = SassFs(fs);
    let options = grass::Options::default()
        .fs(&sass_fs)
        .load_path(load_dir)
        .style(grass::OutputStyle::Expanded);

    grass::from_string(source.to_string(), &options)
        .map_err(|e| StageError::content(STAGE, e.to_string()))
}

/// Resolve browserslist queries into lightningcss targets.
pub fn resolve_targets(browsers: &[String]) -> Result<Targets, StageError> {
    let browsers = Browsers::from_browserslist(browsers.iter().map(|q| q.as_str()))
        .map_err(|e| StageError::infrastructure("autoprefixer", e.to_string()))?;
    Ok(Targets {
        browsers,
        ..Targets::default()
    })
}

/// `min-width` of a media query in its own unit, if any.
fn min_width(query: &str) -> Option<f64> {
    MIN_WIDTH_RE
        .captures(query)
        .and_then(|caps| caps[1].parse::<f64>().ok())
}

/// Merge top-level `@media` blocks with identical queries and move them to
/// the end of the sheet, keeping first-appearance order. With `sort`, queries
/// without `min-width` come first, then ascending `min-width`.
pub fn pack_media_queries(rules: &mut CssRuleList<'_>, sort: bool) {
    let mut kept = Vec::with_capacity(rules.0.len());
    let mut groups: Vec<(String, CssRule<'_>)> = Vec::new();

    for rule in std::mem::take(&mut rules.0) {
        match rule {
            CssRule::Media(media) => {
                let key = media
                    .query
                    .to_css_string(PrinterOptions::default())
                    .unwrap_or_default();
                match groups.iter_mut().find(|(k, _)| *k == key) {
                    Some((_, CssRule::Media(existing))) => existing.rules.0.extend(media.rules.0),
                    _ => groups.push((key, CssRule::Media(media))),
                }
            }
            other => kept.push(other),
        }
    }

    if sort {
        groups.sort_by(|(a, _), (b, _)| match (min_width(a), min_width(b)) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(std::cmp::Ordering::Equal),
            (None, Some(_)) => std::cmp::Ordering::Less,
            (Some(_), None) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
    }

    kept.extend(groups.into_iter().map(|(_, rule)| rule));
    rules.0 = kept;
}

fn css_error(e: impl std::fmt::Display) -> StageError {
    StageError::content("postcss", e.to_string())
}

/// Prefix, pack and print compiled CSS in both readable and minified form.
///
/// The map points into `css` itself, declared under `filename`.
pub fn process_css(
    css: &str,
    filename: &str,
    browsers: &[String],
    sort_media_queries: bool,
) -> Result<CssOutput, StageError> {
    let targets = resolve_targets(browsers)?;
    let parser_options = || ParserOptions {
        filename: filename.to_string(),
        ..ParserOptions::default()
    };

    let mut sheet = StyleSheet::parse(css, parser_options()).map_err(css_error)?;
    pack_media_queries(&mut sheet.rules, sort_media_queries);
    sheet
        .minify(MinifyOptions {
            targets: targets.clone(),
            ..MinifyOptions::default()
        })
        .map_err(css_error)?;

    let mut source_map = SourceMap::new("/");
    source_map.add_source(filename);
    source_map
        .set_source_content(0, css)
        .map_err(|e| StageError::infrastructure("sourcemaps", e.to_string()))?;

    let readable = sheet
        .to_css(PrinterOptions {
            minify: false,
            targets: targets.clone(),
            source_map: Some(&mut source_map),
            ..PrinterOptions::default()
        })
        .map_err(css_error)?;

    let map = source_map
        .to_json(None)
        .map_err(|e| StageError::infrastructure("sourcemaps", e.to_string()))?;

    let mut min_sheet = StyleSheet::parse(css, parser_options()).map_err(css_error)?;
    pack_media_queries(&mut min_sheet.rules, sort_media_queries);
    min_sheet
        .minify(MinifyOptions {
            targets: targets.clone(),
            ..MinifyOptions::default()
        })
        .map_err(css_error)?;
    let minified = min_sheet
        .to_css(PrinterOptions {
            minify: true,
            targets,
            ..PrinterOptions::default()
        })
        .map_err(css_error)?;

    Ok(CssOutput {
        css: format!("{}\n/*# sourceMappingURL={MAP_NAME} */\n", readable.code.trim_end()),
        map,
        minified: minified.code,
    })
}

impl Task for SassTask {
    fn name(&self) -> &str {
        "sass"
    }

    fn run(&self, ctx: &TaskContext) -> Result<(), StageError> {
        let fs = ctx.fs.as_ref();

        let raw = fs.read_to_string(&self.entry).stage(STAGE)?;
        let source = resolve_includes(fs, &self.entry, &raw)?;
        let load_dir = self.entry.parent().unwrap_or_else(|| Path::new("."));
        let compiled = compile_scss(fs, &source, load_dir)?;
        let output =
            process_css(&compiled, COMPILED_NAME, &self.browsers, self.sort_media_queries)?;

        fs.write(&self.dest_dir.join(CSS_NAME), output.css.as_bytes()).stage(STAGE)?;
        fs.write(&self.dest_dir.join(MAP_NAME), output.map.as_bytes()).stage(STAGE)?;
        ctx.live.stream(format!("css/{CSS_NAME}"));
        fs.write(&self.dest_dir.join(MIN_NAME), output.minified.as_bytes()).stage(STAGE)?;

        info!(
            css = output.css.len(),
            minified = output.minified.len(),
            "styles compiled"
        );
        Ok(())
    }
}
