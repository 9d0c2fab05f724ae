// src/tasks/include.rs

//! `@@include('path'[, {json}])` directives.
//!
//! Paths resolve against the including file's directory. Keys of the optional
//! JSON object are substituted as `@@key` (dotted keys reach into nested
//! objects) in the included text before its own includes are expanded.

use std::path::Path;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::Value;

use crate::fs::FileSystem;
use crate::tasks::StageError;

pub const STAGE: &str = "file-include";

/// Deepest include chain followed before giving up.
pub const MAX_DEPTH: usize = 32;

static INCLUDE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"@@include\(\s*(?:'([^']*)'|"([^"]*)")\s*(?:,\s*(\{[\s\S]*?\}))?\s*\)"#)
        .expect("include pattern is valid")
});

static VAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@@([A-Za-z_][\w]*(?:\.[A-Za-z_][\w]*)*)").expect("variable pattern is valid"));

/// Expand every include directive in `text`, which was read from `file`.
pub fn resolve_includes(fs: &dyn FileSystem, file: &Path, text: &str) -> Result<String, StageError> {
    expand(fs, file, text, 0)
}

fn expand(fs: &dyn FileSystem, file: &Path, text: &str, depth: usize) -> Result<String, StageError> {
    if depth > MAX_DEPTH {
        return Err(StageError::content(
            STAGE,
            format!(
                "{}: include nesting deeper than {MAX_DEPTH} levels (recursive include?)",
                file.display()
            ),
        ));
    }

    let dir = file.parent().unwrap_or_else(|| Path::new(""));
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for caps in INCLUDE_RE.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        out.push_str(&text[last..whole.start()]);
        last = whole.end();

        let rel = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str())
            .unwrap_or_default();
        let target = dir.join(rel);

        let body = fs.read_to_string(&target).map_err(|e| {
            StageError::content(
                STAGE,
                format!("{}: cannot include '{rel}': {e:#}", file.display()),
            )
        })?;

        let body = match caps.get(3) {
            Some(json) => {
                let context: Value = serde_json::from_str(json.as_str()).map_err(|e| {
                    StageError::content(
                        STAGE,
                        format!("{}: invalid include context for '{rel}': {e}", file.display()),
                    )
                })?;
                substitute(&body, &context)
            }
            None => body,
        };

        out.push_str(&expand(fs, &target, &body, depth + 1)?);
    }

    out.push_str(&text[last..]);
    Ok(out)
}

/// Replace `@@key` with the matching value from `context`. Unknown keys are
/// left untouched.
pub fn substitute(text: &str, context: &Value) -> String {
    VAR_RE
        .replace_all(text, |caps: &Captures| {
            let key = &caps[1];
            match lookup(context, key) {
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

fn lookup<'a>(context: &'a Value, dotted: &str) -> Option<&'a Value> {
    dotted
        .split('.')
        .try_fold(context, |value, key| value.as_object()?.get(key))
}
