// src/config/validate.rs

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{AssetdagError, Result};
use crate::watch::patterns::build_globset;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::AssetdagError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_paths(cfg)?;
    validate_entries(cfg)?;
    validate_server(cfg)?;
    validate_watch(cfg)?;
    Ok(())
}

fn config_error(msg: impl Into<String>) -> AssetdagError {
    AssetdagError::ConfigError(msg.into())
}

fn validate_paths(cfg: &RawConfigFile) -> Result<()> {
    let source = cfg.paths.source.trim();
    let build = cfg.paths.build.trim();

    if source.is_empty() || build.is_empty() {
        return Err(config_error("[paths].source and [paths].build must be non-empty"));
    }
    check_disjoint_roots(Path::new(source), Path::new(build))?;
    for keep in cfg.paths.preserve.iter() {
        if keep.trim().is_empty() || keep.contains("..") {
            return Err(config_error(format!(
                "[paths].preserve entry '{keep}' must be a plain build-relative path"
            )));
        }
    }
    Ok(())
}

/// Re-check the roots once they are anchored on the config directory, so
/// `..` segments that climb out of it are resolved too.
pub fn validate_anchored_roots(cfg: &ConfigFile) -> Result<()> {
    let source = std::path::absolute(cfg.source_root())?;
    let build = std::path::absolute(cfg.build_root())?;
    check_disjoint_roots(&source, &build)
}

/// `clean` empties the build root, so it must neither be, nor contain, nor
/// sit inside the source root.
fn check_disjoint_roots(source: &Path, build: &Path) -> Result<()> {
    let source = lexical_normalize(source);
    let build = lexical_normalize(build);

    if source == build {
        return Err(config_error(format!(
            "[paths].source and [paths].build must differ (both are '{}')",
            display_root(&source)
        )));
    }
    if source.starts_with(&build) {
        return Err(config_error(format!(
            "[paths].build '{}' contains the source tree '{}'",
            display_root(&build),
            display_root(&source)
        )));
    }
    if build.starts_with(&source) {
        return Err(config_error(format!(
            "[paths].build '{}' lies inside the source tree '{}'",
            display_root(&build),
            display_root(&source)
        )));
    }
    Ok(())
}

/// Drop `.` segments and fold `..` into the preceding name, without
/// touching the filesystem.
fn lexical_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn display_root(path: &Path) -> String {
    if path.as_os_str().is_empty() {
        ".".to_string()
    } else {
        path.display().to_string()
    }
}

fn validate_entries(cfg: &RawConfigFile) -> Result<()> {
    if cfg.sass.entry.trim().is_empty() {
        return Err(config_error("[sass].entry must be non-empty"));
    }
    if cfg.js.entry.trim().is_empty() {
        return Err(config_error("[js].entry must be non-empty"));
    }
    if cfg.js.output == cfg.js.minified {
        return Err(config_error(format!(
            "[js].output and [js].minified must differ (both are '{}')",
            cfg.js.output
        )));
    }
    if cfg.img.extensions.is_empty() {
        return Err(config_error("[img].extensions must list at least one extension"));
    }
    if cfg.img.png_level > 6 {
        return Err(config_error(format!(
            "[img].png_level must be between 0 and 6 (got {})",
            cfg.img.png_level
        )));
    }
    let [min, max] = cfg.img.png_quality;
    if min > max || max > 100 {
        return Err(config_error(format!(
            "[img].png_quality must be [min, max] with min <= max <= 100 (got [{min}, {max}])"
        )));
    }
    if cfg.fonts.extensions.is_empty() {
        return Err(config_error("[fonts].extensions must list at least one extension"));
    }
    Ok(())
}

fn validate_server(cfg: &RawConfigFile) -> Result<()> {
    if cfg.server.port == 0 {
        return Err(config_error("[server].port must be >= 1 (got 0)"));
    }
    if cfg.server.host.trim().is_empty() {
        return Err(config_error("[server].host must be non-empty"));
    }
    Ok(())
}

fn validate_watch(cfg: &RawConfigFile) -> Result<()> {
    // triggered_while_running_behaviour is strongly typed and validated
    // during deserialization.

    if cfg.watch.queue_length == 0 {
        return Err(config_error("[watch].queue_length must be >= 1 (got 0)"));
    }

    let mut seen = HashSet::new();
    for binding in cfg.watch.binding.iter() {
        if binding.task.trim().is_empty() {
            return Err(config_error("[[watch.binding]].task must be non-empty"));
        }
        if !seen.insert(binding.task.as_str()) {
            return Err(config_error(format!(
                "task '{}' is bound more than once in [[watch.binding]]",
                binding.task
            )));
        }
        if binding.patterns.is_empty() {
            return Err(config_error(format!(
                "watch binding for '{}' needs at least one pattern",
                binding.task
            )));
        }
        build_globset(&binding.patterns)
            .and_then(|_| build_globset(&binding.exclude))
            .map_err(|e| {
                config_error(format!("watch binding for '{}': {e:#}", binding.task))
            })?;
    }
    Ok(())
}
