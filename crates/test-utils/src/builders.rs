#![allow(dead_code)]

use std::path::{Path, PathBuf};

use assetdag::config::{ConfigFile, RawConfigFile, WatchBindingConfig};
use assetdag::types::TriggerWhileRunningBehaviour;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
    base_dir: PathBuf,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
            base_dir: PathBuf::from("."),
        }
    }

    /// Anchor `src/` and `build/` on `dir`.
    pub fn rooted_at(mut self, dir: &Path) -> Self {
        self.base_dir = dir.to_path_buf();
        self
    }

    pub fn with_paths(mut self, source: &str, build: &str) -> Self {
        self.config.paths.source = source.to_string();
        self.config.paths.build = build.to_string();
        self
    }

    pub fn with_preserve(mut self, path: &str) -> Self {
        self.config.paths.preserve.push(path.to_string());
        self
    }

    pub fn with_binding(mut self, binding: WatchBindingConfig) -> Self {
        self.config.watch.binding.push(binding);
        self
    }

    pub fn with_behaviour(mut self, behaviour: TriggerWhileRunningBehaviour) -> Self {
        self.config.watch.triggered_while_running_behaviour = behaviour;
        self
    }

    pub fn with_queue_length(mut self, len: usize) -> Self {
        self.config.watch.queue_length = len;
        self
    }

    pub fn with_use_hash(mut self, val: bool) -> Self {
        self.config.watch.use_hash = val;
        self
    }

    pub fn with_sort_media_queries(mut self, val: bool) -> Self {
        self.config.sass.sort_media_queries = val;
        self
    }

    pub fn with_img_extensions(mut self, extensions: &[&str]) -> Self {
        self.config.img.extensions = extensions.iter().map(|e| e.to_string()).collect();
        self
    }

    pub fn with_png_quantize(mut self, val: bool) -> Self {
        self.config.img.png_quantize = val;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config)
            .expect("Failed to build valid config from builder")
            .with_base_dir(self.base_dir)
    }

    /// Skip validation (for settings validation would reject, like port 0).
    pub fn build_unchecked(self) -> ConfigFile {
        ConfigFile::new_unchecked(self.config).with_base_dir(self.base_dir)
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}
