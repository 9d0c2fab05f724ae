// src/registry/mod.rs

//! Named task definitions and their flattening into execution plans.
//!
//! The registry is built once at startup and never changes afterwards.
//! Every name resolves to one of:
//! - a step: a [`Task`] that does actual work,
//! - a composite: a `series` / `parallel` [`Composition`] over other names,
//! - an alias for another name,
//! - the serve entry point, which runs another target first.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::debug;

use crate::config::ConfigFile;
use crate::dag::{Composition, Plan};
use crate::errors::{AssetdagError, Result};
use crate::tasks::{
    CleanTask, CopyTask, HtmlTask, ImgOptTask, ImgTask, JsTask, ReloadTask, SassTask, Task,
};
use crate::types::TaskName;

pub const BUILD: &str = "build";
pub const SERVE: &str = "serve";
pub const DEFAULT: &str = "default";
pub const RELOAD: &str = "reload";

#[derive(Debug, Clone)]
pub enum Definition {
    Step(Arc<dyn Task>),
    Composite(Composition),
    Alias(TaskName),
    /// Run `after` to completion, then start the dev server and watcher.
    Serve { after: TaskName },
}

impl Definition {
    /// Names this definition refers to directly.
    fn references(&self) -> Vec<&str> {
        match self {
            Definition::Step(_) => Vec::new(),
            Definition::Composite(comp) => comp.references(),
            Definition::Alias(target) => vec![target.as_str()],
            Definition::Serve { after } => vec![after.as_str()],
        }
    }

    /// One-line human description, used by `--list`.
    pub fn describe(&self) -> String {
        match self {
            Definition::Step(_) => "step".to_string(),
            Definition::Composite(comp) => comp.to_string(),
            Definition::Alias(target) => format!("alias for {target}"),
            Definition::Serve { after } => format!("{after}, then dev server + watch"),
        }
    }
}

#[derive(Debug, Default)]
pub struct TaskRegistry {
    definitions: BTreeMap<TaskName, Definition>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every built-in task, composite and watch target for `cfg`.
    ///
    /// `build = series(clean, parallel(sass, img, js, copy), html)`.
    pub fn standard(cfg: &ConfigFile) -> Result<Self> {
        let mut registry = Self::new();

        registry.register_step(Arc::new(CleanTask::new(cfg)))?;
        registry.register_step(Arc::new(SassTask::new(cfg)))?;
        registry.register_step(Arc::new(HtmlTask::new(cfg)?))?;
        registry.register_step(Arc::new(ImgTask::new(cfg)?))?;
        registry.register_step(Arc::new(ImgOptTask::new(cfg)?))?;
        registry.register_step(Arc::new(JsTask::new(cfg)))?;
        registry.register_step(Arc::new(CopyTask::new(cfg)?))?;
        registry.register_step(Arc::new(ReloadTask))?;

        registry.register_composite(
            BUILD,
            Composition::series([
                Composition::task("clean"),
                Composition::parallel([
                    Composition::task("sass"),
                    Composition::task("img"),
                    Composition::task("js"),
                    Composition::task("copy"),
                ]),
                Composition::task("html"),
            ]),
        )?;
        registry.register_serve(SERVE, BUILD)?;
        registry.register_alias(DEFAULT, SERVE)?;

        for binding in cfg.watch_bindings() {
            let name = binding.target_name();
            if registry.contains(&name) {
                debug!(target = %name, "watch target already registered; skipping duplicate binding");
                continue;
            }
            let comp = if binding.reload {
                Composition::series([Composition::task(&binding.task), Composition::task(RELOAD)])
            } else {
                Composition::task(&binding.task)
            };
            registry.register_composite(&name, comp)?;
        }

        Ok(registry)
    }

    fn insert(&mut self, name: &str, def: Definition) -> Result<()> {
        if self.definitions.contains_key(name) {
            return Err(AssetdagError::ConfigError(format!(
                "task '{name}' is registered twice"
            )));
        }
        self.definitions.insert(name.to_string(), def);
        Ok(())
    }

    /// Register a step under its own name.
    pub fn register_step(&mut self, task: Arc<dyn Task>) -> Result<()> {
        let name = task.name().to_string();
        self.insert(&name, Definition::Step(task))
    }

    pub fn register_composite(&mut self, name: &str, comp: Composition) -> Result<()> {
        self.insert(name, Definition::Composite(comp))
    }

    pub fn register_alias(&mut self, name: &str, target: &str) -> Result<()> {
        self.insert(name, Definition::Alias(target.to_string()))
    }

    pub fn register_serve(&mut self, name: &str, after: &str) -> Result<()> {
        self.insert(
            name,
            Definition::Serve {
                after: after.to_string(),
            },
        )
    }

    pub fn contains(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Definition> {
        self.definitions.get(name)
    }

    /// Registered names in lexical order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(|s| s.as_str())
    }

    /// `(name, description)` for every registered name.
    pub fn listing(&self) -> Vec<(String, String)> {
        self.definitions
            .iter()
            .map(|(name, def)| (name.clone(), def.describe()))
            .collect()
    }

    /// Follow aliases until a non-alias definition.
    pub fn canonical<'a>(&'a self, name: &'a str) -> Result<&'a str> {
        let mut current = name;
        let mut seen = BTreeSet::new();
        loop {
            match self.definitions.get(current) {
                Some(Definition::Alias(target)) => {
                    if !seen.insert(current) {
                        return Err(AssetdagError::Cycle(format!(
                            "alias '{name}' never resolves"
                        )));
                    }
                    current = target.as_str();
                }
                Some(_) => return Ok(current),
                None => return Err(AssetdagError::UnknownTask(current.to_string())),
            }
        }
    }

    /// The target `name` runs before serving, when it resolves to the serve
    /// entry point.
    pub fn serve_target(&self, name: &str) -> Option<&str> {
        let canonical = self.canonical(name).ok()?;
        match self.definitions.get(canonical) {
            Some(Definition::Serve { after }) => Some(after.as_str()),
            _ => None,
        }
    }

    /// The task behind a step name.
    pub fn step(&self, name: &str) -> Option<Arc<dyn Task>> {
        match self.definitions.get(name) {
            Some(Definition::Step(task)) => Some(Arc::clone(task)),
            _ => None,
        }
    }

    /// Check references and cycles. Runs once, before anything executes.
    pub fn validate(&self) -> Result<()> {
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

        for (name, def) in self.definitions.iter() {
            graph.add_node(name.as_str());
            for reference in def.references() {
                if !self.definitions.contains_key(reference) {
                    return Err(AssetdagError::UnknownTask(format!(
                        "'{reference}' (referenced by '{name}')"
                    )));
                }
                graph.add_edge(name.as_str(), reference, ());
            }
        }

        if let Err(cycle) = toposort(&graph, None) {
            return Err(AssetdagError::Cycle(format!(
                "task definitions refer back to '{}'",
                cycle.node_id()
            )));
        }

        for name in self.definitions.keys() {
            self.plan(name)?;
        }

        debug!(tasks = self.definitions.len(), "task registry validated");
        Ok(())
    }

    /// Flatten `name` into the plan of steps it runs.
    pub fn plan(&self, name: &str) -> Result<Plan> {
        let mut plan = Plan::new();
        let mut visiting = Vec::new();
        self.flatten_name(name, &BTreeSet::new(), &mut plan, &mut visiting)?;
        plan.topological_order()?;
        Ok(plan)
    }

    /// Merged plan for several targets.
    pub fn plan_for(&self, targets: &[TaskName]) -> Result<Plan> {
        let mut plan = Plan::new();
        for target in targets {
            plan.merge(&self.plan(target)?);
        }
        plan.topological_order()?;
        Ok(plan)
    }

    /// Add `name` to `plan` behind `entry`; returns the steps whose
    /// completion means `name` is done.
    fn flatten_name(
        &self,
        name: &str,
        entry: &BTreeSet<TaskName>,
        plan: &mut Plan,
        visiting: &mut Vec<TaskName>,
    ) -> Result<BTreeSet<TaskName>> {
        if visiting.iter().any(|v| v == name) {
            let mut path = visiting.clone();
            path.push(name.to_string());
            return Err(AssetdagError::Cycle(path.join(" -> ")));
        }

        let def = self
            .definitions
            .get(name)
            .ok_or_else(|| AssetdagError::UnknownTask(name.to_string()))?;

        visiting.push(name.to_string());
        let exits = match def {
            Definition::Step(_) => {
                plan.add_step(name, entry.iter());
                BTreeSet::from([name.to_string()])
            }
            Definition::Composite(comp) => self.flatten_composition(comp, entry, plan, visiting)?,
            Definition::Alias(target) | Definition::Serve { after: target } => {
                self.flatten_name(target, entry, plan, visiting)?
            }
        };
        visiting.pop();

        Ok(exits)
    }

    fn flatten_composition(
        &self,
        comp: &Composition,
        entry: &BTreeSet<TaskName>,
        plan: &mut Plan,
        visiting: &mut Vec<TaskName>,
    ) -> Result<BTreeSet<TaskName>> {
        match comp {
            Composition::Task(name) => self.flatten_name(name, entry, plan, visiting),
            Composition::Series(items) => {
                let mut current = entry.clone();
                for item in items {
                    current = self.flatten_composition(item, &current, plan, visiting)?;
                }
                Ok(current)
            }
            Composition::Parallel(items) => {
                if items.is_empty() {
                    return Ok(entry.clone());
                }
                let mut exits = BTreeSet::new();
                for item in items {
                    exits.extend(self.flatten_composition(item, entry, plan, visiting)?);
                }
                Ok(exits)
            }
        }
    }
}
