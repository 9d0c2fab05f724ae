// src/dag/composition.rs

use crate::types::TaskName;

/// Ordering expression over named tasks.
///
/// - `Series` runs each member to completion before the next starts.
/// - `Parallel` starts all members together and completes when the slowest
///   one does. Members have no ordering among themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Composition {
    Task(TaskName),
    Series(Vec<Composition>),
    Parallel(Vec<Composition>),
}

impl Composition {
    pub fn task(name: impl Into<TaskName>) -> Self {
        Composition::Task(name.into())
    }

    pub fn series(items: impl IntoIterator<Item = Composition>) -> Self {
        Composition::Series(items.into_iter().collect())
    }

    pub fn parallel(items: impl IntoIterator<Item = Composition>) -> Self {
        Composition::Parallel(items.into_iter().collect())
    }

    /// Every task name referenced anywhere in the expression, in order of
    /// appearance (duplicates kept).
    pub fn references(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Composition::Task(name) => out.push(name.as_str()),
            Composition::Series(items) | Composition::Parallel(items) => {
                for item in items {
                    item.collect_references(out);
                }
            }
        }
    }
}

impl std::fmt::Display for Composition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (label, items) = match self {
            Composition::Task(name) => return write!(f, "{name}"),
            Composition::Series(items) => ("series", items),
            Composition::Parallel(items) => ("parallel", items),
        };
        write!(f, "{label}(")?;
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{item}")?;
        }
        write!(f, ")")
    }
}
