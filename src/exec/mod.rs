// src/exec/mod.rs

//! Step execution layer.
//!
//! - [`executor_loop`] owns the loop that runs steps on the blocking pool
//!   and reports `StepCompleted` back to the runtime.
//! - [`policy`] turns stage errors into notifications and outcomes.
//! - [`backend`] provides the `ExecutorBackend` trait and the production
//!   `RealExecutorBackend`; tests replace it with a fake.

pub mod backend;
pub mod executor_loop;
pub mod policy;

pub use backend::{ExecutorBackend, RealExecutorBackend};
pub use executor_loop::spawn_executor;
