//! Role-specific execution routines
//!
//! Each worker variant is its own [`Behavior`] type, selected when the
//! agent is constructed. The routine receives the task and produces an
//! opaque result payload; what the payload *means* is the caller's
//! business, not the engine's.

use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::agent::AgentSpec;
use crate::task::Task;

/// A worker's execution routine
#[async_trait]
pub trait Behavior: Send + Sync {
    /// Variant name, used in logs and results
    fn name(&self) -> &str;

    /// Execute a task
    ///
    /// Errors are captured by the owning agent and recorded on the task;
    /// they never propagate past the agent.
    async fn execute(&self, task: &Task) -> anyhow::Result<Value>;
}

/// Examines a task's inputs and reports findings
pub struct AnalysisBehavior;

#[async_trait]
impl Behavior for AnalysisBehavior {
    fn name(&self) -> &str {
        "analysis"
    }

    async fn execute(&self, task: &Task) -> anyhow::Result<Value> {
        Ok(json!({
            "kind": "analysis",
            "summary": format!("Analyzed: {}", task.description),
            "inputs": task.context,
        }))
    }
}

/// Produces an artifact from a task description
pub struct BuildBehavior;

#[async_trait]
impl Behavior for BuildBehavior {
    fn name(&self) -> &str {
        "build"
    }

    async fn execute(&self, task: &Task) -> anyhow::Result<Value> {
        Ok(json!({
            "kind": "build",
            "output": format!("Built: {}", task.description),
        }))
    }
}

/// Evaluates prior work carried in the task context
pub struct ReviewBehavior;

#[async_trait]
impl Behavior for ReviewBehavior {
    fn name(&self) -> &str {
        "review"
    }

    async fn execute(&self, task: &Task) -> anyhow::Result<Value> {
        Ok(json!({
            "kind": "review",
            "verdict": "approved",
            "notes": format!("Reviewed: {}", task.description),
            "reviewed": task.context,
        }))
    }
}

/// Fallback routine for workers without a specialized variant
pub struct GenericBehavior;

#[async_trait]
impl Behavior for GenericBehavior {
    fn name(&self) -> &str {
        "generic"
    }

    async fn execute(&self, task: &Task) -> anyhow::Result<Value> {
        Ok(json!({
            "kind": "result",
            "summary": format!("Handled: {}", task.description),
        }))
    }
}

type BoxedRoutine =
    Box<dyn Fn(Task) -> Pin<Box<dyn Future<Output = anyhow::Result<Value>> + Send>> + Send + Sync>;

/// Adapter turning a closure into a behavior, for one-off workers
pub struct FnBehavior {
    name: String,
    routine: BoxedRoutine,
}

impl FnBehavior {
    /// Wrap a synchronous closure
    pub fn new<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Task) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            routine: Box::new(move |task| {
                let out = f(&task);
                let fut: Pin<Box<dyn Future<Output = anyhow::Result<Value>> + Send>> =
                    Box::pin(async move { out });
                fut
            }),
        }
    }

    /// Wrap an asynchronous closure
    pub fn new_async<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Task) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        Self {
            name: name.into(),
            routine: Box::new(move |task| {
                let fut: Pin<Box<dyn Future<Output = anyhow::Result<Value>> + Send>> =
                    Box::pin(f(task));
                fut
            }),
        }
    }
}

#[async_trait]
impl Behavior for FnBehavior {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, task: &Task) -> anyhow::Result<Value> {
        (self.routine)(task.clone()).await
    }
}

/// Choose a behavior variant from a worker's declared role and expertise
///
/// Selection happens once, at construction; the agent never re-inspects
/// its role name afterwards.
pub fn behavior_for(spec: &AgentSpec) -> Box<dyn Behavior> {
    let mut keywords: Vec<String> = vec![spec.role.to_lowercase()];
    keywords.extend(spec.expertise.iter().map(|e| e.to_lowercase()));
    let matches = |needle: &str| keywords.iter().any(|k| k.contains(needle));

    if matches("analy") {
        Box::new(AnalysisBehavior)
    } else if matches("build") || matches("code") || matches("implement") {
        Box::new(BuildBehavior)
    } else if matches("review") {
        Box::new(ReviewBehavior)
    } else {
        Box::new(GenericBehavior)
    }
}
