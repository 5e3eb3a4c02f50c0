//! Tool trait: the abstraction over workers.
//!
//! Workers are independent capabilities (a CVE lookup, a weather query, ...)
//! that the model may request mid-conversation through an inline directive.
//! Each one is registered explicitly, with its documentation attached at
//! registration time, into a [`ToolRegistry`] that is read-only once built.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use crate::error::ToolError;

/// Arguments passed to a worker: string keys to string values.
pub type ToolArgs = BTreeMap<String, String>;

/// The core Tool trait.
///
/// Argument names are whatever the implementation accepts; they are not
/// declared up front. The documentation text is shown verbatim to the model.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this worker (e.g., "weather_api").
    fn name(&self) -> &str;

    /// Free-text usage documentation, including an example directive.
    fn documentation(&self) -> &str;

    /// Execute the worker. The output is serialized into the digest as JSON.
    async fn execute(&self, args: ToolArgs) -> std::result::Result<serde_json::Value, ToolError>;
}

/// A registry of available workers.
///
/// Registration order is preserved and is the order in which workers are
/// advertised to the model.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a worker. Replaces any existing worker with the same name,
    /// keeping the original position.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        match self.index.get(&name) {
            Some(&i) => self.tools[i] = tool,
            None => {
                self.index.insert(name, self.tools.len());
                self.tools.push(tool);
            }
        }
    }

    /// Builder-style registration.
    pub fn with(mut self, tool: Arc<dyn Tool>) -> Self {
        self.register(tool);
        self
    }

    /// Get a worker by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.index.get(name).map(|&i| Arc::clone(&self.tools[i]))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// All registered worker names, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    /// All registered workers, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Tool>> {
        self.tools.iter()
    }

    /// Workers that are both registered and named in `allowed`, in
    /// registration order. Unknown names in `allowed` are ignored.
    pub fn permitted<S: AsRef<str>>(&self, allowed: &[S]) -> Vec<Arc<dyn Tool>> {
        self.tools
            .iter()
            .filter(|t| allowed.iter().any(|a| a.as_ref() == t.name()))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
