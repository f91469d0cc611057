//! Lookup of tools by name.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use strand_core::ToolDefinition;

use crate::traits::Tool;

/// Filter for deriving a narrower registry.
#[derive(Clone, Debug)]
pub enum ToolFilter {
    /// Every tool.
    All,
    /// Every tool except these.
    Except(HashSet<String>),
    /// Only these tools.
    Only(HashSet<String>),
}

/// Tools an agent may call, looked up by exact name.
///
/// Cloning is cheap; entries are shared.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, returning any tool it replaced.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Option<Arc<dyn Tool>> {
        let name = tool.name().to_string();
        self.tools.insert(name, tool)
    }

    /// Add a tool, replacing any tool with the same name.
    #[must_use]
    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        let _ = self.register(tool);
        self
    }

    /// Unregister a tool by name.
    pub fn unregister(&mut self, name: &str) -> bool {
        self.tools.remove(name).is_some()
    }

    /// The tool registered under `name`.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).map(Arc::clone)
    }

    /// True if a tool is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// All tool names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    /// Definitions for model tool binding, sorted by name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.to_definition()).collect()
    }

    /// `name: description` per line, for prompt rendering.
    pub fn render_descriptions(&self) -> String {
        self.tools
            .values()
            .map(|t| format!("{}: {}", t.name(), t.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// True when no tool is registered.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Copy holding only the tools the filter admits.
    pub fn filtered(&self, filter: &ToolFilter) -> Self {
        let tools = self
            .tools
            .iter()
            .filter(|(name, _)| match filter {
                ToolFilter::All => true,
                ToolFilter::Except(excluded) => !excluded.contains(*name),
                ToolFilter::Only(included) => included.contains(*name),
            })
            .map(|(name, tool)| (name.clone(), Arc::clone(tool)))
            .collect();
        Self { tools }
    }
}

impl FromIterator<Arc<dyn Tool>> for ToolRegistry {
    fn from_iter<T: IntoIterator<Item = Arc<dyn Tool>>>(iter: T) -> Self {
        let mut registry = Self::new();
        for tool in iter {
            let _ = registry.register(tool);
        }
        registry
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{ToolContext, ToolError};
    use async_trait::async_trait;

    struct DummyTool {
        name: String,
    }

    fn dummy(name: &str) -> Arc<dyn Tool> {
        Arc::new(DummyTool {
            name: name.to_string(),
        })
    }

    #[async_trait]
    impl Tool for DummyTool {
        fn name(&self) -> &str {
            &self.name
        }
        fn description(&self) -> &str {
            "A dummy tool for testing"
        }
        async fn run(&self, _input: &str, _ctx: &ToolContext) -> Result<String, ToolError> {
            Ok("ok".into())
        }
    }

    #[test]
    fn register_and_get() {
        let mut registry = ToolRegistry::new();
        assert!(registry.register(dummy("search")).is_none());

        assert!(registry.contains("search"));
        assert!(!registry.contains("Search"));
        assert_eq!(registry.len(), 1);
        assert!(registry.get("search").is_some());
    }

    #[test]
    fn register_replaces_same_name() {
        let mut registry = ToolRegistry::new();
        let _ = registry.register(dummy("calc"));
        assert!(registry.register(dummy("calc")).is_some());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn unregister() {
        let mut registry = ToolRegistry::new().with_tool(dummy("calc"));
        assert!(registry.unregister("calc"));
        assert!(!registry.contains("calc"));
        assert!(!registry.unregister("calc"));
        assert!(registry.is_empty());
    }

    #[test]
    fn names_sorted() {
        let registry: ToolRegistry = [dummy("search"), dummy("calculator"), dummy("weather")]
            .into_iter()
            .collect();
        assert_eq!(registry.names(), vec!["calculator", "search", "weather"]);
    }

    #[test]
    fn definitions_sorted() {
        let registry = ToolRegistry::new().with_tool(dummy("b")).with_tool(dummy("a"));
        let defs = registry.definitions();
        assert_eq!(defs.len(), 2);
        assert_eq!(defs[0].name, "a");
        assert_eq!(defs[1].name, "b");
    }

    #[test]
    fn render_descriptions_one_per_line() {
        let registry = ToolRegistry::new().with_tool(dummy("b")).with_tool(dummy("a"));
        assert_eq!(
            registry.render_descriptions(),
            "a: A dummy tool for testing\nb: A dummy tool for testing"
        );
    }

    #[test]
    fn filtered_variants() {
        let registry: ToolRegistry = [dummy("read"), dummy("write"), dummy("shell")]
            .into_iter()
            .collect();

        assert_eq!(registry.filtered(&ToolFilter::All).len(), 3);

        let except = registry.filtered(&ToolFilter::Except(HashSet::from(["shell".to_string()])));
        assert_eq!(except.names(), vec!["read", "write"]);

        let only = registry.filtered(&ToolFilter::Only(HashSet::from(["read".to_string()])));
        assert_eq!(only.names(), vec!["read"]);
    }
}
