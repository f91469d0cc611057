//! Fan-out of lifecycle events to registered handlers.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::{ActionEvent, CallbackHandler, FinishEvent, LlmResult, RunInfo};
use crate::errors::RunError;
use crate::ids::RunId;
use crate::messages::{Document, Message};

/// Ordered fan-out over a set of handlers.
///
/// Handlers registered as inheritable are carried into [`child`](Self::child)
/// managers, so a tool call nested inside a pipeline stage reports to the same
/// tracer without re-registration. Local handlers see only this level.
#[derive(Clone, Default)]
pub struct CallbackManager {
    handlers: Vec<Arc<dyn CallbackHandler>>,
    inheritable: Vec<Arc<dyn CallbackHandler>>,
    tags: Vec<String>,
}

impl CallbackManager {
    /// An empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for this level only.
    #[must_use]
    pub fn with_handler(mut self, handler: Arc<dyn CallbackHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Register a handler for this level and every nested level.
    #[must_use]
    pub fn with_inheritable_handler(mut self, handler: Arc<dyn CallbackHandler>) -> Self {
        self.inheritable.push(Arc::clone(&handler));
        self.handlers.push(handler);
        self
    }

    /// Add a tag to this level.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Derive the manager for a nested execution.
    pub fn child(&self, tag: Option<&str>) -> Self {
        let mut tags = self.tags.clone();
        if let Some(tag) = tag {
            tags.push(tag.to_string());
        }
        Self {
            handlers: self.inheritable.clone(),
            inheritable: self.inheritable.clone(),
            tags,
        }
    }

    /// Handlers that receive events at this level.
    pub fn handlers(&self) -> &[Arc<dyn CallbackHandler>] {
        &self.handlers
    }

    /// Handlers carried into child managers.
    pub fn inheritable_handlers(&self) -> &[Arc<dyn CallbackHandler>] {
        &self.inheritable
    }

    /// Tags of this level and its ancestors.
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// True when no handler is registered here.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    fn each(&self, f: impl Fn(&dyn CallbackHandler)) {
        for handler in &self.handlers {
            f(handler.as_ref());
        }
    }
}

impl fmt::Debug for CallbackManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackManager")
            .field("handlers", &self.handlers.len())
            .field("inheritable", &self.inheritable.len())
            .field("tags", &self.tags)
            .finish()
    }
}

impl CallbackHandler for CallbackManager {
    fn on_llm_start(&self, run: &RunInfo<'_>, prompts: &[String]) {
        self.each(|h| h.on_llm_start(run, prompts));
    }

    fn on_chat_model_start(&self, run: &RunInfo<'_>, messages: &[Message]) {
        self.each(|h| h.on_chat_model_start(run, messages));
    }

    fn on_llm_new_token(&self, run_id: &RunId, token: &str) {
        self.each(|h| h.on_llm_new_token(run_id, token));
    }

    fn on_llm_end(&self, run_id: &RunId, result: &LlmResult) {
        self.each(|h| h.on_llm_end(run_id, result));
    }

    fn on_llm_error(&self, run_id: &RunId, error: &RunError) {
        self.each(|h| h.on_llm_error(run_id, error));
    }

    fn on_chain_start(&self, run: &RunInfo<'_>, inputs: &Value) {
        self.each(|h| h.on_chain_start(run, inputs));
    }

    fn on_chain_end(&self, run_id: &RunId, outputs: &Value) {
        self.each(|h| h.on_chain_end(run_id, outputs));
    }

    fn on_chain_error(&self, run_id: &RunId, error: &RunError) {
        self.each(|h| h.on_chain_error(run_id, error));
    }

    fn on_tool_start(&self, run: &RunInfo<'_>, tool: &str, input: &str) {
        self.each(|h| h.on_tool_start(run, tool, input));
    }

    fn on_tool_end(&self, run_id: &RunId, output: &str) {
        self.each(|h| h.on_tool_end(run_id, output));
    }

    fn on_tool_error(&self, run_id: &RunId, error: &RunError) {
        self.each(|h| h.on_tool_error(run_id, error));
    }

    fn on_agent_action(&self, run_id: &RunId, action: &ActionEvent) {
        self.each(|h| h.on_agent_action(run_id, action));
    }

    fn on_agent_finish(&self, run_id: &RunId, finish: &FinishEvent) {
        self.each(|h| h.on_agent_finish(run_id, finish));
    }

    fn on_retriever_start(&self, run: &RunInfo<'_>, query: &str) {
        self.each(|h| h.on_retriever_start(run, query));
    }

    fn on_retriever_end(&self, run_id: &RunId, documents: &[Document]) {
        self.each(|h| h.on_retriever_end(run_id, documents));
    }

    fn on_retriever_error(&self, run_id: &RunId, error: &RunError) {
        self.each(|h| h.on_retriever_error(run_id, error));
    }

    fn on_text(&self, run_id: &RunId, text: &str) {
        self.each(|h| h.on_text(run_id, text));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callbacks::NoopHandler;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        label: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl CallbackHandler for Recorder {
        fn on_chain_start(&self, run: &RunInfo<'_>, _inputs: &Value) {
            self.log.lock().push(format!("{}:chain_start:{}", self.label, run.name));
        }

        fn on_tool_end(&self, _run_id: &RunId, output: &str) {
            self.log.lock().push(format!("{}:tool_end:{output}", self.label));
        }
    }

    fn info<'a>(run_id: &'a RunId) -> RunInfo<'a> {
        RunInfo {
            run_id,
            parent_run_id: None,
            name: "seq",
            tags: &[],
        }
    }

    #[test]
    fn dispatches_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let manager = CallbackManager::new()
            .with_handler(Arc::new(Recorder { label: "a", log: Arc::clone(&log) }))
            .with_handler(Arc::new(NoopHandler))
            .with_handler(Arc::new(Recorder { label: "b", log: Arc::clone(&log) }));

        let run_id = RunId::new();
        manager.on_chain_start(&info(&run_id), &Value::Null);
        manager.on_tool_end(&run_id, "42");

        assert_eq!(
            *log.lock(),
            vec![
                "a:chain_start:seq",
                "b:chain_start:seq",
                "a:tool_end:42",
                "b:tool_end:42",
            ]
        );
    }

    #[test]
    fn child_keeps_only_inheritable_handlers() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let manager = CallbackManager::new()
            .with_handler(Arc::new(Recorder { label: "local", log: Arc::clone(&log) }))
            .with_inheritable_handler(Arc::new(Recorder {
                label: "shared",
                log: Arc::clone(&log),
            }));
        assert_eq!(manager.handlers().len(), 2);

        let child = manager.child(Some("tool"));
        assert_eq!(child.handlers().len(), 1);
        assert_eq!(child.tags(), ["tool".to_string()]);

        child.on_tool_end(&RunId::new(), "ok");
        assert_eq!(*log.lock(), vec!["shared:tool_end:ok"]);

        let grandchild = child.child(None);
        assert_eq!(grandchild.handlers().len(), 1);
    }

    #[test]
    fn empty_manager_is_silent() {
        let manager = CallbackManager::new();
        assert!(manager.is_empty());
        manager.on_text(&RunId::new(), "nothing happens");
    }
}
