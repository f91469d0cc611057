//! Retrievers as pipeline units.

use std::sync::Arc;

use async_trait::async_trait;

use strand_core::{CallbackHandler, Document, Result, Retriever, RunConfig, Runnable};

/// Exposes a [`Retriever`] as a unit from query to documents.
pub struct RetrieverRunnable<R: ?Sized> {
    retriever: Arc<R>,
}

impl<R: Retriever + ?Sized> RetrieverRunnable<R> {
    /// Wrap a shared retriever.
    pub fn new(retriever: Arc<R>) -> Self {
        Self { retriever }
    }
}

#[async_trait]
impl<R: Retriever + ?Sized + 'static> Runnable<String, Vec<Document>> for RetrieverRunnable<R> {
    fn name(&self) -> &str {
        self.retriever.name()
    }

    async fn invoke(&self, query: String, config: &RunConfig) -> Result<Vec<Document>> {
        config.check_cancelled()?;
        let child = config.child(None)?;
        let callbacks = config.callbacks();
        callbacks.on_retriever_start(&child.run_info(self.name()), &query);
        match self.retriever.get_relevant_documents(&query, &child).await {
            Ok(documents) => {
                tracing::debug!(count = documents.len(), "retrieved documents");
                callbacks.on_retriever_end(child.run_id(), &documents);
                Ok(documents)
            }
            Err(e) => {
                callbacks.on_retriever_error(child.run_id(), &e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use strand_core::{RunError, RunId, RunInfo};

    struct Fixed;

    #[async_trait]
    impl Retriever for Fixed {
        async fn get_relevant_documents(&self, query: &str, _: &RunConfig) -> Result<Vec<Document>> {
            if query.is_empty() {
                return Err(RunError::Retriever("empty query".into()));
            }
            Ok(vec![Document::new(format!("about {query}"))])
        }
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl CallbackHandler for Recorder {
        fn on_retriever_start(&self, run: &RunInfo<'_>, query: &str) {
            self.0.lock().push(format!("start:{query}:{}", run.parent_run_id.is_some()));
        }
        fn on_retriever_end(&self, _: &RunId, documents: &[Document]) {
            self.0.lock().push(format!("end:{}", documents.len()));
        }
        fn on_retriever_error(&self, _: &RunId, _: &RunError) {
            self.0.lock().push("error".into());
        }
    }

    #[tokio::test]
    async fn emits_retriever_events() {
        let recorder = Arc::new(Recorder::default());
        let config = RunConfig::builder()
            .with_callbacks([Arc::clone(&recorder) as Arc<dyn CallbackHandler>])
            .build();
        let unit = RetrieverRunnable::new(Arc::new(Fixed));
        assert_eq!(unit.name(), "Retriever");

        let docs = unit.invoke("rust".into(), &config).await.unwrap();
        assert_eq!(docs[0].page_content, "about rust");
        assert!(unit.invoke(String::new(), &config).await.is_err());

        assert_eq!(
            *recorder.0.lock(),
            vec!["start:rust:true", "end:1", "start::true", "error"]
        );
    }

    #[tokio::test]
    async fn local_handler_sees_retriever_events() {
        let recorder = Arc::new(Recorder::default());
        let config = RunConfig::builder()
            .with_local_callback(Arc::clone(&recorder) as Arc<dyn CallbackHandler>)
            .build();
        let unit = RetrieverRunnable::new(Arc::new(Fixed));

        let _ = unit.invoke("rust".into(), &config).await.unwrap();
        assert_eq!(*recorder.0.lock(), vec!["start:rust:true", "end:1"]);
    }
}
