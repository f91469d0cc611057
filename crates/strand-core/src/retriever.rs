//! Document retrieval contract.

use async_trait::async_trait;

use crate::config::RunConfig;
use crate::errors::Result;
use crate::messages::Document;

/// Looks up documents relevant to a query.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Display name used in callbacks.
    fn name(&self) -> &str {
        "Retriever"
    }

    /// Documents relevant to `query`, most relevant first.
    async fn get_relevant_documents(&self, query: &str, config: &RunConfig)
    -> Result<Vec<Document>>;
}
