//! Query execution against the provider

use crate::provider::{DocumentProvider, FieldId, QueryTarget, RowStream};
use crate::TreeGrantError;
use std::sync::Arc;

#[derive(Clone)]
pub struct ProviderQueryExecutor {
    provider: Arc<dyn DocumentProvider>,
}

impl ProviderQueryExecutor {
    pub fn new(provider: Arc<dyn DocumentProvider>) -> Self {
        Self { provider }
    }

    /// Open a fresh cursor for `target`.
    ///
    /// Zero rows is a valid empty stream. A provider error or a null result
    /// both mean the query could not be opened and yield `QueryUnavailable`.
    pub async fn execute(&self, target: &QueryTarget, fields: &[FieldId]) -> crate::Result<RowStream> {
        let unavailable = |reason: String| TreeGrantError::QueryUnavailable {
            target: target.to_string(),
            reason,
        };

        let cursor = self
            .provider
            .open_query(target, fields)
            .await
            .map_err(|e| unavailable(e.to_string()))?
            .ok_or_else(|| unavailable("provider returned no result".to_string()))?;

        tracing::debug!(target = %target, "query opened");
        Ok(RowStream::new(cursor))
    }
}
