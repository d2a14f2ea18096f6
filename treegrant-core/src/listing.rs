//! Listing orchestration: parse, grant, query, map

use crate::executor::ProviderQueryExecutor;
use crate::grant::GrantManager;
use crate::handle::TreeHandle;
use crate::provider::DocumentProvider;
use crate::query::ChildQueryBuilder;
use crate::record::{DocumentRecord, RecordMapper};
use std::fmt::{self, Display};
use std::sync::Arc;

/// Children of a tree root, in the provider's row order
pub type Listing = Vec<DocumentRecord>;

/// Progress of one listing call. Stages only move forward; a failure
/// ends the call at whatever stage was last reached. Mapping the rows is
/// the final step, so a fully mapped listing is `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ListingStage {
    Start,
    Parsed,
    Granted,
    Queried,
    Done,
}

impl Display for ListingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Start => "start",
            Self::Parsed => "parsed",
            Self::Granted => "granted",
            Self::Queried => "queried",
            Self::Done => "done",
        };
        f.write_str(s)
    }
}

#[derive(Clone)]
pub struct ListingService {
    grants: GrantManager,
    executor: ProviderQueryExecutor,
}

impl ListingService {
    pub fn new(provider: Arc<dyn DocumentProvider>) -> Self {
        Self {
            grants: GrantManager::new(Arc::clone(&provider)),
            executor: ProviderQueryExecutor::new(provider),
        }
    }

    pub fn grants(&self) -> &GrantManager {
        &self.grants
    }

    /// List the immediate children of the tree named by `handle`.
    ///
    /// All-or-nothing: any failing step ends the call with that step's
    /// error and no partial listing.
    pub async fn list_children(&self, handle: &str) -> crate::Result<Listing> {
        let mut stage = ListingStage::Start;
        let result = self.run(handle, &mut stage).await;
        match &result {
            Ok(listing) => {
                tracing::debug!(handle, count = listing.len(), "listing complete");
            }
            Err(err) => {
                tracing::warn!(
                    handle,
                    failed_after = %stage,
                    kind = %err.kind(),
                    error = %err,
                    "listing failed"
                );
            }
        }
        result
    }

    async fn run(&self, input: &str, stage: &mut ListingStage) -> crate::Result<Listing> {
        let handle = TreeHandle::parse(input)?;
        *stage = ListingStage::Parsed;

        self.grants.ensure_grant(&handle).await?;
        *stage = ListingStage::Granted;

        let target = ChildQueryBuilder::children_target(&handle);
        let rows = self
            .executor
            .execute(&target, ChildQueryBuilder::fields_to_fetch())
            .await?;
        *stage = ListingStage::Queried;

        // The stream is dropped (and its cursor closed) on the first bad row
        let listing = rows
            .enumerate()
            .map(|(index, row)| RecordMapper::to_record(&handle, index, &row))
            .collect::<crate::Result<Listing>>()?;
        *stage = ListingStage::Done;
        Ok(listing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ErrorKind, FieldId, InMemoryProvider, RawRow};

    fn handle() -> TreeHandle {
        TreeHandle::parse("tree://providerA/root123").unwrap()
    }

    #[tokio::test]
    async fn test_bad_row_fails_whole_call_and_closes_cursor() {
        let provider = Arc::new(InMemoryProvider::new());
        provider.add_tree(
            &handle(),
            vec![
                RawRow::child("f1", "a.txt", "text/plain"),
                RawRow::new().with(FieldId::DocumentId, "f2"),
                RawRow::child("f3", "c.txt", "text/plain"),
            ],
        );
        let service = ListingService::new(provider.clone());

        let err = service
            .list_children("tree://providerA/root123")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedRow);
        assert_eq!(provider.opened_cursors(), 1);
        assert_eq!(provider.open_cursors(), 0);
    }

    #[tokio::test]
    async fn test_row_failure_is_reported_after_query() {
        let provider = Arc::new(InMemoryProvider::new());
        provider.add_tree(&handle(), vec![RawRow::new()]);
        let service = ListingService::new(provider);

        let mut stage = ListingStage::Start;
        let err = service
            .run("tree://providerA/root123", &mut stage)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedRow);
        assert_eq!(stage, ListingStage::Queried);

        let mut stage = ListingStage::Start;
        service.run("not-a-uri", &mut stage).await.unwrap_err();
        assert_eq!(stage, ListingStage::Start);
    }

    #[tokio::test]
    async fn test_grant_denied_skips_query() {
        let provider = Arc::new(InMemoryProvider::new());
        let service = ListingService::new(provider.clone());

        let err = service
            .list_children("tree://providerA/root123")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::GrantDenied);
        assert_eq!(provider.opened_cursors(), 0);
    }

    #[test]
    fn test_stage_order() {
        assert!(ListingStage::Start < ListingStage::Parsed);
        assert!(ListingStage::Queried < ListingStage::Done);
        assert_eq!(ListingStage::Granted.to_string(), "granted");
    }
}
