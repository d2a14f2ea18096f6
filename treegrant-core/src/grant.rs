//! Persistent read grants

use crate::handle::TreeHandle;
use crate::provider::{DocumentProvider, ProviderError};
use crate::TreeGrantError;
use std::sync::Arc;

/// Requests, lists and releases durable grants through the provider's
/// permission store.
#[derive(Clone)]
pub struct GrantManager {
    provider: Arc<dyn DocumentProvider>,
}

impl GrantManager {
    pub fn new(provider: Arc<dyn DocumentProvider>) -> Self {
        Self { provider }
    }

    /// Ensure a persisted read grant exists for `handle`. Idempotent.
    pub async fn ensure_grant(&self, handle: &TreeHandle) -> crate::Result<()> {
        self.provider
            .take_persistable_grant(handle)
            .await
            .map_err(|e| TreeGrantError::GrantDenied {
                handle: handle.to_string(),
                reason: e.to_string(),
            })?;
        tracing::debug!(handle = %handle, "grant ensured");
        Ok(())
    }

    /// Release the grant for `handle`. Releasing an absent grant is a no-op.
    pub async fn revoke(&self, handle: &TreeHandle) -> crate::Result<()> {
        self.provider
            .release_persistable_grant(handle)
            .await
            .map_err(|e| match e {
                ProviderError::Io(e) => TreeGrantError::Io(e),
                ProviderError::Serialization(e) => TreeGrantError::Serialization(e),
                other => TreeGrantError::GrantDenied {
                    handle: handle.to_string(),
                    reason: other.to_string(),
                },
            })?;
        tracing::debug!(handle = %handle, "grant released");
        Ok(())
    }

    /// Trees currently holding a persisted grant
    pub async fn granted(&self) -> crate::Result<Vec<TreeHandle>> {
        self.provider.persisted_grants().await.map_err(|e| match e {
            ProviderError::Io(e) => TreeGrantError::Io(e),
            ProviderError::Serialization(e) => TreeGrantError::Serialization(e),
            other => TreeGrantError::Io(std::io::Error::other(format!(
                "failed to read grant store: {other}"
            ))),
        })
    }
}
