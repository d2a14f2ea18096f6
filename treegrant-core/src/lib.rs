//! Treegrant Core - Durable tree grants and normalized child listings
//!
//! This library parses opaque tree handles, secures a persistent read grant
//! for them from a document provider, and lists the immediate children of the
//! tree root as provider-agnostic records.

pub mod config;
pub mod error;
pub mod executor;
pub mod grant;
pub mod handle;
pub mod listing;
pub mod local;
pub mod memory;
pub mod provider;
pub mod query;
pub mod record;

pub use config::Config;
pub use error::{ErrorEnvelope, ErrorKind, TreeGrantError, LIST_FILES_CODE};
pub use executor::ProviderQueryExecutor;
pub use grant::GrantManager;
pub use handle::{DocumentRef, TreeHandle};
pub use listing::{Listing, ListingService, ListingStage};
pub use local::LocalTreeProvider;
pub use memory::InMemoryProvider;
pub use provider::{
    DocumentProvider, FieldId, ProviderError, QueryTarget, RawRow, RowCursor, RowStream, VecCursor,
};
pub use query::ChildQueryBuilder;
pub use record::{DocumentRecord, RecordMapper, DIRECTORY_MIME};

/// Result type alias for treegrant operations
pub type Result<T> = std::result::Result<T, TreeGrantError>;
