//! Remote data gateway.
//!
//! Issues paginated, filtered reads against the upstream collections and
//! normalizes the two response shapes into one [`PageEnvelope`].

pub mod envelope;
pub mod http;
pub mod memory;

pub use envelope::{PageEnvelope, PageLinks, PageMeta, UpstreamPayload};
pub use http::HttpGateway;
pub use memory::{MemorySource, SourceRequest};

use crate::core::{Record, Result};
use crate::reconcile::QueryFilters;
use async_trait::async_trait;

/// A read-only source of records of one kind.
///
/// Any transport or HTTP failure surfaces as [`crate::AdminError::Fetch`].
/// No retries are attempted.
#[async_trait]
pub trait RemoteSource<T: Record>: Send + Sync {
    async fn fetch_page(
        &self,
        page: u64,
        page_size: u64,
        filters: &QueryFilters,
    ) -> Result<PageEnvelope<T>>;

    async fn fetch_by_id(&self, id: u64) -> Result<T>;
}
