use super::RemoteSource;
use super::envelope::{PageEnvelope, PageMeta};
use crate::core::{AdminError, Record, Result};
use crate::reconcile::QueryFilters;
use async_trait::async_trait;
use std::sync::Mutex;

/// A recorded listing request.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRequest {
    pub page: u64,
    pub page_size: u64,
    pub filters: QueryFilters,
}

/// In-process stand-in for the upstream API.
///
/// Serves fixed records in pages, ignores filters (the reconciler applies
/// them client-side) and remembers every request it was asked for.
pub struct MemorySource<T> {
    records: Vec<T>,
    requests: Mutex<Vec<SourceRequest>>,
    failing: Mutex<bool>,
}

impl<T: Record> MemorySource<T> {
    pub fn new(records: Vec<T>) -> Self {
        Self {
            records,
            requests: Mutex::new(Vec::new()),
            failing: Mutex::new(false),
        }
    }

    /// Makes every following request fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        if let Ok(mut guard) = self.failing.lock() {
            *guard = failing;
        }
    }

    pub fn requests(&self) -> Vec<SourceRequest> {
        self.requests
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    fn check_failing(&self) -> Result<()> {
        let failing = self
            .failing
            .lock()
            .map_err(|err| AdminError::Fetch(err.to_string()))?;
        if *failing {
            return Err(AdminError::Fetch("upstream unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl<T: Record> RemoteSource<T> for MemorySource<T> {
    async fn fetch_page(
        &self,
        page: u64,
        page_size: u64,
        filters: &QueryFilters,
    ) -> Result<PageEnvelope<T>> {
        self.requests
            .lock()
            .map_err(|err| AdminError::Fetch(err.to_string()))?
            .push(SourceRequest {
                page,
                page_size,
                filters: filters.clone(),
            });
        self.check_failing()?;

        let size = page_size.max(1) as usize;
        let total_items = self.records.len() as u64;
        let total_pages = (total_items.div_ceil(size as u64)).max(1);
        let start = (page.saturating_sub(1) as usize).saturating_mul(size);
        let items: Vec<T> = self.records.iter().skip(start).take(size).cloned().collect();

        Ok(PageEnvelope {
            meta: PageMeta {
                total_items,
                item_count: items.len() as u64,
                items_per_page: page_size,
                total_pages,
                current_page: page,
            },
            items,
            links: None,
        })
    }

    async fn fetch_by_id(&self, id: u64) -> Result<T> {
        self.check_failing()?;
        self.records
            .iter()
            .find(|record| record.id() == id)
            .cloned()
            .ok_or(AdminError::NotFound(id))
    }
}
