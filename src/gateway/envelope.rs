use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub total_items: u64,
    pub item_count: u64,
    pub items_per_page: u64,
    pub total_pages: u64,
    pub current_page: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLinks {
    #[serde(default)]
    pub first: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub last: Option<String>,
}

/// One page of records plus paging metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageEnvelope<T> {
    pub items: Vec<T>,
    pub meta: PageMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<PageLinks>,
}

impl<T> PageEnvelope<T> {
    /// Wraps a bare record list as the only page of its listing.
    pub fn single_page(items: Vec<T>, page_size: u64) -> Self {
        let count = items.len() as u64;
        Self {
            items,
            meta: PageMeta {
                total_items: count,
                item_count: count,
                items_per_page: page_size,
                total_pages: 1,
                current_page: 1,
            },
            links: None,
        }
    }

    pub fn total_pages(&self) -> u64 {
        self.meta.total_pages
    }
}

/// The two body shapes the upstream API answers a listing with.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum UpstreamPayload<T> {
    Bare(Vec<T>),
    Page(PageEnvelope<T>),
}

impl<T> UpstreamPayload<T> {
    pub fn into_envelope(self, page_size: u64) -> PageEnvelope<T> {
        match self {
            UpstreamPayload::Bare(items) => PageEnvelope::single_page(items, page_size),
            UpstreamPayload::Page(envelope) => envelope,
        }
    }
}
