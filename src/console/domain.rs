use crate::core::{AdminError, Entry, LocalIdAllocator, Record, Result};
use crate::gateway::{PageEnvelope, RemoteSource};
use crate::overlay::OverlayStore;
use crate::reconcile::{QueryFilters, RecordFilter, reconcile};
use crate::session::Session;
use std::collections::HashSet;
use tracing::{Level, event, info_span};

/// One listing read to perform, tagged with the ticket that must still be
/// current when its response arrives.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadRequest {
    pub ticket: u64,
    pub page: u64,
    pub page_size: u64,
    pub filters: QueryFilters,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied,
    Failed,
    /// A newer request was issued after this one; the response was dropped.
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageMove {
    First,
    Previous,
    Next,
    Last,
}

/// What the edit form is currently bound to.
#[derive(Debug, Clone, PartialEq)]
pub enum EditTarget<T> {
    New,
    Existing(Entry<T>),
}

/// Listing state for one record kind: paging, filters, the current remote
/// page (with any in-memory edits) and the local overlay.
pub struct DomainController<T: Record> {
    overlay: OverlayStore<T>,
    remote: Vec<T>,
    filters: T::Filters,
    page: u64,
    page_size: u64,
    total_pages: u64,
    issued: u64,
    loading: bool,
    error: Option<String>,
    editing: Option<EditTarget<T>>,
    ids: LocalIdAllocator,
}

impl<T: Record> DomainController<T> {
    pub fn new(overlay: OverlayStore<T>, page_size: u64) -> Self {
        Self {
            overlay,
            remote: Vec::new(),
            filters: T::Filters::default(),
            page: 1,
            page_size: page_size.max(1),
            total_pages: 1,
            issued: 0,
            loading: false,
            error: None,
            editing: None,
            ids: LocalIdAllocator::new(),
        }
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    pub fn total_pages(&self) -> u64 {
        self.total_pages
    }

    pub fn filters(&self) -> &T::Filters {
        &self.filters
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn overlay(&self) -> &OverlayStore<T> {
        &self.overlay
    }

    pub fn remote(&self) -> &[T] {
        &self.remote
    }

    pub fn editing(&self) -> Option<&EditTarget<T>> {
        self.editing.as_ref()
    }

    /// The reconciled, filtered display set.
    pub fn entries(&self) -> Vec<Entry<T>> {
        reconcile(self.overlay.records(), &self.remote, &self.filters)
    }

    /// Looks up a displayable record by id, ignoring the active filters.
    pub fn find(&self, id: u64) -> Option<Entry<T>> {
        reconcile(self.overlay.records(), &self.remote, &T::Filters::default())
            .into_iter()
            .find(|entry| entry.id() == id)
    }

    /// Pagination only applies to the unfiltered remote listing.
    pub fn pagination_visible(&self) -> bool {
        !self.filters.is_active()
    }

    pub fn load_failure_message() -> String {
        format!("Failed to load {}s. Please try again.", T::LABEL)
    }

    // ------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------

    /// Issues a new ticket. Responses for older tickets are discarded.
    pub fn prepare_load(&mut self) -> LoadRequest {
        self.issued += 1;
        self.loading = true;
        self.error = None;
        LoadRequest {
            ticket: self.issued,
            page: self.page,
            page_size: self.page_size,
            filters: self.filters.to_query(),
        }
    }

    pub fn apply_load(&mut self, ticket: u64, result: Result<PageEnvelope<T>>) -> LoadOutcome {
        if ticket != self.issued {
            event!(
                Level::DEBUG,
                collection = T::COLLECTION,
                ticket,
                latest = self.issued,
                "stale load response dropped"
            );
            return LoadOutcome::Stale;
        }

        self.loading = false;
        match result {
            Ok(envelope) => {
                self.total_pages = envelope.meta.total_pages.max(1);
                self.page = self.page.min(self.total_pages);
                self.remote = envelope.items;
                LoadOutcome::Applied
            }
            Err(err) => {
                event!(Level::ERROR, collection = T::COLLECTION, error = %err, "listing load failed");
                self.error = Some(Self::load_failure_message());
                LoadOutcome::Failed
            }
        }
    }

    /// Fetches the current page and applies it.
    pub async fn reload<S>(&mut self, source: &S) -> LoadOutcome
    where
        S: RemoteSource<T> + ?Sized,
    {
        let request = self.prepare_load();
        let result = source
            .fetch_page(request.page, request.page_size, &request.filters)
            .await;
        self.apply_load(request.ticket, result)
    }

    /// Resolves an id to an entry, asking the source when it is not in the
    /// current listing.
    pub async fn lookup<S>(&self, source: &S, id: u64) -> Result<Entry<T>>
    where
        S: RemoteSource<T> + ?Sized,
    {
        if let Some(entry) = self.find(id) {
            return Ok(entry);
        }
        source.fetch_by_id(id).await.map(Entry::Remote)
    }

    // ------------------------------------------------------------------
    // Filters and paging
    // ------------------------------------------------------------------

    /// Replaces the filters. A change resets paging to the first page; the
    /// caller is expected to reload when this returns `true`.
    pub fn set_filters(&mut self, filters: T::Filters) -> bool {
        if filters == self.filters {
            return false;
        }
        self.filters = filters;
        self.page = 1;
        true
    }

    pub fn set_filter(&mut self, field: &str, value: &str) -> Result<bool> {
        let mut next = self.filters.clone();
        next.set_field(field, value)?;
        Ok(self.set_filters(next))
    }

    pub fn clear_filters(&mut self) -> bool {
        self.set_filters(T::Filters::default())
    }

    /// Moves to `page`, clamped to the known page range.
    pub fn goto_page(&mut self, page: u64) -> bool {
        let target = page.clamp(1, self.total_pages);
        if target == self.page {
            return false;
        }
        self.page = target;
        true
    }

    /// Sets the page before the page count is known, e.g. ahead of the
    /// first load.
    pub fn seek(&mut self, page: u64) {
        self.page = page.max(1);
    }

    pub fn move_page(&mut self, step: PageMove) -> bool {
        let target = match step {
            PageMove::First => 1,
            PageMove::Previous => self.page.saturating_sub(1),
            PageMove::Next => self.page.saturating_add(1),
            PageMove::Last => self.total_pages,
        };
        self.goto_page(target)
    }

    // ------------------------------------------------------------------
    // Editing
    // ------------------------------------------------------------------

    pub fn begin_create(&mut self, session: &Session) -> Result<()> {
        session.require_admin(&format!("create a {}", T::LABEL))?;
        self.editing = Some(EditTarget::New);
        Ok(())
    }

    pub fn begin_edit(&mut self, session: &Session, id: u64) -> Result<Entry<T>> {
        session.require_admin(&format!("edit a {}", T::LABEL))?;
        let entry = self.find(id).ok_or(AdminError::NotFound(id))?;
        self.editing = Some(EditTarget::Existing(entry.clone()));
        Ok(entry)
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    /// Saves the form against the current edit target. The target is
    /// released only when the save succeeds.
    pub fn save(&mut self, session: &Session, mut record: T) -> Result<Entry<T>> {
        let saved = match self.editing.clone() {
            Some(EditTarget::Existing(entry)) => {
                record.set_id(entry.id());
                self.update(session, entry.with_record(record))
            }
            Some(EditTarget::New) | None => self.create(session, record),
        }?;
        self.editing = None;
        Ok(saved)
    }

    /// Creates a local record with a freshly allocated id.
    pub fn create(&mut self, session: &Session, mut record: T) -> Result<Entry<T>> {
        let user = session.require_admin(&format!("create a {}", T::LABEL))?;
        let span = info_span!("console.create", collection = T::COLLECTION, user = %user.username);
        let _enter = span.enter();

        record.validate()?;
        let taken: HashSet<u64> = self
            .overlay
            .records()
            .iter()
            .chain(self.remote.iter())
            .map(|record| record.id())
            .collect();
        record.set_id(self.ids.next_id(&taken));

        self.guard_save(|this| this.overlay.create(record.clone()))?;
        event!(Level::INFO, id = record.id(), "local record created");
        Ok(Entry::Local(record))
    }

    /// Local entries are rewritten in the overlay; remote entries are only
    /// replaced in the current listing.
    pub fn update(&mut self, session: &Session, entry: Entry<T>) -> Result<Entry<T>> {
        let user = session.require_admin(&format!("edit a {}", T::LABEL))?;
        let span = info_span!(
            "console.update",
            collection = T::COLLECTION,
            id = entry.id(),
            origin = %entry.origin(),
            user = %user.username
        );
        let _enter = span.enter();

        entry.record().validate()?;
        match &entry {
            Entry::Local(record) => {
                self.guard_save(|this| this.overlay.update(record.clone()))?;
            }
            Entry::Remote(record) => {
                let slot = self
                    .remote
                    .iter_mut()
                    .find(|existing| existing.id() == record.id())
                    .ok_or(AdminError::NotFound(record.id()))?;
                *slot = record.clone();
            }
        }
        event!(Level::INFO, "record updated");
        Ok(entry)
    }

    /// Local entries leave the overlay; remote entries only leave the
    /// current listing and the overlay key is not touched.
    pub fn delete(&mut self, session: &Session, id: u64) -> Result<Entry<T>> {
        let user = session.require_admin(&format!("delete a {}", T::LABEL))?;
        let span = info_span!("console.delete", collection = T::COLLECTION, id, user = %user.username);
        let _enter = span.enter();

        let entry = self.find(id).ok_or(AdminError::NotFound(id))?;
        if entry.is_local() {
            self.guard_delete(|this| this.overlay.delete(id).map(|_| ()))?;
        }
        self.remote.retain(|record| record.id() != id);
        event!(Level::INFO, origin = %entry.origin(), "record deleted");
        Ok(entry)
    }

    fn guard_save<F>(&mut self, op: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        op(self).inspect_err(|_| {
            self.error = Some(format!("Failed to save {}.", T::LABEL));
        })
    }

    fn guard_delete<F>(&mut self, op: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        op(self).inspect_err(|_| {
            self.error = Some(format!("Failed to delete {}.", T::LABEL));
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Character;
    use crate::gateway::PageMeta;
    use crate::overlay::MemoryKeyValueStore;
    use std::sync::Arc;

    fn controller() -> DomainController<Character> {
        let overlay = OverlayStore::open(Arc::new(MemoryKeyValueStore::new())).unwrap();
        DomainController::new(overlay, 2)
    }

    fn page_of(items: Vec<Character>, total_pages: u64) -> PageEnvelope<Character> {
        PageEnvelope {
            meta: PageMeta {
                total_items: items.len() as u64,
                item_count: items.len() as u64,
                items_per_page: 2,
                total_pages,
                current_page: 1,
            },
            items,
            links: None,
        }
    }

    #[test]
    fn stale_ticket_is_discarded() {
        let mut listing = controller();
        let first = listing.prepare_load();
        let second = listing.prepare_load();

        let applied = listing.apply_load(second.ticket, Ok(page_of(vec![Character::named(2, "Vegeta")], 1)));
        assert_eq!(applied, LoadOutcome::Applied);

        let late = listing.apply_load(first.ticket, Ok(page_of(vec![Character::named(1, "Goku")], 9)));
        assert_eq!(late, LoadOutcome::Stale);
        assert_eq!(listing.remote(), &[Character::named(2, "Vegeta")]);
        assert_eq!(listing.total_pages(), 1);
        assert!(!listing.is_loading());
    }

    #[test]
    fn failed_load_sets_message_and_keeps_previous_page() {
        let mut listing = controller();
        let request = listing.prepare_load();
        listing.apply_load(request.ticket, Ok(page_of(vec![Character::named(1, "Goku")], 3)));

        let request = listing.prepare_load();
        let outcome = listing.apply_load(
            request.ticket,
            Err(AdminError::Fetch("connection refused".to_string())),
        );
        assert_eq!(outcome, LoadOutcome::Failed);
        assert_eq!(listing.error(), Some("Failed to load characters. Please try again."));
        assert_eq!(listing.remote().len(), 1);
    }

    #[test]
    fn shrinking_page_count_pulls_current_page_back() {
        let mut listing = controller();
        listing.seek(5);
        let request = listing.prepare_load();
        assert_eq!(request.page, 5);

        listing.apply_load(request.ticket, Ok(page_of(Vec::new(), 3)));
        assert_eq!(listing.page(), 3);
        assert_eq!(listing.prepare_load().page, 3);
    }

    #[test]
    fn paging_clamps_to_known_range() {
        let mut listing = controller();
        let request = listing.prepare_load();
        listing.apply_load(request.ticket, Ok(page_of(Vec::new(), 3)));

        assert!(!listing.move_page(PageMove::Previous));
        assert!(listing.move_page(PageMove::Last));
        assert_eq!(listing.page(), 3);
        assert!(!listing.move_page(PageMove::Next));
        assert!(listing.goto_page(2));
        assert!(listing.goto_page(99));
        assert_eq!(listing.page(), 3);
        assert!(listing.move_page(PageMove::First));
        assert_eq!(listing.page(), 1);
    }

    #[test]
    fn filter_change_resets_page_and_hides_pagination() {
        let mut listing = controller();
        listing.seek(4);
        assert!(listing.pagination_visible());

        assert!(listing.set_filter("race", "Saiyan").unwrap());
        assert_eq!(listing.page(), 1);
        assert!(!listing.pagination_visible());

        assert!(!listing.set_filter("race", "Saiyan").unwrap());
        assert!(listing.set_filter("power", "1").is_err());
        assert!(listing.clear_filters());
        assert!(listing.pagination_visible());
    }

    #[test]
    fn load_request_carries_active_filters() {
        let mut listing = controller();
        listing.set_filter("name", "goku").unwrap();
        let request = listing.prepare_load();
        let names: Vec<&str> = request.filters.active().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["name"]);
        assert_eq!(request.page, 1);
        assert_eq!(request.page_size, 2);
    }
}
