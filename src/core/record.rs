//! Record identity and origin tagging.

use crate::core::{AdminError, Result};
use crate::reconcile::RecordFilter;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Lower bound for ids handed out to locally created records.
///
/// Upstream ids stay well below this value, and clock-derived ids are far
/// above it, so the two ranges never meet in practice.
pub const LOCAL_ID_FLOOR: u64 = 1_000_000;

/// A record kind served by the remote API and mirrored in the overlay.
pub trait Record:
    Clone + std::fmt::Debug + PartialEq + Serialize + DeserializeOwned + Default + Send + Sync + 'static
{
    /// Path segment of the upstream collection (`/characters`).
    const COLLECTION: &'static str;

    /// Durable storage key of the local overlay.
    const OVERLAY_KEY: &'static str;

    /// Singular label used in user-facing messages.
    const LABEL: &'static str;

    type Filters: RecordFilter<Self>;

    fn id(&self) -> u64;

    fn set_id(&mut self, id: u64);

    fn name(&self) -> &str;

    /// Field names accepted by [`Record::set_field`].
    fn fields() -> &'static [&'static str];

    /// Assigns a field from its textual form (`race=Saiyan`).
    fn set_field(&mut self, field: &str, value: &str) -> Result<()>;

    /// Column headers used by the listing views.
    fn columns() -> &'static [&'static str];

    /// Cell values matching [`Record::columns`].
    fn cells(&self) -> Vec<String>;

    fn validate(&self) -> Result<()> {
        if self.name().trim().is_empty() {
            return Err(AdminError::Validation(format!(
                "{} name cannot be empty",
                Self::LABEL
            )));
        }
        Ok(())
    }
}

/// Splits a `field=value` assignment. The value may be empty.
pub fn parse_assignment(raw: &str) -> Result<(&str, &str)> {
    let (field, value) = raw.split_once('=').ok_or_else(|| {
        AdminError::Validation(format!("Invalid assignment '{}'. Expected field=value", raw.trim()))
    })?;
    let field = field.trim();
    if field.is_empty() {
        return Err(AdminError::Validation(format!(
            "Missing field name in '{}'",
            raw.trim()
        )));
    }
    Ok((field, value.trim()))
}

/// Applies `field=value` assignments to a record in order.
pub fn apply_assignments<T: Record, S: AsRef<str>>(record: &mut T, assignments: &[S]) -> Result<()> {
    for raw in assignments {
        let (field, value) = parse_assignment(raw.as_ref())?;
        record.set_field(field, value)?;
    }
    Ok(())
}

/// Storage tier a displayed record was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Remote,
    Local,
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Origin::Remote => f.write_str("remote"),
            Origin::Local => f.write_str("local"),
        }
    }
}

/// A displayed record together with its origin.
///
/// Remote entries are read-only upstream; edits to them only live in the
/// current listing. Local entries belong to the overlay store.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "origin", content = "record", rename_all = "lowercase")]
pub enum Entry<T> {
    Remote(T),
    Local(T),
}

impl<T: Record> Entry<T> {
    pub fn id(&self) -> u64 {
        self.record().id()
    }

    pub fn record(&self) -> &T {
        match self {
            Entry::Remote(record) | Entry::Local(record) => record,
        }
    }

    pub fn into_record(self) -> T {
        match self {
            Entry::Remote(record) | Entry::Local(record) => record,
        }
    }

    pub fn origin(&self) -> Origin {
        match self {
            Entry::Remote(_) => Origin::Remote,
            Entry::Local(_) => Origin::Local,
        }
    }

    #[inline]
    pub fn is_local(&self) -> bool {
        matches!(self, Entry::Local(_))
    }

    /// Same origin, different payload.
    pub fn with_record(&self, record: T) -> Self {
        match self {
            Entry::Remote(_) => Entry::Remote(record),
            Entry::Local(_) => Entry::Local(record),
        }
    }
}

/// Hands out clock-derived ids for new local records.
///
/// Ids are strictly increasing within one allocator and skip any id the
/// caller reports as taken.
#[derive(Debug, Default)]
pub struct LocalIdAllocator {
    last: u64,
}

impl LocalIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self, taken: &HashSet<u64>) -> u64 {
        let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
        let mut candidate = now.max(LOCAL_ID_FLOOR).max(self.last.saturating_add(1));
        while taken.contains(&candidate) {
            candidate += 1;
        }
        self.last = candidate;
        candidate
    }
}
