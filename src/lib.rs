// ============================================================================
// Dragon Ball Admin Library
// ============================================================================

pub mod config;
pub mod console;
pub mod core;
pub mod gateway;
pub mod logging;
pub mod overlay;
pub mod reconcile;
pub mod session;

// Re-export main types for convenience
pub use config::ConsoleConfig;
pub use console::{Console, DomainController, EditTarget, LoadOutcome, PageMove, View};
pub use crate::core::{
    AdminError, Character, Entry, LOCAL_ID_FLOOR, Origin, Planet, Record, Result, Role, User,
};
pub use gateway::{HttpGateway, MemorySource, PageEnvelope, PageMeta, RemoteSource};
pub use overlay::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore, OverlayStore};
pub use reconcile::{CharacterFilters, PlanetFilters, QueryFilters, RecordFilter, reconcile};
pub use session::{CredentialDirectory, Session};
