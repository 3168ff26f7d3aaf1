pub mod error;
pub mod record;
pub mod types;

pub use error::{AdminError, Result};
pub use record::{
    Entry, LOCAL_ID_FLOOR, LocalIdAllocator, Origin, Record, apply_assignments, parse_assignment,
};
pub use types::{Character, Planet, Role, User, parse_flag};
