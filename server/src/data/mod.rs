//! Data storage layer
//!
//! - `filters` - Query parameter translation and SQL rendering
//! - `sqlite` - Connection pool and resource table access
//! - `traits` - Store trait the API layer is written against
//! - `error` - Unified error type for the data layer

pub mod error;
pub mod filters;
pub mod sqlite;
pub mod traits;

pub use error::DataError;
pub use sqlite::SqliteService;
pub use traits::{Page, Record, ResourceStore, TableRef};
