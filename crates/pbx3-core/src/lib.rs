// pbx3-core: Session lifecycle and schema metadata between pbx3-api and consumers.

pub mod config;
pub mod console;
pub mod error;
pub mod form_errors;
pub mod list;
pub mod schema;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{ConnectionConfig, TlsVerification};
pub use console::Console;
pub use error::CoreError;
pub use form_errors::{field_errors, first_error_message};
pub use list::normalize_list;
pub use schema::{
    CacheState, FieldMutability, ResourceSchema, SCHEMAS_PATH, SchemaCache, SchemaMap,
};
