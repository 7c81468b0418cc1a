pub mod loader;
pub mod schema;

pub use loader::{load_source_config, load_source_config_from_str};
pub use schema::{parse_verify_flag, Credentials, RegistrySyncEntry, SourceConfig};
