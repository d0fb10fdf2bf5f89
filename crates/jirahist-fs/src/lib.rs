//! Filesystem side of jirahist.
//!
//! Reads:
//! - `jirahist.yml`: field catalog, status categories, additional fields
//! - Raw issues as a JSON array, a single JSON object, a search response page
//!   (`{"issues": [...]}`), NDJSON, or a directory of such files

pub mod config;
pub mod error;
pub mod loader;

pub use config::{RunConfig, DEFAULT_CONFIG_FILE};
pub use error::{FsError, Result};
pub use loader::{load_file, load_issues};
