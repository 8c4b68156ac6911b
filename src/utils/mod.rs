pub mod fs;
pub mod url;

pub use fs::{atomic_write, ensure_dir, resolve_path, safe_write};
pub use url::hash_parameter;
