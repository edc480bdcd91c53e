//! Per-title session configuration and on-disk layout.
//!
//! - `SessionLayout`: computed paths for a session root (no I/O).
//! - `SessionConfig`: serializable session metadata (`.symstate/session.json`,
//!   or `session.yaml` next to it).
//! - `SessionContext`: layout + config loaded together, with helpers to open
//!   the signature database, load the memory image and find the map file.

mod context;
mod layout;
mod session;
mod util;

pub use context::SessionContext;
pub use layout::SessionLayout;
pub use session::{HardwareSizes, MemoryConfig, SessionConfig, SignatureDbConfig};
pub use util::{find_map_file, load_map_on_boot, load_session_config, open_signature_db, MapFileLookup};
