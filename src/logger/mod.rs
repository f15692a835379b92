//! Process-wide `tracing` setup. Installed once in `main` before settings are
//! read, then narrowed to the configured filter.

mod logger;
pub use logger::*;

pub use tracing::{debug, error, info, trace, warn};
