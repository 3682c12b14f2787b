//! A flat, growable directory table stored in a single file
//!
//! See [`repr`] for the on-disk format.

use slog::{Drain, Logger};

pub mod config;
pub mod directory;
pub mod errors;
pub mod header;
pub mod name;
pub mod shared;

pub use crate::config::NamePolicy;
pub use crate::directory::{Directory, DirectoryBuilder, Location, Names};
pub use crate::errors::{Error, Result};
pub use crate::header::{HeaderSource, RawHeader, SectorHeaders};
pub use crate::name::FileName;
pub use crate::shared::SharedDirectory;

fn default_logger() -> Logger {
    slog::Logger::root(slog_stdlog::StdLog.fuse(), slog::o!())
}
