//! A flat file system stores a single directory table, packed at byte alignment:
//!
//! * [Directory Table](directory/index.html)
//!
//! Every structure is little endian. Storage is addressed in sectors of [`SECTOR_SIZE`] bytes,
//! and file headers are referenced by sector number.

pub mod directory;

/// The size in bytes of a storage sector
pub const SECTOR_SIZE: usize = 128;
