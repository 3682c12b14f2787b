//! Directory Table
//!
//! The directory is a flat table of fixed size entries. Each entry maps a file name to the
//! sector where that file's header is stored. The table is stored in the directory file as:
//!
//! * offset [`COUNT_OFFSET`]: the number of entries in the table, as a little endian `u32`
//! * offset [`TABLE_START`]: `count` packed [`Entry`] records
//!
//! The first record-sized slot of the file is reserved: the count occupies its first four
//! bytes, and the rest is never read. Entries are never compacted, so a free entry can sit
//! between two used entries.
//!
//! The table only ever grows by [`ENTRIES_PER_SECTOR`] entries at a time, one sector's worth.

use static_assertions::const_assert_eq;
use std::mem;
use zerocopy::byteorder::{LittleEndian, U32};
use zerocopy::{AsBytes, FromBytes, Unaligned};

/// The longest file name which can be stored in an entry
pub const NAME_MAX_LEN: usize = 9;
/// The width of the name field. Names shorter than the field are padded with NUL bytes
pub const NAME_FIELD_LEN: usize = NAME_MAX_LEN + 1;

pub const ENTRY_SIZE: usize = mem::size_of::<Entry>();
/// The number of entries which exactly fill one sector
pub const ENTRIES_PER_SECTOR: usize = crate::SECTOR_SIZE / ENTRY_SIZE;

pub const COUNT_OFFSET: u64 = 0;
pub const TABLE_START: u64 = ENTRY_SIZE as u64;

const_assert_eq!(ENTRY_SIZE, 16);
const_assert_eq!(crate::SECTOR_SIZE % ENTRY_SIZE, 0);

const IN_USE: u8 = 1;
const FREE: u8 = 0;

/// A directory entry
#[derive(Debug, Copy, Clone, PartialEq, Eq, AsBytes, FromBytes, Unaligned)]
#[repr(C)]
pub struct Entry {
    /// Non-zero if the entry holds a file. The other fields of a free entry are meaningless
    pub in_use: u8,
    /// The file name, NUL padded. A name of exactly `NAME_MAX_LEN` bytes still leaves a
    /// terminating NUL
    pub name: [u8; NAME_FIELD_LEN],
    /// Always zero
    pub _reserved: u8,
    /// The sector holding the file's header
    pub sector: U32<LittleEndian>,
}

impl Entry {
    pub fn free() -> Self {
        Self {
            in_use: FREE,
            name: [0; NAME_FIELD_LEN],
            _reserved: 0,
            sector: U32::new(0),
        }
    }

    /// Build a used entry
    ///
    /// Panics if `name` is longer than [`NAME_MAX_LEN`]
    pub fn occupied(name: &[u8], sector: u32) -> Self {
        assert!(name.len() <= NAME_MAX_LEN);
        let mut entry = Self::free();
        entry.in_use = IN_USE;
        entry.name[..name.len()].copy_from_slice(name);
        entry.sector = U32::new(sector);
        entry
    }

    pub fn is_in_use(&self) -> bool {
        self.in_use != FREE
    }

    /// The stored name, up to the first NUL
    pub fn name(&self) -> &[u8] {
        let end = self
            .name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(NAME_FIELD_LEN);
        &self.name[..end]
    }

    pub fn sector(&self) -> u32 {
        self.sector.get()
    }

    /// Mark the entry free. The name and sector are left behind
    pub fn release(&mut self) {
        self.in_use = FREE;
    }
}
