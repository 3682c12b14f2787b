//! The directory table: a flat mapping from file name to file header location
//!
//! A [`Directory`] is loaded from its backing store, searched and modified in memory, then
//! written back explicitly. Modifications which are never persisted are lost.
//!
//! A `Directory` has no internal locking. Every operation, including the scan before an insert
//! and the reallocation when the table grows, assumes exclusive access. Callers sharing one
//! directory between threads must hold a single lock around all of its operations, see
//! [`SharedDirectory`](../shared/struct.SharedDirectory.html).

use crate::config::NamePolicy;
use crate::errors::{Error, Result};
use crate::header::HeaderSource;
use crate::name::{self, FileName};
use bstr::{BStr, ByteSlice};
use byteorder::LittleEndian;
use positioned_io::{ReadAt, ReadBytesAtExt, WriteAt, WriteBytesAtExt};
use repr::directory::{Entry, COUNT_OFFSET, ENTRIES_PER_SECTOR, ENTRY_SIZE, TABLE_START};
use repr::SECTOR_SIZE;
use slog::Logger;
use std::{fmt, io, slice};
use zerocopy::AsBytes;

/// The sector where a file's header is stored
///
/// The directory never checks that a location is valid, that is up to the sector allocator.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Location(pub u32);

impl Location {
    /// Byte offset of the sector on disk
    pub fn offset(self) -> u64 {
        u64::from(self.0) * SECTOR_SIZE as u64
    }
}

/// Entries read from the store at a time while loading
const LOAD_CHUNK: usize = 64 * ENTRIES_PER_SECTOR;

type ResizeHook = Box<dyn FnMut(usize) + Send>;

pub struct Directory {
    entries: Vec<Entry>,
    name_policy: NamePolicy,
    on_resize: Option<ResizeHook>,
    logger: Logger,
}

impl Directory {
    /// Create a directory with `size` free entries
    ///
    /// Panics if `size` is zero
    pub fn new(size: usize) -> Self {
        DirectoryBuilder::new().build(size)
    }

    /// Read a directory from its backing store
    pub fn load<R: ReadAt>(store: R) -> Result<Self> {
        DirectoryBuilder::new().load(store)
    }

    /// Replace the table with the one stored in `store`
    ///
    /// On error, the current table is kept.
    pub fn load_from<R: ReadAt>(&mut self, store: R) -> Result<()> {
        let count = store.read_u32_at::<LittleEndian>(COUNT_OFFSET)?;
        if count == 0 {
            return Err(Error::EmptyTable);
        }

        // Read in bounded chunks so a corrupt count fails at the end of the store instead of
        // allocating the whole claimed table up front
        let count = count as usize;
        let mut entries = Vec::new();
        let mut chunk = [Entry::free(); LOAD_CHUNK];
        let mut pos = TABLE_START;
        while entries.len() < count {
            let chunk = &mut chunk[..(count - entries.len()).min(LOAD_CHUNK)];
            store.read_exact_at(pos, chunk.as_bytes_mut())?;
            entries.extend_from_slice(chunk);
            pos += (chunk.len() * ENTRY_SIZE) as u64;
        }
        self.entries = entries;

        slog::debug!(self.logger, "Loaded directory";
            "entries" => count,
            "in_use" => self.in_use()
        );
        self.resized();
        Ok(())
    }

    /// Write the whole table to `store`
    ///
    /// The store must be able to hold [`image_len`](#method.image_len) bytes. A failed write
    /// can leave a partial table behind.
    pub fn persist<W: WriteAt>(&self, mut store: W) -> Result<()> {
        let count = u32::try_from(self.entries.len()).map_err(|_| Error::TooLarge {
            entries: self.entries.len(),
        })?;
        store.write_u32_at::<LittleEndian>(COUNT_OFFSET, count)?;
        store.write_all_at(TABLE_START, self.entries.as_slice().as_bytes())?;
        store.flush()?;

        slog::debug!(self.logger, "Persisted directory"; "entries" => count);
        Ok(())
    }

    /// The index of the entry holding `name`
    pub fn find_slot<N: AsRef<[u8]>>(&self, name: N) -> Option<usize> {
        let name = self.lookup_name(name.as_ref())?;
        self.slot_of(&name)
    }

    /// The header location of the file `name`
    pub fn find<N: AsRef<[u8]>>(&self, name: N) -> Option<Location> {
        self.find_slot(name)
            .map(|slot| Location(self.entries[slot].sector()))
    }

    /// Add a file to the directory
    ///
    /// Returns `Ok(false)` without changing anything if `name` is already present. The first
    /// free entry is reused; if there is none, the table grows by one sector's worth of
    /// entries. Errors only when `name` is empty, or is too long under
    /// [`NamePolicy::Reject`](../config/enum.NamePolicy.html#variant.Reject).
    ///
    /// Empty names, including names starting with a NUL byte, are always refused with
    /// `Error::EmptyName`, although the stored format could hold one. Overlong names are
    /// truncated under the default policy.
    pub fn insert<N: AsRef<[u8]>>(&mut self, name: N, location: Location) -> Result<bool> {
        let raw_name = name.as_ref();
        let name = FileName::new(raw_name, self.name_policy)?;
        if name.is_empty() {
            return Err(Error::EmptyName);
        }
        if name::is_overlong(raw_name) {
            slog::warn!(self.logger, "Truncating file name";
                "name" => %raw_name.as_bstr(),
                "stored" => %name
            );
        }

        if self.slot_of(&name).is_some() {
            return Ok(false);
        }

        let entry = Entry::occupied(name.as_bytes(), location.0);
        match self.entries.iter().position(|e| !e.is_in_use()) {
            Some(slot) => {
                slog::debug!(self.logger, "Reusing free slot"; "slot" => slot, "name" => %name);
                self.entries[slot] = entry;
            }
            None => self.grow(entry),
        }
        Ok(true)
    }

    /// Remove a file from the directory
    ///
    /// Returns false if `name` is not present. The table never shrinks.
    pub fn remove<N: AsRef<[u8]>>(&mut self, name: N) -> bool {
        match self.find_slot(name) {
            Some(slot) => {
                self.entries[slot].release();
                true
            }
            None => false,
        }
    }

    /// The names of all files, in table order
    pub fn names(&self) -> Names<'_> {
        Names {
            entries: self.entries.iter(),
        }
    }

    /// The number of entries in the table, used or not
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    /// The number of files in the directory
    pub fn in_use(&self) -> usize {
        self.entries.iter().filter(|e| e.is_in_use()).count()
    }

    /// The number of bytes `persist` will write, counting the reserved space before the table
    pub fn image_len(&self) -> u64 {
        TABLE_START + (self.entries.len() * ENTRY_SIZE) as u64
    }

    /// The raw table entries
    pub fn raw(&self) -> &[Entry] {
        &self.entries
    }

    /// Write the name of every file, one per line
    pub fn list<W: io::Write>(&self, mut out: W) -> io::Result<()> {
        for name in self.names() {
            writeln!(out, "{}", name)?;
        }
        Ok(())
    }

    /// Write every file's name, header location, and header, for debugging
    ///
    /// Fetches the header of every file.
    pub fn print<H: HeaderSource, W: io::Write>(&self, headers: H, mut out: W) -> Result<()> {
        writeln!(out, "Directory contents:")?;
        for entry in self.entries.iter().filter(|e| e.is_in_use()) {
            writeln!(
                out,
                "\nDirectory entry:\n    name: {}\n    sector: {}",
                entry.name().as_bstr(),
                entry.sector()
            )?;
            let header = headers.fetch(Location(entry.sector()))?;
            writeln!(out, "{}", header)?;
        }
        writeln!(out)?;
        Ok(())
    }

    fn lookup_name(&self, name: &[u8]) -> Option<FileName> {
        FileName::new(name, self.name_policy).ok()
    }

    fn slot_of(&self, name: &FileName) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.is_in_use() && e.name() == name.as_bytes())
    }

    fn grow(&mut self, entry: Entry) {
        let old_size = self.entries.len();
        let new_size = old_size + ENTRIES_PER_SECTOR;

        self.entries.reserve_exact(ENTRIES_PER_SECTOR);
        self.entries.push(entry);
        self.entries.resize(new_size, Entry::free());

        slog::info!(self.logger, "Grew directory";
            "old_size" => old_size,
            "new_size" => new_size
        );
        self.resized();
    }

    fn resized(&mut self) {
        let size = self.entries.len();
        if let Some(on_resize) = &mut self.on_resize {
            on_resize(size);
        }
    }
}

impl fmt::Debug for Directory {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Directory")
            .field("size", &self.entries.len())
            .field("names", &self.names().collect::<Vec<_>>())
            .field("name_policy", &self.name_policy)
            .finish()
    }
}

/// Iterator over the names in a directory, see [`Directory::names`](struct.Directory.html#method.names)
#[derive(Debug, Clone)]
pub struct Names<'a> {
    entries: slice::Iter<'a, Entry>,
}

impl<'a> Iterator for Names<'a> {
    type Item = &'a BStr;

    fn next(&mut self) -> Option<Self::Item> {
        self.entries
            .find(|e| e.is_in_use())
            .map(|e| e.name().as_bstr())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.entries.size_hint().1)
    }
}

pub struct DirectoryBuilder {
    pub name_policy: NamePolicy,

    logger: Option<Logger>,
    on_resize: Option<ResizeHook>,
}

impl Default for DirectoryBuilder {
    fn default() -> Self {
        DirectoryBuilder {
            name_policy: NamePolicy::default(),
            logger: None,
            on_resize: None,
        }
    }
}

impl DirectoryBuilder {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn set_name_policy(&mut self, policy: NamePolicy) -> &mut Self {
        self.name_policy = policy;
        self
    }

    pub fn set_logger(&mut self, logger: Logger) -> &mut Self {
        self.logger = Some(logger);
        self
    }

    /// Called with the new table size whenever a table is loaded, or grows
    pub fn on_resize<F>(&mut self, on_resize: F) -> &mut Self
    where
        F: FnMut(usize) + Send + 'static,
    {
        self.on_resize = Some(Box::new(on_resize));
        self
    }

    /// Create a directory with `size` free entries
    ///
    /// Panics if `size` is zero
    pub fn build(self, size: usize) -> Directory {
        assert!(size > 0, "a directory must have at least one entry");
        self.into_directory(vec![Entry::free(); size])
    }

    pub fn load<R: ReadAt>(self, store: R) -> Result<Directory> {
        let mut directory = self.into_directory(Vec::new());
        directory.load_from(store)?;
        Ok(directory)
    }

    fn into_directory(self, entries: Vec<Entry>) -> Directory {
        Directory {
            entries,
            name_policy: self.name_policy,
            on_resize: self.on_resize,
            logger: self.logger.unwrap_or_else(crate::default_logger),
        }
    }
}

impl fmt::Debug for DirectoryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("DirectoryBuilder")
            .field("name_policy", &self.name_policy)
            .field("on_resize", &self.on_resize.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn full_directory() -> Directory {
        let mut directory = Directory::new(ENTRIES_PER_SECTOR);
        for i in 0..ENTRIES_PER_SECTOR {
            assert!(directory
                .insert(format!("f{}", i), Location(i as u32 + 100))
                .unwrap());
        }
        directory
    }

    #[test]
    fn simple() {
        let mut directory = Directory::new(4);
        assert!(directory.insert("foo.txt", Location(10)).unwrap());
        assert!(directory.insert("bar.txt", Location(20)).unwrap());
        assert!(!directory.insert("foo.txt", Location(99)).unwrap());
        assert_eq!(directory.find("foo.txt"), Some(Location(10)));
        assert!(directory.remove("bar.txt"));
        assert_eq!(directory.find("bar.txt"), None);
        assert!(!directory.remove("bar.txt"));
    }

    #[test]
    #[should_panic]
    fn zero_size() {
        Directory::new(0);
    }

    #[test]
    fn first_fit() {
        let mut directory = Directory::new(4);
        directory.insert("a", Location(1)).unwrap();
        directory.insert("b", Location(2)).unwrap();
        directory.insert("c", Location(3)).unwrap();
        directory.remove("a");
        directory.remove("b");

        directory.insert("d", Location(4)).unwrap();
        assert_eq!(directory.find_slot("d"), Some(0));
        assert_eq!(directory.find_slot("c"), Some(2));
    }

    #[test]
    fn reuses_slot_before_growing() {
        let mut directory = full_directory();
        assert!(directory.remove("f3"));
        assert_eq!(directory.find_slot("f3"), None);

        assert!(directory.insert("b", Location(7)).unwrap());
        assert_eq!(directory.size(), ENTRIES_PER_SECTOR);
        assert_eq!(directory.find_slot("b"), Some(3));
    }

    #[test]
    fn grows_one_sector() {
        let mut directory = full_directory();
        assert!(directory.insert("extra", Location(1)).unwrap());
        assert_eq!(directory.size(), 2 * ENTRIES_PER_SECTOR);
        assert_eq!(directory.find_slot("extra"), Some(ENTRIES_PER_SECTOR));
        for i in 0..ENTRIES_PER_SECTOR {
            assert_eq!(
                directory.find(format!("f{}", i)),
                Some(Location(i as u32 + 100))
            );
        }
        assert!(directory.raw()[ENTRIES_PER_SECTOR + 1..]
            .iter()
            .all(|e| !e.is_in_use()));
    }

    #[test]
    fn grows_unaligned_table() {
        let mut directory = Directory::new(3);
        for name in &["a", "b", "c", "d"] {
            directory.insert(name, Location(0)).unwrap();
        }
        assert_eq!(directory.size(), 3 + ENTRIES_PER_SECTOR);
        assert_eq!(directory.find_slot("d"), Some(3));
    }

    #[test]
    fn resize_hook() {
        let seen = Arc::new(AtomicUsize::new(0));
        let mut builder = DirectoryBuilder::new();
        let hook_seen = Arc::clone(&seen);
        builder.on_resize(move |size| hook_seen.store(size, Ordering::SeqCst));
        let mut directory = builder.build(1);

        directory.insert("a", Location(1)).unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 0);
        directory.insert("b", Location(2)).unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 1 + ENTRIES_PER_SECTOR);
    }

    #[test]
    fn removed_payload_is_inert() {
        let mut directory = Directory::new(2);
        directory.insert("a", Location(5)).unwrap();
        directory.remove("a");

        assert_eq!(directory.raw()[0].name(), b"a");
        assert_eq!(directory.find("a"), None);
        assert_eq!(directory.names().count(), 0);
    }

    #[test]
    fn truncated_names_collide() {
        let mut directory = Directory::new(2);
        assert!(directory.insert("abcdefghijk", Location(1)).unwrap());
        assert!(!directory.insert("abcdefghiXX", Location(2)).unwrap());
        assert_eq!(directory.find("abcdefghi"), Some(Location(1)));
        assert_eq!(directory.find("abcdefghizzz"), Some(Location(1)));
    }

    #[test]
    fn reject_policy() {
        let mut builder = DirectoryBuilder::new();
        builder.set_name_policy(NamePolicy::Reject);
        let mut directory = builder.build(2);

        assert!(matches!(
            directory.insert("abcdefghijk", Location(1)),
            Err(Error::NameTooLong { .. })
        ));
        assert_eq!(directory.in_use(), 0);

        directory.insert("abcdefghi", Location(2)).unwrap();
        assert_eq!(directory.find("abcdefghijk"), None);
        assert_eq!(directory.find("abcdefghi"), Some(Location(2)));
    }

    #[test]
    fn empty_name() {
        let mut directory = Directory::new(2);
        assert!(matches!(
            directory.insert("", Location(1)),
            Err(Error::EmptyName)
        ));
        assert!(matches!(
            directory.insert("\0abc", Location(1)),
            Err(Error::EmptyName)
        ));
    }

    #[test]
    fn persist_layout() {
        let mut directory = Directory::new(2);
        directory.insert("x", Location(0x0102)).unwrap();

        let mut image = Vec::new();
        directory.persist(&mut image).unwrap();
        assert_eq!(image.len() as u64, directory.image_len());
        assert_eq!(&image[..4], &[2, 0, 0, 0]);
        assert_eq!(&image[4..16], &[0; 12]);
        assert_eq!(image[16], 1);
        assert_eq!(image[17], b'x');
        assert_eq!(&image[28..32], &[0x02, 0x01, 0, 0]);
        assert_eq!(&image[32..48], &[0; 16]);
    }

    #[test]
    fn persist_leaves_reserved_bytes() {
        let mut image = vec![0xee; 64];
        Directory::new(1).persist(&mut image).unwrap();
        assert_eq!(&image[..4], &[1, 0, 0, 0]);
        assert_eq!(&image[4..16], &[0xee; 12]);
        assert_eq!(&image[16..32], &[0; 16]);
        assert_eq!(&image[32..], &[0xee; 32]);
    }

    #[test]
    fn load_replaces_table() {
        let mut source = Directory::new(ENTRIES_PER_SECTOR);
        source.insert("kept", Location(3)).unwrap();
        let mut image = Vec::new();
        source.persist(&mut image).unwrap();

        let mut directory = Directory::new(1);
        directory.insert("gone", Location(9)).unwrap();
        directory.load_from(&image).unwrap();
        assert_eq!(directory.size(), ENTRIES_PER_SECTOR);
        assert_eq!(directory.find("gone"), None);
        assert_eq!(directory.find("kept"), Some(Location(3)));
    }

    #[test]
    fn load_errors_keep_table() {
        let mut directory = Directory::new(1);
        directory.insert("a", Location(1)).unwrap();

        let empty = vec![0; 32];
        assert!(matches!(directory.load_from(&empty), Err(Error::EmptyTable)));

        // Claims two entries, only holds one
        let mut short = vec![0; 32];
        short[0] = 2;
        let err = directory.load_from(&short).unwrap_err();
        assert!(err.is_io());

        assert_eq!(directory.size(), 1);
        assert_eq!(directory.find("a"), Some(Location(1)));
    }

    #[test]
    fn load_huge_count() {
        let mut directory = Directory::new(1);
        directory.insert("a", Location(1)).unwrap();

        let mut image = vec![0; 32];
        image[..4].copy_from_slice(&[0xff; 4]);
        let err = directory.load_from(&image).unwrap_err();
        match err {
            Error::Io(e) => assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof),
            e => panic!("unexpected error {}", e),
        }
        assert_eq!(directory.size(), 1);
        assert_eq!(directory.find("a"), Some(Location(1)));
    }

    #[test]
    fn load_spans_chunks() {
        let mut source = Directory::new(LOAD_CHUNK + 3);
        source.insert("first", Location(1)).unwrap();
        for i in 0..LOAD_CHUNK + 2 {
            source.insert(format!("f{}", i), Location(2)).unwrap();
        }
        let mut image = Vec::new();
        source.persist(&mut image).unwrap();

        let loaded = Directory::load(&image).unwrap();
        assert_eq!(loaded.raw(), source.raw());
        assert_eq!(loaded.find(format!("f{}", LOAD_CHUNK + 1)), Some(Location(2)));
    }

    #[test]
    fn list() {
        let mut directory = Directory::new(4);
        directory.insert("one", Location(1)).unwrap();
        directory.insert("two", Location(2)).unwrap();
        directory.remove("one");
        directory.insert("three", Location(3)).unwrap();

        let mut out = Vec::new();
        directory.list(&mut out).unwrap();
        assert_eq!(out, b"three\ntwo\n");
    }
}
