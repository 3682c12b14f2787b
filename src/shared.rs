//! A directory shared between threads
//!
//! Every operation takes one lock around both the table and its backing store, so a lookup
//! followed by a change, a table reallocation, and the write back which follows all happen
//! without another thread observing the directory half way.

use crate::directory::{Directory, DirectoryBuilder, Location};
use crate::errors::Result;
use bstr::BString;
use parking_lot::Mutex;
use positioned_io::{ReadAt, WriteAt};
use std::fmt;

pub struct SharedDirectory<S> {
    inner: Mutex<Inner<S>>,
}

struct Inner<S> {
    directory: Directory,
    store: S,
}

impl<S: ReadAt + WriteAt> SharedDirectory<S> {
    /// Load the directory stored in `store`
    pub fn open(store: S, builder: DirectoryBuilder) -> Result<Self> {
        let directory = builder.load(&store)?;
        Ok(Self::new(directory, store))
    }

    /// Write a new directory of `size` free entries to `store`
    pub fn format(mut store: S, builder: DirectoryBuilder, size: usize) -> Result<Self> {
        let directory = builder.build(size);
        directory.persist(&mut store)?;
        Ok(Self::new(directory, store))
    }

    fn new(directory: Directory, store: S) -> Self {
        Self {
            inner: Mutex::new(Inner { directory, store }),
        }
    }

    /// Add a file, and write the directory back if it changed
    pub fn create<N: AsRef<[u8]>>(&self, name: N, location: Location) -> Result<bool> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        if !inner.directory.insert(name, location)? {
            return Ok(false);
        }
        inner.directory.persist(&mut inner.store)?;
        Ok(true)
    }

    /// Remove a file, and write the directory back if it changed
    pub fn remove<N: AsRef<[u8]>>(&self, name: N) -> Result<bool> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        if !inner.directory.remove(name) {
            return Ok(false);
        }
        inner.directory.persist(&mut inner.store)?;
        Ok(true)
    }

    pub fn lookup<N: AsRef<[u8]>>(&self, name: N) -> Option<Location> {
        self.inner.lock().directory.find(name)
    }

    pub fn names(&self) -> Vec<BString> {
        let inner = self.inner.lock();
        inner.directory.names().map(BString::from).collect()
    }

    /// Run `f` with the directory locked
    pub fn with<T, F: FnOnce(&Directory) -> T>(&self, f: F) -> T {
        f(&self.inner.lock().directory)
    }

    pub fn into_inner(self) -> (Directory, S) {
        let inner = self.inner.into_inner();
        (inner.directory, inner.store)
    }
}

impl<S> fmt::Debug for SharedDirectory<S> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.inner.try_lock() {
            Some(inner) => f
                .debug_struct("SharedDirectory")
                .field("directory", &inner.directory)
                .finish(),
            None => f.write_str("SharedDirectory { <locked> }"),
        }
    }
}
