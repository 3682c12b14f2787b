use crate::config::NamePolicy;
use crate::errors::{Error, Result};
use bstr::{BStr, BString, ByteSlice};
use repr::directory::NAME_MAX_LEN;
use std::fmt;

/// A file name which fits in a directory entry
///
/// Names follow C string rules: anything after the first NUL byte is ignored.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct FileName {
    bytes: [u8; NAME_MAX_LEN],
    len: u8,
}

impl FileName {
    pub fn new(name: &[u8], policy: NamePolicy) -> Result<Self> {
        let name = until_nul(name);
        if name.len() > NAME_MAX_LEN && policy == NamePolicy::Reject {
            return Err(Error::NameTooLong {
                name: BString::from(name),
                max: NAME_MAX_LEN,
            });
        }
        Ok(Self::truncated(name))
    }

    fn truncated(name: &[u8]) -> Self {
        let len = name.len().min(NAME_MAX_LEN);
        let mut bytes = [0; NAME_MAX_LEN];
        bytes[..len].copy_from_slice(&name[..len]);
        Self {
            bytes,
            len: len as u8,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..usize::from(self.len)]
    }

    pub fn as_bstr(&self) -> &BStr {
        self.as_bytes().as_bstr()
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Returns true if `name` would lose bytes when stored
pub fn is_overlong(name: &[u8]) -> bool {
    until_nul(name).len() > NAME_MAX_LEN
}

fn until_nul(name: &[u8]) -> &[u8] {
    match name.iter().position(|&b| b == 0) {
        Some(end) => &name[..end],
        None => name,
    }
}

impl PartialEq<[u8]> for FileName {
    fn eq(&self, other: &[u8]) -> bool {
        self.as_bytes() == other
    }
}

impl fmt::Debug for FileName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self.as_bstr(), f)
    }
}

impl fmt::Display for FileName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self.as_bstr(), f)
    }
}
