use bstr::BString;
use std::io;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Corrupt directory: the table holds no entries")]
    EmptyTable,
    #[error("File name {name:?} is longer than {max} bytes")]
    NameTooLong { name: BString, max: usize },
    #[error("File name is empty")]
    EmptyName,
    #[error("Directory of {entries} entries cannot be stored")]
    TooLarge { entries: usize },
}

impl Error {
    /// True for errors raised by the backing store rather than by the directory itself
    pub fn is_io(&self) -> bool {
        matches!(self, Error::Io(_))
    }
}
