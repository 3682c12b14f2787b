#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NamePolicy {
    /// Silently cut names to the width of the name field
    ///
    /// Two names which share their first
    /// [`NAME_MAX_LEN`](../../repr/directory/constant.NAME_MAX_LEN.html) bytes are the same file
    Truncate,
    /// Refuse to add files with overlong names
    ///
    /// Lookups of overlong names find nothing
    Reject,
}

impl Default for NamePolicy {
    fn default() -> Self {
        NamePolicy::Truncate
    }
}
