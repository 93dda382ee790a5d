//! Status bitmask and its classifiers
//!
//! The numeric space is libgit2's `git_status_t`; the engine treats it as an
//! opaque integer and only interprets it through the predicates below.

use std::fmt;

use git2::Status;

const MODIFIED_MASK: u32 = Status::WT_MODIFIED.bits()
    | Status::INDEX_MODIFIED.bits()
    | Status::WT_DELETED.bits()
    | Status::INDEX_DELETED.bits()
    | Status::WT_TYPECHANGE.bits()
    | Status::INDEX_TYPECHANGE.bits();

const NEW_MASK: u32 = Status::WT_NEW.bits() | Status::INDEX_NEW.bits();

const DELETED_MASK: u32 = Status::WT_DELETED.bits() | Status::INDEX_DELETED.bits();

const STAGED_MASK: u32 = Status::INDEX_NEW.bits()
    | Status::INDEX_MODIFIED.bits()
    | Status::INDEX_DELETED.bits()
    | Status::INDEX_RENAMED.bits()
    | Status::INDEX_TYPECHANGE.bits();

const IGNORED_MASK: u32 = Status::IGNORED.bits();

/// Opaque status bitmask for one path
///
/// Classifiers are independent: a path can be staged and modified at once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct StatusBits(u32);

impl StatusBits {
    /// Unmodified / up to date
    pub const CURRENT: StatusBits = StatusBits(0);

    pub const fn from_bits(bits: u32) -> Self {
        StatusBits(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn is_current(self) -> bool {
        self.0 == 0
    }

    pub const fn is_modified(self) -> bool {
        self.0 & MODIFIED_MASK != 0
    }

    pub const fn is_new(self) -> bool {
        self.0 & NEW_MASK != 0
    }

    pub const fn is_deleted(self) -> bool {
        self.0 & DELETED_MASK != 0
    }

    pub const fn is_staged(self) -> bool {
        self.0 & STAGED_MASK != 0
    }

    pub const fn is_ignored(self) -> bool {
        self.0 & IGNORED_MASK != 0
    }

    /// Bitwise union, used for directory rollups
    pub const fn union(self, other: StatusBits) -> StatusBits {
        StatusBits(self.0 | other.0)
    }
}

impl From<Status> for StatusBits {
    fn from(status: Status) -> Self {
        StatusBits(status.bits())
    }
}

impl From<u32> for StatusBits {
    fn from(bits: u32) -> Self {
        StatusBits(bits)
    }
}

impl std::ops::BitOr for StatusBits {
    type Output = StatusBits;

    fn bitor(self, rhs: StatusBits) -> StatusBits {
        self.union(rhs)
    }
}

impl std::ops::BitOrAssign for StatusBits {
    fn bitor_assign(&mut self, rhs: StatusBits) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for StatusBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

/// Commits ahead of / behind the upstream branch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct AheadBehind {
    pub ahead: usize,
    pub behind: usize,
}

impl AheadBehind {
    pub const fn new(ahead: usize, behind: usize) -> Self {
        Self { ahead, behind }
    }
}
