use std::fmt::{Display, Formatter};
use std::ops::Neg;

use crate::utils::MyHash;

/// A lightweight handle to a BDD node.
///
/// The sign encodes an attributed (complement) edge: `-r` denotes the
/// negation of the function rooted at `r`. Index 1 is the single terminal
/// node, so `Ref::new(1)` is TRUE and `Ref::new(-1)` is FALSE.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Ref(i32);

impl Ref {
    pub(crate) const fn new(value: i32) -> Self {
        Self(value)
    }

    pub(crate) const fn positive(index: u32) -> Self {
        Self(index as i32)
    }

    pub const fn is_negated(&self) -> bool {
        self.0 < 0
    }

    pub const fn negate(self) -> Self {
        Self(-self.0)
    }

    /// The raw signed representation.
    pub const fn get(self) -> i32 {
        self.0
    }

    /// The index of the referenced node in the storage arena.
    pub const fn index(self) -> u32 {
        self.0.unsigned_abs()
    }

    /// Sign-free encoding, distinct for `r` and `-r`. Used for hashing.
    pub(crate) const fn unsigned(self) -> u32 {
        (self.0.unsigned_abs() << 1) | (self.0 < 0) as u32
    }
}

impl Neg for Ref {
    type Output = Self;

    fn neg(self) -> Self::Output {
        self.negate()
    }
}

impl Display for Ref {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", if self.is_negated() { "~" } else { "" }, self.index())
    }
}

impl MyHash for Ref {
    fn hash(&self) -> u64 {
        self.unsigned() as u64
    }
}

impl MyHash for (Ref, Ref) {
    fn hash(&self) -> u64 {
        crate::utils::pairing2(self.0.unsigned() as u64, self.1.unsigned() as u64)
    }
}
