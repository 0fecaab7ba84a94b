//! Typed identifiers
//!
//! Subjects and articles live in ordered sequences; ids are logical handles
//! into those sequences, never positions. Each entity kind gets its own
//! newtype so a subject id can never be passed where an article id is
//! expected. Ids serialize as their bare integer value.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;

/// Integer-backed identifier of one entity kind
pub trait KeyId: Copy + Ord + fmt::Debug {
    /// Wrap a raw integer value
    fn from_raw(raw: u32) -> Self;

    /// Underlying integer value
    fn raw(self) -> u32;
}

/// Identifier of a [`crate::Subject`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(u32);

/// Identifier of an [`crate::Article`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArticleId(u32);

impl SubjectId {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u32 {
        self.0
    }
}

impl ArticleId {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u32 {
        self.0
    }
}

impl KeyId for SubjectId {
    fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    fn raw(self) -> u32 {
        self.0
    }
}

impl KeyId for ArticleId {
    fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ArticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sequential id source for one entity kind
///
/// Mints `last + 1` on every call. Seed it with the largest id already in
/// use so fresh ids never collide with imported ones.
#[derive(Debug, Clone)]
pub struct IdGenerator<I: KeyId> {
    last: u32,
    _kind: PhantomData<I>,
}

impl<I: KeyId> IdGenerator<I> {
    /// Generator whose first id will be 1
    pub fn new() -> Self {
        Self {
            last: 0,
            _kind: PhantomData,
        }
    }

    /// Generator continuing after the largest of `ids`
    pub fn after<'a>(ids: impl IntoIterator<Item = &'a I>) -> Self
    where
        I: 'a,
    {
        let mut generator = Self::new();
        for id in ids {
            generator.observe(*id);
        }
        generator
    }

    /// Mint the next id
    pub fn next_id(&mut self) -> I {
        self.last += 1;
        I::from_raw(self.last)
    }

    /// Make sure future ids are minted past `id`
    pub fn observe(&mut self, id: I) {
        self.last = self.last.max(id.raw());
    }
}

impl<I: KeyId> Default for IdGenerator<I> {
    fn default() -> Self {
        Self::new()
    }
}
