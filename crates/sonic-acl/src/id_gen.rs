//! Bounded-range identifier generator.
//!
//! Ids are drawn from `[0, max)`. Allocation scans forward from the
//! position after the last issued id and wraps at `max`, so ids freed by
//! deleted objects are reused without the range growing. Callers replaying
//! externally chosen ids reserve them explicitly instead of allocating.

use std::fmt;

use crate::error::{AclError, AclResult};
use crate::types::ObjId;

const WORD_BITS: u64 = u64::BITS as u64;

/// Allocates, reserves and releases ids in `[0, max)`.
#[derive(Clone)]
pub struct IdGenerator {
    max: u64,
    used: Vec<u64>,
    in_use: u64,
    /// Next candidate for `alloc`.
    cursor: u64,
}

impl IdGenerator {
    /// Creates a generator for `[0, max)` with no id in use.
    pub fn new(max: u64) -> Self {
        let words = max.div_ceil(WORD_BITS) as usize;
        Self {
            max,
            used: vec![0; words],
            in_use: 0,
            cursor: 0,
        }
    }

    /// Upper bound (exclusive) of the range.
    pub fn max(&self) -> u64 {
        self.max
    }

    /// Number of ids currently in use.
    pub fn in_use(&self) -> u64 {
        self.in_use
    }

    /// Returns true if `id` is marked in use.
    pub fn is_used(&self, id: ObjId) -> bool {
        if id >= self.max {
            return false;
        }
        let (word, bit) = Self::slot(id);
        self.used[word] & bit != 0
    }

    /// Allocates the first free id at or after the cursor, wrapping at `max`.
    pub fn alloc(&mut self) -> AclResult<ObjId> {
        if self.in_use >= self.max {
            return Err(AclError::ResourceExhausted(format!(
                "all {} ids in use",
                self.max
            )));
        }

        let mut candidate = self.cursor;
        for _ in 0..self.max {
            if !self.is_used(candidate) {
                self.mark(candidate);
                self.cursor = (candidate + 1) % self.max;
                return Ok(candidate);
            }
            candidate = (candidate + 1) % self.max;
        }

        Err(AclError::ResourceExhausted(format!(
            "all {} ids in use",
            self.max
        )))
    }

    /// Marks `id` in use without scanning.
    ///
    /// Fails with `Conflict` if the id is already in use, in which case the
    /// in-use set is unchanged.
    pub fn reserve(&mut self, id: ObjId) -> AclResult<()> {
        if id >= self.max {
            return Err(AclError::invalid(format!(
                "id {} outside range [0, {})",
                id, self.max
            )));
        }
        if self.is_used(id) {
            return Err(AclError::Conflict(format!("id {} already in use", id)));
        }
        self.mark(id);
        Ok(())
    }

    /// Returns `id` to the free pool. Releasing a free or out-of-range id
    /// is a no-op.
    pub fn release(&mut self, id: ObjId) {
        if !self.is_used(id) {
            return;
        }
        let (word, bit) = Self::slot(id);
        self.used[word] &= !bit;
        self.in_use -= 1;
    }

    fn mark(&mut self, id: ObjId) {
        let (word, bit) = Self::slot(id);
        self.used[word] |= bit;
        self.in_use += 1;
    }

    fn slot(id: ObjId) -> (usize, u64) {
        ((id / WORD_BITS) as usize, 1u64 << (id % WORD_BITS))
    }
}

impl fmt::Debug for IdGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdGenerator")
            .field("max", &self.max)
            .field("in_use", &self.in_use)
            .field("cursor", &self.cursor)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AclErrorKind;
    use std::collections::HashSet;

    #[test]
    fn test_alloc_covers_range_once() {
        let mut gen = IdGenerator::new(130);
        let ids: HashSet<ObjId> = (0..130).map(|_| gen.alloc().unwrap()).collect();

        assert_eq!(ids.len(), 130);
        assert!(ids.iter().all(|id| *id < 130));
        assert_eq!(gen.in_use(), 130);

        let err = gen.alloc().unwrap_err();
        assert_eq!(err.kind(), AclErrorKind::ResourceExhausted);
    }

    #[test]
    fn test_release_then_realloc_returns_same_id() {
        let mut gen = IdGenerator::new(8);
        for _ in 0..8 {
            gen.alloc().unwrap();
        }
        gen.release(5);
        assert!(!gen.is_used(5));
        assert_eq!(gen.alloc().unwrap(), 5);
    }

    #[test]
    fn test_alloc_moves_forward_before_reuse() {
        let mut gen = IdGenerator::new(10);
        assert_eq!(gen.alloc().unwrap(), 0);
        assert_eq!(gen.alloc().unwrap(), 1);
        gen.release(0);
        assert_eq!(gen.alloc().unwrap(), 2);
    }

    #[test]
    fn test_alloc_wraps_around() {
        let mut gen = IdGenerator::new(3);
        assert_eq!(gen.alloc().unwrap(), 0);
        assert_eq!(gen.alloc().unwrap(), 1);
        assert_eq!(gen.alloc().unwrap(), 2);
        gen.release(0);
        assert_eq!(gen.alloc().unwrap(), 0);
    }

    #[test]
    fn test_alloc_skips_reserved() {
        let mut gen = IdGenerator::new(10);
        gen.reserve(0).unwrap();
        gen.reserve(1).unwrap();
        assert_eq!(gen.alloc().unwrap(), 2);
    }

    #[test]
    fn test_reserve_conflict_keeps_state() {
        let mut gen = IdGenerator::new(10);
        gen.reserve(4).unwrap();
        let before = gen.in_use();

        let err = gen.reserve(4).unwrap_err();
        assert_eq!(err.kind(), AclErrorKind::Conflict);
        assert_eq!(gen.in_use(), before);
        assert!(gen.is_used(4));
    }

    #[test]
    fn test_reserve_out_of_range() {
        let mut gen = IdGenerator::new(10);
        let err = gen.reserve(10).unwrap_err();
        assert_eq!(err.kind(), AclErrorKind::InvalidArgument);
        assert_eq!(gen.in_use(), 0);
    }

    #[test]
    fn test_release_is_idempotent() {
        let mut gen = IdGenerator::new(10);
        let id = gen.alloc().unwrap();
        gen.release(id);
        gen.release(id);
        gen.release(99);
        assert_eq!(gen.in_use(), 0);
    }

    #[test]
    fn test_zero_sized_range() {
        let mut gen = IdGenerator::new(0);
        assert!(gen.alloc().is_err());
        assert!(gen.reserve(0).is_err());
    }
}
