//! Contiguous spans of virtual address space.
//!
//! Behaviors:
//! - [R1] `contains` is inclusive of equal bounds
//! - [R2] `carve` leaves zero, one, or two page-multiple remainders
//! - [R3] empty ranges overlap nothing

use core::fmt;

use los_hal::paging::{PAGE_SIZE, page_round_down, page_round_up};

use crate::address::VirtualAddress;
use crate::error::MemoryError;

/// `[base, base + size)`. `base + size` never wraps.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct VirtualRange {
    base: VirtualAddress,
    size: usize,
}

/// What remains of a range after removing a sub-range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Carved {
    Consumed,
    One(VirtualRange),
    Two(VirtualRange, VirtualRange),
}

impl Carved {
    pub fn len(&self) -> usize {
        match self {
            Carved::Consumed => 0,
            Carved::One(_) => 1,
            Carved::Two(..) => 2,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Carved::Consumed)
    }

    pub fn iter(&self) -> impl Iterator<Item = VirtualRange> {
        let (first, second) = match *self {
            Carved::Consumed => (None, None),
            Carved::One(a) => (Some(a), None),
            Carved::Two(a, b) => (Some(a), Some(b)),
        };
        first.into_iter().chain(second)
    }
}

impl VirtualRange {
    /// Panics if the range would wrap past the top of the address space.
    pub fn new(base: VirtualAddress, size: usize) -> Self {
        match Self::try_new(base, size) {
            Some(range) => range,
            None => panic!("VirtualRange {base} + {size:#x} overflows"),
        }
    }

    pub const fn try_new(base: VirtualAddress, size: usize) -> Option<Self> {
        match base.get().checked_add(size) {
            Some(_) => Some(Self { base, size }),
            None => None,
        }
    }

    /// Smallest page-aligned range covering `[address, address + size)`.
    pub fn expand_to_page_boundaries(address: usize, size: usize) -> Result<Self, MemoryError> {
        let end = address
            .checked_add(size)
            .and_then(page_round_up)
            .ok_or(MemoryError::AddressOverflow)?;
        let base = page_round_down(address);
        Ok(Self {
            base: VirtualAddress::new(base),
            size: end - base,
        })
    }

    pub const fn base(&self) -> VirtualAddress {
        self.base
    }

    pub const fn size(&self) -> usize {
        self.size
    }

    pub const fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// One past the last byte.
    pub const fn end(&self) -> VirtualAddress {
        VirtualAddress::new(self.base.get() + self.size)
    }

    /// Last byte of a non-empty range.
    pub const fn last(&self) -> VirtualAddress {
        VirtualAddress::new(self.base.get() + self.size - 1)
    }

    pub fn contains_address(&self, addr: VirtualAddress) -> bool {
        addr >= self.base && addr < self.end()
    }

    /// [R1] `other` lies entirely inside `self`.
    pub fn contains(&self, other: &VirtualRange) -> bool {
        other.base >= self.base && other.end() <= self.end()
    }

    /// Like `contains`, for a span that may not be representable.
    pub fn contains_span(&self, base: VirtualAddress, size: usize) -> bool {
        Self::try_new(base, size).is_some_and(|span| self.contains(&span))
    }

    /// [R3] Shares at least one byte.
    pub fn overlaps(&self, other: &VirtualRange) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.base < other.end()
            && other.base < self.end()
    }

    pub fn intersect(&self, other: &VirtualRange) -> Option<VirtualRange> {
        if !self.overlaps(other) {
            return None;
        }
        let base = self.base.max(other.base);
        let end = self.end().min(other.end());
        Some(VirtualRange {
            base,
            size: end.get() - base.get(),
        })
    }

    /// [R2] Remove `taken` from `self`, returning the pieces before and after it.
    ///
    /// `taken` must lie inside `self` and be a whole number of pages.
    pub fn carve(&self, taken: &VirtualRange) -> Carved {
        assert!(
            self.contains(taken),
            "carve: {taken} is not inside {self}"
        );
        assert_eq!(taken.size % PAGE_SIZE, 0, "carve: {taken} is not page sized");

        let before = VirtualRange {
            base: self.base,
            size: taken.base.get() - self.base.get(),
        };
        let after = VirtualRange {
            base: taken.end(),
            size: self.end().get() - taken.end().get(),
        };
        match (before.is_empty(), after.is_empty()) {
            (true, true) => Carved::Consumed,
            (false, true) => Carved::One(before),
            (true, false) => Carved::One(after),
            (false, false) => Carved::Two(before, after),
        }
    }
}

impl fmt::Debug for VirtualRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for VirtualRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:#x} - {:#x})", self.base.get(), self.end().get())
    }
}
