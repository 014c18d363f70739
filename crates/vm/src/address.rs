//! Virtual address newtype.

use core::fmt;

use los_hal::paging::{PAGE_MASK, PAGE_SIZE};

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct VirtualAddress(usize);

impl VirtualAddress {
    pub const fn new(addr: usize) -> Self {
        Self(addr)
    }

    pub const fn get(self) -> usize {
        self.0
    }

    /// `self + offset`, panicking on wrap-around.
    pub fn offset(self, offset: usize) -> Self {
        match self.checked_offset(offset) {
            Some(addr) => addr,
            None => panic!("VirtualAddress {self} + {offset:#x} overflows"),
        }
    }

    pub const fn checked_offset(self, offset: usize) -> Option<Self> {
        match self.0.checked_add(offset) {
            Some(addr) => Some(Self(addr)),
            None => None,
        }
    }

    pub const fn page_base(self) -> Self {
        Self(self.0 & PAGE_MASK)
    }

    pub const fn offset_in_page(self) -> usize {
        self.0 & (PAGE_SIZE - 1)
    }

    pub const fn is_page_aligned(self) -> bool {
        self.is_aligned_to(PAGE_SIZE)
    }

    /// `alignment` must be a power of two.
    pub const fn is_aligned_to(self, alignment: usize) -> bool {
        self.0 & (alignment - 1) == 0
    }
}

impl From<usize> for VirtualAddress {
    fn from(addr: usize) -> Self {
        Self(addr)
    }
}

impl fmt::Debug for VirtualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "V{:#x}", self.0)
    }
}

impl fmt::Display for VirtualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "V{:#018x}", self.0)
    }
}

impl fmt::LowerHex for VirtualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}
