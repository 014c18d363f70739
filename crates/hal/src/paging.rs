//! Generic page-table plumbing shared by every layout.
//!
//! TEAM_263: A table is 512 eight-byte entries in one 4 KiB frame, on both
//! x86_64 4-level paging and RISC-V Sv39.

use crate::memory::phys_to_virt;
use crate::traits::PageTableEntryOps;

pub const PAGE_SHIFT: usize = 12;
pub const PAGE_SIZE: usize = 1 << PAGE_SHIFT;
/// Clears the in-page offset of an address.
pub const PAGE_MASK: usize = !(PAGE_SIZE - 1);
pub const ENTRIES_PER_TABLE: usize = 512;

#[repr(C, align(4096))]
pub struct PageTable<E> {
    pub entries: [E; ENTRIES_PER_TABLE],
}

impl<E: PageTableEntryOps> PageTable<E> {
    /// Clear every entry.
    pub fn zero(&mut self) {
        for entry in &mut self.entries {
            entry.clear();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(PageTableEntryOps::is_null)
    }

    pub fn present_entries(&self) -> usize {
        self.entries.iter().filter(|e| e.is_present()).count()
    }
}

/// View the table stored in the physical frame at `paddr`.
///
/// # Safety
/// `paddr` must be a page-aligned frame reachable through the physical memory
/// window, holding a table of entry type `E`, and the caller must not create
/// overlapping mutable views of the same frame.
pub unsafe fn table_at<'a, E: PageTableEntryOps>(paddr: usize) -> &'a mut PageTable<E> {
    debug_assert_eq!(paddr % PAGE_SIZE, 0);
    unsafe { &mut *(phys_to_virt(paddr) as *mut PageTable<E>) }
}

#[inline]
pub const fn page_round_down(addr: usize) -> usize {
    addr & PAGE_MASK
}

/// Round up to the next page boundary, `None` on overflow.
#[inline]
pub const fn page_round_up(addr: usize) -> Option<usize> {
    match addr.checked_add(PAGE_SIZE - 1) {
        Some(v) => Some(v & PAGE_MASK),
        None => None,
    }
}

#[inline]
pub const fn is_page_aligned(addr: usize) -> bool {
    addr % PAGE_SIZE == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::riscv64::paging::Sv39PageTableEntry;
    use crate::x86_64::paging::PageTableEntry;

    #[test]
    fn test_table_is_one_page() {
        assert_eq!(core::mem::size_of::<PageTable<PageTableEntry>>(), PAGE_SIZE);
        assert_eq!(core::mem::align_of::<PageTable<PageTableEntry>>(), PAGE_SIZE);
        assert_eq!(core::mem::size_of::<PageTable<Sv39PageTableEntry>>(), PAGE_SIZE);
    }

    #[test]
    fn test_page_rounding() {
        assert_eq!(page_round_down(0x1fff), 0x1000);
        assert_eq!(page_round_up(0x1001), Some(0x2000));
        assert_eq!(page_round_up(0x2000), Some(0x2000));
        assert_eq!(page_round_up(usize::MAX), None);
        assert!(is_page_aligned(0x3000));
        assert!(!is_page_aligned(0x3008));
    }

    #[test]
    fn test_zero_clears_entries() {
        let mut table = PageTable {
            entries: [PageTableEntry::from_raw(0x1003); ENTRIES_PER_TABLE],
        };
        assert_eq!(table.present_entries(), ENTRIES_PER_TABLE);
        table.zero();
        assert!(table.is_empty());
    }
}
