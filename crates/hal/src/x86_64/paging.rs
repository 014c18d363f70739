use bitflags::bitflags;

use crate::paging::{ENTRIES_PER_TABLE, PAGE_SHIFT};
use crate::traits::{DirectoryEntryOps, LeafEntryOps, PageTableEntryOps, PagingArch};

// TEAM_263: x86_64 Page Table Entry and Page Table structures.
// Follows the 4-level paging scheme (PML4, PDPT, PD, PT).

bitflags! {
    /// x86_64 Page Table Entry flags.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct PageTableFlags: u64 {
        const PRESENT = 1 << 0;
        const WRITABLE = 1 << 1;
        const USER_ACCESSIBLE = 1 << 2;
        const WRITE_THROUGH = 1 << 3;
        const NO_CACHE = 1 << 4;
        const ACCESSED = 1 << 5;
        const DIRTY = 1 << 6;
        /// PS in directory entries. In a leaf this bit is PAT and is left alone.
        const HUGE_PAGE = 1 << 7;
        const GLOBAL = 1 << 8;
        const NO_EXECUTE = 1 << 63;
    }
}

/// Bits 12..52 hold the frame address.
pub const PHYSICAL_ADDRESS_MASK: u64 = 0x000F_FFFF_FFFF_F000;

/// Leaf entry (PT level).
#[derive(Clone, Copy, Default, PartialEq, Eq)]
#[repr(transparent)]
pub struct PageTableEntry(u64);

/// Non-leaf entry (PML4, PDPT, PD levels).
#[derive(Clone, Copy, Default, PartialEq, Eq)]
#[repr(transparent)]
pub struct PageDirectoryEntry(u64);

fn update(raw: &mut u64, flag: PageTableFlags, value: bool) {
    if value {
        *raw |= flag.bits();
    } else {
        *raw &= !flag.bits();
    }
}

fn with_address(raw: u64, addr: usize) -> u64 {
    debug_assert_eq!(addr & 0xfff, 0, "Physical address must be 4KB aligned");
    (raw & !PHYSICAL_ADDRESS_MASK) | (addr as u64 & PHYSICAL_ADDRESS_MASK)
}

// Both entry kinds share the permission bit positions.
macro_rules! x86_entry_ops {
    ($entry:ident) => {
        impl $entry {
            pub const fn empty() -> Self {
                Self(0)
            }

            pub fn flags(&self) -> PageTableFlags {
                PageTableFlags::from_bits_truncate(self.0)
            }

            fn has(&self, flag: PageTableFlags) -> bool {
                self.0 & flag.bits() != 0
            }
        }

        impl PageTableEntryOps for $entry {
            fn from_raw(raw: u64) -> Self {
                Self(raw)
            }

            fn raw(&self) -> u64 {
                self.0
            }

            fn is_present(&self) -> bool {
                self.has(PageTableFlags::PRESENT)
            }

            fn set_present(&mut self, present: bool) {
                update(&mut self.0, PageTableFlags::PRESENT, present);
            }

            fn is_writable(&self) -> bool {
                self.has(PageTableFlags::WRITABLE)
            }

            fn set_writable(&mut self, writable: bool) {
                update(&mut self.0, PageTableFlags::WRITABLE, writable);
            }

            fn is_user_allowed(&self) -> bool {
                self.has(PageTableFlags::USER_ACCESSIBLE)
            }

            fn set_user_allowed(&mut self, allowed: bool) {
                update(&mut self.0, PageTableFlags::USER_ACCESSIBLE, allowed);
            }

            fn is_global(&self) -> bool {
                self.has(PageTableFlags::GLOBAL)
            }

            fn set_global(&mut self, global: bool) {
                update(&mut self.0, PageTableFlags::GLOBAL, global);
            }

            fn is_execute_disabled(&self) -> bool {
                self.has(PageTableFlags::NO_EXECUTE)
            }

            fn set_execute_disabled(&mut self, disabled: bool) {
                update(&mut self.0, PageTableFlags::NO_EXECUTE, disabled);
            }

            fn is_cache_disabled(&self) -> bool {
                self.has(PageTableFlags::NO_CACHE)
            }

            fn set_cache_disabled(&mut self, disabled: bool) {
                update(&mut self.0, PageTableFlags::NO_CACHE, disabled);
            }

            fn is_write_through(&self) -> bool {
                self.has(PageTableFlags::WRITE_THROUGH)
            }

            fn set_write_through(&mut self, write_through: bool) {
                update(&mut self.0, PageTableFlags::WRITE_THROUGH, write_through);
            }
        }

        impl core::fmt::Debug for $entry {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.debug_struct(stringify!($entry))
                    .field("address", &format_args!("{:#x}", self.0 & PHYSICAL_ADDRESS_MASK))
                    .field("flags", &self.flags())
                    .finish()
            }
        }
    };
}

x86_entry_ops!(PageTableEntry);
x86_entry_ops!(PageDirectoryEntry);

impl LeafEntryOps for PageTableEntry {
    fn physical_page_base(&self) -> usize {
        (self.0 & PHYSICAL_ADDRESS_MASK) as usize
    }

    fn set_physical_page_base(&mut self, base: usize) {
        self.0 = with_address(self.0, base);
    }
}

impl DirectoryEntryOps for PageDirectoryEntry {
    fn is_huge(&self) -> bool {
        self.has(PageTableFlags::HUGE_PAGE)
    }

    fn set_huge(&mut self, huge: bool) {
        update(&mut self.0, PageTableFlags::HUGE_PAGE, huge);
    }

    fn physical_page_table_base(&self) -> usize {
        (self.0 & PHYSICAL_ADDRESS_MASK) as usize
    }

    fn set_physical_page_table_base(&mut self, base: usize) {
        self.0 = with_address(self.0, base);
    }
}

/// Extract PML4 index (bits 39-47)
pub fn pml4_index(addr: usize) -> usize {
    (addr >> 39) & 0x1ff
}

/// Extract PDPT index (bits 30-38)
pub fn pdpt_index(addr: usize) -> usize {
    (addr >> 30) & 0x1ff
}

/// Extract PD index (bits 21-29)
pub fn pd_index(addr: usize) -> usize {
    (addr >> 21) & 0x1ff
}

/// Extract PT index (bits 12-20)
pub fn pt_index(addr: usize) -> usize {
    (addr >> 12) & 0x1ff
}

/// 4-level paging with 48-bit virtual addresses.
pub struct X86_64Paging;

impl PagingArch for X86_64Paging {
    type TableEntry = PageTableEntry;
    type DirectoryEntry = PageDirectoryEntry;

    const NAME: &'static str = "x86_64";
    const LEVELS: usize = 4;
    const PHYSICAL_ADDRESS_BITS: u32 = 52;
    const FIRST_KERNEL_ROOT_ENTRY: usize = ENTRIES_PER_TABLE / 2;

    fn table_index(vaddr: usize, level: usize) -> usize {
        (vaddr >> (PAGE_SHIFT + 9 * level)) & (ENTRIES_PER_TABLE - 1)
    }

    // Intermediate levels are permissive; the leaf decides the final access.
    fn link_table(entry: &mut PageDirectoryEntry, table_paddr: usize) {
        entry.clear();
        entry.set_physical_page_table_base(table_paddr);
        entry.set_present(true);
        entry.set_writable(true);
        entry.set_user_allowed(true);
    }

    fn root_register_value(root_paddr: usize) -> usize {
        root_paddr
    }

    fn root_from_register(value: usize) -> usize {
        value & PHYSICAL_ADDRESS_MASK as usize
    }
}
