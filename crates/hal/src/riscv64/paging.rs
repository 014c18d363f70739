//! RISC-V Sv39 entry layout.
//!
//! TEAM_431: Three levels of 512 entries, 39-bit virtual addresses.
//! ```text
//!  63  62-61  60-54  53 ............ 10  9-8  7 6 5 4 3 2 1 0
//!  N   PBMT   rsvd   PPN[2..0] (44 bits) RSW  D A G U X W R V
//! ```
//!
//! Sv39 has no direct equivalent for some portable fields:
//! - A valid leaf must be readable, and the kernel does not take A/D faults,
//!   so a leaf's `set_present(true)` sets V|R|A|D and `set_present(false)`
//!   clears V|R. Directory entries use V alone.
//! - "Execute disabled" is the absence of X.
//! - "Cache disabled" is the Svpbmt IO memory type.
//! - "Write through" has no memory type; it is recorded in RSW bit 8 only.
//! - A directory entry with R set is a leaf at that level (a huge page).

use bitflags::bitflags;

use crate::paging::{ENTRIES_PER_TABLE, PAGE_SHIFT};
use crate::traits::{DirectoryEntryOps, LeafEntryOps, PageTableEntryOps, PagingArch};

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Sv39Flags: u64 {
        const VALID = 1 << 0;
        const READABLE = 1 << 1;
        const WRITABLE = 1 << 2;
        const EXECUTABLE = 1 << 3;
        const USER = 1 << 4;
        const GLOBAL = 1 << 5;
        const ACCESSED = 1 << 6;
        const DIRTY = 1 << 7;
        /// Software bit: write-through requested.
        const WRITE_THROUGH = 1 << 8;
        /// Svpbmt NC
        const PBMT_NC = 1 << 61;
        /// Svpbmt IO
        const PBMT_IO = 1 << 62;
    }
}

const PPN_SHIFT: u32 = 10;
const PPN_BITS: u32 = 44;
/// Bits 10..54 hold the physical page number.
pub const PPN_MASK: u64 = ((1 << PPN_BITS) - 1) << PPN_SHIFT;

/// satp.MODE for Sv39.
pub const SATP_MODE_SV39: usize = 8 << 60;
const SATP_PPN_MASK: usize = (1 << PPN_BITS) - 1;

#[derive(Clone, Copy, Default, PartialEq, Eq)]
#[repr(transparent)]
pub struct Sv39PageTableEntry(u64);

#[derive(Clone, Copy, Default, PartialEq, Eq)]
#[repr(transparent)]
pub struct Sv39PageDirectoryEntry(u64);

fn update(raw: &mut u64, flag: Sv39Flags, value: bool) {
    if value {
        *raw |= flag.bits();
    } else {
        *raw &= !flag.bits();
    }
}

fn address_of(raw: u64) -> usize {
    (((raw & PPN_MASK) >> PPN_SHIFT) << PAGE_SHIFT) as usize
}

fn with_address(raw: u64, addr: usize) -> u64 {
    debug_assert_eq!(addr & 0xfff, 0, "Physical address must be 4KB aligned");
    let ppn = ((addr >> PAGE_SHIFT) as u64) << PPN_SHIFT;
    (raw & !PPN_MASK) | (ppn & PPN_MASK)
}

// Fields that behave the same on leaf and directory entries.
macro_rules! sv39_shared_ops {
    () => {
        fn from_raw(raw: u64) -> Self {
            Self(raw)
        }

        fn raw(&self) -> u64 {
            self.0
        }

        fn is_writable(&self) -> bool {
            self.has(Sv39Flags::WRITABLE)
        }

        fn set_writable(&mut self, writable: bool) {
            update(&mut self.0, Sv39Flags::WRITABLE, writable);
        }

        fn is_user_allowed(&self) -> bool {
            self.has(Sv39Flags::USER)
        }

        fn set_user_allowed(&mut self, allowed: bool) {
            update(&mut self.0, Sv39Flags::USER, allowed);
        }

        fn is_global(&self) -> bool {
            self.has(Sv39Flags::GLOBAL)
        }

        fn set_global(&mut self, global: bool) {
            update(&mut self.0, Sv39Flags::GLOBAL, global);
        }

        fn is_execute_disabled(&self) -> bool {
            !self.has(Sv39Flags::EXECUTABLE)
        }

        fn set_execute_disabled(&mut self, disabled: bool) {
            update(&mut self.0, Sv39Flags::EXECUTABLE, !disabled);
        }

        fn is_cache_disabled(&self) -> bool {
            self.has(Sv39Flags::PBMT_IO)
        }

        fn set_cache_disabled(&mut self, disabled: bool) {
            update(&mut self.0, Sv39Flags::PBMT_IO, disabled);
        }

        fn is_write_through(&self) -> bool {
            self.has(Sv39Flags::WRITE_THROUGH)
        }

        fn set_write_through(&mut self, write_through: bool) {
            update(&mut self.0, Sv39Flags::WRITE_THROUGH, write_through);
        }
    };
}

impl Sv39PageTableEntry {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn flags(&self) -> Sv39Flags {
        Sv39Flags::from_bits_truncate(self.0)
    }

    fn has(&self, flag: Sv39Flags) -> bool {
        self.0 & flag.bits() != 0
    }
}

impl Sv39PageDirectoryEntry {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn flags(&self) -> Sv39Flags {
        Sv39Flags::from_bits_truncate(self.0)
    }

    fn has(&self, flag: Sv39Flags) -> bool {
        self.0 & flag.bits() != 0
    }
}

impl PageTableEntryOps for Sv39PageTableEntry {
    sv39_shared_ops!();

    fn is_present(&self) -> bool {
        self.has(Sv39Flags::VALID)
    }

    fn set_present(&mut self, present: bool) {
        if present {
            self.0 |= (Sv39Flags::VALID
                | Sv39Flags::READABLE
                | Sv39Flags::ACCESSED
                | Sv39Flags::DIRTY)
                .bits();
        } else {
            self.0 &= !(Sv39Flags::VALID | Sv39Flags::READABLE).bits();
        }
    }
}

impl PageTableEntryOps for Sv39PageDirectoryEntry {
    sv39_shared_ops!();

    fn is_present(&self) -> bool {
        self.has(Sv39Flags::VALID)
    }

    fn set_present(&mut self, present: bool) {
        update(&mut self.0, Sv39Flags::VALID, present);
    }
}

impl LeafEntryOps for Sv39PageTableEntry {
    fn physical_page_base(&self) -> usize {
        address_of(self.0)
    }

    fn set_physical_page_base(&mut self, base: usize) {
        self.0 = with_address(self.0, base);
    }
}

impl DirectoryEntryOps for Sv39PageDirectoryEntry {
    fn is_huge(&self) -> bool {
        self.has(Sv39Flags::READABLE)
    }

    fn set_huge(&mut self, huge: bool) {
        update(&mut self.0, Sv39Flags::READABLE, huge);
    }

    fn physical_page_table_base(&self) -> usize {
        address_of(self.0)
    }

    fn set_physical_page_table_base(&mut self, base: usize) {
        self.0 = with_address(self.0, base);
    }
}

impl core::fmt::Debug for Sv39PageTableEntry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Sv39PageTableEntry")
            .field("address", &format_args!("{:#x}", address_of(self.0)))
            .field("flags", &self.flags())
            .finish()
    }
}

impl core::fmt::Debug for Sv39PageDirectoryEntry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Sv39PageDirectoryEntry")
            .field("address", &format_args!("{:#x}", address_of(self.0)))
            .field("flags", &self.flags())
            .finish()
    }
}

pub struct Sv39Paging;

impl PagingArch for Sv39Paging {
    type TableEntry = Sv39PageTableEntry;
    type DirectoryEntry = Sv39PageDirectoryEntry;

    const NAME: &'static str = "riscv64-sv39";
    const LEVELS: usize = 3;
    const PHYSICAL_ADDRESS_BITS: u32 = 56;
    const FIRST_KERNEL_ROOT_ENTRY: usize = ENTRIES_PER_TABLE / 2;

    fn table_index(vaddr: usize, level: usize) -> usize {
        (vaddr >> (PAGE_SHIFT + 9 * level)) & (ENTRIES_PER_TABLE - 1)
    }

    // Non-leaf entries carry V only; U/A/D must be zero at this level.
    fn link_table(entry: &mut Sv39PageDirectoryEntry, table_paddr: usize) {
        entry.clear();
        entry.set_physical_page_table_base(table_paddr);
        entry.set_present(true);
    }

    fn root_register_value(root_paddr: usize) -> usize {
        SATP_MODE_SV39 | ((root_paddr >> PAGE_SHIFT) & SATP_PPN_MASK)
    }

    fn root_from_register(value: usize) -> usize {
        (value & SATP_PPN_MASK) << PAGE_SHIFT
    }
}
