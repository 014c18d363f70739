//! Architecture-independent traits for hardware abstraction.
//!
//! TEAM_255: Decouples the kernel from architecture-specific hardware logic.
//! TEAM_431: Page-table entries are reached through capability traits so the
//! address-space code is written once for every paging layout.

/// Trait for physical page allocation, to be used by MMU for dynamic page tables.
pub trait PageAllocator: Send + Sync {
    /// Allocate a 4KB physical page.
    fn alloc_page(&self) -> Option<usize>;
    /// Free a 4KB physical page.
    fn free_page(&self, pa: usize);
}

/// Permission and caching bits shared by leaf and directory entries.
///
/// Every setter changes only its own field. How a field maps onto hardware
/// bits is decided by the implementing layout.
pub trait PageTableEntryOps: Copy + Eq + Send + Sync + 'static {
    fn from_raw(raw: u64) -> Self;
    fn raw(&self) -> u64;

    /// True for an all-zero entry.
    fn is_null(&self) -> bool {
        self.raw() == 0
    }

    /// Reset every bit to zero.
    fn clear(&mut self) {
        *self = Self::from_raw(0);
    }

    fn is_present(&self) -> bool;
    fn set_present(&mut self, present: bool);

    fn is_writable(&self) -> bool;
    fn set_writable(&mut self, writable: bool);

    fn is_user_allowed(&self) -> bool;
    fn set_user_allowed(&mut self, allowed: bool);

    fn is_global(&self) -> bool;
    fn set_global(&mut self, global: bool);

    fn is_execute_disabled(&self) -> bool;
    fn set_execute_disabled(&mut self, disabled: bool);

    fn is_cache_disabled(&self) -> bool;
    fn set_cache_disabled(&mut self, disabled: bool);

    fn is_write_through(&self) -> bool;
    fn set_write_through(&mut self, write_through: bool);
}

/// Entry that maps a 4 KiB page.
pub trait LeafEntryOps: PageTableEntryOps {
    fn physical_page_base(&self) -> usize;
    /// Replace the frame address, keeping every flag bit.
    fn set_physical_page_base(&mut self, base: usize);
}

/// Entry in a non-leaf table: points at the next table or maps a huge page.
pub trait DirectoryEntryOps: PageTableEntryOps {
    fn is_huge(&self) -> bool;
    fn set_huge(&mut self, huge: bool);

    fn physical_page_table_base(&self) -> usize;
    /// Replace the table address, keeping every flag bit.
    fn set_physical_page_table_base(&mut self, base: usize);
}

/// One paging layout: entry formats, tree shape, and root-register encoding.
pub trait PagingArch: 'static {
    type TableEntry: LeafEntryOps;
    type DirectoryEntry: DirectoryEntryOps;

    const NAME: &'static str;
    /// Number of table levels, root included.
    const LEVELS: usize;
    /// Width of a physical address the entry format can hold.
    const PHYSICAL_ADDRESS_BITS: u32;
    /// Root entries from this index up map the kernel half, shared by every directory.
    const FIRST_KERNEL_ROOT_ENTRY: usize;

    /// Index into the table at `level` (0 = leaf table) for `vaddr`.
    fn table_index(vaddr: usize, level: usize) -> usize;

    /// Index into the root table for `vaddr`.
    fn root_index(vaddr: usize) -> usize {
        Self::table_index(vaddr, Self::LEVELS - 1)
    }

    /// Point `entry` at a next-level table with the permissions a user-capable
    /// intermediate level needs.
    fn link_table(entry: &mut Self::DirectoryEntry, table_paddr: usize);

    /// Value to load into the translation root register for a root table.
    fn root_register_value(root_paddr: usize) -> usize;

    /// Root table address encoded in a translation root register value.
    fn root_from_register(value: usize) -> usize;
}
