//! TEAM_431: Virtual memory core for LevitateOS.
//!
//! - [`VirtualRange`] / [`VirtualRangeAllocator`]: page-granular reservation of
//!   virtual address space with guard pages and randomized placement.
//! - [`PageDirectory`]: one hardware translation tree (address space), shared
//!   kernel half included, findable by its CR3 / SATP value.
//! - [`PhysicalFrame`]: counted handle to a page-table frame.
//!
//! Entry bit layouts live in `los_hal` (`x86_64::paging`, `riscv64::paging`).

#![no_std]

extern crate alloc;

pub mod address;
pub mod error;
pub mod frame;
pub mod layout;
pub mod page_directory;
pub mod random;
pub mod range;
pub mod range_allocator;
mod registry;

#[cfg(test)]
mod test_support;

pub use address::VirtualAddress;
pub use error::MemoryError;
pub use frame::PhysicalFrame;
pub use page_directory::{BootPageTables, PageDirectory, Process, activate};
pub use range::{Carved, VirtualRange};
pub use range_allocator::VirtualRangeAllocator;
