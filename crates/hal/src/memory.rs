// TEAM_266: Physical memory window.
// All physical memory is mapped at a fixed offset in the kernel half, so a
// page table at physical address `pa` is reachable at `pa + offset`.
// TEAM_431: The offset is set at boot from the bootloader's HHDM response;
// it stays 0 (identity) for host tests, where "physical" pages are heap pages.

use core::sync::atomic::{AtomicUsize, Ordering};

static PHYS_OFFSET: AtomicUsize = AtomicUsize::new(0);

/// Record where physical memory is mapped. Called once during early boot.
pub fn set_phys_offset(offset: usize) {
    PHYS_OFFSET.store(offset, Ordering::Release);
}

pub fn phys_offset() -> usize {
    PHYS_OFFSET.load(Ordering::Acquire)
}

/// [M20] Converts PA to its window VA
#[inline]
pub fn phys_to_virt(pa: usize) -> usize {
    window_virt(pa, phys_offset())
}

/// [M19] Converts a window VA back to PA
#[inline]
pub fn virt_to_phys(va: usize) -> usize {
    window_phys(va, phys_offset())
}

const fn window_virt(pa: usize, offset: usize) -> usize {
    pa.wrapping_add(offset)
}

const fn window_phys(va: usize, offset: usize) -> usize {
    va.wrapping_sub(offset)
}
