//! TEAM_431: Virtual range allocator.
//!
//! Hands out page-granular spans of one address space. The free list is an
//! ordered map from base address to free range, so neighbours are found with
//! a single predecessor/successor lookup.
//!
//! Behaviors:
//! - [A1] Returned ranges are page aligned, page sized, and inside `total_range`
//! - [A2] Live allocations never overlap each other or a free entry
//! - [A3] `allocate_anywhere` surrounds the allocation with guard pages that stay free
//! - [A4] `allocate_specific` succeeds only when one free entry covers the request
//! - [A5] `deallocate` coalesces with free neighbours on both sides
//! - [A6] Freeing a range that overlaps free space (double free) is fatal
//! - [A7] Size 0 and out-of-bounds requests return None

extern crate alloc;

use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, Ordering};

use los_hal::IrqSafeLock;
use los_hal::paging::PAGE_SIZE;

use crate::address::VirtualAddress;
use crate::layout::MAX_RANDOMIZATION_ATTEMPTS;
use crate::random;
use crate::range::VirtualRange;

/// Padding placed before and after each `allocate_anywhere` result.
pub const GUARD_PAGE_SIZE: usize = PAGE_SIZE;

#[derive(Default)]
struct FreeRanges {
    total_range: VirtualRange,
    available: BTreeMap<VirtualAddress, VirtualRange>,
}

impl FreeRanges {
    fn reset(&mut self, total_range: VirtualRange) {
        self.total_range = total_range;
        self.available.clear();
        if !total_range.is_empty() {
            self.available.insert(total_range.base(), total_range);
        }
    }

    fn is_initialized(&self) -> bool {
        !self.total_range.is_empty()
    }

    /// Free entry that could contain `addr`.
    fn entry_at_or_before(&self, addr: VirtualAddress) -> Option<VirtualRange> {
        self.available.range(..=addr).next_back().map(|(_, range)| *range)
    }

    /// Replace `free` by what is left of it after removing `taken`.
    fn take(&mut self, free: VirtualRange, taken: VirtualRange) {
        self.available.remove(&free.base());
        for remainder in free.carve(&taken).iter() {
            self.available.insert(remainder.base(), remainder);
        }
    }

    fn release(&mut self, range: VirtualRange) {
        // [A6]
        if let Some(before) = self.entry_at_or_before(range.base()) {
            assert!(
                !before.overlaps(&range),
                "[VM][RANGE] Double free of {range}: overlaps free {before}"
            );
        }
        if let Some((_, inside)) = self.available.range(range.base()..range.end()).next() {
            panic!("[VM][RANGE] Double free of {range}: overlaps free {inside}");
        }

        // [A5]
        let mut merged = range;
        if let Some(before) = self.entry_at_or_before(range.base()) {
            if before.end() == range.base() {
                self.available.remove(&before.base());
                merged = VirtualRange::new(before.base(), before.size() + merged.size());
            }
        }
        if let Some(after) = self.available.remove(&range.end()) {
            merged = VirtualRange::new(merged.base(), merged.size() + after.size());
        }
        self.available.insert(merged.base(), merged);
    }
}

fn align_up(addr: usize, alignment: usize) -> Option<usize> {
    Some(addr.checked_add(alignment - 1)? & !(alignment - 1))
}

fn assert_request(size: usize, alignment: usize) {
    assert_eq!(size % PAGE_SIZE, 0, "[VM][RANGE] Size {size:#x} is not page sized");
    assert!(
        alignment.is_power_of_two() && alignment % PAGE_SIZE == 0,
        "[VM][RANGE] Bad alignment {alignment:#x}"
    );
}

/// Lowest `alignment`-aligned allocation of `size` inside `free` that leaves
/// `guard` bytes free on both sides.
fn fit(free: &VirtualRange, size: usize, alignment: usize, guard: usize) -> Option<VirtualRange> {
    let start = free.base().get().checked_add(guard)?;
    let base = align_up(start, alignment)?;
    let end = base.checked_add(size)?.checked_add(guard)?;
    if end > free.end().get() {
        return None;
    }
    VirtualRange::try_new(VirtualAddress::new(base), size)
}

pub struct VirtualRangeAllocator {
    state: IrqSafeLock<FreeRanges>,
    guard_pages: AtomicBool,
}

impl Default for VirtualRangeAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualRangeAllocator {
    /// An allocator with no range; every allocation fails until initialized.
    pub fn new() -> Self {
        Self {
            state: IrqSafeLock::new(FreeRanges::default()),
            guard_pages: AtomicBool::new(true),
        }
    }

    pub fn with_range(base: VirtualAddress, size: usize) -> Self {
        let allocator = Self::new();
        allocator.initialize_with_range(base, size);
        allocator
    }

    /// Reset to a single free range `[base, base + size)`.
    pub fn initialize_with_range(&self, base: VirtualAddress, size: usize) {
        assert!(base.is_page_aligned(), "[VM][RANGE] Base {base} is not page aligned");
        assert_eq!(size % PAGE_SIZE, 0, "[VM][RANGE] Size {size:#x} is not page sized");
        let total_range = VirtualRange::new(base, size);
        self.state.lock().reset(total_range);
        log::trace!("[VM][RANGE] Initialized with {total_range}");
    }

    /// Copy `parent`'s total range and free list, so the same holes are free here.
    pub fn initialize_from_parent(&self, parent: &VirtualRangeAllocator) {
        assert!(
            !core::ptr::eq(self, parent),
            "[VM][RANGE] Cannot initialize an allocator from itself"
        );
        let (total_range, available) = {
            let parent_state = parent.state.lock();
            (parent_state.total_range, parent_state.available.clone())
        };
        let mut state = self.state.lock();
        state.total_range = total_range;
        state.available = available;
        self.guard_pages.store(parent.guard_pages(), Ordering::Relaxed);
    }

    pub fn set_guard_pages(&self, enabled: bool) {
        self.guard_pages.store(enabled, Ordering::Relaxed);
    }

    pub fn guard_pages(&self) -> bool {
        self.guard_pages.load(Ordering::Relaxed)
    }

    pub fn total_range(&self) -> VirtualRange {
        self.state.lock().total_range
    }

    pub fn is_initialized(&self) -> bool {
        self.state.lock().is_initialized()
    }

    /// Snapshot of the free list in address order.
    pub fn available_ranges(&self) -> Vec<VirtualRange> {
        self.state.lock().available.values().copied().collect()
    }

    pub fn free_bytes(&self) -> usize {
        self.state.lock().available.values().map(VirtualRange::size).sum()
    }

    /// First-fit allocation, padded with guard pages when enabled.
    pub fn allocate_anywhere(&self, size: usize, alignment: usize) -> Option<VirtualRange> {
        if size == 0 {
            return None; // [A7]
        }
        assert_request(size, alignment);
        let guard = if self.guard_pages() { GUARD_PAGE_SIZE } else { 0 };

        let mut state = self.state.lock();
        let found = state
            .available
            .values()
            .find_map(|free| fit(free, size, alignment, guard).map(|taken| (*free, taken)));

        if let Some((free, allocated)) = found {
            // [A3] guards stay in the free list
            state.take(free, allocated);
            return Some(allocated);
        }
        let total_range = state.total_range;
        drop(state);
        log::warn!(
            "[VM][RANGE] Failed to allocate anywhere: size={size:#x} alignment={alignment:#x} in {total_range}"
        );
        None
    }

    /// Reserve exactly `[base, base + size)` if it is free.
    pub fn allocate_specific(&self, base: VirtualAddress, size: usize) -> Option<VirtualRange> {
        if size == 0 {
            return None; // [A7]
        }
        assert!(base.is_page_aligned(), "[VM][RANGE] Base {base} is not page aligned");
        assert_eq!(size % PAGE_SIZE, 0, "[VM][RANGE] Size {size:#x} is not page sized");
        let allocated = VirtualRange::try_new(base, size)?;

        let mut state = self.state.lock();
        if !state.total_range.contains(&allocated) {
            return None; // [A7]
        }
        let free = state.entry_at_or_before(base)?;
        if !free.contains(&allocated) {
            return None; // [A4]
        }
        state.take(free, allocated);
        Some(allocated)
    }

    /// Try random aligned bases inside the total range, then fall back to first fit.
    pub fn allocate_randomized(&self, size: usize, alignment: usize) -> Option<VirtualRange> {
        if size == 0 {
            return None; // [A7]
        }
        assert_request(size, alignment);

        let total_range = self.total_range();
        if !total_range.is_empty() {
            for _ in 0..MAX_RANDOMIZATION_ATTEMPTS {
                let offset = random::random_usize() % total_range.size();
                let Some(candidate) = align_up(total_range.base().get() + offset, alignment) else {
                    continue;
                };
                let candidate = VirtualAddress::new(candidate);
                if !total_range.contains_span(candidate, size) {
                    continue;
                }
                if let Some(allocated) = self.allocate_specific(candidate, size) {
                    return Some(allocated);
                }
            }
        }
        self.allocate_anywhere(size, alignment)
    }

    /// Return `range` to the free list.
    pub fn deallocate(&self, range: VirtualRange) {
        assert!(!range.is_empty(), "[VM][RANGE] Deallocating an empty range");
        assert!(range.base().is_page_aligned(), "[VM][RANGE] {range} is not page aligned");
        assert_eq!(range.size() % PAGE_SIZE, 0, "[VM][RANGE] {range} is not page sized");

        let mut state = self.state.lock();
        assert!(state.is_initialized(), "[VM][RANGE] Deallocating {range} before initialization");
        assert!(
            state.total_range.contains(&range),
            "[VM][RANGE] {range} is outside {}",
            state.total_range
        );
        state.release(range);
    }

    /// Log the free list.
    pub fn dump(&self) {
        let state = self.state.lock();
        log::debug!(
            "[VM][RANGE] {} ({} free ranges)",
            state.total_range,
            state.available.len()
        );
        for range in state.available.values() {
            log::debug!("[VM][RANGE]    {range}");
        }
    }
}
