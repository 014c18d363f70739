//! x86_64 CR3 access with mock support.
//! TEAM_373: Centralized control helpers to enable unit testing of CPU structures.

// =============================================================================
// Real implementation for bare metal (no_std)
// =============================================================================

#[cfg(not(feature = "std"))]
mod real_impl {
    use core::arch::asm;

    pub unsafe fn load_cr3(phys: u64) {
        asm!("mov cr3, {}", in(reg) phys, options(nostack, preserves_flags));
    }

    pub unsafe fn read_cr3() -> u64 {
        let res: u64;
        asm!("mov {}, cr3", out(reg) res, options(nomem, nostack, preserves_flags));
        res
    }
}

// =============================================================================
// Mock implementation for std feature (user-space tests)
// =============================================================================

// TEAM_431: CR3 is per CPU, so the mock is per thread; parallel tests each
// see their own "CPU".
#[cfg(feature = "std")]
mod mock_impl {
    use std::cell::Cell;

    std::thread_local! {
        static CR3: Cell<u64> = const { Cell::new(0) };
    }

    pub unsafe fn load_cr3(phys: u64) {
        CR3.with(|cr3| cr3.set(phys));
    }

    pub unsafe fn read_cr3() -> u64 {
        CR3.with(Cell::get)
    }
}

// =============================================================================
// Public API
// =============================================================================

#[cfg(not(feature = "std"))]
pub use real_impl::*;

#[cfg(feature = "std")]
pub use mock_impl::*;

/// Current CR3 value, PCID bits included.
pub fn read_root_register() -> usize {
    // SAFETY: reading CR3 has no side effects
    unsafe { read_cr3() as usize }
}

/// Switch address spaces by loading CR3.
///
/// # Safety
/// `value` must encode a root table that maps the currently executing code and stack.
pub unsafe fn load_root_register(value: usize) {
    unsafe { load_cr3(value as u64) }
}
