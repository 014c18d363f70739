//! RISC-V satp access with mock support.

#[cfg(not(feature = "std"))]
mod real_impl {
    use core::arch::asm;

    pub unsafe fn write_satp(value: u64) {
        asm!("csrw satp, {}", "sfence.vma", in(reg) value, options(nostack));
    }

    pub unsafe fn read_satp() -> u64 {
        let res: u64;
        asm!("csrr {}, satp", out(reg) res, options(nomem, nostack));
        res
    }
}

// Per-thread, like the x86_64 CR3 mock.
#[cfg(feature = "std")]
mod mock_impl {
    use std::cell::Cell;

    std::thread_local! {
        static SATP: Cell<u64> = const { Cell::new(0) };
    }

    pub unsafe fn write_satp(value: u64) {
        SATP.with(|satp| satp.set(value));
    }

    pub unsafe fn read_satp() -> u64 {
        SATP.with(Cell::get)
    }
}

#[cfg(not(feature = "std"))]
pub use real_impl::*;

#[cfg(feature = "std")]
pub use mock_impl::*;

/// Current satp value, ASID and mode included.
pub fn read_root_register() -> usize {
    // SAFETY: reading satp has no side effects
    unsafe { read_satp() as usize }
}

/// Switch address spaces by writing satp and fencing.
///
/// # Safety
/// `value` must encode a root table that maps the currently executing code and stack.
pub unsafe fn load_root_register(value: usize) {
    unsafe { write_satp(value as u64) }
}
