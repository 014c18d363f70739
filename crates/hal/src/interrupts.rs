// TEAM_260: Generic interrupt control wrapper.
// Delegates to architecture-specific implementations.
// TEAM_431: Under `std` the interrupt flag is a per-thread mock so host tests
// can run lock code without privileged instructions.

#[cfg(all(not(feature = "std"), target_arch = "riscv64"))]
use crate::riscv64::interrupts as arch_interrupts;

#[cfg(all(not(feature = "std"), target_arch = "x86_64"))]
use crate::x86_64::interrupts as arch_interrupts;

#[cfg(any(feature = "std", not(any(target_arch = "riscv64", target_arch = "x86_64"))))]
use self::mock as arch_interrupts;

/// [I1] Disables interrupts, [I2] returns previous state
#[inline(always)]
pub fn disable() -> u64 {
    arch_interrupts::disable()
}

/// [I7] Unconditionally enables interrupts
///
/// # Safety
/// Enabling interrupts inside a critical section breaks its exclusion.
#[inline(always)]
pub unsafe fn enable() {
    unsafe { arch_interrupts::enable() }
}

/// [I3] Restores previous interrupt state
#[inline(always)]
pub fn restore(state: u64) {
    arch_interrupts::restore(state);
}

/// [I4] Returns true when enabled, [I5] returns false when disabled
#[inline(always)]
pub fn is_enabled() -> bool {
    arch_interrupts::is_enabled()
}

#[cfg(any(feature = "std", not(any(target_arch = "riscv64", target_arch = "x86_64"))))]
mod mock {
    #[cfg(feature = "std")]
    use core::cell::Cell;

    const ENABLED: u64 = 1;

    #[cfg(feature = "std")]
    std::thread_local! {
        static FLAG: Cell<bool> = const { Cell::new(true) };
    }

    #[cfg(feature = "std")]
    fn get() -> bool {
        FLAG.with(Cell::get)
    }

    #[cfg(feature = "std")]
    fn set(enabled: bool) {
        FLAG.with(|flag| flag.set(enabled));
    }

    #[cfg(not(feature = "std"))]
    fn get() -> bool {
        true
    }

    #[cfg(not(feature = "std"))]
    fn set(_enabled: bool) {}

    pub fn disable() -> u64 {
        let previous = get();
        set(false);
        if previous { ENABLED } else { 0 }
    }

    pub unsafe fn enable() {
        set(true);
    }

    pub fn restore(state: u64) {
        if state & ENABLED != 0 {
            set(true);
        }
    }

    pub fn is_enabled() -> bool {
        get()
    }
}
