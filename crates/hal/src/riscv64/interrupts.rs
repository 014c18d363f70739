// TEAM_431: RISC-V supervisor interrupt control via sstatus.SIE.

use core::arch::asm;

/// sstatus.SIE
const SSTATUS_SIE: u64 = 1 << 1;

/// [I1] Disables interrupts, [I2] returns previous state
#[inline(always)]
pub fn disable() -> u64 {
    let sstatus: u64;
    // SAFETY: clearing SIE only masks supervisor interrupts
    unsafe { asm!("csrrci {}, sstatus, 2", out(reg) sstatus, options(nomem, nostack)) };
    sstatus
}

/// [I7] Unconditionally enables interrupts
#[inline(always)]
pub unsafe fn enable() {
    unsafe { asm!("csrsi sstatus, 2", options(nomem, nostack)) };
}

/// [I3] Restores previous interrupt state
#[inline(always)]
pub fn restore(state: u64) {
    if state & SSTATUS_SIE != 0 {
        unsafe { enable() };
    }
}

/// [I4] Returns true when enabled, [I5] returns false when disabled
#[inline(always)]
pub fn is_enabled() -> bool {
    let sstatus: u64;
    // SAFETY: reading sstatus has no side effects
    unsafe { asm!("csrr {}, sstatus", out(reg) sstatus, options(nomem, nostack)) };
    sstatus & SSTATUS_SIE != 0
}
