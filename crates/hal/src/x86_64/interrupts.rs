// TEAM_260: x86_64 interrupt control.
// TEAM_431: Backed by the x86_64 crate's instruction wrappers.

use ::x86_64::instructions::interrupts as cpu;

/// RFLAGS.IF
const RFLAGS_IF: u64 = 1 << 9;

/// [I1] Disables interrupts, [I2] returns previous state
#[inline(always)]
pub fn disable() -> u64 {
    let state = if cpu::are_enabled() { RFLAGS_IF } else { 0 };
    cpu::disable();
    state
}

/// [I7] Unconditionally enables interrupts
#[inline(always)]
pub unsafe fn enable() {
    cpu::enable();
}

/// [I3] Restores previous interrupt state
#[inline(always)]
pub fn restore(state: u64) {
    if state & RFLAGS_IF != 0 {
        cpu::enable();
    }
}

/// [I4] Returns true when enabled, [I5] returns false when disabled
#[inline(always)]
pub fn is_enabled() -> bool {
    cpu::are_enabled()
}
