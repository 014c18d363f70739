// TEAM_431: RISC-V (Sv39) HAL module structure.
// Mirrors x86_64/: `paging` builds everywhere, register and interrupt access
// only exists on riscv64 itself or as host mocks.

#[cfg(any(feature = "std", target_arch = "riscv64"))]
pub mod control;
#[cfg(all(not(feature = "std"), target_arch = "riscv64"))]
pub mod interrupts;
pub mod paging;

#[cfg(any(feature = "std", target_arch = "riscv64"))]
pub use control::{load_root_register, read_root_register};
