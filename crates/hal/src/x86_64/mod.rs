// TEAM_259: x86_64 HAL module structure.
// TEAM_431: `paging` is plain data and builds everywhere; register and
// interrupt access only exists on x86_64 itself or as host mocks.

#[cfg(any(feature = "std", target_arch = "x86_64"))]
pub mod control;
#[cfg(all(not(feature = "std"), target_arch = "x86_64"))]
pub mod interrupts;
pub mod paging;

#[cfg(any(feature = "std", target_arch = "x86_64"))]
pub use control::{load_root_register, read_root_register};
