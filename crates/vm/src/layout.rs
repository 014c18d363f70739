//! TEAM_431: Address-space layout constants.
//!
//! User space starts above the first 8 MiB so null-ish pointers never hit a
//! mapping, with a random page-aligned shift of up to 32 MiB on top.

const MIB: usize = 1024 * 1024;

/// Lowest address handed to user space before randomization.
pub const USER_RANGE_BASE: usize = 0x0080_0000;

/// Top of the user range: just below the canonical-address hole.
#[cfg(not(target_arch = "riscv64"))]
pub const USER_RANGE_CEILING: usize = 0x0000_7FFF_FFFF_0000;
/// Top of the user range: just below the Sv39 sign-extension boundary.
#[cfg(target_arch = "riscv64")]
pub const USER_RANGE_CEILING: usize = 0x0000_003F_FFFF_0000;

/// Upper bound (exclusive) on the random shift applied to `USER_RANGE_BASE`.
pub const USER_RANDOM_OFFSET_LIMIT: usize = 32 * MIB;

/// Kernel virtual range handed out by the kernel directory's allocator.
pub const KERNEL_RANGE_BASE: usize = 0xFFFF_FFFF_8200_0000;
pub const KERNEL_RANGE_SIZE: usize = 0x3E00_0000;

/// Low identity-mapped window managed by the kernel directory.
pub const KERNEL_IDENTITY_RANGE_BASE: usize = 0;
pub const KERNEL_IDENTITY_RANGE_SIZE: usize = 2 * MIB;

/// Random placements tried before falling back to first fit.
pub const MAX_RANDOMIZATION_ATTEMPTS: usize = 1000;
