#![cfg_attr(not(feature = "std"), no_std)]

// TEAM_260: HAL Crate - Symmetrical Architecture Support
// Root contains generic traits and utilities.
// Arch-specific logic is isolated in riscv64/ and x86_64/ submodules.
// TEAM_431: Both paging layouts are always compiled so either can be tested
// on the host; only register and interrupt access is target-gated.

pub mod interrupts;
pub mod memory;
pub mod paging;
pub mod traits;

pub mod riscv64;
pub mod x86_64;

pub use traits::{
    DirectoryEntryOps, LeafEntryOps, PageAllocator, PageTableEntryOps, PagingArch,
};

#[cfg(target_arch = "riscv64")]
pub use self::riscv64 as arch;
#[cfg(not(target_arch = "riscv64"))]
pub use self::x86_64 as arch;

/// Paging layout of the architecture this kernel is built for.
#[cfg(target_arch = "riscv64")]
pub type ActiveArch = self::riscv64::paging::Sv39Paging;
#[cfg(not(target_arch = "riscv64"))]
pub type ActiveArch = self::x86_64::paging::X86_64Paging;

use core::mem::ManuallyDrop;
use los_utils::{Mutex, MutexGuard, ReentrantMutex, ReentrantMutexGuard};

/// IRQ-safe lock that disables interrupts while held.
/// Behaviors: [L1]-[L4] interrupt-safe locking
pub struct IrqSafeLock<T> {
    inner: Mutex<T>,
}

impl<T> IrqSafeLock<T> {
    pub const fn new(data: T) -> Self {
        Self {
            inner: Mutex::new(data),
        }
    }

    /// [L1] Disables interrupts before acquiring, [L4] data accessible through guard
    pub fn lock(&self) -> IrqSafeLockGuard<'_, T> {
        let state = interrupts::disable(); // [L1] disable before acquire
        let guard = self.inner.lock();
        IrqSafeLockGuard {
            guard: ManuallyDrop::new(guard), // [L4] data access
            state,
        }
    }

    /// TEAM_089: Try to acquire the lock without blocking.
    /// Returns None if the lock is already held; interrupts are restored in that case.
    pub fn try_lock(&self) -> Option<IrqSafeLockGuard<'_, T>> {
        let state = interrupts::disable();
        if let Some(guard) = self.inner.try_lock() {
            Some(IrqSafeLockGuard {
                guard: ManuallyDrop::new(guard),
                state,
            })
        } else {
            interrupts::restore(state);
            None
        }
    }
}

impl<T: Default> Default for IrqSafeLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

pub struct IrqSafeLockGuard<'a, T> {
    guard: ManuallyDrop<MutexGuard<'a, T>>,
    state: u64,
}

impl<T> core::ops::Deref for IrqSafeLockGuard<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T> core::ops::DerefMut for IrqSafeLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}

impl<T> Drop for IrqSafeLockGuard<'_, T> {
    /// [L2] Restores interrupts after releasing
    fn drop(&mut self) {
        // SAFETY: guard is only dropped once, here in Drop, before restoring interrupts
        unsafe { ManuallyDrop::drop(&mut self.guard) };
        interrupts::restore(self.state); // [L2] restore on drop
    }
}

/// TEAM_431: Re-entrant counterpart of [`IrqSafeLock`].
/// Behaviors: [L5] interrupts off while any guard is held, [L6] owner re-enters,
/// [L7] outermost guard restores the entry state
pub struct IrqSafeReentrantLock<T> {
    inner: ReentrantMutex<T>,
}

impl<T> IrqSafeReentrantLock<T> {
    pub const fn new(data: T) -> Self {
        Self {
            inner: ReentrantMutex::new(data),
        }
    }

    /// [L5] Disables interrupts before acquiring, [L6] no deadlock for the owner
    pub fn lock(&self) -> IrqSafeReentrantGuard<'_, T> {
        let state = interrupts::disable();
        let guard = self.inner.lock();
        IrqSafeReentrantGuard {
            guard: ManuallyDrop::new(guard),
            state,
        }
    }

    pub fn try_lock(&self) -> Option<IrqSafeReentrantGuard<'_, T>> {
        let state = interrupts::disable();
        if let Some(guard) = self.inner.try_lock() {
            Some(IrqSafeReentrantGuard {
                guard: ManuallyDrop::new(guard),
                state,
            })
        } else {
            interrupts::restore(state);
            None
        }
    }

    pub fn is_locked(&self) -> bool {
        self.inner.is_locked()
    }
}

/// Shared access only; nested guards may alias.
pub struct IrqSafeReentrantGuard<'a, T> {
    guard: ManuallyDrop<ReentrantMutexGuard<'a, T>>,
    state: u64,
}

impl<T> core::ops::Deref for IrqSafeReentrantGuard<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T> Drop for IrqSafeReentrantGuard<'_, T> {
    /// [L7] Each guard restores what it saw on entry, so the outermost one
    /// re-enables interrupts
    fn drop(&mut self) {
        // SAFETY: guard is only dropped once, here in Drop, before restoring interrupts
        unsafe { ManuallyDrop::drop(&mut self.guard) };
        interrupts::restore(self.state);
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;

    /// Tests: [L1] disable before acquire, [L2] restore after release, [L4] data access
    /// Also tests [I1]-[I5] via interrupt mock
    #[test]
    fn test_irq_safe_lock_behavior() {
        let lock = IrqSafeLock::new(10);

        assert!(interrupts::is_enabled()); // [I4] initially enabled

        {
            let mut guard = lock.lock(); // [L1] disables interrupts
            assert_eq!(*guard, 10); // [L4] read access
            *guard = 20; // [L4] write access

            assert!(!interrupts::is_enabled()); // [I5] disabled while held
        } // [L2] restore on drop

        assert!(interrupts::is_enabled()); // [I4] restored
        assert_eq!(*lock.lock(), 20);
    }

    /// Tests: [L3] nested locks work correctly, [I6] disable→restore preserves state
    #[test]
    fn test_irq_safe_lock_nested() {
        let lock1 = IrqSafeLock::new(1);
        let lock2 = IrqSafeLock::new(2);

        assert!(interrupts::is_enabled());
        {
            let _g1 = lock1.lock(); // [L3] first lock
            assert!(!interrupts::is_enabled());
            {
                let _g2 = lock2.lock(); // [L3] nested lock
                assert!(!interrupts::is_enabled());
            }
            assert!(!interrupts::is_enabled()); // [L3] still disabled after inner drop
        }
        assert!(interrupts::is_enabled()); // [I6] finally restored
    }

    /// Tests: failed try_lock leaves interrupts as they were
    #[test]
    fn test_irq_safe_try_lock_restores() {
        let lock = IrqSafeLock::new(());
        let held = lock.lock();
        assert!(!interrupts::is_enabled());
        assert!(lock.try_lock().is_none());
        assert!(!interrupts::is_enabled()); // still inside the outer guard
        drop(held);
        assert!(interrupts::is_enabled());
        assert!(lock.try_lock().is_some());
    }

    /// Tests: [L5] disabled while held, [L6] re-entry, [L7] outermost restores
    #[test]
    fn test_irq_safe_reentrant_lock() {
        let lock = IrqSafeReentrantLock::new(5);
        assert!(interrupts::is_enabled());
        {
            let outer = lock.lock(); // [L5]
            assert!(!interrupts::is_enabled());
            {
                let inner = lock.lock(); // [L6] same context
                assert_eq!(*inner, 5);
                assert!(!interrupts::is_enabled());
            }
            assert!(!interrupts::is_enabled()); // [L7] inner drop keeps them off
            assert_eq!(*outer, 5);
        }
        assert!(interrupts::is_enabled()); // [L7]
        assert!(!lock.is_locked());
    }

    /// Tests: failed reentrant try_lock restores the caller's state
    #[test]
    fn test_irq_safe_reentrant_try_lock_elsewhere() {
        let lock = std::sync::Arc::new(IrqSafeReentrantLock::new(()));
        let held = lock.lock();
        let contender = std::sync::Arc::clone(&lock);
        let (acquired, enabled_after) = std::thread::spawn(move || {
            let acquired = contender.try_lock().is_some();
            (acquired, interrupts::is_enabled())
        })
        .join()
        .unwrap_or((true, false));
        assert!(!acquired);
        assert!(enabled_after);
        drop(held);
        assert!(interrupts::is_enabled());
    }
}
