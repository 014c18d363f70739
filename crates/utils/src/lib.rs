#![cfg_attr(not(feature = "std"), no_std)]

pub mod reentrant;

// TEAM_211: Re-export spin crate types as our lock API
// Note: spin::Mutex is re-exported as Mutex for API compatibility
pub use spin::{Lazy, Once};
pub use spin::{Mutex, MutexGuard};

// TEAM_212: Re-export hashbrown collections
pub use hashbrown::HashMap;

// TEAM_431: Re-entrant lock for paths that may re-acquire a lock they hold
pub use reentrant::{
    ExecutionContextId, ReentrantMutex, ReentrantMutexGuard, set_context_id_source,
};

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;

    /// Tests: [S1] exclusive access, [S3] release on drop, [S4] read, [S5] write, [S6] cycles
    #[test]
    fn test_spinlock_basic() {
        let lock = Mutex::new(42);
        {
            let mut guard = lock.lock(); // [S1] acquire
            assert_eq!(*guard, 42); // [S4] read access
            *guard = 43; // [S5] write access
        } // [S3] release on drop
        assert_eq!(*lock.lock(), 43); // [S6] multiple cycles
    }

    /// Tests: [S2] try_lock fails while another holder exists
    #[test]
    fn test_spinlock_exclusive() {
        let lock = Mutex::new(0_u32);
        let guard = lock.lock();
        assert!(lock.try_lock().is_none()); // [S2] held
        drop(guard);
        assert!(lock.try_lock().is_some());
    }

    /// Tests: Lazy initializes once on first access
    #[test]
    fn test_lazy_hashmap() {
        static TABLE: Lazy<Mutex<HashMap<usize, &'static str>>> =
            Lazy::new(|| Mutex::new(HashMap::new()));
        TABLE.lock().insert(0x1000, "root");
        assert_eq!(TABLE.lock().get(&0x1000), Some(&"root"));
        assert_eq!(TABLE.lock().get(&0x2000), None);
    }
}
