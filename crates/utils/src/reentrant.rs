//! TEAM_431: Re-entrant spinlock.
//!
//! A page directory lock may be taken again by a path that already holds it
//! (for example, creating a user directory while the kernel directory is being
//! walked). `ReentrantMutex` lets the owning execution context re-acquire the
//! lock while every other context spins.
//!
//! Ownership is tracked by an execution-context id. The kernel installs its
//! id source (current CPU + thread) with [`set_context_id_source`]. Before that,
//! hosted builds use the OS thread, and bare-metal builds treat the boot
//! context as the only one.
//!
//! Behaviors:
//! - [RM1] The owner may lock again without blocking
//! - [RM2] Other contexts cannot acquire until every guard is dropped
//! - [RM3] Guards only give shared access (`&T`)

use core::num::NonZeroUsize;

use lock_api::GetThreadId;

/// Raw lock underneath the re-entrant wrapper.
pub type RawSpinLock = spin::mutex::SpinMutex<()>;

pub type ReentrantMutex<T> = lock_api::ReentrantMutex<RawSpinLock, ExecutionContextId, T>;
pub type ReentrantMutexGuard<'a, T> =
    lock_api::ReentrantMutexGuard<'a, RawSpinLock, ExecutionContextId, T>;

static CONTEXT_ID_SOURCE: spin::Once<fn() -> NonZeroUsize> = spin::Once::new();

/// Install the function that identifies the running execution context.
///
/// Only the first call has an effect.
pub fn set_context_id_source(source: fn() -> NonZeroUsize) {
    CONTEXT_ID_SOURCE.call_once(|| source);
}

/// Identifies the current execution context for lock ownership.
pub struct ExecutionContextId;

// SAFETY: distinct live contexts never share an id. The installed source is
// required to uphold this, the hosted fallback uses a per-thread address, and
// the bare-metal fallback is only used while a single context runs.
unsafe impl GetThreadId for ExecutionContextId {
    const INIT: Self = ExecutionContextId;

    fn nonzero_thread_id(&self) -> NonZeroUsize {
        if let Some(source) = CONTEXT_ID_SOURCE.get() {
            return source();
        }
        fallback_context_id()
    }
}

#[cfg(feature = "std")]
fn fallback_context_id() -> NonZeroUsize {
    std::thread_local! {
        static MARKER: u8 = const { 0 };
    }
    MARKER.with(|marker| {
        NonZeroUsize::new(core::ptr::from_ref(marker) as usize).unwrap_or(NonZeroUsize::MIN)
    })
}

#[cfg(not(feature = "std"))]
fn fallback_context_id() -> NonZeroUsize {
    NonZeroUsize::MIN
}
