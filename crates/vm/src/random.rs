//! Randomness for address-space layout.
//!
//! The kernel installs its entropy pool with [`set_random_source`]. Until then
//! a xorshift64* generator keeps placement varied, which is enough for layout
//! but not for anything secret.

use core::sync::atomic::{AtomicU64, Ordering};

use los_utils::Once;

pub trait RandomSource: Send + Sync {
    fn random_u64(&self) -> u64;
}

static SOURCE: Once<&'static dyn RandomSource> = Once::new();
static FALLBACK_STATE: AtomicU64 = AtomicU64::new(0x9E37_79B9_7F4A_7C15);

/// Install the kernel's random source. Only the first call has an effect.
pub fn set_random_source(source: &'static dyn RandomSource) {
    SOURCE.call_once(|| source);
}

pub fn random_u64() -> u64 {
    match SOURCE.get() {
        Some(source) => source.random_u64(),
        None => fallback_u64(),
    }
}

pub fn random_usize() -> usize {
    random_u64() as usize
}

fn xorshift(mut x: u64) -> u64 {
    x ^= x >> 12;
    x ^= x << 25;
    x ^= x >> 27;
    x
}

fn fallback_u64() -> u64 {
    let previous = FALLBACK_STATE
        .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |x| Some(xorshift(x)))
        .unwrap_or_else(|x| x);
    xorshift(previous).wrapping_mul(0x2545_F491_4F6C_DD1D)
}
