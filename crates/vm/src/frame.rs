//! TEAM_431: Counted handles to page-table frames.
//!
//! A `PhysicalFrame` owns one physical page. Clones share it; the last drop
//! returns the page to the allocator it came from. Frames adopted from the
//! bootloader have no allocator and are never returned.

extern crate alloc;

use alloc::sync::Arc;
use core::fmt;

use los_hal::memory::phys_to_virt;
use los_hal::paging::PAGE_SIZE;
use los_hal::traits::PageAllocator;
use los_utils::Once;

static FRAME_ALLOCATOR: Once<&'static dyn PageAllocator> = Once::new();

/// Install the allocator used for page-table frames. Only the first call has an effect.
pub fn set_frame_allocator(allocator: &'static dyn PageAllocator) {
    FRAME_ALLOCATOR.call_once(|| allocator);
}

pub fn frame_allocator() -> Option<&'static dyn PageAllocator> {
    FRAME_ALLOCATOR.get().copied()
}

struct FrameInner {
    paddr: usize,
    source: Option<&'static dyn PageAllocator>,
}

impl Drop for FrameInner {
    fn drop(&mut self) {
        if let Some(allocator) = self.source {
            log::trace!("[VM] Releasing frame {:#x}", self.paddr);
            allocator.free_page(self.paddr);
        }
    }
}

#[derive(Clone)]
pub struct PhysicalFrame {
    inner: Arc<FrameInner>,
}

impl PhysicalFrame {
    /// Take one page from `allocator`. Contents are whatever the allocator left.
    pub fn allocate(allocator: &'static dyn PageAllocator) -> Option<Self> {
        let paddr = allocator.alloc_page()?;
        assert_eq!(paddr % PAGE_SIZE, 0, "[VM] Allocator returned unaligned frame {paddr:#x}");
        Some(Self {
            inner: Arc::new(FrameInner {
                paddr,
                source: Some(allocator),
            }),
        })
    }

    /// Take one page from `allocator` and zero it through the physical memory window.
    pub fn allocate_zeroed(allocator: &'static dyn PageAllocator) -> Option<Self> {
        let frame = Self::allocate(allocator)?;
        // SAFETY: the frame was just allocated, so nothing else references it,
        // and the window maps every physical page.
        unsafe {
            core::ptr::write_bytes(phys_to_virt(frame.paddr()) as *mut u8, 0, PAGE_SIZE);
        }
        Some(frame)
    }

    /// Wrap a frame the bootloader set up. It is never freed.
    pub fn adopt_boot_frame(paddr: usize) -> Self {
        assert_eq!(paddr % PAGE_SIZE, 0, "[VM] Boot frame {paddr:#x} is not page aligned");
        Self {
            inner: Arc::new(FrameInner {
                paddr,
                source: None,
            }),
        }
    }

    pub fn paddr(&self) -> usize {
        self.inner.paddr
    }

    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    pub fn is_boot_frame(&self) -> bool {
        self.inner.source.is_none()
    }
}

impl fmt::Debug for PhysicalFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PhysicalFrame({:#x})", self.paddr())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{CountingFrameAllocator, POISON};

    #[test]
    fn test_last_drop_frees() {
        let frames = CountingFrameAllocator::leak(4);
        let frame = PhysicalFrame::allocate(frames).unwrap();
        let clone = frame.clone();
        assert_eq!(frame.ref_count(), 2);
        assert_eq!(frames.live(), 1);
        drop(frame);
        assert_eq!(frames.live(), 1);
        drop(clone);
        assert_eq!(frames.live(), 0);
        assert_eq!(frames.freed(), 1);
    }

    #[test]
    fn test_allocate_zeroed() {
        let frames = CountingFrameAllocator::leak(2);
        let read = |frame: &PhysicalFrame| {
            // SAFETY: test frames are live heap pages, identity mapped on the host
            unsafe { core::slice::from_raw_parts(frame.paddr() as *const u8, PAGE_SIZE) }.to_vec()
        };
        let raw = PhysicalFrame::allocate(frames).unwrap();
        assert!(read(&raw).iter().all(|&b| b == POISON));
        let zeroed = PhysicalFrame::allocate_zeroed(frames).unwrap();
        assert!(read(&zeroed).iter().all(|&b| b == 0));
    }

    #[test]
    fn test_exhaustion_and_boot_frames() {
        let frames = CountingFrameAllocator::leak(1);
        let _held = PhysicalFrame::allocate(frames).unwrap();
        assert!(PhysicalFrame::allocate(frames).is_none());

        let boot = PhysicalFrame::adopt_boot_frame(0x0010_0000);
        assert!(boot.is_boot_frame());
        assert_eq!(boot.paddr(), 0x0010_0000);
        drop(boot); // never reaches an allocator
    }
}
