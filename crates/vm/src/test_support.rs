//! Host-side stand-ins for boot state: frames, kernel directory, processes.

extern crate std;

use alloc::sync::Arc;
use std::alloc::{Layout, alloc, handle_alloc_error};
use std::collections::BTreeSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::boxed::Box;

use los_hal::ActiveArch;
use los_hal::paging::{PAGE_SIZE, table_at};
use los_hal::traits::{PageAllocator, PagingArch};

use crate::frame::set_frame_allocator;
use crate::page_directory::{BootPageTables, PageDirectory, Process};

/// Fill byte for fresh frames, so missing zeroing shows up.
pub const POISON: u8 = 0xCC;

/// Hands out heap pages as "physical" frames (the window offset is 0 on the
/// host). Pages are never given back to the heap, so a frame address is never
/// reused within a test run.
pub struct CountingFrameAllocator {
    budget: AtomicUsize,
    live: Mutex<BTreeSet<usize>>,
    freed: AtomicUsize,
}

impl CountingFrameAllocator {
    /// A `'static` allocator that grants at most `budget` frames.
    pub fn leak(budget: usize) -> &'static Self {
        Box::leak(Box::new(Self {
            budget: AtomicUsize::new(budget),
            live: Mutex::new(BTreeSet::new()),
            freed: AtomicUsize::new(0),
        }))
    }

    pub fn live(&self) -> usize {
        self.live.lock().map_or(0, |live| live.len())
    }

    pub fn freed(&self) -> usize {
        self.freed.load(Ordering::SeqCst)
    }
}

impl PageAllocator for CountingFrameAllocator {
    fn alloc_page(&self) -> Option<usize> {
        self.budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .ok()?;
        let layout = Layout::from_size_align(PAGE_SIZE, PAGE_SIZE).ok()?;
        // SAFETY: layout has non-zero size
        let page = unsafe { alloc(layout) };
        if page.is_null() {
            handle_alloc_error(layout);
        }
        // SAFETY: page is a fresh PAGE_SIZE allocation
        unsafe { core::ptr::write_bytes(page, POISON, PAGE_SIZE) };
        let paddr = page as usize;
        if let Ok(mut live) = self.live.lock() {
            live.insert(paddr);
        }
        Some(paddr)
    }

    fn free_page(&self, pa: usize) {
        let was_live = self.live.lock().is_ok_and(|mut live| live.remove(&pa));
        assert!(was_live, "free of frame {pa:#x} that is not live");
        self.freed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Frame handed to every kernel root entry from `FIRST_KERNEL_ROOT_ENTRY` up.
pub const FAKE_KERNEL_TABLE_BASE: usize = 0x0100_0000;

fn boot() {
    static BOOT: std::sync::Once = std::sync::Once::new();
    BOOT.call_once(|| {
        let frames = CountingFrameAllocator::leak(usize::MAX);
        set_frame_allocator(frames);

        let Some(root) = frames.alloc_page() else {
            panic!("host frame allocator exhausted");
        };
        // SAFETY: root is a fresh page-sized, page-aligned heap block
        let table = unsafe { table_at::<<ActiveArch as PagingArch>::DirectoryEntry>(root) };
        table.zero();
        for (i, entry) in table
            .entries
            .iter_mut()
            .enumerate()
            .skip(ActiveArch::FIRST_KERNEL_ROOT_ENTRY)
        {
            ActiveArch::link_table(entry, FAKE_KERNEL_TABLE_BASE + i * PAGE_SIZE);
        }
        PageDirectory::must_create_kernel_page_directory(BootPageTables { root });
    });
}

/// The kernel directory, created on first use.
pub fn kernel_directory() -> Arc<PageDirectory> {
    boot();
    PageDirectory::kernel_page_directory()
}

pub struct TestProcess {
    pub pid: usize,
}

impl Process for TestProcess {
    fn pid(&self) -> usize {
        self.pid
    }
}

pub fn test_process(pid: usize) -> Arc<dyn Process> {
    Arc::new(TestProcess { pid })
}
