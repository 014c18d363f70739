//! TEAM_431: Page directories (address spaces).
//!
//! A `PageDirectory` owns one hardware translation tree: the root table plus
//! the intermediate tables it created, and a range allocator for its half of
//! the address space. Every user directory shares the kernel half by copying
//! the kernel root's upper entries at creation time.
//!
//! Directories are registered by root-table address so the one a CPU is
//! running on can be recovered from CR3 / SATP.
//!
//! Behaviors:
//! - [D1] Creation failure leaks no frames and registers nothing
//! - [D2] A registered directory is found by its root register value
//! - [D3] Dropping a directory unregisters it, then releases its frames
//! - [D4] User directories share the kernel root entries verbatim
//! - [D5] The directory lock is re-entrant for the holding context
//! - [D6] Interrupts stay disabled while the directory lock is held
//! - [D7] A lookup racing the last drop yields the directory or nothing

extern crate alloc;

use alloc::sync::{Arc, Weak};
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;
use core::sync::atomic::{AtomicBool, Ordering};

use los_hal::ActiveArch;
use los_hal::paging::{PAGE_MASK, PageTable, table_at};
use los_hal::traits::{PageAllocator, PagingArch};
use los_hal::{IrqSafeReentrantGuard, IrqSafeReentrantLock};
use los_utils::Once;

use crate::address::VirtualAddress;
use crate::error::MemoryError;
use crate::frame::{self, PhysicalFrame};
use crate::layout::{
    KERNEL_IDENTITY_RANGE_BASE, KERNEL_IDENTITY_RANGE_SIZE, KERNEL_RANGE_BASE, KERNEL_RANGE_SIZE,
    USER_RANDOM_OFFSET_LIMIT, USER_RANGE_BASE, USER_RANGE_CEILING,
};
use crate::random;
use crate::range_allocator::VirtualRangeAllocator;
use crate::registry;

type RootEntry = <ActiveArch as PagingArch>::DirectoryEntry;

/// Owner of a user address space, as seen from the memory manager.
pub trait Process: Send + Sync {
    fn pid(&self) -> usize;
}

/// Tables the bootloader left active when the kernel took over.
#[derive(Clone, Copy, Debug)]
pub struct BootPageTables {
    /// Physical address of the root table.
    pub root: usize,
}

static KERNEL_PAGE_DIRECTORY: Once<Arc<PageDirectory>> = Once::new();

pub struct PageDirectory {
    root_table: PhysicalFrame,
    directory_tables: Vec<PhysicalFrame>,
    range_allocator: VirtualRangeAllocator,
    identity_range_allocator: Option<VirtualRangeAllocator>,
    process: Option<Weak<dyn Process>>,
    lock: IrqSafeReentrantLock<()>,
    registered: AtomicBool,
}

impl PageDirectory {
    /// Adopt the boot tables as the kernel directory.
    ///
    /// Fatal if a kernel directory already exists.
    pub fn must_create_kernel_page_directory(boot: BootPageTables) -> Arc<Self> {
        let mut created = false;
        let directory = KERNEL_PAGE_DIRECTORY.call_once(|| {
            created = true;
            let directory = Arc::new(Self {
                root_table: PhysicalFrame::adopt_boot_frame(boot.root),
                directory_tables: Vec::new(),
                range_allocator: VirtualRangeAllocator::with_range(
                    VirtualAddress::new(KERNEL_RANGE_BASE),
                    KERNEL_RANGE_SIZE,
                ),
                identity_range_allocator: Some(VirtualRangeAllocator::with_range(
                    VirtualAddress::new(KERNEL_IDENTITY_RANGE_BASE),
                    KERNEL_IDENTITY_RANGE_SIZE,
                )),
                process: None,
                lock: IrqSafeReentrantLock::new(()),
                registered: AtomicBool::new(false),
            });
            directory.register();
            log::debug!(
                "[VM] Kernel page directory at {:#x} ({})",
                boot.root,
                ActiveArch::NAME
            );
            directory
        });
        assert!(created, "[VM] Kernel page directory already exists");
        Arc::clone(directory)
    }

    /// The directory created by [`Self::must_create_kernel_page_directory`].
    pub fn kernel_page_directory() -> Arc<Self> {
        match KERNEL_PAGE_DIRECTORY.get() {
            Some(directory) => Arc::clone(directory),
            None => panic!("[VM] Kernel page directory used before creation"),
        }
    }

    /// New user address space for `process`, using the boot-installed frame allocator.
    pub fn try_create_for_userspace(process: Weak<dyn Process>) -> Result<Arc<Self>, MemoryError> {
        let Some(frames) = frame::frame_allocator() else {
            panic!("[VM] No frame allocator installed");
        };
        Self::try_create_for_userspace_with(Some(process), None, frames)
    }

    /// New user address space whose free ranges start as a copy of this one's.
    pub fn try_clone_for_userspace(
        &self,
        process: Weak<dyn Process>,
    ) -> Result<Arc<Self>, MemoryError> {
        let Some(frames) = frame::frame_allocator() else {
            panic!("[VM] No frame allocator installed");
        };
        Self::try_create_for_userspace_with(Some(process), Some(&self.range_allocator), frames)
    }

    /// Build a user directory from explicit collaborators.
    ///
    /// With `parent`, the range allocator copies the parent's free list;
    /// otherwise it covers the user range from a randomized base.
    pub fn try_create_for_userspace_with(
        process: Option<Weak<dyn Process>>,
        parent: Option<&VirtualRangeAllocator>,
        frames: &'static dyn PageAllocator,
    ) -> Result<Arc<Self>, MemoryError> {
        let kernel = Self::kernel_page_directory();

        // [D1] frames already taken are released when `?` drops them
        let root_table = PhysicalFrame::allocate_zeroed(frames).ok_or(MemoryError::OutOfMemory)?;
        let user_table = PhysicalFrame::allocate_zeroed(frames).ok_or(MemoryError::OutOfMemory)?;

        {
            let _kernel_guard = kernel.lock();
            // SAFETY: both frames hold root-level tables reachable through the
            // physical window. The new root is not shared yet, and the kernel
            // root is only read while its lock is held.
            let kernel_root: &PageTable<RootEntry> = unsafe { table_at(kernel.root_table_paddr()) };
            let root: &mut PageTable<RootEntry> = unsafe { table_at(root_table.paddr()) };

            let first_kernel = ActiveArch::FIRST_KERNEL_ROOT_ENTRY;
            root.entries[first_kernel..].copy_from_slice(&kernel_root.entries[first_kernel..]); // [D4]
            ActiveArch::link_table(
                &mut root.entries[ActiveArch::root_index(USER_RANGE_BASE)],
                user_table.paddr(),
            );
        }

        let range_allocator = VirtualRangeAllocator::new();
        match parent {
            Some(parent) => range_allocator.initialize_from_parent(parent),
            None => {
                let offset = (random::random_usize() % USER_RANDOM_OFFSET_LIMIT) & PAGE_MASK;
                let base = USER_RANGE_BASE + offset;
                range_allocator
                    .initialize_with_range(VirtualAddress::new(base), USER_RANGE_CEILING - base);
            }
        }

        let directory = Arc::new(Self {
            root_table,
            directory_tables: vec![user_table],
            range_allocator,
            identity_range_allocator: None,
            process,
            lock: IrqSafeReentrantLock::new(()),
            registered: AtomicBool::new(false),
        });
        directory.register();
        log::trace!(
            "[VM] Created user page directory {:#x}, range {}",
            directory.root_table_paddr(),
            directory.range_allocator.total_range()
        );
        Ok(directory)
    }

    fn register(self: &Arc<Self>) {
        registry::register(self.root_table_paddr(), self);
        self.registered.store(true, Ordering::Release);
    }

    /// [D2] Directory whose root matches a CR3 / SATP value.
    pub fn find_by_cr3(value: usize) -> Option<Arc<Self>> {
        registry::lookup(ActiveArch::root_from_register(value))
    }

    /// Directory active on this CPU, if it is registered.
    pub fn find_current() -> Option<Arc<Self>> {
        Self::find_by_cr3(los_hal::arch::read_root_register())
    }

    /// Like [`Self::find_current`], for contexts that always run on a registered directory.
    pub fn must_find_current() -> Arc<Self> {
        match Self::find_current() {
            Some(directory) => directory,
            None => panic!(
                "[VM] No page directory registered for root register {:#x}",
                los_hal::arch::read_root_register()
            ),
        }
    }

    pub fn registered_directory_count() -> usize {
        registry::len()
    }

    pub fn root_table_paddr(&self) -> usize {
        self.root_table.paddr()
    }

    /// Value to load into CR3 / SATP to run on this directory.
    pub fn root_register_value(&self) -> usize {
        ActiveArch::root_register_value(self.root_table_paddr())
    }

    pub fn range_allocator(&self) -> &VirtualRangeAllocator {
        &self.range_allocator
    }

    /// Low identity window; kernel directory only.
    pub fn identity_range_allocator(&self) -> Option<&VirtualRangeAllocator> {
        self.identity_range_allocator.as_ref()
    }

    /// Owning process, if it is still alive.
    pub fn process(&self) -> Option<Arc<dyn Process>> {
        self.process.as_ref().and_then(Weak::upgrade)
    }

    pub fn is_kernel(&self) -> bool {
        KERNEL_PAGE_DIRECTORY
            .get()
            .is_some_and(|kernel| core::ptr::eq(Arc::as_ptr(kernel), self))
    }

    /// Tables below the root that this directory allocated.
    pub fn directory_table_count(&self) -> usize {
        self.directory_tables.len()
    }

    /// [D5] Serialize changes to this directory's tables.
    ///
    /// [D6] Interrupts are disabled until the outermost guard drops.
    pub fn lock(&self) -> IrqSafeReentrantGuard<'_, ()> {
        self.lock.lock()
    }

    pub fn try_lock(&self) -> Option<IrqSafeReentrantGuard<'_, ()>> {
        self.lock.try_lock()
    }
}

impl Drop for PageDirectory {
    fn drop(&mut self) {
        // [D3] unregister first; the frames are released after this returns
        if self.registered.load(Ordering::Acquire) {
            registry::unregister(self.root_table.paddr(), self);
        }
        log::trace!("[VM] Destroying page directory {:#x}", self.root_table.paddr());
    }
}

impl fmt::Debug for PageDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageDirectory")
            .field("root", &format_args!("{:#x}", self.root_table_paddr()))
            .field("range", &self.range_allocator.total_range())
            .field("tables", &self.directory_tables.len())
            .finish_non_exhaustive()
    }
}

/// Switch this CPU to `directory`.
///
/// # Safety
/// `directory` must map the running code and stack, and must outlive its use
/// on this CPU.
pub unsafe fn activate(directory: &PageDirectory) {
    log::trace!("[VM] Activating page directory {:#x}", directory.root_table_paddr());
    unsafe { los_hal::arch::load_root_register(directory.root_register_value()) }
}
