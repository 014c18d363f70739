//! TEAM_431: Global map from root-table address to live page directory.
//!
//! Entries are weak, so the registry never keeps a directory alive. A
//! directory removes its own entry when dropped, before its root frame is
//! released, so a root address is never reused while still registered.

extern crate alloc;

use alloc::sync::{Arc, Weak};

use los_hal::IrqSafeLock;
use los_utils::{HashMap, Lazy};

use crate::page_directory::PageDirectory;

static DIRECTORIES: Lazy<IrqSafeLock<HashMap<usize, Weak<PageDirectory>>>> =
    Lazy::new(|| IrqSafeLock::new(HashMap::new()));

pub(crate) fn register(root: usize, directory: &Arc<PageDirectory>) {
    let previous = DIRECTORIES.lock().insert(root, Arc::downgrade(directory));
    assert!(
        previous.is_none(),
        "[VM] Root table {root:#x} registered twice"
    );
}

/// Remove `root` only if it still maps to `directory`.
pub(crate) fn unregister(root: usize, directory: *const PageDirectory) {
    let mut map = DIRECTORIES.lock();
    if map
        .get(&root)
        .is_some_and(|entry| core::ptr::eq(entry.as_ptr(), directory))
    {
        map.remove(&root);
    }
}

pub(crate) fn lookup(root: usize) -> Option<Arc<PageDirectory>> {
    let found = DIRECTORIES.lock().get(&root).and_then(Weak::upgrade);
    found
}

pub(crate) fn len() -> usize {
    DIRECTORIES.lock().len()
}
