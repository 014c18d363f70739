use los_error::define_kernel_error;

define_kernel_error! {
    /// Address-space failures that callers can recover from.
    pub enum MemoryError(0x0A) {
        /// A frame for a page table could not be allocated
        OutOfMemory = 0x01 => "Out of physical memory",
        /// A range computation wrapped past the end of the address space
        AddressOverflow = 0x02 => "Address range overflows the address space",
    }
}
