use core::ptr::NonNull;

use super::header::BlockHeader;

/// A control block for one managed object.
///
/// Block = (BlockHeader, storage strategy). The two implementations differ
/// in where the object lives: `Direct` points at a separate allocation,
/// `Combined` embeds the object next to the header. The variant is fixed
/// when the block is created and reached through `NonNull<dyn Counter>`.
pub trait Counter {
    fn header(&self) -> &BlockHeader;
    /// Address of the managed object, `None` once the object is destroyed.
    fn object_addr(&self) -> Option<NonNull<()>>;
    /// Runs the managed object's destructor. Idempotent. Never frees the
    /// block storage.
    unsafe fn destroy(&self);
}

/// Frees the block storage. Called at most once per block, by whichever
/// handle observes both counts at zero. The storage is deallocated with
/// the layout of the concrete block type, recovered through the vtable.
pub unsafe fn release(counter: NonNull<dyn Counter>) {
    counter.as_ref().header().release_assert();
    drop(Box::from_raw(counter.as_ptr()));
}
