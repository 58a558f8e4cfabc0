use core::{cell::Cell, ptr::NonNull};

use super::{counter::Counter, header::BlockHeader};

/// A control block for an object allocated independently of the block.
///
/// The block adopts an allocation made by `Box`, so destroying the object
/// deallocates it with the layout of the concrete pointee even when `T` is
/// a trait object or another unsized type.
pub struct Direct<T: ?Sized> {
    header: BlockHeader,
    ptr: Cell<Option<NonNull<T>>>,
}

impl<T: ?Sized> Direct<T> {
    pub fn new(ptr: NonNull<T>) -> Self {
        Self {
            header: BlockHeader::default(),
            ptr: Cell::new(Some(ptr)),
        }
    }
}

impl<T: ?Sized> Counter for Direct<T> {
    #[inline(always)]
    fn header(&self) -> &BlockHeader {
        &self.header
    }
    fn object_addr(&self) -> Option<NonNull<()>> {
        self.ptr.get().map(NonNull::cast)
    }
    unsafe fn destroy(&self) {
        if self.header.try_destroy() {
            if let Some(ptr) = self.ptr.take() {
                drop(Box::from_raw(ptr.as_ptr()));
            }
        }
    }
}
