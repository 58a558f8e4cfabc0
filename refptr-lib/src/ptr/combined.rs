use core::{
    cell::UnsafeCell,
    mem::MaybeUninit,
    ptr::{drop_in_place, NonNull},
};

use super::{counter::Counter, header::BlockHeader, state::BlockState};

/// A control block embedding the object storage next to the header, so one
/// allocation carries both.
///
/// The storage may be created uninitialized for a fallible constructor.
/// Such a block must be initialized with `init` before any handle refers
/// to it; dropping it before `init` releases the storage without running
/// an object destructor.
pub struct Combined<T> {
    header: BlockHeader,
    object: UnsafeCell<MaybeUninit<T>>,
}

impl<T> Combined<T> {
    pub fn new(value: T) -> Self {
        Self {
            header: BlockHeader::default(),
            object: UnsafeCell::new(MaybeUninit::new(value)),
        }
    }
    pub fn uninit() -> Self {
        Self {
            header: BlockHeader::default(),
            object: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }
    pub fn init(&mut self, value: T) {
        self.object.get_mut().write(value);
    }
    #[inline(always)]
    pub fn object_ptr(&self) -> NonNull<T> {
        unsafe { NonNull::new_unchecked(self.object.get().cast()) }
    }
}

impl<T> Counter for Combined<T> {
    #[inline(always)]
    fn header(&self) -> &BlockHeader {
        &self.header
    }
    fn object_addr(&self) -> Option<NonNull<()>> {
        match self.header.state() {
            BlockState::Live => Some(self.object_ptr().cast()),
            BlockState::ObjectDestroyed => None,
        }
    }
    unsafe fn destroy(&self) {
        if self.header.try_destroy() {
            drop_in_place(self.object_ptr().as_ptr());
        }
    }
}
