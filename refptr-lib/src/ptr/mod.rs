//! Reference counted strong and weak handles over a control block.
//!
//! Block = (BlockHeader, storage strategy). The block owns the managed
//! object and dies in two phases: the object is destroyed when the strong
//! count reaches zero, the block storage is released once both counts are
//! zero, by whichever handle observes that last.
//!
//! The counters are not synchronized. Handles that alias one block must
//! stay on one thread; `Shared` and `Weak` are neither `Send` nor `Sync`.

pub mod combined;
pub mod counter;
pub mod counter_update;
pub mod direct;
pub mod header;
pub mod shared;
pub mod state;
pub mod weak;

use core::ptr::NonNull;

use self::{combined::Combined, counter::Counter, shared::Shared};

/// A strong handle to a new object, allocating a single block that embeds
/// the object storage next to the counters.
pub fn new_shared<T: 'static>(value: T) -> Shared<T> {
    let counter = Box::leak(Box::new(Combined::new(value)));
    let ptr = counter.object_ptr();
    let counter: &mut dyn Counter = counter;
    unsafe { Shared::from_counter(NonNull::from(counter), ptr) }
}

/// Like `new_shared` for a fallible constructor. The block is allocated
/// first; a constructor failure releases it and propagates the error.
pub fn try_new_shared<T: 'static, E>(
    new: impl FnOnce() -> Result<T, E>,
) -> Result<Shared<T>, E> {
    let mut block = Box::new(Combined::uninit());
    block.init(new()?);
    let counter = Box::leak(block);
    let ptr = counter.object_ptr();
    let counter: &mut dyn Counter = counter;
    Ok(unsafe { Shared::from_counter(NonNull::from(counter), ptr) })
}
