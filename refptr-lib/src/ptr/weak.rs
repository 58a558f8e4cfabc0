use core::{fmt, ptr::NonNull};

use super::{
    counter::{release, Counter},
    counter_update::RefCounterUpdate,
    shared::Shared,
};

/// A weak handle: observes a block without keeping the object alive.
///
/// A handle is either empty or it contributes exactly one to the weak
/// count of its block. A weak handle keeps only the block metadata alive;
/// the managed object dies with the last strong handle.
pub struct Weak<T: ?Sized> {
    inner: Option<Inner<T>>,
}

struct Inner<T: ?Sized> {
    counter: NonNull<dyn Counter>,
    /// The typed address of the managed object, kept dormant so `lock`
    /// can re-form a strong handle. Never dereferenced here: while the
    /// object may be dead it is only an address.
    ptr: NonNull<T>,
}

impl<T: ?Sized> Clone for Inner<T> {
    #[inline(always)]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: ?Sized> Copy for Inner<T> {}

/// The weak half of the two-phase protocol: the last weak handle releases
/// the block storage if the strong side is already gone.
unsafe fn weak_release(counter: NonNull<dyn Counter>) {
    let header = counter.as_ref().header();
    if header.weak_update(RefCounterUpdate::Release) == 1
        && header.strong_update(RefCounterUpdate::Read) == 0
    {
        release(counter);
    }
}

impl<T: ?Sized> Weak<T> {
    /// An empty handle, referring to no block.
    pub const fn new() -> Self {
        Self { inner: None }
    }
    /// Observes an existing block, incrementing its weak count. `ptr` must
    /// address the object owned by `counter`.
    pub unsafe fn from_counter(counter: NonNull<dyn Counter>, ptr: NonNull<T>) -> Self {
        counter.as_ref().header().weak_update(RefCounterUpdate::AddRef);
        Self {
            inner: Some(Inner { counter, ptr }),
        }
    }
    /// `true` iff the handle is empty or the managed object is destroyed.
    pub fn expired(&self) -> bool {
        match &self.inner {
            Some(i) => {
                unsafe { i.counter.as_ref() }
                    .header()
                    .strong_update(RefCounterUpdate::Read)
                    == 0
            }
            None => true,
        }
    }
    /// A new strong handle sharing ownership, or an empty handle when the
    /// object is already destroyed. Never panics.
    pub fn lock(&self) -> Shared<T> {
        match &self.inner {
            Some(i) if !self.expired() => unsafe {
                debug_assert_eq!(i.counter.as_ref().object_addr(), Some(i.ptr.cast()));
                Shared::from_counter(i.counter, i.ptr)
            },
            _ => Shared::new(),
        }
    }
    /// Releases the referenced block and leaves the handle empty.
    pub fn reset(&mut self) {
        if let Some(i) = self.inner.take() {
            unsafe { weak_release(i.counter) };
        }
    }
    /// A handle to a related type, sharing the same block. Same contract
    /// as `Shared::cast`; the converted address is compared, never
    /// dereferenced.
    pub fn cast<U: ?Sized>(this: &Self, f: impl FnOnce(*mut T) -> *mut U) -> Weak<U> {
        match &this.inner {
            Some(i) => {
                let ptr = f(i.ptr.as_ptr());
                assert_eq!(
                    ptr.cast::<()>(),
                    i.ptr.as_ptr().cast::<()>(),
                    "cast changed the object address"
                );
                unsafe { Weak::from_counter(i.counter, NonNull::new_unchecked(ptr)) }
            }
            None => Weak::new(),
        }
    }
}

impl<T: ?Sized> Default for Weak<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> Clone for Weak<T> {
    fn clone(&self) -> Self {
        match &self.inner {
            Some(i) => unsafe { Self::from_counter(i.counter, i.ptr) },
            None => Self::new(),
        }
    }
}

impl<T: ?Sized> Drop for Weak<T> {
    fn drop(&mut self) {
        self.reset();
    }
}

impl<T: ?Sized> fmt::Debug for Weak<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Weak")
            .field("expired", &self.expired())
            .finish()
    }
}
